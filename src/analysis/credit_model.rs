//! Credit model: subscore composition, logistic PD, score mapping and
//! loan sizing.
//!
//! The pipeline is a pure composed function over the extracted features.
//! Subscores are deliberately unclamped; the logistic stage absorbs
//! magnitude.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::analysis::features::{self, FeatureSet};
use crate::config::ModelParams;
use crate::positions::{self, ScoreInput};
use crate::utils::error::{Error, Result};

/// Performance and risk subscores, kept for auditability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub performance: f64,
    pub risk: f64,
}

/// LTV ratio and capped maximum loan amount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Fraction of effective collateral the system will lend, in [ltv_min, ltv_max]
    pub ltv: f64,
    /// Capped maximum loan amount, never negative
    pub max_loan: f64,
}

/// Final output of a scoring call. Immutable once created; persistence and
/// on-chain submission happen elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResult {
    pub user_name: String,
    pub user_id: String,
    /// Probability of default, in (0, 1)
    pub pd: f64,
    /// FICO-style base score, clamped to the configured bounds.
    /// Deterministic; any published variance is injected downstream.
    pub credit_score: f64,
    pub ltv: f64,
    pub max_loan: f64,
    pub features: FeatureSet,
    pub subscores: Subscores,
    pub scored_at: chrono::DateTime<Utc>,
}

/// Human-readable score tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreditRating {
    Exceptional,
    Excellent,
    Good,
    Fair,
    BelowAverage,
    Poor,
}

impl CreditRating {
    /// Classify a credit score into its tier
    pub fn from_score(score: f64) -> Self {
        match score {
            | s if s >= 850.0 => CreditRating::Exceptional,
            | s if s >= 750.0 => CreditRating::Excellent,
            | s if s >= 650.0 => CreditRating::Good,
            | s if s >= 550.0 => CreditRating::Fair,
            | s if s >= 450.0 => CreditRating::BelowAverage,
            | _ => CreditRating::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            | CreditRating::Exceptional => "Exceptional",
            | CreditRating::Excellent => "Excellent",
            | CreditRating::Good => "Good",
            | CreditRating::Fair => "Fair",
            | CreditRating::BelowAverage => "Below Average",
            | CreditRating::Poor => "Poor",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            | CreditRating::Exceptional => "Top tier trader with excellent track record",
            | CreditRating::Excellent => "Very strong trading performance",
            | CreditRating::Good => "Solid trader with positive results",
            | CreditRating::Fair => "Average trading performance",
            | CreditRating::BelowAverage => "Needs improvement",
            | CreditRating::Poor => "Significant losses or low activity",
        }
    }
}

/// Linear combination of features into the two subscores
pub fn compose_subscores(features: &FeatureSet, params: &ModelParams) -> Subscores {
    let perf = &params.performance;
    let risk = &params.risk;
    Subscores {
        performance: perf.w_roi * features.roi_real
            + perf.w_win_rate * (features.win_rate - 0.5)
            + perf.w_sharpe * features.sharpe
            + perf.w_profit_factor * features.profit_factor_feature,
        risk: risk.w_drawdown * -features.dd_open
            + risk.w_concentration * features.hhi_open
            + risk.w_dead_share * features.dead_share,
    }
}

/// Fixed-coefficient logistic PD model. The logistic range keeps the result
/// inside (0, 1); callers taking logs or ratios still guard with eps.
pub fn probability_of_default(subscores: &Subscores, params: &ModelParams) -> f64 {
    let coef = &params.logistic;
    let z = coef.beta0 + coef.beta_perf * subscores.performance + coef.beta_risk * subscores.risk;
    1.0 / (1.0 + (-z).exp())
}

/// Map PD to a bounded FICO-style score via log-odds scaling
pub fn map_score(pd: f64, params: &ModelParams) -> f64 {
    let mapping = &params.score_mapping;
    let factor = mapping.pdo / 2.0_f64.ln();
    let offset = mapping.score_ref - factor * mapping.odds_ref.ln();

    let odds_good = (1.0 - pd) / pd.max(params.eps);
    let raw_score = offset + factor * odds_good.max(params.eps).ln();

    raw_score.clamp(mapping.score_min, mapping.score_max)
}

/// Convert PD and effective collateral into LTV and a capped max loan
pub fn size_loan(pd: f64, v_eff: f64, params: &ModelParams) -> LoanTerms {
    let sizing = &params.loan_sizing;
    let goodness = (1.0 - pd).max(0.0);

    let ltv = sizing.ltv_min + (sizing.ltv_max - sizing.ltv_min) * goodness.powf(sizing.gamma);

    let collateral_loan = ltv * v_eff;
    // Independent, steeper cap that can bind before the LTV figure for
    // low-goodness accounts
    let capped_loan = sizing.kappa * v_eff * goodness.powf(sizing.delta);
    let max_loan = collateral_loan.min(capped_loan).max(0.0);

    LoanTerms { ltv, max_loan }
}

/// The scoring engine: a pure, synchronous pipeline over one account's
/// position lists. Holds only immutable parameters, so concurrent scoring of
/// different accounts needs no locking.
#[derive(Debug, Clone, Default)]
pub struct CreditEngine {
    params: ModelParams,
}

impl CreditEngine {
    /// Create an engine with the default calibration
    pub fn new() -> Self {
        Self { params: ModelParams::default() }
    }

    /// Create an engine with custom parameters
    pub fn with_params(params: ModelParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Score an account from its raw position data.
    ///
    /// Never fails: malformed numeric fields coerce to zero and every
    /// degenerate input (empty lists, zero totals, all-loss books) has a
    /// documented fallback.
    pub fn score(&self, input: &ScoreInput) -> ScoreResult {
        let closed = positions::normalize_closed(&input.closed_positions);
        let current = positions::normalize_current(&input.current_positions);

        let features = features::extract(&closed, &current, &self.params);
        let subscores = compose_subscores(&features, &self.params);
        let pd = probability_of_default(&subscores, &self.params);
        let credit_score = map_score(pd, &self.params);
        let loan = size_loan(pd, features.v_eff, &self.params);

        log::debug!(
            "scored user={} perf={:.4} risk={:.4} pd={:.4}",
            input.user.name,
            subscores.performance,
            subscores.risk,
            pd
        );
        log::info!(
            "credit score for {}: {:.0} ({}), max loan {:.2}",
            input.user.name,
            credit_score,
            CreditRating::from_score(credit_score).label(),
            loan.max_loan
        );

        ScoreResult {
            user_name: input.user.name.clone(),
            user_id: input.user.value.clone(),
            pd,
            credit_score,
            ltv: loan.ltv,
            max_loan: loan.max_loan,
            features,
            subscores,
            scored_at: Utc::now(),
        }
    }

    /// Score with a finiteness check on the output fields. Hardening layer
    /// for callers that want upstream NaN/Infinity injection to fail loudly
    /// instead of propagating.
    pub fn score_checked(&self, input: &ScoreInput) -> Result<ScoreResult> {
        let result = self.score(input);
        let fields = [
            ("pd", result.pd),
            ("credit_score", result.credit_score),
            ("ltv", result.ltv),
            ("max_loan", result.max_loan),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::ComputationError(format!(
                    "non-finite {} for user {}",
                    name, result.user_name
                )));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positions::{ClosedPosition, CurrentPosition};
    use rstest::rstest;
    use serde_json::json;

    fn input_from_positions(
        closed: &[ClosedPosition],
        current: &[CurrentPosition],
    ) -> ScoreInput {
        ScoreInput {
            user: crate::positions::UserRef { name: "test".into(), value: "0xtest".into() },
            closed_positions: closed
                .iter()
                .map(|p| {
                    json!({ "realizedPnl": p.realized_pnl.to_string(), "totalBought": p.total_bought.to_string() })
                })
                .collect(),
            current_positions: current
                .iter()
                .map(|p| {
                    json!({
                        "initialValue": p.initial_value.to_string(),
                        "currentValue": p.current_value.to_string(),
                        "percentPnl": p.percent_pnl.to_string()
                    })
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_input_pd_matches_formula() {
        let engine = CreditEngine::new();
        let result = engine.score(&ScoreInput::default());

        // Empty book: WinRate 0.5 contributes 0, Sharpe 0, ROI 0, but the
        // profit factor centers at -1, so PerfScore = 0.15 * -1 = -0.15
        assert!((result.subscores.performance - (-0.15)).abs() < 1e-12);
        assert_eq!(result.subscores.risk, 0.0);

        // z = -0.9 - 1.0 * (-0.15) = -0.75
        let expected_pd = 1.0 / (1.0 + 0.75_f64.exp());
        assert!((result.pd - expected_pd).abs() < 1e-12);

        // odds_good = (1 - pd) / pd = e^0.75; Factor * ln(4) = 100 exactly
        let factor = 50.0 / 2.0_f64.ln();
        let expected_score = (650.0 - 100.0) + factor * 0.75;
        assert!((result.credit_score - expected_score).abs() < 1e-9);

        assert_eq!(result.features.v_eff, 0.0);
        assert_eq!(result.max_loan, 0.0);
    }

    #[test]
    fn test_determinism() {
        let engine = CreditEngine::new();
        let input = input_from_positions(
            &[
                ClosedPosition { realized_pnl: 416736.0, total_bought: 1190675.0 },
                ClosedPosition { realized_pnl: -50000.0, total_bought: 300000.0 },
            ],
            &[CurrentPosition { initial_value: 303359.0, current_value: 150000.0, percent_pnl: -50.0 }],
        );

        let a = engine.score(&input);
        let b = engine.score(&input);
        assert_eq!(a.pd.to_bits(), b.pd.to_bits());
        assert_eq!(a.credit_score.to_bits(), b.credit_score.to_bits());
        assert_eq!(a.ltv.to_bits(), b.ltv.to_bits());
        assert_eq!(a.max_loan.to_bits(), b.max_loan.to_bits());
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn test_monotonicity_in_realized_pnl() {
        let engine = CreditEngine::new();
        let current =
            [CurrentPosition { initial_value: 1000.0, current_value: 900.0, percent_pnl: -10.0 }];

        let mut last_pd = 1.0;
        let mut last_score = 0.0;
        for pnl in [10.0, 100.0, 500.0, 2500.0] {
            let input = input_from_positions(
                &[ClosedPosition { realized_pnl: pnl, total_bought: 1000.0 }],
                &current,
            );
            let result = engine.score(&input);
            assert!(result.pd <= last_pd, "pd increased when pnl rose to {}", pnl);
            assert!(
                result.credit_score >= last_score,
                "score decreased when pnl rose to {}",
                pnl
            );
            last_pd = result.pd;
            last_score = result.credit_score;
        }
    }

    #[rstest]
    #[case(&[], &[])]
    #[case(
        &[
            ClosedPosition { realized_pnl: 1_000_000.0, total_bought: 1_000_000.0 },
            ClosedPosition { realized_pnl: 2_000_000.0, total_bought: 1_000_000.0 },
        ],
        &[]
    )]
    #[case(
        &[
            ClosedPosition { realized_pnl: -1_000_000.0, total_bought: 1_000_000.0 },
            ClosedPosition { realized_pnl: -2_000_000.0, total_bought: 1_000_000.0 },
        ],
        &[]
    )]
    #[case(
        &[
            ClosedPosition { realized_pnl: -500.0, total_bought: 1000.0 },
            ClosedPosition { realized_pnl: -300.0, total_bought: 1000.0 },
        ],
        &[CurrentPosition { initial_value: 1000.0, current_value: 0.0, percent_pnl: -100.0 }]
    )]
    fn test_output_bounds(
        #[case] closed: &[ClosedPosition],
        #[case] current: &[CurrentPosition],
    ) {
        let engine = CreditEngine::new();
        let result = engine.score(&input_from_positions(closed, current));

        assert!(result.pd > 0.0 && result.pd < 1.0);
        assert!(result.credit_score >= 300.0 && result.credit_score <= 850.0);
        assert!(result.ltv >= 0.25 && result.ltv <= 0.8);
        assert!(result.max_loan >= 0.0);
    }

    #[test]
    fn test_dead_portfolio_scores_as_high_risk() {
        let engine = CreditEngine::new();
        let input = input_from_positions(
            &[],
            &[CurrentPosition { initial_value: 1000.0, current_value: 0.0, percent_pnl: -100.0 }],
        );
        let result = engine.score(&input);

        assert_eq!(result.features.dead_share, 1.0);
        assert_eq!(result.features.dd_open, -1.0);
        // RiskScore = 1.5 * 1.0 + 1.0 * 0.0 + 1.0 * 1.0 = 2.5
        assert!((result.subscores.risk - 2.5).abs() < 1e-12);
        assert!(result.pd > 0.5);
        assert!(result.credit_score < 650.0);
        // No collateral left to lend against
        assert_eq!(result.max_loan, 0.0);
    }

    #[test]
    fn test_loan_cap_binds_for_risky_accounts() {
        let params = ModelParams::default();
        // Below the crossover goodness the independent cap is the binding
        // constraint; above it the LTV figure is
        let sizing = &params.loan_sizing;
        let v_eff = 1000.0;

        for pd in [0.05, 0.5, 0.95] {
            let terms = size_loan(pd, v_eff, &params);
            let g = 1.0 - pd;
            let ltv = sizing.ltv_min + (sizing.ltv_max - sizing.ltv_min) * g.powf(sizing.gamma);
            let cap = sizing.kappa * v_eff * g.powf(sizing.delta);
            assert!((terms.max_loan - (ltv * v_eff).min(cap)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ltv_bounds_at_extremes() {
        let params = ModelParams::default();
        let at_best = size_loan(0.0, 100.0, &params);
        assert!((at_best.ltv - 0.8).abs() < 1e-12);

        let at_worst = size_loan(1.0, 100.0, &params);
        assert!((at_worst.ltv - 0.25).abs() < 1e-12);
        assert_eq!(at_worst.max_loan, 0.0);
    }

    #[test]
    fn test_score_reference_point() {
        // PD = 0.2 corresponds to 4:1 good odds and must land on the
        // reference score exactly
        let params = ModelParams::default();
        let score = map_score(0.2, &params);
        assert!((score - 650.0).abs() < 1e-9);

        // Halving the odds costs one PDO worth of points
        let score_double_odds = map_score(1.0 / 9.0, &params); // 8:1 odds
        assert!((score_double_odds - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamps_at_extreme_pd() {
        let params = ModelParams::default();
        assert_eq!(map_score(1e-12, &params), 850.0);
        assert_eq!(map_score(1.0 - 1e-12, &params), 300.0);
    }

    #[rstest]
    #[case(860.0, CreditRating::Exceptional)]
    #[case(800.0, CreditRating::Excellent)]
    #[case(650.0, CreditRating::Good)]
    #[case(600.0, CreditRating::Fair)]
    #[case(500.0, CreditRating::BelowAverage)]
    #[case(310.0, CreditRating::Poor)]
    fn test_rating_tiers(#[case] score: f64, #[case] expected: CreditRating) {
        assert_eq!(CreditRating::from_score(score), expected);
    }

    #[test]
    fn test_score_checked_accepts_normal_input() {
        let engine = CreditEngine::new();
        let input = input_from_positions(
            &[ClosedPosition { realized_pnl: 100.0, total_bought: 100.0 }],
            &[],
        );
        let result = engine.score_checked(&input).unwrap();
        assert!(result.credit_score.is_finite());
    }

    #[test]
    fn test_result_serializes_for_downstream_persistence() {
        let engine = CreditEngine::new();
        let result = engine.score(&ScoreInput::default());
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"credit_score\""));
        assert!(json.contains("\"v_eff\""));
    }
}
