//! Model parameter configuration for the scoring engine
//!
//! Every calibration constant of the pipeline lives here, so recalibration
//! never touches formula code. A `ModelParams` value is immutable for the
//! duration of a scoring request.

use crate::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Calibration constants for the full scoring pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    /// Numeric floor used wherever a division could hit zero
    #[serde(default = "default_eps")]
    pub eps: f64,

    /// Realized-gain collateral weight: realized-but-withdrawn profit counts
    /// less than open collateral
    #[serde(default = "default_lambda_realized")]
    pub lambda_realized: f64,

    /// Profit factor cap, applied before centering
    #[serde(default = "default_pf_cap")]
    pub pf_cap: f64,

    /// Performance subscore weights
    #[serde(default)]
    pub performance: PerformanceWeights,

    /// Risk subscore weights
    #[serde(default)]
    pub risk: RiskWeights,

    /// Logistic PD model coefficients
    #[serde(default)]
    pub logistic: LogisticCoefficients,

    /// FICO-style score mapping
    #[serde(default)]
    pub score_mapping: ScoreMapping,

    /// LTV and loan cap parameters
    #[serde(default)]
    pub loan_sizing: LoanSizing,
}

/// Weights of the linear performance subscore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceWeights {
    /// Weight on realized ROI
    pub w_roi: f64,

    /// Weight on (win rate - 0.5)
    pub w_win_rate: f64,

    /// Weight on the per-trade Sharpe ratio
    pub w_sharpe: f64,

    /// Weight on the centered profit factor
    pub w_profit_factor: f64,
}

/// Weights of the linear risk subscore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskWeights {
    /// Weight on open drawdown (applied to -DD_open)
    pub w_drawdown: f64,

    /// Weight on the Herfindahl concentration index
    pub w_concentration: f64,

    /// Weight on the dead-position exposure share
    pub w_dead_share: f64,
}

/// Fixed coefficients of the logistic PD model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticCoefficients {
    /// Intercept
    pub beta0: f64,

    /// Performance coefficient (higher performance -> lower PD)
    pub beta_perf: f64,

    /// Risk coefficient (higher risk -> higher PD)
    pub beta_risk: f64,
}

/// Log-odds score mapping calibration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreMapping {
    /// Points to double the odds
    pub pdo: f64,

    /// Reference score anchoring the mapping
    pub score_ref: f64,

    /// Good:bad odds at the reference score (4:1 corresponds to PD = 0.2)
    pub odds_ref: f64,

    /// Lower score bound
    pub score_min: f64,

    /// Upper score bound
    pub score_max: f64,
}

/// Loan-to-value and loan cap parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanSizing {
    /// LTV granted at goodness 0
    pub ltv_min: f64,

    /// LTV granted at goodness 1
    pub ltv_max: f64,

    /// Goodness exponent of the LTV curve (super-linear reward)
    pub gamma: f64,

    /// Multiplier of the independent loan cap
    pub kappa: f64,

    /// Goodness exponent of the independent loan cap
    pub delta: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            lambda_realized: default_lambda_realized(),
            pf_cap: default_pf_cap(),
            performance: PerformanceWeights::default(),
            risk: RiskWeights::default(),
            logistic: LogisticCoefficients::default(),
            score_mapping: ScoreMapping::default(),
            loan_sizing: LoanSizing::default(),
        }
    }
}

impl Default for PerformanceWeights {
    fn default() -> Self {
        Self { w_roi: 1.0, w_win_rate: 0.8, w_sharpe: 0.4, w_profit_factor: 0.15 }
    }
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self { w_drawdown: 1.5, w_concentration: 1.0, w_dead_share: 1.0 }
    }
}

impl Default for LogisticCoefficients {
    fn default() -> Self {
        Self { beta0: -0.9, beta_perf: -1.0, beta_risk: 0.7 }
    }
}

impl Default for ScoreMapping {
    fn default() -> Self {
        Self { pdo: 50.0, score_ref: 650.0, odds_ref: 4.0, score_min: 300.0, score_max: 850.0 }
    }
}

impl Default for LoanSizing {
    fn default() -> Self {
        Self { ltv_min: 0.25, ltv_max: 0.8, gamma: 1.5, kappa: 1.5, delta: 1.2 }
    }
}

// --------- Helper default functions for serde ---------
fn default_eps() -> f64 {
    1e-8
}
fn default_lambda_realized() -> f64 {
    0.25
}
fn default_pf_cap() -> f64 {
    10.0
}

impl ModelParams {
    /// Serialize default parameters to TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).expect("serialize default params")
    }

    /// Load model parameters from a specific file path
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read params file {:?}: {}", path.as_ref(), e))
        })?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse params file: {}", e)))?;
        params.validate()?;
        Ok(params)
    }

    /// Save the parameters to a file
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize params: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write params file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the parameters for finiteness and reasonable values
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("eps", self.eps),
            ("lambda_realized", self.lambda_realized),
            ("pf_cap", self.pf_cap),
            ("performance.w_roi", self.performance.w_roi),
            ("performance.w_win_rate", self.performance.w_win_rate),
            ("performance.w_sharpe", self.performance.w_sharpe),
            ("performance.w_profit_factor", self.performance.w_profit_factor),
            ("risk.w_drawdown", self.risk.w_drawdown),
            ("risk.w_concentration", self.risk.w_concentration),
            ("risk.w_dead_share", self.risk.w_dead_share),
            ("logistic.beta0", self.logistic.beta0),
            ("logistic.beta_perf", self.logistic.beta_perf),
            ("logistic.beta_risk", self.logistic.beta_risk),
            ("score_mapping.pdo", self.score_mapping.pdo),
            ("score_mapping.score_ref", self.score_mapping.score_ref),
            ("score_mapping.odds_ref", self.score_mapping.odds_ref),
            ("score_mapping.score_min", self.score_mapping.score_min),
            ("score_mapping.score_max", self.score_mapping.score_max),
            ("loan_sizing.ltv_min", self.loan_sizing.ltv_min),
            ("loan_sizing.ltv_max", self.loan_sizing.ltv_max),
            ("loan_sizing.gamma", self.loan_sizing.gamma),
            ("loan_sizing.kappa", self.loan_sizing.kappa),
            ("loan_sizing.delta", self.loan_sizing.delta),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::ConfigError(format!("{} must be finite", name)));
            }
        }
        if self.eps <= 0.0 {
            return Err(Error::ConfigError("eps must be > 0".to_string()));
        }
        if self.score_mapping.pdo <= 0.0 {
            return Err(Error::ConfigError("score_mapping.pdo must be > 0".to_string()));
        }
        if self.score_mapping.odds_ref <= 0.0 {
            return Err(Error::ConfigError("score_mapping.odds_ref must be > 0".to_string()));
        }
        if self.score_mapping.score_min >= self.score_mapping.score_max {
            return Err(Error::ConfigError(
                "score_mapping.score_min must be < score_max".to_string(),
            ));
        }
        if self.loan_sizing.ltv_min > self.loan_sizing.ltv_max {
            return Err(Error::ConfigError(
                "loan_sizing.ltv_min cannot exceed ltv_max".to_string(),
            ));
        }
        if self.loan_sizing.gamma < 0.0 || self.loan_sizing.delta < 0.0 {
            return Err(Error::ConfigError(
                "loan_sizing exponents must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
