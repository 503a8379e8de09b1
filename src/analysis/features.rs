//! Feature extraction from normalized position lists.
//!
//! Every edge case here is load-bearing: which quantities fall back to a
//! fixed neutral constant, which use a `max(1, ..)` floor and which use the
//! `eps` floor all differ, and downstream calibration depends on the exact
//! combination. Empty position lists are a valid input, not an error.

use serde::{Deserialize, Serialize};

use crate::config::ModelParams;
use crate::positions::{ClosedPosition, CurrentPosition};

/// The fixed set of scalar features derived from an account's positions.
/// Recomputed fresh on every scoring call; never cached or mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Realized return on total cost basis across closed positions
    pub roi_real: f64,
    /// Fraction of closed positions with positive realized PnL
    /// (0.5 neutral prior with no track record)
    pub win_rate: f64,
    /// Per-trade Sharpe ratio over cost-normalized returns
    pub sharpe: f64,
    /// Profit factor, capped and centered so a break-even trader sits at 0
    pub profit_factor_feature: f64,
    /// Open drawdown: mark-to-market vs entry value of open positions,
    /// negative when underwater
    pub dd_open: f64,
    /// Herfindahl concentration index over open position values
    pub hhi_open: f64,
    /// Share of initial open exposure sitting in dead positions
    pub dead_share: f64,
    /// Current mark-to-market collateral value of open positions
    pub v_open: f64,
    /// Sum of positive realized gains across closed positions
    pub v_realized_plus: f64,
    /// Effective collateral: open value plus discounted realized gains
    pub v_eff: f64,
}

/// Derive the feature set from normalized positions
pub fn extract(
    closed: &[ClosedPosition],
    current: &[CurrentPosition],
    params: &ModelParams,
) -> FeatureSet {
    let eps = params.eps;
    let n_closed = closed.len();

    // Per-trade returns, cost-normalized with a unit floor
    let mut total_realized_pnl = 0.0;
    let mut total_bought_all = 0.0;
    let mut returns = Vec::with_capacity(n_closed);
    for pos in closed {
        total_realized_pnl += pos.realized_pnl;
        total_bought_all += pos.total_bought;
        returns.push(pos.realized_pnl / pos.total_bought.max(1.0));
    }

    let roi_real = if total_bought_all <= 0.0 {
        0.0
    } else {
        total_realized_pnl / total_bought_all.max(1.0)
    };

    // No track record is neither good nor bad
    let win_rate = if n_closed == 0 {
        0.5
    } else {
        let wins = closed.iter().filter(|p| p.realized_pnl > 0.0).count();
        wins as f64 / (n_closed as f64).max(1.0)
    };

    // Population variance; with fewer than two trades the variance term
    // stays 0 before the eps is added
    let mut r_mean = 0.0;
    let mut r_var = 0.0;
    if n_closed > 0 {
        r_mean = returns.iter().sum::<f64>() / n_closed as f64;
        if n_closed > 1 {
            r_var = returns.iter().map(|r| (r - r_mean) * (r - r_mean)).sum::<f64>()
                / n_closed as f64;
        }
    }
    let r_std = (r_var + eps).sqrt();
    let sharpe = r_mean / (r_std + eps);

    // Profit factor: gross gains over gross losses, capped, then centered
    let mut g_plus = 0.0;
    let mut g_minus = 0.0;
    for pos in closed {
        if pos.realized_pnl > 0.0 {
            g_plus += pos.realized_pnl;
        } else if pos.realized_pnl < 0.0 {
            g_minus += -pos.realized_pnl;
        }
    }
    let pf_raw = g_plus / (g_minus + eps);
    let profit_factor_feature = pf_raw.min(params.pf_cap) - 1.0;

    // Open-position aggregates
    let mut i_open = 0.0;
    let mut c_open = 0.0;
    for pos in current {
        i_open += pos.initial_value;
        c_open += pos.current_value;
    }

    let dd_open = if i_open <= 0.0 { 0.0 } else { (c_open - i_open) / i_open.max(1.0) };

    let v_curr: f64 = current.iter().map(|p| p.current_value).sum();
    let hhi_open = if v_curr > 0.0 {
        current
            .iter()
            .map(|p| {
                let share = p.current_value / v_curr;
                share * share
            })
            .sum()
    } else {
        0.0
    };

    let dead_init_sum: f64 =
        current.iter().filter(|p| p.is_dead()).map(|p| p.initial_value).sum();
    let dead_share = if i_open <= 0.0 { 0.0 } else { dead_init_sum / i_open.max(1.0) };

    let v_open = c_open;
    let v_realized_plus: f64 = closed.iter().map(|p| p.realized_pnl.max(0.0)).sum();
    let v_eff = v_open + params.lambda_realized * v_realized_plus;

    FeatureSet {
        roi_real,
        win_rate,
        sharpe,
        profit_factor_feature,
        dd_open,
        hhi_open,
        dead_share,
        v_open,
        v_realized_plus,
        v_eff,
    }
}
