//! Position records and the raw-input normalizer.
//!
//! Portfolio data arrives as loosely-typed JSON (numbers carried as strings,
//! fields occasionally missing or garbage). Normalization never fails: any
//! field that does not coerce to a number scores as zero. That silent-zero
//! contract matches the upstream data pipeline and is deliberate; see
//! DESIGN.md before tightening it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A position the account has fully exited
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosedPosition {
    /// Signed profit/loss realized on exit
    pub realized_pnl: f64,
    /// Non-negative cumulative cost basis for the position
    pub total_bought: f64,
}

/// A position still open at scoring time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentPosition {
    /// Value at entry (cost basis)
    pub initial_value: f64,
    /// Mark-to-market value now, may be zero
    pub current_value: f64,
    /// Percentage P&L relative to initial value (-100 means total loss)
    pub percent_pnl: f64,
}

impl CurrentPosition {
    /// A position whose percentage loss reached 100% of its initial value
    /// is fully impaired
    pub fn is_dead(&self) -> bool {
        self.percent_pnl <= -100.0
    }
}

/// Identifies the account being scored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRef {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Opaque identifier (wallet address or portfolio value tag upstream)
    #[serde(default)]
    pub value: String,
}

/// The raw scoring request envelope as produced by the position data source.
///
/// Position records stay as `serde_json::Value` so that malformed entries
/// survive deserialization and get coerced during normalization instead of
/// failing the whole request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInput {
    #[serde(default)]
    pub user: UserRef,
    #[serde(default)]
    pub closed_positions: Vec<Value>,
    #[serde(default)]
    pub current_positions: Vec<Value>,
}

impl ScoreInput {
    /// Parse a scoring request from a JSON string
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Coerce a raw JSON field to a number, JS-style: numeric strings parse,
/// booleans map to 0/1, everything else (missing, null, garbage, NaN)
/// becomes 0.
fn coerce_num(record: &Value, field: &str) -> f64 {
    let parsed = match record.get(field) {
        | None | Some(Value::Null) => 0.0,
        | Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        | Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        | Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                match trimmed.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => {
                        log::debug!("coerced non-numeric field {}={:?} to 0", field, s);
                        0.0
                    }
                }
            }
        }
        | Some(other) => {
            log::debug!("coerced non-numeric field {}={} to 0", field, other);
            0.0
        }
    };
    if parsed.is_nan() {
        0.0
    } else {
        parsed
    }
}

/// Normalize raw closed-position records
pub fn normalize_closed(raw: &[Value]) -> Vec<ClosedPosition> {
    raw.iter()
        .map(|record| ClosedPosition {
            realized_pnl: coerce_num(record, "realizedPnl"),
            total_bought: coerce_num(record, "totalBought"),
        })
        .collect()
}

/// Normalize raw current-position records. Informational fields the scoring
/// pipeline ignores (size, avgPrice, cashPnl, curPrice, ...) are dropped here.
pub fn normalize_current(raw: &[Value]) -> Vec<CurrentPosition> {
    raw.iter()
        .map(|record| CurrentPosition {
            initial_value: coerce_num(record, "initialValue"),
            current_value: coerce_num(record, "currentValue"),
            percent_pnl: coerce_num(record, "percentPnl"),
        })
        .collect()
}
