//! # CreditScore Rust
//! Main library file for the trading-history credit scoring engine.
//! Computes a deterministic creditworthiness score, probability of default
//! and loan sizing for a trading account from its closed and open positions.

pub use crate::utils::error::{Error, Result};

pub mod analysis;
pub mod config;
pub mod positions;
pub mod utils;

pub use crate::analysis::credit_model::{CreditEngine, CreditRating, ScoreResult};
pub use crate::analysis::features::FeatureSet;
pub use crate::config::ModelParams;
pub use crate::positions::ScoreInput;
