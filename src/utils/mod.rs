//! Utility functions and types for the credit scoring engine.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::init_logging;
