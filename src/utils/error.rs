//! Error handling for the credit scoring engine.

use thiserror::Error;

/// Main error type for the credit scoring engine
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors (bad model parameters, unreadable files)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Data-related errors (e.g. missing or malformed portfolio data)
    #[error("Data error: {0}")]
    DataError(String),

    /// Numeric errors surfaced by the optional finiteness check
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML serialization/deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

/// Result type for the credit scoring engine
pub type Result<T> = std::result::Result<T, Error>;

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

// Allow automatic conversion from anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
