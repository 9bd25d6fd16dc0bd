//! Error types for the engine.
//!
//! Only configuration problems are errors. Runtime data problems (unknown
//! table, time outside the program, failed root search) degrade to defaults
//! and are reported through `ok` flags instead.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A carrier table was selected but has no points.
    #[error("carrier table has no points")]
    MissingCarrierTable,

    /// A configuration value is unusable at the point of use.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Custom pulse table bytes are malformed.
    #[error("invalid pulse table: {message}")]
    InvalidTable {
        /// Error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid table error.
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Self::InvalidTable {
            message: message.into(),
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::MissingCarrierTable => "ENGINE_001",
            EngineError::InvalidParameter { .. } => "ENGINE_002",
            EngineError::InvalidTable { .. } => "ENGINE_003",
            EngineError::Io(_) => "ENGINE_004",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_param_helper() {
        let err = EngineError::invalid_param("random.interval", "must be positive");
        assert!(err.to_string().contains("random.interval"));
        assert_eq!(err.code(), "ENGINE_002");
    }

    #[test]
    fn test_invalid_table_helper() {
        let err = EngineError::invalid_table("truncated block 3");
        assert!(err.to_string().contains("truncated block 3"));
    }
}
