//! Unified error types for the connectivity model
//!
//! [`GcmError`] covers the structural failures that abort a run: bad input
//! tables, invalid configuration, unreadable caches and solver crashes.
//! Per-school infeasibility is *not* an error; it is carried as data on
//! [`SchoolConnectionCosts`](crate::SchoolConnectionCosts).
//!
//! # Example
//!
//! ```ignore
//! use gcm_core::{GcmError, GcmResult};
//!
//! fn run(path: &str) -> GcmResult<()> {
//!     let schools = load_schools(path)?;
//!     schools.validate()?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all connectivity model operations.
#[derive(Error, Debug)]
pub enum GcmError {
    /// I/O errors (file access, cache directories, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input table validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed distance cache documents
    #[error("Cache error: {0}")]
    Cache(String),

    /// Constraint solver errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GcmError.
pub type GcmResult<T> = Result<T, GcmError>;

impl From<anyhow::Error> for GcmError {
    fn from(err: anyhow::Error) -> Self {
        GcmError::Other(err.to_string())
    }
}

impl From<String> for GcmError {
    fn from(s: String) -> Self {
        GcmError::Other(s)
    }
}

impl From<&str> for GcmError {
    fn from(s: &str) -> Self {
        GcmError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GcmError {
    fn from(err: serde_json::Error) -> Self {
        GcmError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GcmError::Config("years_opex must be positive".into());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("years_opex"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "cache missing");
        let err: GcmError = io_err.into();
        assert!(matches!(err, GcmError::Io(_)));
    }

    #[test]
    fn test_json_error_is_parse() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: GcmError = json_err.into();
        assert!(matches!(err, GcmError::Parse(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GcmResult<()> {
            Err(GcmError::Validation("duplicate school id".into()))
        }

        fn outer() -> GcmResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
