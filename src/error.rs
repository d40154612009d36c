// src/error.rs
use std::fmt;

/// Custom error types for the qlbs-hedge library
#[derive(Debug, Clone, PartialEq)]
pub enum QlbsError {
    /// Invalid parameter values
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration
    InvalidConfiguration { field: String, reason: String },

    /// Unsupported option-type token
    InvalidOptionType { token: String },

    /// A public operation was invoked before its prerequisite phase
    UninitializedState { operation: String, missing: String },

    /// The regression Gram matrix could not be solved
    SingularSystem { step: usize, reason: String },

    /// A state value fell outside the fitted basis domain under the Fail policy
    DomainExtrapolation { value: f64, lo: f64, hi: f64 },

    /// Numerical instability (non-finite estimate)
    NumericalInstability { method: String, reason: String },
}

impl fmt::Display for QlbsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QlbsError::InvalidParameters {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            QlbsError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            QlbsError::InvalidOptionType { token } => {
                write!(
                    f,
                    "Invalid option type '{}': expected Put ('P') or Call ('C')",
                    token
                )
            }
            QlbsError::UninitializedState { operation, missing } => {
                write!(
                    f,
                    "Operation '{}' requires '{}' to have run first",
                    operation, missing
                )
            }
            QlbsError::SingularSystem { step, reason } => {
                write!(
                    f,
                    "Regression system at time step {} is not solvable: {}",
                    step, reason
                )
            }
            QlbsError::DomainExtrapolation { value, lo, hi } => {
                write!(
                    f,
                    "State value {} lies outside the fitted basis domain [{}, {}]",
                    value, lo, hi
                )
            }
            QlbsError::NumericalInstability { method, reason } => {
                write!(f, "Numerical instability in {}: {}", method, reason)
            }
        }
    }
}

impl std::error::Error for QlbsError {}

/// Result type alias for qlbs-hedge operations
pub type QlbsResult<T> = Result<T, QlbsError>;

/// Validation utilities
pub mod validation {
    use super::{QlbsError, QlbsResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> QlbsResult<()> {
        if value <= 0.0 {
            Err(QlbsError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> QlbsResult<()> {
        if value < 0.0 {
            Err(QlbsError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> QlbsResult<()> {
        if !value.is_finite() {
            Err(QlbsError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate paths count; cross-sectional statistics need at least two paths
    pub fn validate_paths(paths: usize) -> QlbsResult<()> {
        if paths < 2 {
            Err(QlbsError::InvalidConfiguration {
                field: "paths".to_string(),
                reason: "must be at least 2 (cross-sectional mean/std undefined otherwise)"
                    .to_string(),
            })
        } else if paths > 100_000_000 {
            Err(QlbsError::InvalidConfiguration {
                field: "paths".to_string(),
                reason: "exceeds maximum allowed (100 million)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate steps count
    pub fn validate_steps(steps: usize) -> QlbsResult<()> {
        if steps == 0 {
            Err(QlbsError::InvalidConfiguration {
                field: "steps".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if steps > 100_000 {
            Err(QlbsError::InvalidConfiguration {
                field: "steps".to_string(),
                reason: "exceeds maximum allowed (100,000)".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
