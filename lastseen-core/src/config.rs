//! Configuration helpers shared by both binaries.

use std::time::Duration;

/// Configuration error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Parse a non-negative number of seconds, fractions allowed.
///
/// Negative and non-finite values are rejected rather than coerced.
pub fn parse_seconds(value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let secs: f64 = value
        .trim()
        .parse()
        .map_err(|_| invalid("not a number"))?;

    if !secs.is_finite() {
        return Err(invalid("must be finite"));
    }
    if secs < 0.0 {
        return Err(invalid("must not be negative"));
    }

    Duration::try_from_secs_f64(secs).map_err(|e| invalid(&e.to_string()))
}
