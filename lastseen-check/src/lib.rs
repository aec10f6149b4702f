//! Lastseen Check
//!
//! Decides whether the topics matching a set of patterns have been heard
//! from recently enough. Results are monitoring-plugin verdicts: OK,
//! WARNING, CRITICAL or UNKNOWN, with age performance data.
//!
//! Every failure along the way (bad thresholds, a missing database, a
//! pattern without data) is reported as an UNKNOWN [`Verdict`], never as a
//! panic or a bare error.

pub mod evaluator;
pub mod pattern;
pub mod threshold;
pub mod verdict;

use std::path::PathBuf;
use std::time::Duration;

pub use evaluator::FreshnessCheck;
pub use pattern::{PatternError, TopicPattern};
pub use threshold::Thresholds;
pub use verdict::{Freshest, PerfData, Status, Verdict};

/// Check error types
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(
        "Warning age ({}s) must be smaller than critical age ({}s)",
        .warning.as_secs_f64(),
        .critical.as_secs_f64()
    )]
    InvalidThresholds { warning: Duration, critical: Duration },

    #[error("No topic patterns given")]
    NoPatterns,

    #[error("{0}")]
    InvalidPattern(#[from] PatternError),

    #[error("File {} does not exist", .0.display())]
    MissingDatabase(PathBuf),

    #[error("{0}")]
    Store(#[from] lastseen_store::StoreError),

    #[error("Cannot find table \"{table}\" in {database}")]
    MissingTable {
        table: &'static str,
        database: String,
    },

    #[error("No data found for topic {topic} in {database}")]
    NoDataForTopic { topic: String, database: String },

    #[error("No topic matching {pattern} found in {database}")]
    NoDataForPattern { pattern: String, database: String },
}

/// Result type for check operations
pub type Result<T> = std::result::Result<T, CheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = CheckError::InvalidThresholds {
            warning: Duration::from_secs(10),
            critical: Duration::from_millis(2500),
        };
        assert_eq!(
            err.to_string(),
            "Warning age (10s) must be smaller than critical age (2.5s)"
        );

        let err = CheckError::MissingDatabase(PathBuf::from("/tmp/none.db"));
        assert_eq!(err.to_string(), "File /tmp/none.db does not exist");

        let verdict = Verdict::from(CheckError::NoPatterns);
        assert_eq!(verdict.to_string(), "UNKNOWN - No topic patterns given");
    }
}
