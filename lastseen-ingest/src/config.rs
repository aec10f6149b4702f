//! Ingestion configuration
//!
//! Validated once at startup; the ingestion mode is resolved from the commit
//! interval here and never re-checked per event.

use lastseen_core::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

/// Prune period used when every arrival is committed immediately
pub const IMMEDIATE_PRUNE_PERIOD: Duration = Duration::from_secs(60);

/// How arrivals reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// One transaction per arrival on the receive path
    Immediate,

    /// Stage in memory, commit every `interval`
    Batched { interval: Duration },
}

impl IngestMode {
    /// A zero commit interval means immediate mode
    pub fn from_commit_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            IngestMode::Immediate
        } else {
            IngestMode::Batched { interval }
        }
    }

    /// Period of the commit scheduler for this mode
    pub fn scheduler_period(&self) -> Duration {
        match self {
            IngestMode::Immediate => IMMEDIATE_PRUNE_PERIOD,
            IngestMode::Batched { interval } => *interval,
        }
    }
}

/// Message bus connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: format!("lastseen-{}", std::process::id()),
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Full ingestion configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// SQLite database file
    pub database: PathBuf,

    pub bus: BusConfig,

    /// Subscription patterns, bus wildcard syntax
    pub topics: Vec<String>,

    /// Zero selects immediate mode
    pub commit_interval: Duration,

    /// Maximum age of receive-log rows
    pub retention: Duration,
}

impl IngestConfig {
    pub fn new(database: impl Into<PathBuf>, topics: Vec<String>) -> Self {
        Self {
            database: database.into(),
            bus: BusConfig::default(),
            topics,
            commit_interval: Duration::from_secs(1),
            retention: Duration::from_secs(86_400),
        }
    }

    /// Reject settings that cannot work before any I/O happens
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topics.is_empty() {
            return Err(ConfigError::invalid("topics", "at least one topic pattern is required"));
        }
        if let Some(empty) = self.topics.iter().find(|t| t.is_empty()) {
            return Err(ConfigError::invalid(
                "topics",
                format!("empty topic pattern '{}'", empty),
            ));
        }
        if self.retention.is_zero() {
            return Err(ConfigError::invalid("retention", "must be greater than zero"));
        }
        if self.bus.host.trim().is_empty() {
            return Err(ConfigError::invalid("broker host", "must not be empty"));
        }
        if self.bus.port == 0 {
            return Err(ConfigError::invalid("broker port", "must not be zero"));
        }
        if self.bus.password.is_some() && self.bus.username.is_none() {
            return Err(ConfigError::invalid("credentials", "password given without username"));
        }
        if !self.bus.keep_alive.is_zero() && self.bus.keep_alive < Duration::from_secs(1) {
            return Err(ConfigError::invalid("keep-alive", "must be zero or at least one second"));
        }
        if self.bus.client_id.is_empty() {
            return Err(ConfigError::invalid("client id", "must not be empty"));
        }
        Ok(())
    }

    pub fn mode(&self) -> IngestMode {
        IngestMode::from_commit_interval(self.commit_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IngestConfig {
        IngestConfig::new("/tmp/lastseen.db", vec!["sensor/#".to_string()])
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.bus.port, 1883);
        assert_eq!(config.mode(), IngestMode::Batched { interval: Duration::from_secs(1) });
    }

    #[test]
    fn test_zero_interval_is_immediate() {
        let mut config = config();
        config.commit_interval = Duration::ZERO;
        assert_eq!(config.mode(), IngestMode::Immediate);
        assert_eq!(config.mode().scheduler_period(), IMMEDIATE_PRUNE_PERIOD);
    }

    #[test]
    fn test_batched_period_is_commit_interval() {
        let mode = IngestMode::from_commit_interval(Duration::from_millis(250));
        assert_eq!(mode.scheduler_period(), Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_missing_topics() {
        let mut config = config();
        config.topics.clear();
        assert!(config.validate().is_err());

        config.topics.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_retention() {
        let mut config = config();
        config.retention = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid retention: must be greater than zero");
    }

    #[test]
    fn test_rejects_password_without_username() {
        let mut config = config();
        config.bus.password = Some("secret".to_string());
        assert!(config.validate().is_err());

        config.bus.username = Some("user".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_broker() {
        let mut config = config();
        config.bus.port = 0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.bus.host = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_sub_second_keep_alive() {
        let mut config = config();
        config.bus.keep_alive = Duration::from_millis(500);
        assert!(config.validate().is_err());

        config.bus.keep_alive = Duration::ZERO;
        assert!(config.validate().is_ok());
    }
}
