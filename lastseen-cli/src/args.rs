//! Command-line arguments
//!
//! Flag names follow the deployed monitoring configuration
//! (`--db-filename`, `--mqtt-topic`, `-w`/`-c`), so existing service units
//! and check definitions keep working.

use clap::error::ErrorKind;
use clap::Parser;
use lastseen_check::{FreshnessCheck, Verdict};
use lastseen_core::parse_seconds;
use lastseen_ingest::{BusConfig, IngestConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// Arguments of the `lastseen-logger` service
#[derive(Debug, Parser)]
#[command(name = "lastseen-logger")]
#[command(about = "Record the last arrival time of every MQTT topic in a SQLite database", long_about = None)]
#[command(version)]
pub struct LoggerArgs {
    /// SQLite database file, created if missing
    #[arg(long = "db-filename", value_name = "PATH")]
    pub db_filename: PathBuf,

    /// Hostname or IP of the MQTT broker
    #[arg(long = "mqtt-broker", default_value = "localhost")]
    pub mqtt_broker: String,

    #[arg(long = "mqtt-broker-port", default_value_t = 1883)]
    pub mqtt_broker_port: u16,

    #[arg(long = "mqtt-username")]
    pub mqtt_username: Option<String>,

    #[arg(long = "mqtt-password", env = "LASTSEEN_MQTT_PASSWORD", hide_env_values = true)]
    pub mqtt_password: Option<String>,

    /// Subscription pattern, repeatable; `+` and `#` wildcards allowed
    #[arg(long = "mqtt-topic", value_name = "PATTERN", required = true)]
    pub mqtt_topic: Vec<String>,

    /// MQTT client id [default: lastseen-<pid>]
    #[arg(long = "client-id")]
    pub client_id: Option<String>,

    /// Commit arrivals every T seconds; 0 commits each arrival on its own
    #[arg(long = "commit-interval", value_name = "T", default_value = "1", value_parser = parse_seconds)]
    pub commit_interval: Duration,

    /// Seconds of raw arrival history to keep
    #[arg(long, value_name = "SECONDS", default_value = "86400", value_parser = parse_seconds)]
    pub retention: Duration,

    /// MQTT keep-alive in seconds
    #[arg(long = "keep-alive", value_name = "SECONDS", default_value = "30", value_parser = parse_seconds)]
    pub keep_alive: Duration,

    /// Log every received message
    #[arg(short, long)]
    pub verbose: bool,
}

impl LoggerArgs {
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// Build the (not yet validated) ingestion config
    pub fn into_config(self) -> IngestConfig {
        let defaults = BusConfig::default();
        let bus = BusConfig {
            host: self.mqtt_broker,
            port: self.mqtt_broker_port,
            username: self.mqtt_username,
            password: self.mqtt_password,
            client_id: self
                .client_id
                .filter(|id| !id.is_empty())
                .unwrap_or(defaults.client_id),
            keep_alive: self.keep_alive,
        };

        IngestConfig {
            database: self.db_filename,
            bus,
            topics: self.mqtt_topic,
            commit_interval: self.commit_interval,
            retention: self.retention,
        }
    }
}

/// Arguments of the `check_topic_age` monitoring plugin
#[derive(Debug, Parser)]
#[command(name = "check_topic_age")]
#[command(about = "Monitoring plugin: age of the freshest arrival among MQTT topics", long_about = None)]
#[command(version)]
pub struct CheckArgs {
    /// WARNING if the freshest arrival is older than this many seconds
    #[arg(short = 'w', long = "warning", value_name = "SECONDS", value_parser = parse_seconds)]
    pub warning: Duration,

    /// CRITICAL if the freshest arrival is older than this many seconds
    #[arg(short = 'c', long = "critical", value_name = "SECONDS", value_parser = parse_seconds)]
    pub critical: Duration,

    /// Database written by lastseen-logger
    #[arg(long = "db-filename", value_name = "PATH")]
    pub db_filename: PathBuf,

    /// Topic name or wildcard pattern, repeatable
    #[arg(long = "mqtt-topic", value_name = "PATTERN")]
    pub mqtt_topic: Vec<String>,

    /// Print the verdict as JSON instead of the plugin status line
    #[arg(long)]
    pub json: bool,
}

impl CheckArgs {
    pub fn to_check(&self) -> FreshnessCheck {
        FreshnessCheck::new(self.warning, self.critical, self.mqtt_topic.clone())
    }
}

/// How an argument parsing failure should end the process
#[derive(Debug)]
pub enum ParseOutcome {
    /// `--help` or `--version`: print clap's output, exit 0
    Informational(clap::Error),
    /// Anything else: report UNKNOWN
    Unknown(Verdict),
}

/// Map a clap error onto the plugin exit convention. Clap would otherwise
/// exit with 2, which a monitoring system reads as CRITICAL.
pub fn classify_parse_error(err: clap::Error) -> ParseOutcome {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ParseOutcome::Informational(err),
        _ => {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or("invalid arguments");
            let message = first.strip_prefix("error: ").unwrap_or(first);
            ParseOutcome::Unknown(Verdict::unknown(message.trim()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lastseen_check::Status;

    #[test]
    fn test_logger_defaults() {
        let args = LoggerArgs::try_parse_from([
            "lastseen-logger",
            "--db-filename",
            "/var/lib/lastseen.db",
            "--mqtt-topic",
            "sensor/#",
        ])
        .unwrap();

        assert_eq!(args.log_level(), Level::INFO);
        let config = args.into_config();
        assert_eq!(config.bus.host, "localhost");
        assert_eq!(config.bus.port, 1883);
        assert!(config.bus.client_id.starts_with("lastseen-"));
        assert_eq!(config.commit_interval, Duration::from_secs(1));
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert_eq!(config.topics, vec!["sensor/#"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logger_repeatable_topics_and_immediate_mode() {
        let args = LoggerArgs::try_parse_from([
            "lastseen-logger",
            "--db-filename",
            "x.db",
            "--mqtt-topic",
            "a/+",
            "--mqtt-topic",
            "b/#",
            "--commit-interval",
            "0",
            "--client-id",
            "logger-1",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.log_level(), Level::DEBUG);
        let config = args.into_config();
        assert_eq!(config.topics, vec!["a/+", "b/#"]);
        assert_eq!(config.mode(), lastseen_ingest::IngestMode::Immediate);
        assert_eq!(config.bus.client_id, "logger-1");
    }

    #[test]
    fn test_logger_rejects_negative_commit_interval() {
        let result = LoggerArgs::try_parse_from([
            "lastseen-logger",
            "--db-filename",
            "x.db",
            "--mqtt-topic",
            "a",
            "--commit-interval",
            "-1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_logger_requires_a_topic() {
        let result = LoggerArgs::try_parse_from(["lastseen-logger", "--db-filename", "x.db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_args() {
        let args = CheckArgs::try_parse_from([
            "check_topic_age",
            "-w",
            "3000",
            "-c",
            "6000",
            "--db-filename",
            "x.db",
            "--mqtt-topic",
            "sensor/1",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.warning, Duration::from_secs(3000));
        assert_eq!(args.critical, Duration::from_secs(6000));
        assert_eq!(args.mqtt_topic, vec!["sensor/1"]);
        assert!(args.json);
    }

    #[test]
    fn test_check_parse_failure_is_unknown() {
        let err = CheckArgs::try_parse_from(["check_topic_age", "-w", "abc"]).unwrap_err();
        match classify_parse_error(err) {
            ParseOutcome::Unknown(verdict) => {
                assert_eq!(verdict.status, Status::Unknown);
                assert_eq!(verdict.exit_code(), 3);
                assert!(verdict.to_string().starts_with("UNKNOWN - "));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_check_help_is_informational() {
        let err = CheckArgs::try_parse_from(["check_topic_age", "--help"]).unwrap_err();
        assert!(matches!(classify_parse_error(err), ParseOutcome::Informational(_)));
    }
}
