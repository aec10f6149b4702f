//! Lastseen CLI
//!
//! Shared pieces of the two binaries: argument definitions, logging setup,
//! the MQTT message source and shutdown signalling. `lastseen-logger`
//! records topic arrivals, `check_topic_age` reports their age as a
//! monitoring plugin.

pub mod args;
pub mod logging;
pub mod mqtt;
pub mod shutdown;

pub use args::{classify_parse_error, CheckArgs, LoggerArgs, ParseOutcome};
pub use logging::{setup_logging, LogTarget};
pub use mqtt::{mqtt_options, MqttSource, SubscriptionSet};
pub use shutdown::watch_for_shutdown;
