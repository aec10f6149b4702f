//! MQTT message source
//!
//! Drives a `rumqttc` event loop and yields the topic of every incoming
//! PUBLISH. Payloads are ignored. Subscriptions are (re)issued after every
//! CONNACK, so a broker restart with a clean session does not silently stop
//! ingestion.

use async_trait::async_trait;
use lastseen_ingest::{BusConfig, MessageSource, SourceError};
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeFilter,
    SubscribeReasonCode,
};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Pause between reconnect attempts after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Capacity of the client request channel
const REQUEST_CAPACITY: usize = 16;

/// Broker options for a bus configuration
pub fn mqtt_options(bus: &BusConfig) -> MqttOptions {
    let mut options = MqttOptions::new(bus.client_id.clone(), bus.host.clone(), bus.port);
    options.set_keep_alive(bus.keep_alive);
    options.set_clean_session(true);
    if let Some(username) = &bus.username {
        options.set_credentials(username.clone(), bus.password.clone().unwrap_or_default());
    }
    options
}

/// The subscribed patterns, always sent together in one SUBSCRIBE.
///
/// Every SUBSCRIBE carries the full list in the same order, including any
/// the client replays after a reconnect, so a SUBACK's reason codes map onto
/// the patterns by position regardless of which packet it answers.
#[derive(Debug, Clone)]
pub struct SubscriptionSet {
    patterns: Vec<String>,
}

impl SubscriptionSet {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn filters(&self) -> Vec<SubscribeFilter> {
        self.patterns
            .iter()
            .map(|p| SubscribeFilter::new(p.clone(), QoS::AtMostOnce))
            .collect()
    }

    /// Pair each pattern with whether the broker accepted it. `None` when
    /// the acknowledgement does not answer this set.
    pub fn outcomes<'a>(
        &'a self,
        codes: &'a [SubscribeReasonCode],
    ) -> Option<Vec<(&'a str, bool)>> {
        if codes.len() != self.patterns.len() {
            return None;
        }
        let outcomes = self
            .patterns
            .iter()
            .zip(codes)
            .map(|(pattern, code)| {
                (
                    pattern.as_str(),
                    matches!(code, SubscribeReasonCode::Success(_)),
                )
            })
            .collect();
        Some(outcomes)
    }
}

/// Topic source backed by an MQTT broker connection
pub struct MqttSource {
    client: AsyncClient,
    eventloop: EventLoop,
    subscriptions: SubscriptionSet,
    shutdown: watch::Receiver<bool>,
}

impl MqttSource {
    /// Connect and subscribe.
    ///
    /// Fails if the first connection attempt does not end in an accepted
    /// CONNACK. Later connection losses are retried indefinitely.
    pub async fn connect(
        bus: &BusConfig,
        topics: Vec<String>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, SourceError> {
        let (client, eventloop) = AsyncClient::new(mqtt_options(bus), REQUEST_CAPACITY);

        let mut source = Self {
            client,
            eventloop,
            subscriptions: SubscriptionSet::new(topics),
            shutdown,
        };

        loop {
            match source.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(SourceError::Connection(format!(
                            "broker refused connection: {:?}",
                            ack.code
                        )));
                    }
                    info!(host = %bus.host, port = bus.port, "Connected to MQTT broker");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(SourceError::Connection(format!(
                        "{}:{}: {}",
                        bus.host, bus.port, e
                    )))
                }
            }
        }

        source.subscribe_all().await?;
        Ok(source)
    }

    async fn subscribe_all(&mut self) -> Result<(), SourceError> {
        self.client
            .subscribe_many(self.subscriptions.filters())
            .await
            .map_err(|e| SourceError::Closed(e.to_string()))?;
        debug!(
            patterns = self.subscriptions.patterns().len(),
            "Subscriptions requested"
        );
        Ok(())
    }

    /// Handle one event loop event; returns the topic of a PUBLISH
    async fn handle(&mut self, event: Event) -> Result<Option<String>, SourceError> {
        match event {
            Event::Incoming(Packet::Publish(publish)) => return Ok(Some(publish.topic)),
            Event::Incoming(Packet::ConnAck(_)) => {
                info!("Reconnected to MQTT broker, resubscribing");
                self.subscribe_all().await?;
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                match self.subscriptions.outcomes(&ack.return_codes) {
                    Some(outcomes) => {
                        for (pattern, accepted) in outcomes {
                            if accepted {
                                info!(pattern = %pattern, "Subscribed");
                            } else {
                                error!(pattern = %pattern, "Subscription rejected by broker");
                            }
                        }
                    }
                    None => warn!(
                        pkid = ack.pkid,
                        codes = ack.return_codes.len(),
                        "SUBACK does not match the subscribed patterns"
                    ),
                }
            }
            _ => {}
        }
        Ok(None)
    }
}

#[async_trait]
impl MessageSource for MqttSource {
    async fn next_topic(&mut self) -> Result<Option<String>, SourceError> {
        loop {
            if *self.shutdown.borrow() {
                return Ok(None);
            }

            let polled = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        info!("Shutdown requested, leaving MQTT loop");
                        return Ok(None);
                    }
                    continue;
                }
                polled = self.eventloop.poll() => polled,
            };

            match polled {
                Ok(event) => {
                    if let Some(topic) = self.handle(event).await? {
                        return Ok(Some(topic));
                    }
                }
                Err(e) => {
                    warn!(error = %e, "MQTT connection error, reconnecting");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> BusConfig {
        BusConfig {
            host: "broker.local".to_string(),
            port: 8883,
            client_id: "lastseen-a".to_string(),
            ..BusConfig::default()
        }
    }

    fn set(patterns: &[&str]) -> SubscriptionSet {
        SubscriptionSet::new(patterns.iter().map(|p| p.to_string()).collect())
    }

    #[test]
    fn test_options_from_bus_config() {
        let options = mqtt_options(&bus());
        assert_eq!(options.broker_address(), ("broker.local".to_string(), 8883));
        assert_eq!(options.client_id(), "lastseen-a");
        assert_eq!(options.keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn test_suback_codes_map_onto_patterns_by_position() {
        let subscriptions = set(&["a/+", "b/#"]);
        let codes = [
            SubscribeReasonCode::Success(QoS::AtMostOnce),
            SubscribeReasonCode::Failure,
        ];

        assert_eq!(
            subscriptions.outcomes(&codes),
            Some(vec![("a/+", true), ("b/#", false)])
        );
    }

    #[test]
    fn test_replayed_suback_names_the_same_patterns() {
        let subscriptions = set(&["a/+", "b/#"]);
        let first = [
            SubscribeReasonCode::Success(QoS::AtMostOnce),
            SubscribeReasonCode::Success(QoS::AtMostOnce),
        ];
        let replayed = [
            SubscribeReasonCode::Failure,
            SubscribeReasonCode::Success(QoS::AtMostOnce),
        ];

        assert_eq!(
            subscriptions.outcomes(&first),
            Some(vec![("a/+", true), ("b/#", true)])
        );
        assert_eq!(
            subscriptions.outcomes(&replayed),
            Some(vec![("a/+", false), ("b/#", true)])
        );
    }

    #[test]
    fn test_suback_of_other_size_is_not_matched() {
        let subscriptions = set(&["a/+", "b/#"]);
        assert_eq!(subscriptions.outcomes(&[SubscribeReasonCode::Failure]), None);
    }

    #[test]
    fn test_filters_keep_pattern_order() {
        let filters = set(&["x", "y/#"]).filters();
        let paths: Vec<_> = filters.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["x", "y/#"]);
    }

    #[tokio::test]
    async fn test_refused_first_connection_is_fatal() {
        let bus = BusConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            client_id: "lastseen-test".to_string(),
            ..BusConfig::default()
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            MqttSource::connect(&bus, vec!["a/#".to_string()], shutdown_rx),
        )
        .await
        .expect("connect attempt should finish");

        assert!(matches!(result, Err(SourceError::Connection(_))));
    }
}
