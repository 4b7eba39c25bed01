//! # Publisher
//!
//! Formats mapped values into timestamped payloads and hands them to the
//! broker session.
//!
//! Payloads are UTF-8 text of the form
//! `<ISO8601-UTC-with-microseconds>|button|<mapped-value>` and are published
//! to the topic configured under the key `"controller"`. The `button` field
//! tag is a fixed literal for hat-derived values as well; the wire format
//! is preserved as-is for downstream consumers.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::mqtt::MqttConnection;
use crate::resolver::MappingResolver;

/// Topic mapping key used for all outgoing publishes
pub const TOPIC_KEY: &str = "controller";

/// Timestamp layout, UTC with microsecond precision (e.g.
/// `2026-08-26T12:00:00.123456+0000`)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f%z";

/// Format an outbound payload for a mapped value
pub fn format_payload(timestamp: &DateTime<Utc>, value: &str) -> String {
    format!("{}|button|{}", timestamp.format(TIMESTAMP_FORMAT), value)
}

/// Delivers mapped values to the broker session
#[derive(Debug)]
pub struct Publisher {
    connection: MqttConnection,
}

impl Publisher {
    pub fn new(connection: MqttConnection) -> Self {
        Self { connection }
    }

    /// Publish a mapped value to the configured controller topic
    ///
    /// A missing topic mapping is a warning and a no-op, never fatal; so is
    /// a client-level delivery failure. Both leave the polling loop running.
    pub fn publish(&self, resolver: &mut MappingResolver, value: &str) {
        let Some(topic) = resolver.find_topic(TOPIC_KEY) else {
            warn!("no topic found, key={}", TOPIC_KEY);
            return;
        };

        let payload = format_payload(&Utc::now(), value);
        match self.connection.try_publish(&topic.value, &payload) {
            Ok(()) => info!("published \"{}\" to \"{}\"", payload, topic.value),
            Err(e) => warn!("failed to publish to \"{}\": {}", topic.value, e),
        }
    }

    /// Release the underlying broker session for teardown
    pub fn into_connection(self) -> MqttConnection {
        self.connection
    }
}
