//! # MQTT Connection Module
//!
//! Owns the broker session for one run of the bridge.
//!
//! [`MqttConnection::connect`] builds the client options (optional TLS and
//! credentials, fixed keepalive) and spawns a background task driving the
//! rumqttc event loop, which processes protocol traffic independently of
//! the polling loop. Connection and disconnection events are logged but not
//! otherwise acted upon; reconnect-on-drop is the client library's own
//! policy and nothing more is layered on top here.
//!
//! Publishes are fire-and-forget at QoS 0 (at-most-once): the polling loop
//! enqueues a request and the event loop task delivers it.

use std::path::Path;
use std::time::Duration;

use rumqttc::{
    AsyncClient, Event, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MqttConfig;
use crate::error::Result;

/// MQTT client identifier presented to the broker
const CLIENT_ID: &str = "joy-bridge";

/// Fixed keepalive interval for the broker session
const KEEP_ALIVE_SECS: u64 = 60;

/// Capacity of the client request queue
const REQUEST_QUEUE_CAPACITY: usize = 64;

/// An established broker session
///
/// The polling loop uses this handle only to enqueue publishes and to issue
/// the final shutdown; protocol traffic is processed exclusively by the
/// background task.
pub struct MqttConnection {
    client: AsyncClient,
    event_task: JoinHandle<()>,
}

impl std::fmt::Debug for MqttConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttConnection").finish_non_exhaustive()
    }
}

impl MqttConnection {
    /// Establish a broker session
    ///
    /// Configures TLS when `cafile` is set and the file exists, and
    /// credentials when both username and password are present, then starts
    /// the background event-loop task. The TCP connection itself is made
    /// lazily by that task.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if a configured and present CA file cannot be
    /// read.
    pub async fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options = MqttOptions::new(CLIENT_ID, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));

        if let Some(cafile) = &config.cafile {
            if Path::new(cafile).is_file() {
                let ca = std::fs::read(cafile)?;
                options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                    ca,
                    alpn: None,
                    client_auth: None,
                }));
                info!("tls enabled with ca file {}", cafile);
            } else {
                warn!("ca file {} not found, connecting without tls", cafile);
            }
        }

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        info!("connecting to mqtt broker {}:{}", config.host, config.port);

        let (client, mut event_loop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);

        let host = config.host.clone();
        let port = config.port;
        let event_task = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        info!(
                            "connected to mqtt broker {}:{}, code={:?}",
                            host, port, ack.code
                        );
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        info!("disconnected from mqtt broker {}:{}", host, port);
                    }
                    Ok(event) => debug!("mqtt event: {:?}", event),
                    Err(e) => {
                        warn!("mqtt connection error: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(Self { client, event_task })
    }

    /// Enqueue a payload for at-most-once delivery
    ///
    /// Never blocks the caller; a full request queue or closed client is a
    /// delivery failure surfaced to the caller for logging.
    pub fn try_publish(&self, topic: &str, payload: &str) -> std::result::Result<(), rumqttc::ClientError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
    }

    /// Tear down the session: stop the background task, then disconnect
    ///
    /// Consumes the connection so teardown can only happen once.
    pub async fn shutdown(self) {
        self.event_task.abort();
        if let Err(e) = self.client.disconnect().await {
            debug!("mqtt disconnect after shutdown: {}", e);
        }
        info!("mqtt session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> MqttConfig {
        MqttConfig {
            host: "127.0.0.1".to_string(),
            port: 1883,
            cafile: None,
            username: None,
            password: None,
            topics: vec![],
        }
    }

    #[test]
    fn test_session_constants() {
        assert_eq!(KEEP_ALIVE_SECS, 60, "broker keepalive is fixed at 60s");
        assert_eq!(CLIENT_ID, "joy-bridge");
    }

    #[tokio::test]
    async fn test_connect_is_lazy_and_shutdown_is_clean() {
        // No broker is listening; connect must still succeed because the
        // TCP connection is only attempted by the background task.
        let connection = MqttConnection::connect(&local_config()).await.unwrap();
        connection.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_cafile_falls_back_to_plaintext() {
        let mut config = local_config();
        config.cafile = Some("/nonexistent/ca.crt".to_string());

        let connection = MqttConnection::connect(&config).await.unwrap();
        connection.shutdown().await;
    }

    #[tokio::test]
    async fn test_try_publish_enqueues_without_broker() {
        let connection = MqttConnection::connect(&local_config()).await.unwrap();
        // Queue capacity is ample; enqueueing must succeed with no broker
        assert!(connection.try_publish("/joy-bridge/events", "payload").is_ok());
        connection.shutdown().await;
    }
}
