//! # Polling Loop / Lifecycle Controller
//!
//! Owns the continuous poll-dispatch-sleep cycle and the session lifecycle:
//! `Idle -> Running -> Stopping -> Stopped`.
//!
//! Each iteration drains every queued controller event, dispatches the
//! batch to the active mode callback, then sleeps for [`POLL_INTERVAL_MS`].
//! The interval bounds worst-case input-to-publish latency and keeps the
//! loop from busy-polling.
//!
//! Cancellation is cooperative through a [`StopToken`]: SIGINT/SIGTERM set
//! it, the loop observes it at the top of the next iteration, and an
//! in-flight batch always completes. When signal handlers cannot be
//! installed the token remains settable through [`Bridge::stop_token`].
//!
//! In publish mode the broker session is torn down exactly once on every
//! exit path, normal stop and fatal poll error alike, before any error
//! propagates to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::{ControllerEvent, EventSource};
use crate::mapper::{classify, MappedOutcome};
use crate::mqtt::MqttConnection;
use crate::publish::Publisher;
use crate::resolver::MappingResolver;
use crate::error::Result;

/// Fixed sleep between polling iterations in milliseconds
pub const POLL_INTERVAL_MS: u64 = 100;

/// Cooperative cancellation token for one polling session
///
/// Set exactly once, transitions false to true, never reset. Clones share
/// the underlying flag.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop; takes effect at the next loop-top check
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One controller-to-broker session
pub struct Bridge {
    resolver: MappingResolver,
    source: Box<dyn EventSource>,
    stop: StopToken,
}

impl Bridge {
    pub fn new(config: Config, source: Box<dyn EventSource>) -> Self {
        Self {
            resolver: MappingResolver::new(config),
            source,
            stop: StopToken::new(),
        }
    }

    /// Token for requesting a stop from outside the loop
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Run the loop in diagnostic mode: log every event, publish nothing
    pub async fn describe_events(mut self) -> Result<()> {
        info!("start describing...");
        let result = self
            .run_loop(|_resolver, event| match *event {
                ControllerEvent::ButtonDown { button } => {
                    info!("button down event, button={}", button);
                }
                ControllerEvent::ButtonUp { button } => {
                    info!("button up event, button={}", button);
                }
                ControllerEvent::HatMotion { x, y } => {
                    info!("hat event, x={}, y={}", x, y);
                }
                ControllerEvent::AxisMotion { axis, value } => {
                    info!("axis event, axis={}, value={}", axis, value);
                }
            })
            .await;
        info!("stop describing...");
        result
    }

    /// Run the full pipeline: classify, publish, tear the session down
    ///
    /// The broker session is shut down unconditionally after the loop,
    /// regardless of exit reason, before any poll error is re-raised.
    pub async fn publish_events(mut self, connection: MqttConnection) -> Result<()> {
        info!("start publishing...");
        let publisher = Publisher::new(connection);

        let result = self
            .run_loop(|resolver, event| match classify(resolver, event) {
                MappedOutcome::ButtonPressed(value) | MappedOutcome::HatMoved(value) => {
                    publisher.publish(resolver, &value);
                }
                MappedOutcome::Unmapped => debug!("ignore event, {:?}", event),
            })
            .await;

        publisher.into_connection().shutdown().await;
        info!("stop publishing...");
        result
    }

    async fn run_loop<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&mut MappingResolver, &ControllerEvent),
    {
        self.install_signal_handlers();

        while !self.stop.is_stopped() {
            let events = self.source.drain()?;
            for event in &events {
                callback(&mut self.resolver, event);
            }
            tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
        }

        Ok(())
    }

    /// Install SIGINT/SIGTERM handlers that set the stop token
    ///
    /// Registration can fail depending on the execution context; the loop
    /// then runs without handlers and relies on [`Bridge::stop_token`].
    fn install_signal_handlers(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let interrupt = signal(SignalKind::interrupt());
        let terminate = signal(SignalKind::terminate());

        match (interrupt, terminate) {
            (Ok(mut interrupt), Ok(mut terminate)) => {
                let stop = self.stop.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = interrupt.recv() => {}
                        _ = terminate.recv() => {}
                    }
                    info!("stop main loop");
                    stop.stop();
                });
            }
            _ => warn!("signal handlers unavailable, stop must be requested explicitly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ButtonMapping, ControllerConfig, MqttConfig, TopicMapping,
    };
    use crate::controller::mocks::ScriptedSource;
    use crate::error::JoyBridgeError;

    fn test_config(topics: Vec<TopicMapping>) -> Config {
        Config {
            name: "test".to_string(),
            controller: ControllerConfig {
                device: None,
                buttons: vec![ButtonMapping {
                    key: 304,
                    value: "select".to_string(),
                }],
                hats: vec![],
            },
            mqtt: MqttConfig {
                host: "127.0.0.1".to_string(),
                port: 1883,
                cafile: None,
                username: None,
                password: None,
                topics,
            },
        }
    }

    #[test]
    fn test_stop_token_is_monotonic() {
        let token = StopToken::new();
        assert!(!token.is_stopped());

        token.stop();
        assert!(token.is_stopped());

        // A second stop is a no-op; the flag never resets
        token.stop();
        assert!(token.is_stopped());

        let clone = token.clone();
        assert!(clone.is_stopped());
    }

    #[tokio::test]
    async fn test_run_loop_dispatches_every_event_then_stops() {
        let stop = StopToken::new();
        let stop_hook = stop.clone();
        let source = ScriptedSource::new(
            vec![
                vec![
                    ControllerEvent::ButtonDown { button: 304 },
                    ControllerEvent::ButtonUp { button: 304 },
                ],
                vec![ControllerEvent::HatMotion { x: 0, y: -1 }],
            ],
            move || stop_hook.stop(),
        );

        let mut bridge = Bridge::new(test_config(vec![]), Box::new(source));
        bridge.stop = stop;

        let mut seen = Vec::new();
        let result = bridge
            .run_loop(|_resolver, event| seen.push(event.clone()))
            .await;

        assert!(result.is_ok());
        assert_eq!(seen.len(), 3, "every drained event must be dispatched");
        assert_eq!(seen[0], ControllerEvent::ButtonDown { button: 304 });
        assert_eq!(seen[2], ControllerEvent::HatMotion { x: 0, y: -1 });
    }

    #[tokio::test]
    async fn test_preset_stop_exits_before_draining() {
        // A failing source proves the loop never drained
        let source = ScriptedSource::failing_after(vec![]);
        let mut bridge = Bridge::new(test_config(vec![]), Box::new(source));
        bridge.stop_token().stop();

        let result = bridge.run_loop(|_resolver, _event| {}).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_poll_error_is_fatal_to_the_loop() {
        let source = ScriptedSource::failing_after(vec![vec![
            ControllerEvent::ButtonDown { button: 304 },
        ]]);
        let mut bridge = Bridge::new(test_config(vec![]), Box::new(source));

        let result = bridge.run_loop(|_resolver, _event| {}).await;
        match result {
            Err(JoyBridgeError::Poll(_)) => {}
            other => panic!("Expected Poll error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_events_tears_down_after_poll_error() {
        let source = ScriptedSource::failing_after(vec![]);
        let bridge = Bridge::new(test_config(vec![]), Box::new(source));

        let connection = MqttConnection::connect(&test_config(vec![]).mqtt)
            .await
            .unwrap();

        // The error must still propagate after the unconditional teardown
        let result = bridge.publish_events(connection).await;
        match result {
            Err(JoyBridgeError::Poll(_)) => {}
            other => panic!("Expected Poll error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_events_without_topic_keeps_running() {
        // Zero configured topics: publishes are skipped with a warning and
        // the loop runs to its normal stop
        let stop = StopToken::new();
        let stop_hook = stop.clone();
        let source = ScriptedSource::new(
            vec![
                vec![ControllerEvent::ButtonDown { button: 304 }],
                vec![ControllerEvent::ButtonDown { button: 304 }],
            ],
            move || stop_hook.stop(),
        );

        let mut bridge = Bridge::new(test_config(vec![]), Box::new(source));
        bridge.stop = stop;

        let connection = MqttConnection::connect(&test_config(vec![]).mqtt)
            .await
            .unwrap();

        assert!(bridge.publish_events(connection).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_events_with_topic_completes() {
        let topics = vec![TopicMapping {
            key: "controller".to_string(),
            value: "/joy-bridge/events".to_string(),
        }];

        let stop = StopToken::new();
        let stop_hook = stop.clone();
        let source = ScriptedSource::new(
            vec![vec![
                ControllerEvent::ButtonDown { button: 304 },
                ControllerEvent::AxisMotion { axis: 0, value: 42 },
            ]],
            move || stop_hook.stop(),
        );

        let mut bridge = Bridge::new(test_config(topics), Box::new(source));
        bridge.stop = stop;

        let connection = MqttConnection::connect(&test_config(vec![]).mqtt)
            .await
            .unwrap();

        assert!(bridge.publish_events(connection).await.is_ok());
    }
}
