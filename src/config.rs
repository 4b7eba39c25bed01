//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! A configuration file names the controller, declares the button and hat
//! mappings that should produce messages, and describes the MQTT broker:
//!
//! ```toml
//! name = "gamepad"
//!
//! [controller]
//!
//! [[controller.buttons]]
//! key = 304
//! value = "button_a"
//!
//! [[controller.hats]]
//! x = 0
//! y = -1
//! value = "up"
//!
//! [mqtt]
//! host = "localhost"
//!
//! [[mqtt.topics]]
//! key = "controller"
//! value = "/joy-bridge/events"
//! ```

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Human-readable name of this bridge instance
    pub name: String,

    pub controller: ControllerConfig,
    pub mqtt: MqttConfig,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Explicit input device path (e.g. `/dev/input/event5`).
    /// When absent, the first joystick-capable device is used.
    #[serde(default)]
    pub device: Option<String>,

    /// Ordered button mappings; the first entry matching a button id wins
    #[serde(default)]
    pub buttons: Vec<ButtonMapping>,

    /// Ordered hat mappings; the first entry matching an (x, y) pair wins
    #[serde(default)]
    pub hats: Vec<HatMapping>,
}

/// Maps an evdev button code to a semantic output value
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ButtonMapping {
    pub key: u16,
    pub value: String,
}

/// Maps a hat (x, y) position to a semantic output value
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HatMapping {
    pub x: i32,
    pub y: i32,
    pub value: String,
}

/// Maps a topic identifier to a broker topic path
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TopicMapping {
    pub key: String,
    pub value: String,
}

/// MQTT broker configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    /// CA certificate file enabling TLS; ignored with a warning if the
    /// file does not exist at connect time
    #[serde(default)]
    pub cafile: Option<String>,

    /// Credentials are applied only when both fields are present
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Ordered topic mappings; publishes use the entry keyed `"controller"`
    #[serde(default)]
    pub topics: Vec<TopicMapping>,
}

fn default_mqtt_port() -> u16 {
    1883
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joy_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(crate::error::JoyBridgeError::Config(
                toml::de::Error::custom("name cannot be empty"),
            ));
        }

        if self.mqtt.host.is_empty() {
            return Err(crate::error::JoyBridgeError::Config(
                toml::de::Error::custom("mqtt host cannot be empty"),
            ));
        }

        for mapping in &self.controller.buttons {
            if mapping.value.is_empty() {
                return Err(crate::error::JoyBridgeError::Config(
                    toml::de::Error::custom(format!(
                        "button mapping for key {} has an empty value",
                        mapping.key
                    )),
                ));
            }
        }

        for mapping in &self.controller.hats {
            if mapping.value.is_empty() {
                return Err(crate::error::JoyBridgeError::Config(
                    toml::de::Error::custom(format!(
                        "hat mapping for ({}, {}) has an empty value",
                        mapping.x, mapping.y
                    )),
                ));
            }
        }

        for topic in &self.mqtt.topics {
            if topic.key.is_empty() || topic.value.is_empty() {
                return Err(crate::error::JoyBridgeError::Config(
                    toml::de::Error::custom("topic mappings need a non-empty key and value"),
                ));
            }
        }

        Ok(())
    }
}
