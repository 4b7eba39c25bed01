//! # Error Types
//!
//! Custom error types for Joy Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Joy Bridge
#[derive(Debug, Error)]
pub enum JoyBridgeError {
    /// No joystick or gamepad device found on the system
    #[error("controller not found")]
    ControllerNotFound,

    /// Controller initialization failed
    #[error("controller init error: {0}")]
    Init(String),

    /// Controller event drain failed mid-session
    #[error("event poll error: {0}")]
    Poll(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Joy Bridge
pub type Result<T> = std::result::Result<T, JoyBridgeError>;
