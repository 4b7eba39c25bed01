//! # Joy Bridge Library
//!
//! Publish joystick and gamepad input events to an MQTT broker.
//!
//! This library polls a local input device, maps configured button presses
//! and hat motions to semantic values, and publishes them as timestamped
//! text payloads. Everything else the device emits is dropped.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod mapper;
pub mod mqtt;
pub mod publish;
pub mod resolver;
