//! # Controller Module
//!
//! Joystick and gamepad input handling.
//!
//! This module handles:
//! - Input device discovery and connection via evdev
//! - Draining queued input events without blocking the poll loop
//! - Translating raw evdev events into [`ControllerEvent`] values
//!
//! The [`EventSource`] trait is the seam between the polling loop and the
//! hardware; [`joystick::JoystickDevice`] is the evdev implementation.

pub mod joystick;

pub use joystick::JoystickDevice;

use crate::error::Result;

/// A single input event from the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A button was pressed
    ButtonDown { button: u16 },
    /// A button was released
    ButtonUp { button: u16 },
    /// The hat (d-pad) moved; carries the full current (x, y) position
    HatMotion { x: i32, y: i32 },
    /// An analog axis changed
    AxisMotion { axis: u16, value: i32 },
}

/// Source of controller events for the polling loop
///
/// A drain returns every event queued since the previous drain, possibly
/// none, and never blocks.
pub trait EventSource: Send {
    /// Consume all currently queued input events in one pass
    fn drain(&mut self) -> Result<Vec<ControllerEvent>>;
}
