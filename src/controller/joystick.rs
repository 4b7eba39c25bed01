//! # Joystick Device Module
//!
//! Joystick/gamepad discovery and event translation via the Linux evdev
//! interface.
//!
//! ## Device Discovery
//!
//! Without an explicit device path the module scans `/dev/input/event*`
//! (sorted, for deterministic selection) and picks the first device that
//! advertises gamepad or joystick button capability.
//!
//! ## Event Translation
//!
//! | evdev event              | Translated to                     |
//! |--------------------------|-----------------------------------|
//! | EV_KEY value 1           | `ControllerEvent::ButtonDown`     |
//! | EV_KEY value 0           | `ControllerEvent::ButtonUp`       |
//! | EV_KEY value 2 (repeat)  | dropped                           |
//! | ABS_HAT0X / ABS_HAT0Y    | `ControllerEvent::HatMotion`      |
//! | other EV_ABS             | `ControllerEvent::AxisMotion`     |
//! | EV_SYN, EV_MSC, ...      | dropped                           |
//!
//! Hat events carry the full current (x, y) position: the translator keeps
//! the last seen value of each hat axis so a single-axis kernel event still
//! yields a complete pair.

use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use evdev::{AbsoluteAxisType, Device, InputEvent, InputEventKind, Key};
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::error::{JoyBridgeError, Result};

use super::{ControllerEvent, EventSource};

/// Translates raw evdev events into [`ControllerEvent`] values.
///
/// Stateful only for the hat: the kernel reports hat movement one axis at a
/// time, while consumers want the full (x, y) position per event.
#[derive(Debug, Default)]
pub struct EventTranslator {
    hat_x: i32,
    hat_y: i32,
}

impl EventTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one raw event; returns `None` for events the bridge drops
    pub fn translate(&mut self, event: &InputEvent) -> Option<ControllerEvent> {
        match event.kind() {
            InputEventKind::Key(key) => match event.value() {
                1 => Some(ControllerEvent::ButtonDown { button: key.code() }),
                0 => Some(ControllerEvent::ButtonUp { button: key.code() }),
                _ => None, // key autorepeat
            },
            InputEventKind::AbsAxis(axis) => match axis {
                AbsoluteAxisType::ABS_HAT0X => {
                    self.hat_x = event.value();
                    Some(ControllerEvent::HatMotion {
                        x: self.hat_x,
                        y: self.hat_y,
                    })
                }
                AbsoluteAxisType::ABS_HAT0Y => {
                    self.hat_y = event.value();
                    Some(ControllerEvent::HatMotion {
                        x: self.hat_x,
                        y: self.hat_y,
                    })
                }
                other => Some(ControllerEvent::AxisMotion {
                    axis: other.0,
                    value: event.value(),
                }),
            },
            _ => None, // sync, misc and other device-level events
        }
    }
}

/// An open joystick/gamepad handle backed by evdev
pub struct JoystickDevice {
    device: Device,
    device_path: String,
    translator: EventTranslator,
}

impl std::fmt::Debug for JoystickDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoystickDevice")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl JoystickDevice {
    /// Open the configured controller device
    ///
    /// Uses the explicit `device` path when configured, otherwise scans
    /// `/dev/input` for the first joystick-capable device.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: no joystick or gamepad device on the system
    /// - `Init`: the device exists but could not be opened or configured
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use joy_bridge::config::ControllerConfig;
    /// use joy_bridge::controller::JoystickDevice;
    ///
    /// let config = ControllerConfig { device: None, buttons: vec![], hats: vec![] };
    /// let joystick = JoystickDevice::open(&config)?;
    /// println!("Connected to controller at: {}", joystick.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &ControllerConfig) -> Result<Self> {
        match &config.device {
            Some(path) if !path.is_empty() => Self::open_path(path),
            _ => Self::open_first_joystick(),
        }
    }

    /// Open a specific input device path
    pub fn open_path(path: &str) -> Result<Self> {
        let device = Device::open(path)
            .map_err(|e| JoyBridgeError::Init(format!("failed to open {}: {}", path, e)))?;
        Self::from_device(device, path.to_string())
    }

    /// Scan `/dev/input` for the first joystick-capable event device
    fn open_first_joystick() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(JoyBridgeError::Init(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| JoyBridgeError::Init(format!("failed to read /dev/input: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| JoyBridgeError::Init(format!("failed to read directory entry: {}", e)))?;

        // Sort entries for deterministic device selection
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            // Only check event* devices
            if let Some(filename) = path.file_name() {
                if !filename.to_string_lossy().starts_with("event") {
                    continue;
                }
            } else {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    if Self::is_joystick(&device) {
                        let device_path = path.to_string_lossy().to_string();
                        info!(
                            "found controller \"{}\" at {}",
                            device.name().unwrap_or("unknown"),
                            device_path
                        );
                        return Self::from_device(device, device_path);
                    }
                    debug!("skipping non-joystick device {}", path.display());
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(JoyBridgeError::ControllerNotFound)
    }

    /// A device counts as a joystick if it advertises gamepad or joystick
    /// button capability
    fn is_joystick(device: &Device) -> bool {
        device.supported_keys().map_or(false, |keys| {
            keys.contains(Key::BTN_SOUTH) || keys.contains(Key::BTN_TRIGGER)
        })
    }

    fn from_device(device: Device, device_path: String) -> Result<Self> {
        // Drains must never block the poll loop; evdev leaves non-blocking
        // mode to the caller, so flip O_NONBLOCK on the raw fd here.
        set_nonblocking(&device)
            .map_err(|e| JoyBridgeError::Init(format!("failed to set non-blocking: {}", e)))?;

        Ok(Self {
            device,
            device_path,
            translator: EventTranslator::new(),
        })
    }

    /// Get the device path of this controller
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Get controller name from evdev
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

impl EventSource for JoystickDevice {
    fn drain(&mut self) -> Result<Vec<ControllerEvent>> {
        let mut drained = Vec::new();

        loop {
            match self.device.fetch_events() {
                Ok(events) => {
                    let mut saw_event = false;
                    for event in events {
                        saw_event = true;
                        if let Some(translated) = self.translator.translate(&event) {
                            drained.push(translated);
                        }
                    }
                    if !saw_event {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    return Err(JoyBridgeError::Poll(format!(
                        "failed to fetch events from {}: {}",
                        self.device_path, e
                    )))
                }
            }
        }

        Ok(drained)
    }
}

fn set_nonblocking(device: &Device) -> io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fcntl on a valid owned fd with F_GETFL/F_SETFL
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::EventType;

    /// Helper to create an axis event for testing.
    fn make_axis_event(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    /// Helper to create a key event for testing.
    fn make_key_event(key: Key, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, key.code(), value)
    }

    #[test]
    fn test_button_press_and_release() {
        let mut translator = EventTranslator::new();

        let down = translator.translate(&make_key_event(Key::BTN_SOUTH, 1));
        assert_eq!(
            down,
            Some(ControllerEvent::ButtonDown {
                button: Key::BTN_SOUTH.code()
            })
        );

        let up = translator.translate(&make_key_event(Key::BTN_SOUTH, 0));
        assert_eq!(
            up,
            Some(ControllerEvent::ButtonUp {
                button: Key::BTN_SOUTH.code()
            })
        );
    }

    #[test]
    fn test_key_autorepeat_is_dropped() {
        let mut translator = EventTranslator::new();
        assert_eq!(translator.translate(&make_key_event(Key::BTN_SOUTH, 2)), None);
    }

    #[test]
    fn test_hat_motion_builds_full_pair() {
        let mut translator = EventTranslator::new();

        // Kernel reports one axis at a time; translation carries the pair
        let first = translator.translate(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 1));
        assert_eq!(first, Some(ControllerEvent::HatMotion { x: 1, y: 0 }));

        let second = translator.translate(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, -1));
        assert_eq!(second, Some(ControllerEvent::HatMotion { x: 1, y: -1 }));

        // Releasing X keeps the remembered Y
        let third = translator.translate(&make_axis_event(AbsoluteAxisType::ABS_HAT0X, 0));
        assert_eq!(third, Some(ControllerEvent::HatMotion { x: 0, y: -1 }));

        let centered = translator.translate(&make_axis_event(AbsoluteAxisType::ABS_HAT0Y, 0));
        assert_eq!(centered, Some(ControllerEvent::HatMotion { x: 0, y: 0 }));
    }

    #[test]
    fn test_analog_axis_translates_to_axis_motion() {
        let mut translator = EventTranslator::new();

        let event = translator.translate(&make_axis_event(AbsoluteAxisType::ABS_X, 192));
        assert_eq!(
            event,
            Some(ControllerEvent::AxisMotion {
                axis: AbsoluteAxisType::ABS_X.0,
                value: 192
            })
        );
    }

    #[test]
    fn test_sync_events_are_dropped() {
        let mut translator = EventTranslator::new();
        let event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        assert_eq!(translator.translate(&event), None);
    }

    #[test]
    fn test_open_path_with_invalid_device_fails() {
        let result = JoystickDevice::open_path("/dev/nonexistent_joystick_12345");
        assert!(result.is_err());
        match result.unwrap_err() {
            JoyBridgeError::Init(msg) => {
                assert!(msg.contains("/dev/nonexistent_joystick_12345"));
            }
            other => panic!("Expected Init error, got: {:?}", other),
        }
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_open_with_real_hardware() {
        let config = ControllerConfig {
            device: None,
            buttons: vec![],
            hats: vec![],
        };
        let result = JoystickDevice::open(&config);
        assert!(result.is_ok(), "Should detect a connected controller");

        let joystick = result.unwrap();
        assert!(joystick.device_path().starts_with("/dev/input/event"));
    }
}
