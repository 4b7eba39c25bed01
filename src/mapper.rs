//! # Event Mapper
//!
//! Classifies translated controller events against the configured mappings.
//!
//! Only button presses and hat motions with a resolved mapping produce
//! outbound messages. Everything else (releases, axis jitter, unmapped
//! inputs) classifies as [`MappedOutcome::Unmapped`] and is dropped by the
//! caller, keeping noise off the broker.

use crate::controller::ControllerEvent;
use crate::resolver::MappingResolver;

/// Result of classifying one controller event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedOutcome {
    /// A mapped button was pressed; carries the configured value
    ButtonPressed(String),
    /// The hat moved to a mapped position; carries the configured value
    HatMoved(String),
    /// The event produces no outbound message
    Unmapped,
}

/// Classify a controller event into a publishable outcome
///
/// A hat position of (0, 0) — centered — is looked up exactly like any
/// other pair; if unmapped it is dropped without special-casing.
pub fn classify(resolver: &mut MappingResolver, event: &ControllerEvent) -> MappedOutcome {
    match *event {
        ControllerEvent::ButtonDown { button } => match resolver.find_button_item(button) {
            Some(item) => MappedOutcome::ButtonPressed(item.value.clone()),
            None => MappedOutcome::Unmapped,
        },
        ControllerEvent::HatMotion { x, y } => match resolver.find_hat_item((x, y)) {
            Some(item) => MappedOutcome::HatMoved(item.value.clone()),
            None => MappedOutcome::Unmapped,
        },
        ControllerEvent::ButtonUp { .. } | ControllerEvent::AxisMotion { .. } => {
            MappedOutcome::Unmapped
        }
    }
}
