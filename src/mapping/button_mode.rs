//! Timed button behavior (normal, toggle, pulse, hold-to-activate)
//!
//! [`ButtonState`] is the per-mapping runtime state. It lives in the engine's
//! runtime arena, never on the [`ButtonMapping`] itself.

use crate::profile::{ButtonMapping, ButtonMode};

/// Runtime state of one button mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Toggle output
    toggled: bool,
    /// Press already consumed; cleared on release
    latched: bool,
    /// Pulse start or hold start, in clock milliseconds
    timer_start: Option<u64>,
}

impl ButtonState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state machine by one tick
    ///
    /// # Arguments
    /// * `mapping` - Mode and durations
    /// * `input` - Physical state after merge and inversion
    /// * `now_ms` - Current clock time
    ///
    /// # Returns
    /// Output state for this tick
    pub fn step(&mut self, mapping: &ButtonMapping, input: bool, now_ms: u64) -> bool {
        let rising = input && !self.latched;
        self.latched = input;

        match mapping.mode {
            ButtonMode::Normal => input,
            ButtonMode::Toggle => {
                if rising {
                    self.toggled = !self.toggled;
                }
                self.toggled
            }
            ButtonMode::Pulse => {
                if rising {
                    self.timer_start = Some(now_ms);
                }
                match self.timer_start {
                    Some(start) if now_ms.saturating_sub(start) < mapping.pulse_ms => true,
                    Some(_) => {
                        self.timer_start = None;
                        false
                    }
                    None => false,
                }
            }
            ButtonMode::HoldToActivate => {
                if input {
                    let start = *self.timer_start.get_or_insert(now_ms);
                    now_ms.saturating_sub(start) >= mapping.hold_ms
                } else {
                    self.timer_start = None;
                    false
                }
            }
        }
    }

    /// Adopt the current physical state without producing edge effects
    ///
    /// Used when the engine starts with the hardware already in some state: a
    /// button held at start must not toggle or pulse, but a hold timer starts.
    ///
    /// # Returns
    /// Output state matching the current hardware
    pub fn prime(&mut self, mapping: &ButtonMapping, input: bool, now_ms: u64) -> bool {
        self.latched = input;
        match mapping.mode {
            ButtonMode::Normal => input,
            ButtonMode::Toggle => self.toggled,
            ButtonMode::Pulse => false,
            ButtonMode::HoldToActivate => {
                self.timer_start = input.then_some(now_ms);
                false
            }
        }
    }

    pub fn is_toggled(&self) -> bool {
        self.toggled
    }
}
