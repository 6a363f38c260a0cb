//! Axis ↔ button conversion
//!
//! - [`HysteresisState`]: axis to button with separate press/release thresholds
//! - [`SmoothingState`]: button to axis with a time-based ramp

use crate::profile::{AxisToButtonMapping, ButtonToAxisMapping};

/// Runtime state of an axis-to-button mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HysteresisState {
    activated: bool,
}

impl HysteresisState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with a new axis value
    ///
    /// Once active, the release threshold moves by `hysteresis` away from the
    /// activation side, so a value hovering at the threshold does not flicker.
    ///
    /// # Returns
    /// Whether the virtual button is pressed
    pub fn step(&mut self, mapping: &AxisToButtonMapping, value: f32) -> bool {
        let threshold = mapping.threshold;
        let margin = mapping.hysteresis.max(0.0);

        self.activated = match (mapping.activate_above, self.activated) {
            (true, false) => value >= threshold,
            (true, true) => value >= threshold - margin,
            (false, false) => value <= threshold,
            (false, true) => value <= threshold + margin,
        };
        self.activated
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }
}

/// Runtime state of a button-to-axis mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothingState {
    /// Current output; `None` until the first tick
    current: Option<f32>,
    last_update_ms: u64,
}

impl SmoothingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move toward the target for the current button state
    ///
    /// The output moves by at most `|pressed - released| · min(elapsed / smoothing, 1)`
    /// per tick, so a full swing takes about `smoothing_ms` whatever the poll
    /// rate. With `smoothing_ms == 0` the output snaps to the target.
    ///
    /// # Returns
    /// Axis value to write this tick
    pub fn step(&mut self, mapping: &ButtonToAxisMapping, pressed: bool, now_ms: u64) -> f32 {
        let target = target_value(mapping, pressed);

        let next = match self.current {
            _ if mapping.smoothing_ms == 0 => target,
            // Ramps start from rest
            None => mapping.released_value,
            Some(current) => {
                let elapsed = now_ms.saturating_sub(self.last_update_ms) as f32;
                let fraction = (elapsed / mapping.smoothing_ms as f32).min(1.0);
                let span = (mapping.pressed_value - mapping.released_value).abs();
                let max_step = span * fraction;
                let delta = target - current;
                if delta.abs() <= max_step {
                    target
                } else {
                    current + max_step.copysign(delta)
                }
            }
        };

        self.current = Some(next);
        self.last_update_ms = now_ms;
        next
    }

    /// Jump straight to the target (initial synchronization)
    pub fn snap(&mut self, mapping: &ButtonToAxisMapping, pressed: bool, now_ms: u64) -> f32 {
        let target = target_value(mapping, pressed);
        self.current = Some(target);
        self.last_update_ms = now_ms;
        target
    }

    pub fn current(&self) -> Option<f32> {
        self.current
    }
}

fn target_value(mapping: &ButtonToAxisMapping, pressed: bool) -> f32 {
    if pressed {
        mapping.pressed_value
    } else {
        mapping.released_value
    }
}
