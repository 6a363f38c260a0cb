//! One pass over the profile's mappings
//!
//! Mapping kinds run in a fixed order: axis, button, hat, axis-to-button,
//! button-to-axis. When two mappings write the same output the later one wins.
//! A mapping whose write fails is logged and skipped; the rest of the pass
//! still runs.

use tracing::{trace, warn};
use uuid::Uuid;

use super::runtime::{HeldKey, RuntimeState};
use crate::mapping::{curve, hat, merge};
use crate::output::{AxisUsage, KeyboardOutput, OutputError, OutputKind, OutputSink, OutputTarget};
use crate::profile::{
    AxisMapping, AxisToButtonMapping, ButtonMapping, ButtonToAxisMapping, HatMapping, MappingBase,
    MappingProfile,
};

/// Anything carrying the shared mapping fields
trait Dispatchable {
    fn base(&self) -> &MappingBase;
}

macro_rules! impl_dispatchable {
    ($($ty:ty),*) => {
        $(impl Dispatchable for $ty {
            fn base(&self) -> &MappingBase {
                &self.base
            }
        })*
    };
}

impl_dispatchable!(
    AxisMapping,
    ButtonMapping,
    HatMapping,
    AxisToButtonMapping,
    ButtonToAxisMapping
);

/// Counters for one pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PassStats {
    pub written: usize,
    pub failed: usize,
}

pub(crate) struct Dispatcher<'a> {
    pub profile: &'a MappingProfile,
    pub runtime: &'a mut RuntimeState,
    pub sink: &'a dyn OutputSink,
    pub keyboard: Option<&'a dyn KeyboardOutput>,
    pub now_ms: u64,
    /// Initial synchronization: adopt hardware state without edge effects
    pub sync: bool,
}

impl<'a> Dispatcher<'a> {
    /// Run every eligible mapping that reads `device_id`, or every eligible
    /// mapping when `device_id` is `None`
    pub fn run(&mut self, device_id: Option<&str>) -> PassStats {
        let profile = self.profile;
        let mut stats = PassStats::default();

        self.each(&profile.axis_mappings, device_id, &mut stats, Self::axis);
        self.each(&profile.button_mappings, device_id, &mut stats, Self::button);
        self.each(&profile.hat_mappings, device_id, &mut stats, Self::hat);
        self.each(
            &profile.axis_to_button_mappings,
            device_id,
            &mut stats,
            Self::axis_to_button,
        );
        self.each(
            &profile.button_to_axis_mappings,
            device_id,
            &mut stats,
            Self::button_to_axis,
        );

        stats
    }

    fn each<M: Dispatchable>(
        &mut self,
        mappings: &[M],
        device_id: Option<&str>,
        stats: &mut PassStats,
        mut apply: impl FnMut(&mut Self, &M) -> Result<bool, OutputError>,
    ) {
        for mapping in mappings {
            let base = mapping.base();
            if !base.enabled || !self.runtime.layers.is_eligible(base.layer) {
                continue;
            }
            if let Some(device) = device_id {
                if !base.reads_device(device) {
                    continue;
                }
            }

            match apply(self, mapping) {
                Ok(true) => stats.written += 1,
                Ok(false) => {}
                Err(e) => {
                    stats.failed += 1;
                    warn!("Mapping '{}' → {} failed: {}", base.label(), base.output, e);
                }
            }
        }
    }

    fn axis(&mut self, mapping: &AxisMapping) -> Result<bool, OutputError> {
        let base = &mapping.base;
        let Some(raw) = self.merged_value(base) else {
            return Ok(false);
        };

        let mut value = curve::evaluate(raw, &mapping.curve);
        if base.invert {
            value = -value;
        }

        trace!("{}: {:.3} → {:.3}", base.label(), raw, value);
        self.write_axis(&base.output, value)?;
        Ok(true)
    }

    fn button(&mut self, mapping: &ButtonMapping) -> Result<bool, OutputError> {
        let base = &mapping.base;
        let Some(input) = self.merged_pressed(base) else {
            return Ok(false);
        };
        let input = input ^ base.invert;

        let (sync, now_ms) = (self.sync, self.now_ms);
        let state = self.runtime.button(base.id);
        let output = if sync {
            state.prime(mapping, input, now_ms)
        } else {
            state.step(mapping, input, now_ms)
        };

        self.write_button(base.id, &base.output, output)?;
        Ok(true)
    }

    fn hat(&mut self, mapping: &HatMapping) -> Result<bool, OutputError> {
        let base = &mapping.base;
        // Hats are not merged: the first source with data wins
        let Some(angle) = base.inputs.iter().find_map(|s| self.runtime.cache.hat(s)) else {
            return Ok(false);
        };

        let angle = if base.invert {
            hat::invert(angle)
        } else {
            hat::normalize(angle)
        };

        let target = &base.output;
        if target.kind != OutputKind::VirtualPov {
            return Err(missing_control(target, "POV"));
        }
        if mapping.continuous {
            self.sink
                .set_continuous_pov(target.device_id, target.index, angle)?;
        } else {
            self.sink.set_discrete_pov(
                target.device_id,
                target.index,
                hat::discrete_direction(angle),
            )?;
        }
        Ok(true)
    }

    fn axis_to_button(&mut self, mapping: &AxisToButtonMapping) -> Result<bool, OutputError> {
        let base = &mapping.base;
        let Some(value) = self.merged_value(base) else {
            return Ok(false);
        };

        let activated = self.runtime.hysteresis(base.id).step(mapping, value);
        self.write_button(base.id, &base.output, activated ^ base.invert)?;
        Ok(true)
    }

    fn button_to_axis(&mut self, mapping: &ButtonToAxisMapping) -> Result<bool, OutputError> {
        let base = &mapping.base;
        let Some(pressed) = self.merged_pressed(base) else {
            return Ok(false);
        };
        let pressed = pressed ^ base.invert;

        let (sync, now_ms) = (self.sync, self.now_ms);
        let state = self.runtime.smoothing(base.id);
        let value = if sync {
            state.snap(mapping, pressed, now_ms)
        } else {
            state.step(mapping, pressed, now_ms)
        };

        self.write_axis(&base.output, value)?;
        Ok(true)
    }

    fn merged_value(&self, base: &MappingBase) -> Option<f32> {
        let values: Vec<Option<f32>> = base
            .inputs
            .iter()
            .map(|s| self.runtime.cache.value(s))
            .collect();
        merge::resolve(base.merge, &values)
    }

    fn merged_pressed(&self, base: &MappingBase) -> Option<bool> {
        let states: Vec<Option<bool>> = base
            .inputs
            .iter()
            .map(|s| self.runtime.cache.value(s).map(|v| v >= 0.5))
            .collect();
        merge::resolve_pressed(base.merge, &states)
    }

    fn write_axis(&self, target: &OutputTarget, value: f32) -> Result<(), OutputError> {
        if target.kind != OutputKind::VirtualAxis {
            return Err(missing_control(target, "axis"));
        }
        let usage = AxisUsage::from_index(target.index)
            .ok_or_else(|| missing_control(target, "axis slot"))?;
        self.sink.set_axis(target.device_id, usage, value)
    }

    /// Virtual buttons are written every pass, keys only when they change
    fn write_button(
        &mut self,
        mapping_id: Uuid,
        target: &OutputTarget,
        pressed: bool,
    ) -> Result<(), OutputError> {
        match target.kind {
            OutputKind::VirtualButton => {
                self.sink.set_button(target.device_id, target.index, pressed)
            }
            OutputKind::KeyboardKey => self.write_key(mapping_id, target, pressed),
            _ => Err(missing_control(target, "button")),
        }
    }

    fn write_key(
        &mut self,
        mapping_id: Uuid,
        target: &OutputTarget,
        pressed: bool,
    ) -> Result<(), OutputError> {
        let held = self.runtime.held_keys.contains_key(&mapping_id);
        if held == pressed {
            return Ok(());
        }

        let keyboard = self
            .keyboard
            .ok_or_else(|| OutputError::Driver("no keyboard output configured".to_string()))?;
        let key = target
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing_control(target, "key name"))?;

        keyboard.set_key(key, pressed, &target.modifiers)?;

        if pressed {
            self.runtime.held_keys.insert(
                mapping_id,
                HeldKey {
                    key: key.to_string(),
                    modifiers: target.modifiers.clone(),
                },
            );
        } else {
            self.runtime.held_keys.remove(&mapping_id);
        }
        Ok(())
    }
}

fn missing_control(target: &OutputTarget, control: &str) -> OutputError {
    OutputError::MissingControl {
        device: target.device_id,
        control: format!("{} ({})", control, target),
    }
}
