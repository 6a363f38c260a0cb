//! Profile validation
//!
//! Run once when a profile is loaded. The engine relies on these checks and
//! does not repeat them per tick.

use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

use super::types::{AxisCurve, CurveKind, MappingBase, MappingProfile};
use crate::input::InputKind;
use crate::output::{AxisUsage, OutputKind};

/// Reasons a profile is rejected
#[derive(Debug, Error, PartialEq)]
pub enum ProfileError {
    #[error("Duplicate id {0}")]
    DuplicateId(Uuid),

    #[error("Mapping '{0}' has no inputs")]
    NoInputs(String),

    #[error("Mapping '{mapping}' reads {found} inputs, expected {expected}")]
    WrongInputKind {
        mapping: String,
        expected: InputKind,
        found: InputKind,
    },

    #[error("Mapping '{mapping}' cannot write to a {kind:?} output")]
    IncompatibleOutput { mapping: String, kind: OutputKind },

    #[error("Mapping '{mapping}' targets axis slot {index}, virtual devices have {max}")]
    InvalidAxisSlot {
        mapping: String,
        index: usize,
        max: usize,
    },

    #[error("Mapping '{0}' targets a keyboard key without a key name")]
    MissingKey(String),

    #[error("Mapping '{mapping}' references unknown shift layer {layer}")]
    UnknownLayer { mapping: String, layer: Uuid },

    #[error("Shift layer '{0}' activator must be a button")]
    InvalidActivator(String),

    #[error("Mapping '{mapping}' has an invalid curve: {reason}")]
    InvalidCurve { mapping: String, reason: String },

    #[error("Mapping '{mapping}': {reason}")]
    InvalidParameter { mapping: String, reason: String },
}

impl MappingProfile {
    /// Check the profile for correctness and consistency
    pub fn validate(&self) -> Result<(), ProfileError> {
        let mut ids = HashSet::new();
        for layer in &self.shift_layers {
            if !ids.insert(layer.id) {
                return Err(ProfileError::DuplicateId(layer.id));
            }
            if let Some(activator) = &layer.activator {
                if activator.kind != InputKind::Button {
                    return Err(ProfileError::InvalidActivator(layer.name.clone()));
                }
            }
        }

        for base in self.bases() {
            if !ids.insert(base.id) {
                return Err(ProfileError::DuplicateId(base.id));
            }
            if let Some(layer) = base.layer {
                if self.layer(layer).is_none() {
                    return Err(ProfileError::UnknownLayer {
                        mapping: base.label(),
                        layer,
                    });
                }
            }
        }

        for m in &self.axis_mappings {
            check_base(&m.base, InputKind::Axis, &[OutputKind::VirtualAxis])?;
            check_curve(&m.base, &m.curve)?;
        }
        for m in &self.button_mappings {
            check_base(
                &m.base,
                InputKind::Button,
                &[OutputKind::VirtualButton, OutputKind::KeyboardKey],
            )?;
        }
        for m in &self.hat_mappings {
            check_base(&m.base, InputKind::Hat, &[OutputKind::VirtualPov])?;
        }
        for m in &self.axis_to_button_mappings {
            check_base(
                &m.base,
                InputKind::Axis,
                &[OutputKind::VirtualButton, OutputKind::KeyboardKey],
            )?;
            if !(-1.0..=1.0).contains(&m.threshold) {
                return Err(parameter(&m.base, "threshold must be within [-1, 1]"));
            }
            if !(0.0..=1.0).contains(&m.hysteresis) {
                return Err(parameter(&m.base, "hysteresis must be within [0, 1]"));
            }
        }
        for m in &self.button_to_axis_mappings {
            check_base(&m.base, InputKind::Button, &[OutputKind::VirtualAxis])?;
            for value in [m.pressed_value, m.released_value] {
                if !(-1.0..=1.0).contains(&value) {
                    return Err(parameter(&m.base, "pressed/released values must be within [-1, 1]"));
                }
            }
        }

        Ok(())
    }
}

fn check_base(base: &MappingBase, input: InputKind, outputs: &[OutputKind]) -> Result<(), ProfileError> {
    if base.inputs.is_empty() {
        return Err(ProfileError::NoInputs(base.label()));
    }
    if let Some(source) = base.inputs.iter().find(|s| s.kind != input) {
        return Err(ProfileError::WrongInputKind {
            mapping: base.label(),
            expected: input,
            found: source.kind,
        });
    }
    if !outputs.contains(&base.output.kind) {
        return Err(ProfileError::IncompatibleOutput {
            mapping: base.label(),
            kind: base.output.kind,
        });
    }
    match base.output.kind {
        OutputKind::VirtualAxis if AxisUsage::from_index(base.output.index).is_none() => {
            Err(ProfileError::InvalidAxisSlot {
                mapping: base.label(),
                index: base.output.index,
                max: AxisUsage::ALL.len(),
            })
        }
        OutputKind::KeyboardKey
            if base.output.key.as_deref().map_or(true, |k| k.trim().is_empty()) =>
        {
            Err(ProfileError::MissingKey(base.label()))
        }
        _ => Ok(()),
    }
}

fn check_curve(base: &MappingBase, curve: &AxisCurve) -> Result<(), ProfileError> {
    let invalid = |reason: &str| ProfileError::InvalidCurve {
        mapping: base.label(),
        reason: reason.to_string(),
    };

    if !(-1.0..=1.0).contains(&curve.curvature) {
        return Err(invalid("curvature must be within [-1, 1]"));
    }
    if !(curve.saturation > 0.0 && curve.saturation <= 1.0) {
        return Err(invalid("saturation must be within (0, 1]"));
    }
    if curve.symmetric {
        if !(0.0..1.0).contains(&curve.deadzone) {
            return Err(invalid("deadzone must be within [0, 1)"));
        }
    } else {
        let b = curve.bounds;
        let ordered = -1.0 <= b.low
            && b.low < b.center_low
            && b.center_low <= b.center_high
            && b.center_high < b.high
            && b.high <= 1.0;
        if !ordered {
            return Err(invalid("deadzone bounds must satisfy -1 <= low < center_low <= center_high < high <= 1"));
        }
    }
    if curve.kind == CurveKind::ControlPoints {
        if curve.control_points.len() < 2 {
            return Err(invalid("control point curves need at least two points"));
        }
        let increasing = curve
            .control_points
            .windows(2)
            .all(|w| w[0].0 < w[1].0);
        if !increasing {
            return Err(invalid("control point inputs must be strictly increasing"));
        }
    }
    Ok(())
}

fn parameter(base: &MappingBase, reason: &str) -> ProfileError {
    ProfileError::InvalidParameter {
        mapping: base.label(),
        reason: reason.to_string(),
    }
}
