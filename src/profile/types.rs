//! Mapping profile data model
//!
//! Everything here is plain configuration. Runtime state (toggle latches, hold
//! timers, smoothing values, active layers) is owned by the engine and keyed
//! by mapping id, so a profile can be shared as `Arc<MappingProfile>` and never
//! changes during a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::input::InputSource;
use crate::output::{OutputTarget, VirtualDeviceId};

/// How several source values combine into one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOp {
    #[default]
    First,
    Average,
    Minimum,
    Maximum,
    /// Sum clamped to `[-1.0, 1.0]`
    Sum,
}

/// Fields shared by every mapping kind
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MappingBase {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shift layer this mapping belongs to; `None` is the base layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<Uuid>,
    /// One or more sources; more than one are merged with `merge`
    pub inputs: Vec<InputSource>,
    pub output: OutputTarget,
    #[serde(default)]
    pub merge: MergeOp,
    #[serde(default)]
    pub invert: bool,
}

impl MappingBase {
    pub fn new(name: impl Into<String>, inputs: Vec<InputSource>, output: OutputTarget) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            enabled: true,
            layer: None,
            inputs,
            output,
            merge: MergeOp::default(),
            invert: false,
        }
    }

    pub fn on_layer(mut self, layer: Uuid) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn merged(mut self, merge: MergeOp) -> Self {
        self.merge = merge;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// True if any source lives on `device_id`
    pub fn reads_device(&self, device_id: &str) -> bool {
        self.inputs.iter().any(|s| s.device_id == device_id)
    }

    /// Name for log lines, falls back to the id
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            self.name.clone()
        }
    }
}

/// Response curve shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveKind {
    #[default]
    Linear,
    SCurve,
    ControlPoints,
}

/// Four-boundary deadzone for asymmetric axes (throttles, pedals, ...)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DeadzoneBounds {
    /// Values at or below saturate to the negative end
    pub low: f32,
    /// Lower edge of the center band
    pub center_low: f32,
    /// Upper edge of the center band
    pub center_high: f32,
    /// Values at or above saturate to the positive end
    pub high: f32,
}

impl Default for DeadzoneBounds {
    fn default() -> Self {
        Self {
            low: -1.0,
            center_low: 0.0,
            center_high: 0.0,
            high: 1.0,
        }
    }
}

/// Axis response curve
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AxisCurve {
    #[serde(default)]
    pub kind: CurveKind,
    /// S-curve strength in `[-1.0, 1.0]`; 0 is linear, positive flattens the center
    #[serde(default)]
    pub curvature: f32,
    /// Output magnitude at full deflection, `(0.0, 1.0]`
    #[serde(default = "default_saturation")]
    pub saturation: f32,
    /// Center deadzone half-width, used in symmetric mode
    #[serde(default)]
    pub deadzone: f32,
    /// Use `deadzone` and mirror positive-side shaping onto the negative side
    #[serde(default = "default_true")]
    pub symmetric: bool,
    /// Deadzone boundaries, used when not symmetric
    #[serde(default)]
    pub bounds: DeadzoneBounds,
    /// `(input, output)` pairs for `ControlPoints`, sorted by input
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub control_points: Vec<(f32, f32)>,
}

impl Default for AxisCurve {
    fn default() -> Self {
        Self {
            kind: CurveKind::Linear,
            curvature: 0.0,
            saturation: 1.0,
            deadzone: 0.0,
            symmetric: true,
            bounds: DeadzoneBounds::default(),
            control_points: Vec::new(),
        }
    }
}

impl AxisCurve {
    pub fn linear() -> Self {
        Self::default()
    }

    pub fn s_curve(curvature: f32) -> Self {
        Self {
            kind: CurveKind::SCurve,
            curvature,
            ..Self::default()
        }
    }

    pub fn control_points(points: Vec<(f32, f32)>) -> Self {
        Self {
            kind: CurveKind::ControlPoints,
            control_points: points,
            ..Self::default()
        }
    }

    pub fn with_deadzone(mut self, deadzone: f32) -> Self {
        self.deadzone = deadzone;
        self.symmetric = true;
        self
    }

    pub fn with_bounds(mut self, bounds: DeadzoneBounds) -> Self {
        self.bounds = bounds;
        self.symmetric = false;
        self
    }

    pub fn with_saturation(mut self, saturation: f32) -> Self {
        self.saturation = saturation;
        self
    }
}

/// Physical axis to virtual axis
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AxisMapping {
    #[serde(flatten)]
    pub base: MappingBase,
    #[serde(default)]
    pub curve: AxisCurve,
}

/// Timed button behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonMode {
    #[default]
    Normal,
    Toggle,
    Pulse,
    HoldToActivate,
}

/// Physical button to virtual button or keyboard key
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ButtonMapping {
    #[serde(flatten)]
    pub base: MappingBase,
    #[serde(default)]
    pub mode: ButtonMode,
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
}

/// Physical hat to virtual POV
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HatMapping {
    #[serde(flatten)]
    pub base: MappingBase,
    /// Continuous (angle) POV instead of 4-way discrete
    #[serde(default)]
    pub continuous: bool,
}

/// Physical axis to virtual button or key, with hysteresis
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AxisToButtonMapping {
    #[serde(flatten)]
    pub base: MappingBase,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_true")]
    pub activate_above: bool,
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f32,
}

/// Physical button to virtual axis, with time-based smoothing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ButtonToAxisMapping {
    #[serde(flatten)]
    pub base: MappingBase,
    #[serde(default = "default_pressed_value")]
    pub pressed_value: f32,
    #[serde(default = "default_released_value")]
    pub released_value: f32,
    #[serde(default)]
    pub smoothing_ms: u64,
}

/// Override context activated by holding a button
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ShiftLayer {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activator: Option<InputSource>,
}

/// A complete mapping configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MappingProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub axis_mappings: Vec<AxisMapping>,
    #[serde(default)]
    pub button_mappings: Vec<ButtonMapping>,
    #[serde(default)]
    pub hat_mappings: Vec<HatMapping>,
    #[serde(default)]
    pub axis_to_button_mappings: Vec<AxisToButtonMapping>,
    #[serde(default)]
    pub button_to_axis_mappings: Vec<ButtonToAxisMapping>,
    #[serde(default)]
    pub shift_layers: Vec<ShiftLayer>,
}

impl MappingProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Shared fields of every mapping, in processing order
    pub fn bases(&self) -> impl Iterator<Item = &MappingBase> {
        self.axis_mappings
            .iter()
            .map(|m| &m.base)
            .chain(self.button_mappings.iter().map(|m| &m.base))
            .chain(self.hat_mappings.iter().map(|m| &m.base))
            .chain(self.axis_to_button_mappings.iter().map(|m| &m.base))
            .chain(self.button_to_axis_mappings.iter().map(|m| &m.base))
    }

    pub fn mapping_count(&self) -> usize {
        self.bases().count()
    }

    /// Distinct virtual devices referenced by any output, in ascending order
    pub fn virtual_devices(&self) -> BTreeSet<VirtualDeviceId> {
        self.bases()
            .filter_map(|b| b.output.virtual_device())
            .collect()
    }

    pub fn layer(&self, id: Uuid) -> Option<&ShiftLayer> {
        self.shift_layers.iter().find(|l| l.id == id)
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_saturation() -> f32 { 1.0 }
fn default_pulse_ms() -> u64 { 100 }
fn default_hold_ms() -> u64 { 500 }
fn default_threshold() -> f32 { 0.5 }
fn default_hysteresis() -> f32 { 0.05 }
fn default_pressed_value() -> f32 { 1.0 }
fn default_released_value() -> f32 { -1.0 }
