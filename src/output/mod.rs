//! Output side: virtual joystick devices and keyboard keys
//!
//! The actual driver bindings (vJoy, uinput, SendInput, ...) live outside this
//! crate. The engine talks to them through [`OutputSink`] and
//! [`KeyboardOutput`].
//!
//! Note: all methods take `&self` so sinks can be shared as `Arc<dyn OutputSink>`.
//! Implementations use interior mutability for their own state.

pub mod console;
#[cfg(test)]
pub(crate) mod recording;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use console::ConsoleSink;

/// Identity of a virtual joystick device (vJoy numbers them from 1)
pub type VirtualDeviceId = u32;

/// Errors reported by output sinks
#[derive(Debug, Error)]
pub enum OutputError {
    /// Device was never acquired or has been released
    #[error("Virtual device {0} is not acquired")]
    NotAcquired(VirtualDeviceId),

    /// Device does not expose the requested control
    #[error("Virtual device {device} has no {control}")]
    MissingControl {
        device: VirtualDeviceId,
        control: String,
    },

    /// Driver call failed
    #[error("Driver error: {0}")]
    Driver(String),
}

/// HID usage of a virtual axis, in slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AxisUsage {
    X,
    Y,
    Z,
    Rx,
    Ry,
    Rz,
    Slider,
    Dial,
}

impl AxisUsage {
    /// All usages, indexed by axis slot
    pub const ALL: [AxisUsage; 8] = [
        AxisUsage::X,
        AxisUsage::Y,
        AxisUsage::Z,
        AxisUsage::Rx,
        AxisUsage::Ry,
        AxisUsage::Rz,
        AxisUsage::Slider,
        AxisUsage::Dial,
    ];

    /// Usage for a zero-based axis slot (0 → X, 1 → Y, ...)
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// HID usage code on the Generic Desktop page
    pub fn hid_usage(self) -> u16 {
        match self {
            AxisUsage::X => 0x30,
            AxisUsage::Y => 0x31,
            AxisUsage::Z => 0x32,
            AxisUsage::Rx => 0x33,
            AxisUsage::Ry => 0x34,
            AxisUsage::Rz => 0x35,
            AxisUsage::Slider => 0x36,
            AxisUsage::Dial => 0x37,
        }
    }
}

/// Category of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    VirtualAxis,
    VirtualButton,
    VirtualPov,
    KeyboardKey,
}

/// Where a value goes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct OutputTarget {
    pub kind: OutputKind,
    /// Virtual device; ignored for keyboard targets
    #[serde(default)]
    pub device_id: VirtualDeviceId,
    /// Axis slot, button number or POV number
    #[serde(default)]
    pub index: usize,
    /// Key name or code, keyboard targets only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<String>,
}

impl OutputTarget {
    pub fn axis(device_id: VirtualDeviceId, index: usize) -> Self {
        Self::virtual_control(OutputKind::VirtualAxis, device_id, index)
    }

    pub fn button(device_id: VirtualDeviceId, index: usize) -> Self {
        Self::virtual_control(OutputKind::VirtualButton, device_id, index)
    }

    pub fn pov(device_id: VirtualDeviceId, index: usize) -> Self {
        Self::virtual_control(OutputKind::VirtualPov, device_id, index)
    }

    pub fn key(key: impl Into<String>, modifiers: Vec<String>) -> Self {
        Self {
            kind: OutputKind::KeyboardKey,
            device_id: 0,
            index: 0,
            key: Some(key.into()),
            modifiers,
        }
    }

    fn virtual_control(kind: OutputKind, device_id: VirtualDeviceId, index: usize) -> Self {
        Self {
            kind,
            device_id,
            index,
            key: None,
            modifiers: Vec::new(),
        }
    }

    /// Virtual device this target writes to, `None` for keyboard keys
    pub fn virtual_device(&self) -> Option<VirtualDeviceId> {
        match self.kind {
            OutputKind::KeyboardKey => None,
            _ => Some(self.device_id),
        }
    }
}

impl fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OutputKind::VirtualAxis => write!(f, "vjoy{}.axis{}", self.device_id, self.index),
            OutputKind::VirtualButton => write!(f, "vjoy{}.btn{}", self.device_id, self.index),
            OutputKind::VirtualPov => write!(f, "vjoy{}.pov{}", self.device_id, self.index),
            OutputKind::KeyboardKey => {
                for modifier in &self.modifiers {
                    write!(f, "{}+", modifier)?;
                }
                write!(f, "{}", self.key.as_deref().unwrap_or("?"))
            }
        }
    }
}

/// Virtual joystick driver
///
/// Calls are assumed synchronous and quick. The engine has no timeout around
/// them: a sink that blocks stalls the polling thread.
pub trait OutputSink: Send + Sync {
    /// Claim a virtual device for exclusive use
    fn acquire_device(&self, id: VirtualDeviceId) -> bool;

    /// Give a device back to the driver
    fn release_device(&self, id: VirtualDeviceId);

    /// Drive every control of a device to neutral
    fn reset_device(&self, id: VirtualDeviceId);

    /// Set an axis, `value` in `[-1.0, 1.0]`
    fn set_axis(&self, id: VirtualDeviceId, usage: AxisUsage, value: f32)
        -> Result<(), OutputError>;

    fn set_button(&self, id: VirtualDeviceId, index: usize, pressed: bool)
        -> Result<(), OutputError>;

    /// 4-way POV: `Some(0..=3)` (up, right, down, left) or `None` for centered
    fn set_discrete_pov(
        &self,
        id: VirtualDeviceId,
        pov: usize,
        direction: Option<u8>,
    ) -> Result<(), OutputError>;

    /// Continuous POV: angle in degrees or `None` for centered
    fn set_continuous_pov(
        &self,
        id: VirtualDeviceId,
        pov: usize,
        angle: Option<f32>,
    ) -> Result<(), OutputError>;
}

/// Keyboard injection
pub trait KeyboardOutput: Send + Sync {
    fn set_key(&self, key: &str, pressed: bool, modifiers: &[String]) -> Result<(), OutputError>;
}
