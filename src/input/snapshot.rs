//! Per-tick device snapshot
//!
//! A [`DeviceSnapshot`] is an owned, read-only view of one physical device at
//! one poll tick. The poller creates it; nothing downstream mutates it.
//!
//! # Value conventions
//! - **Axes:** normalized to `[-1.0, 1.0]`.
//! - **Buttons:** `true` while held.
//! - **Hats (POV/D-pad):** angle in degrees `[0, 360)`, `None` when centered.
//!   Up is 0°, clockwise.

use serde::{Deserialize, Serialize};

/// State of one physical device at one poll tick
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceSnapshot {
    /// Stable device identity (instance GUID, HID path, ...)
    pub device_id: String,
    /// Human-friendly device name
    #[serde(default)]
    pub name: String,
    /// Poll time in milliseconds, monotonic per device
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub axes: Vec<f32>,
    #[serde(default)]
    pub buttons: Vec<bool>,
    #[serde(default)]
    pub hats: Vec<Option<f32>>,
}

impl DeviceSnapshot {
    pub fn new(device_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    pub fn with_axes(mut self, axes: Vec<f32>) -> Self {
        self.axes = axes;
        self
    }

    pub fn with_buttons(mut self, buttons: Vec<bool>) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_hats(mut self, hats: Vec<Option<f32>>) -> Self {
        self.hats = hats;
        self
    }

    /// Axis value, `None` if the device has no such axis
    #[inline]
    pub fn axis(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }

    /// Button state, `None` if the device has no such button
    #[inline]
    pub fn button(&self, index: usize) -> Option<bool> {
        self.buttons.get(index).copied()
    }

    /// Hat angle; outer `None` if the hat does not exist, inner `None` if centered
    #[inline]
    pub fn hat(&self, index: usize) -> Option<Option<f32>> {
        self.hats.get(index).copied()
    }
}
