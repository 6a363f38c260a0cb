//! Physical input: per-tick device snapshots and the last-value cache
//!
//! The device poller itself lives outside this crate. It hands over one
//! [`DeviceSnapshot`] per device per poll tick; the engine and the calibration
//! service each keep their own [`DeviceCache`] of what they have seen.

pub mod cache;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use cache::DeviceCache;
pub use snapshot::DeviceSnapshot;

/// Category of a physical input channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Axis,
    Button,
    Hat,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Axis => write!(f, "axis"),
            InputKind::Button => write!(f, "button"),
            InputKind::Hat => write!(f, "hat"),
        }
    }
}

/// Where a value comes from: one channel on one physical device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct InputSource {
    pub device_id: String,
    pub kind: InputKind,
    pub index: usize,
}

impl InputSource {
    pub fn axis(device_id: impl Into<String>, index: usize) -> Self {
        Self {
            device_id: device_id.into(),
            kind: InputKind::Axis,
            index,
        }
    }

    pub fn button(device_id: impl Into<String>, index: usize) -> Self {
        Self {
            device_id: device_id.into(),
            kind: InputKind::Button,
            index,
        }
    }

    pub fn hat(device_id: impl Into<String>, index: usize) -> Self {
        Self {
            device_id: device_id.into(),
            kind: InputKind::Hat,
            index,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.device_id, self.kind, self.index)
    }
}
