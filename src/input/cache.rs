//! Last-value cache keyed by device identity
//!
//! Mappings can merge sources that live on different devices, but each
//! snapshot only carries one device. The cache keeps the most recent snapshot
//! per device so a merge can read every source, even if its device was not
//! polled this tick. Each component owns its own cache; there is no shared
//! global map.

use std::collections::HashMap;

use super::{DeviceSnapshot, InputKind, InputSource};

/// Most recent snapshot per device
#[derive(Debug, Default)]
pub struct DeviceCache {
    devices: HashMap<String, DeviceSnapshot>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` as the latest state of its device
    pub fn update(&mut self, snapshot: &DeviceSnapshot) {
        match self.devices.get_mut(&snapshot.device_id) {
            Some(existing) => existing.clone_from(snapshot),
            None => {
                self.devices
                    .insert(snapshot.device_id.clone(), snapshot.clone());
            }
        }
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        self.devices.get(device_id)
    }

    /// Numeric value of a source: axis value, 1.0/0.0 for buttons,
    /// 1.0/0.0 for hats (off-center / centered)
    pub fn value(&self, source: &InputSource) -> Option<f32> {
        let snap = self.devices.get(&source.device_id)?;
        match source.kind {
            InputKind::Axis => snap.axis(source.index),
            InputKind::Button => snap.button(source.index).map(bool_to_value),
            InputKind::Hat => snap.hat(source.index).map(|h| bool_to_value(h.is_some())),
        }
    }

    /// Hat angle of a hat source; `None` when missing, `Some(None)` when centered
    pub fn hat(&self, source: &InputSource) -> Option<Option<f32>> {
        if source.kind != InputKind::Hat {
            return None;
        }
        self.devices.get(&source.device_id)?.hat(source.index)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

#[inline]
pub(crate) fn bool_to_value(pressed: bool) -> f32 {
    if pressed {
        1.0
    } else {
        0.0
    }
}
