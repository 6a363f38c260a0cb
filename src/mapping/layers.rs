//! Shift-layer activity tracking
//!
//! A layer is active while its activator button is held. Eligibility:
//! - a base-layer mapping (no layer id) runs only while no layer is active
//! - a layered mapping runs only while its own layer is active
//!
//! Several layers may be held at once. The rule above is applied as written in
//! that case: every held layer's mappings run and base mappings stay off. No
//! priority between layers is implied.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

use crate::input::{DeviceSnapshot, InputKind};
use crate::profile::ShiftLayer;

/// Tracks which shift layers are held
#[derive(Debug, Default)]
pub struct ShiftLayerManager {
    layers: Vec<ShiftLayer>,
    active: HashMap<Uuid, bool>,
}

impl ShiftLayerManager {
    pub fn new(layers: Vec<ShiftLayer>) -> Self {
        let active = layers.iter().map(|l| (l.id, false)).collect();
        Self { layers, active }
    }

    /// Refresh every layer whose activator lives on the snapshot's device
    ///
    /// # Returns
    /// True if any layer changed state
    pub fn update(&mut self, snapshot: &DeviceSnapshot) -> bool {
        let mut changed = false;

        for layer in &self.layers {
            let Some(activator) = &layer.activator else {
                continue;
            };
            if activator.device_id != snapshot.device_id || activator.kind != InputKind::Button {
                continue;
            }

            let held = snapshot.button(activator.index).unwrap_or(false);
            let entry = self.active.entry(layer.id).or_insert(false);
            if *entry != held {
                *entry = held;
                changed = true;
                debug!(
                    "Shift layer '{}' {}",
                    layer.name,
                    if held { "activated" } else { "released" }
                );
            }
        }

        changed
    }

    pub fn is_active(&self, layer: Uuid) -> bool {
        self.active.get(&layer).copied().unwrap_or(false)
    }

    pub fn any_active(&self) -> bool {
        self.active.values().any(|&a| a)
    }

    /// Whether a mapping on `layer` (`None` = base layer) may run now
    pub fn is_eligible(&self, layer: Option<Uuid>) -> bool {
        match layer {
            None => !self.any_active(),
            Some(id) => self.is_active(id),
        }
    }

    /// Ids of the held layers
    pub fn active_layers(&self) -> BTreeSet<Uuid> {
        self.active
            .iter()
            .filter(|(_, &a)| a)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Release every layer
    pub fn reset(&mut self) {
        for active in self.active.values_mut() {
            *active = false;
        }
    }
}
