//! Per-run mutable state, kept apart from the immutable profile
//!
//! Every entry is keyed by mapping id. The arena is created on `start` and
//! dropped on `stop`, so a restart never sees stale latches or timers.

use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::input::DeviceCache;
use crate::mapping::{ButtonState, HysteresisState, ShiftLayerManager, SmoothingState};
use crate::output::VirtualDeviceId;
use crate::profile::MappingProfile;

/// Keyboard key currently held down by a mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeldKey {
    pub key: String,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct RuntimeState {
    /// Last snapshot per device, read by merges
    pub cache: DeviceCache,
    pub layers: ShiftLayerManager,
    pub buttons: HashMap<Uuid, ButtonState>,
    pub hysteresis: HashMap<Uuid, HysteresisState>,
    pub smoothing: HashMap<Uuid, SmoothingState>,
    /// Keys pressed by a mapping and not yet released
    pub held_keys: HashMap<Uuid, HeldKey>,
    /// Devices acquired for this run
    pub acquired: BTreeSet<VirtualDeviceId>,
}

impl RuntimeState {
    pub fn new(profile: &MappingProfile) -> Self {
        Self {
            layers: ShiftLayerManager::new(profile.shift_layers.clone()),
            ..Self::default()
        }
    }

    pub fn button(&mut self, id: Uuid) -> &mut ButtonState {
        self.buttons.entry(id).or_default()
    }

    pub fn hysteresis(&mut self, id: Uuid) -> &mut HysteresisState {
        self.hysteresis.entry(id).or_default()
    }

    pub fn smoothing(&mut self, id: Uuid) -> &mut SmoothingState {
        self.smoothing.entry(id).or_default()
    }
}
