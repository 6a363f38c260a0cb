//! Console sink - logs virtual device and keyboard output for testing and debugging
//!
//! Useful for:
//! - Trying a profile without a virtual joystick driver installed
//! - Watching what the engine writes while replaying recorded input

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::{AxisUsage, KeyboardOutput, OutputError, OutputSink, VirtualDeviceId};

/// Last value written per control, for change-only logging
#[derive(Debug, Clone, PartialEq)]
enum ControlValue {
    Axis(f32),
    Button(bool),
    Pov(Option<f32>),
}

/// Sink that logs every state change through `tracing`
///
/// The engine writes every mapped control on every tick; only changes are
/// logged so a 250 Hz poller does not flood the console.
pub struct ConsoleSink {
    /// Devices that may be acquired; `None` accepts any id
    available: Option<HashSet<VirtualDeviceId>>,
    acquired: Mutex<HashSet<VirtualDeviceId>>,
    last_values: Mutex<HashMap<(VirtualDeviceId, String), ControlValue>>,
    /// Number of calls that changed a control
    change_count: AtomicU64,
}

impl ConsoleSink {
    /// Sink that accepts any device id
    pub fn new() -> Self {
        Self {
            available: None,
            acquired: Mutex::new(HashSet::new()),
            last_values: Mutex::new(HashMap::new()),
            change_count: AtomicU64::new(0),
        }
    }

    /// Sink that only lets the given device ids be acquired
    pub fn with_devices(devices: impl IntoIterator<Item = VirtualDeviceId>) -> Self {
        Self {
            available: Some(devices.into_iter().collect()),
            ..Self::new()
        }
    }

    pub fn change_count(&self) -> u64 {
        self.change_count.load(Ordering::Relaxed)
    }

    fn ensure_acquired(&self, id: VirtualDeviceId) -> Result<(), OutputError> {
        if self.acquired.lock().contains(&id) {
            Ok(())
        } else {
            Err(OutputError::NotAcquired(id))
        }
    }

    /// Record a value, returning true if it differs from the previous one
    fn record(&self, id: VirtualDeviceId, control: String, value: ControlValue) -> bool {
        let mut last = self.last_values.lock();
        let changed = last.get(&(id, control.clone())) != Some(&value);
        if changed {
            last.insert((id, control), value);
            self.change_count.fetch_add(1, Ordering::Relaxed);
        }
        changed
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for ConsoleSink {
    fn acquire_device(&self, id: VirtualDeviceId) -> bool {
        let allowed = self
            .available
            .as_ref()
            .map_or(true, |devices| devices.contains(&id));
        if allowed {
            self.acquired.lock().insert(id);
            info!("🔌 Virtual device {} acquired", id);
        } else {
            info!("⚠️  Virtual device {} is not available", id);
        }
        allowed
    }

    fn release_device(&self, id: VirtualDeviceId) {
        if self.acquired.lock().remove(&id) {
            info!("Virtual device {} released", id);
        }
    }

    fn reset_device(&self, id: VirtualDeviceId) {
        self.last_values.lock().retain(|(device, _), _| *device != id);
        debug!("Virtual device {} reset to neutral", id);
    }

    fn set_axis(&self, id: VirtualDeviceId, usage: AxisUsage, value: f32) -> Result<(), OutputError> {
        self.ensure_acquired(id)?;
        if self.record(id, format!("{:?}", usage), ControlValue::Axis(value)) {
            info!("🎮 vjoy{} axis {:?} = {:.3}", id, usage, value);
        }
        Ok(())
    }

    fn set_button(&self, id: VirtualDeviceId, index: usize, pressed: bool) -> Result<(), OutputError> {
        self.ensure_acquired(id)?;
        if self.record(id, format!("btn{}", index), ControlValue::Button(pressed)) {
            info!(
                "🎮 vjoy{} button {} {}",
                id,
                index,
                if pressed { "pressed" } else { "released" }
            );
        }
        Ok(())
    }

    fn set_discrete_pov(
        &self,
        id: VirtualDeviceId,
        pov: usize,
        direction: Option<u8>,
    ) -> Result<(), OutputError> {
        self.ensure_acquired(id)?;
        let value = ControlValue::Pov(direction.map(|d| f32::from(d) * 90.0));
        if self.record(id, format!("pov{}", pov), value) {
            info!("🎮 vjoy{} pov {} direction {:?}", id, pov, direction);
        }
        Ok(())
    }

    fn set_continuous_pov(
        &self,
        id: VirtualDeviceId,
        pov: usize,
        angle: Option<f32>,
    ) -> Result<(), OutputError> {
        self.ensure_acquired(id)?;
        if self.record(id, format!("pov{}", pov), ControlValue::Pov(angle)) {
            info!("🎮 vjoy{} pov {} angle {:?}", id, pov, angle);
        }
        Ok(())
    }
}

impl KeyboardOutput for ConsoleSink {
    fn set_key(&self, key: &str, pressed: bool, modifiers: &[String]) -> Result<(), OutputError> {
        self.change_count.fetch_add(1, Ordering::Relaxed);
        let combo = if modifiers.is_empty() {
            key.to_string()
        } else {
            format!("{}+{}", modifiers.join("+"), key)
        };
        info!("⌨️  {} {}", combo, if pressed { "down" } else { "up" });
        Ok(())
    }
}
