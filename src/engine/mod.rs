//! Mapping engine - lifecycle and per-snapshot orchestration
//!
//! The engine manages:
//! - Profile attachment and validation
//! - Virtual device acquisition, reset and release
//! - Initial synchronization with current hardware
//! - Dispatch of each snapshot through the profile's mappings
//!
//! Lifecycle: `Idle → Loaded → Running → Loaded`. Every entry point takes one
//! internal lock for the duration of the call, so the poller thread and a
//! control thread can call in concurrently. No call blocks on I/O.

mod dispatch;
mod runtime;

#[cfg(test)]
mod tests;

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::input::DeviceSnapshot;
use crate::output::{KeyboardOutput, OutputSink, VirtualDeviceId};
use crate::profile::{MappingProfile, ProfileError};
use dispatch::Dispatcher;
use runtime::RuntimeState;

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No profile attached
    Idle,
    /// Profile attached, not processing input
    Loaded,
    /// Devices acquired, processing input
    Running,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Loaded => write!(f, "loaded"),
            EngineState::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No profile loaded")]
    NoProfile,

    #[error("Failed to acquire virtual device {0}")]
    AcquireFailed(VirtualDeviceId),

    #[error("Engine is running; stop it first")]
    AlreadyRunning,

    #[error("Invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),
}

struct EngineInner {
    state: EngineState,
    profile: Option<Arc<MappingProfile>>,
    runtime: RuntimeState,
}

/// Real-time remapping engine
pub struct MappingEngine {
    inner: Mutex<EngineInner>,
    sink: Arc<dyn OutputSink>,
    keyboard: Option<Arc<dyn KeyboardOutput>>,
    clock: Arc<dyn Clock>,
}

impl MappingEngine {
    /// Create an idle engine writing to `sink`
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            inner: Mutex::new(EngineInner {
                state: EngineState::Idle,
                profile: None,
                runtime: RuntimeState::default(),
            }),
            sink,
            keyboard: None,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Route keyboard-key outputs to `keyboard`
    pub fn with_keyboard(mut self, keyboard: Arc<dyn KeyboardOutput>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Replace the time source used by pulse, hold and smoothing
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate and attach a profile
    ///
    /// Profiles cannot change mid-run: stop, load, then start again.
    pub fn load_profile(&self, profile: impl Into<Arc<MappingProfile>>) -> Result<(), EngineError> {
        let profile = profile.into();
        let mut inner = self.inner.lock();

        if inner.state == EngineState::Running {
            return Err(EngineError::AlreadyRunning);
        }
        profile.validate()?;

        info!(
            "📋 Loaded profile '{}' ({} mappings, {} shift layers)",
            profile.name,
            profile.mapping_count(),
            profile.shift_layers.len()
        );
        inner.profile = Some(profile);
        inner.state = EngineState::Loaded;
        Ok(())
    }

    /// Acquire every referenced virtual device and start processing input
    ///
    /// If any device cannot be acquired, the ones already acquired are released
    /// again and the engine stays `Loaded`.
    ///
    /// # Arguments
    /// * `initial` - Current state of the physical devices. When given, all
    ///   outputs are driven to match it right away (no toggles or pulses fire).
    pub fn start(&self, initial: Option<&[DeviceSnapshot]>) -> Result<(), EngineError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state == EngineState::Running {
            return Err(EngineError::AlreadyRunning);
        }
        let profile = inner.profile.clone().ok_or(EngineError::NoProfile)?;

        let mut runtime = RuntimeState::new(&profile);
        for id in profile.virtual_devices() {
            if self.sink.acquire_device(id) {
                debug!("Acquired virtual device {}", id);
                runtime.acquired.insert(id);
                continue;
            }

            warn!("❌ Failed to acquire virtual device {}", id);
            for acquired in runtime.acquired.iter().rev() {
                self.sink.release_device(*acquired);
            }
            return Err(EngineError::AcquireFailed(id));
        }

        inner.runtime = runtime;

        if let Some(snapshots) = initial {
            for snapshot in snapshots {
                inner.runtime.cache.update(snapshot);
                inner.runtime.layers.update(snapshot);
            }
            let stats = Dispatcher {
                profile: &profile,
                runtime: &mut inner.runtime,
                sink: self.sink.as_ref(),
                keyboard: self.keyboard.as_deref(),
                now_ms: self.clock.now_ms(),
                sync: true,
            }
            .run(None);
            debug!(
                "Initial sync from {} devices: {} outputs written, {} failed",
                snapshots.len(),
                stats.written,
                stats.failed
            );
        }

        inner.state = EngineState::Running;
        info!(
            "▶️  Engine started with profile '{}' on {} virtual devices",
            profile.name,
            inner.runtime.acquired.len()
        );
        Ok(())
    }

    /// Reset and release every acquired device
    ///
    /// Keys still held by a mapping are released first. Never fails; driver
    /// errors are logged.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state != EngineState::Running {
            return;
        }

        let runtime = std::mem::take(&mut inner.runtime);

        if let Some(keyboard) = &self.keyboard {
            for held in runtime.held_keys.values() {
                if let Err(e) = keyboard.set_key(&held.key, false, &held.modifiers) {
                    warn!("Failed to release key {}: {}", held.key, e);
                }
            }
        }

        for id in &runtime.acquired {
            self.sink.reset_device(*id);
            self.sink.release_device(*id);
        }

        inner.state = EngineState::Loaded;
        info!("⏹️  Engine stopped ({} virtual devices released)", runtime.acquired.len());
    }

    /// Feed one device snapshot through the mappings
    ///
    /// Ignored unless the engine is running.
    pub fn process_input(&self, snapshot: &DeviceSnapshot) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state != EngineState::Running {
            return;
        }
        let Some(profile) = inner.profile.as_deref() else {
            return;
        };

        inner.runtime.cache.update(snapshot);
        inner.runtime.layers.update(snapshot);

        let stats = Dispatcher {
            profile,
            runtime: &mut inner.runtime,
            sink: self.sink.as_ref(),
            keyboard: self.keyboard.as_deref(),
            now_ms: self.clock.now_ms(),
            sync: false,
        }
        .run(Some(&snapshot.device_id));

        if stats.failed > 0 {
            debug!(
                "Snapshot from '{}': {} outputs written, {} failed",
                snapshot.device_id, stats.written, stats.failed
            );
        }
    }

    pub fn state(&self) -> EngineState {
        self.inner.lock().state
    }

    /// Currently attached profile
    pub fn profile(&self) -> Option<Arc<MappingProfile>> {
        self.inner.lock().profile.clone()
    }

    /// Ids of the shift layers currently held
    pub fn active_layers(&self) -> BTreeSet<Uuid> {
        self.inner.lock().runtime.layers.active_layers()
    }

    /// Virtual devices held by the running engine
    pub fn acquired_devices(&self) -> BTreeSet<VirtualDeviceId> {
        self.inner.lock().runtime.acquired.clone()
    }
}

impl Drop for MappingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
