//! Input calibration - detect the one control a user actuates while binding
//!
//! A session ignores everything that is already "on" when it starts, rejects
//! axes that jitter at rest, and requires axis movement to persist for a few
//! ticks before reporting it.
//!
//! The service is fed by the same poller as the engine (`deliver`) and
//! resolved through a oneshot channel, so the waiting side can be cancelled or
//! time out between any two ticks.

mod baseline;
mod session;


use anyhow::{bail, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use baseline::{AxisBaseline, DeviceBaseline};

use crate::input::{DeviceSnapshot, InputKind, InputSource};
use session::Session;

/// Detection tuning
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CalibrationConfig {
    /// Ticks discarded per device before warmup
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u32,
    /// Ticks per device used to build the resting baseline
    #[serde(default = "default_warmup_ticks")]
    pub warmup_ticks: u32,
    /// Resting standard deviation above which an axis is ignored
    #[serde(default = "default_noisy_std_dev")]
    pub noisy_std_dev: f32,
    /// Consecutive ticks an axis must stay past the threshold
    #[serde(default = "default_confirm_ticks")]
    pub confirm_ticks: u32,
    /// Deviation below which an axis counts as back at rest
    #[serde(default = "default_jitter_threshold")]
    pub jitter_threshold: f32,
    /// Axis deviation used when the caller does not pass one
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            settle_ticks: default_settle_ticks(),
            warmup_ticks: default_warmup_ticks(),
            noisy_std_dev: default_noisy_std_dev(),
            confirm_ticks: default_confirm_ticks(),
            jitter_threshold: default_jitter_threshold(),
            detection_threshold: default_detection_threshold(),
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.warmup_ticks == 0 {
            bail!("calibration.warmup_ticks must be at least 1");
        }
        if self.confirm_ticks == 0 {
            bail!("calibration.confirm_ticks must be at least 1");
        }
        if !(self.noisy_std_dev > 0.0) {
            bail!("calibration.noisy_std_dev must be positive");
        }
        if !(self.jitter_threshold >= 0.0) {
            bail!("calibration.jitter_threshold must not be negative");
        }
        if !(self.detection_threshold > self.jitter_threshold && self.detection_threshold <= 2.0) {
            bail!(
                "calibration.detection_threshold must be above jitter_threshold ({}) and at most 2.0, got {}",
                self.jitter_threshold,
                self.detection_threshold
            );
        }
        Ok(())
    }
}

fn default_settle_ticks() -> u32 { 5 }
fn default_warmup_ticks() -> u32 { 20 }
fn default_noisy_std_dev() -> f32 { 0.05 }
fn default_confirm_ticks() -> u32 { 3 }
fn default_jitter_threshold() -> f32 { 0.05 }
fn default_detection_threshold() -> f32 { 0.5 }

/// Which kinds of control a session may report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFilter {
    pub axes: bool,
    pub buttons: bool,
    pub hats: bool,
}

impl InputFilter {
    pub const ALL: Self = Self { axes: true, buttons: true, hats: true };
    pub const AXES: Self = Self { axes: true, buttons: false, hats: false };
    pub const BUTTONS: Self = Self { axes: false, buttons: true, hats: false };
    pub const HATS: Self = Self { axes: false, buttons: false, hats: true };

    pub fn accepts(&self, kind: InputKind) -> bool {
        match kind {
            InputKind::Axis => self.axes,
            InputKind::Button => self.buttons,
            InputKind::Hat => self.hats,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.axes || self.buttons || self.hats)
    }
}

impl Default for InputFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for InputFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            axes: self.axes || rhs.axes,
            buttons: self.buttons || rhs.buttons,
            hats: self.hats || rhs.hats,
        }
    }
}

/// Result of a calibration session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedInput {
    pub source: InputSource,
    pub device_name: String,
    /// Axis value, 1.0 for a button, angle in degrees for a hat
    pub value: f32,
    pub timestamp_ms: u64,
}

impl DetectedInput {
    fn new(snapshot: &DeviceSnapshot, source: InputSource, value: f32) -> Self {
        Self {
            source,
            device_name: snapshot.name.clone(),
            value,
            timestamp_ms: snapshot.timestamp_ms,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CalibrationError {
    #[error("A calibration session is already waiting for input")]
    SessionActive,

    #[error("Detection threshold must be in (0, 2], got {0}")]
    InvalidThreshold(f32),

    #[error("Input filter accepts no control kind")]
    EmptyFilter,
}

struct Pending {
    id: u64,
    session: Session,
    tx: oneshot::Sender<DetectedInput>,
}

#[derive(Default)]
struct ServiceState {
    next_id: u64,
    pending: Option<Pending>,
}

/// Single-session input detector
pub struct InputCalibrationService {
    config: CalibrationConfig,
    state: Mutex<ServiceState>,
}

impl InputCalibrationService {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: Mutex::new(ServiceState::default()),
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// True while a session is waiting for input
    pub fn is_active(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    /// Feed one snapshot to the pending session, if any
    ///
    /// Snapshots arriving with no session pending, or after the session has
    /// resolved, are ignored.
    pub fn deliver(&self, snapshot: &DeviceSnapshot) {
        let mut state = self.state.lock();
        let Some(pending) = state.pending.as_mut() else {
            return;
        };
        let Some(detected) = pending.session.feed(snapshot) else {
            return;
        };

        if let Some(pending) = state.pending.take() {
            info!("🎯 Detected {} on '{}'", detected.source, detected.device_name);
            // The waiter may already be gone
            let _ = pending.tx.send(detected);
        }
    }

    /// Start a session and wait until one control is actuated
    ///
    /// # Arguments
    /// * `filter` - Control kinds that may be reported
    /// * `threshold` - Axis deviation from rest needed to count as movement
    /// * `timeout` - Give up after this long; `None` waits indefinitely
    /// * `cancel` - Token that ends the wait early
    ///
    /// # Returns
    /// `Ok(None)` on timeout or cancellation
    pub async fn wait_for_input(
        &self,
        filter: InputFilter,
        threshold: f32,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<Option<DetectedInput>, CalibrationError> {
        if !(threshold > 0.0 && threshold <= 2.0) {
            return Err(CalibrationError::InvalidThreshold(threshold));
        }
        if filter.is_empty() {
            return Err(CalibrationError::EmptyFilter);
        }

        let (id, rx) = {
            let mut state = self.state.lock();
            if state.pending.is_some() {
                return Err(CalibrationError::SessionActive);
            }
            let (tx, rx) = oneshot::channel();
            let id = state.next_id;
            state.next_id += 1;
            state.pending = Some(Pending {
                id,
                session: Session::new(self.config.clone(), filter, threshold),
                tx,
            });
            (id, rx)
        };
        // Clears the slot however this future ends, including when dropped
        let _guard = SessionGuard { service: self, id };

        info!("👂 Waiting for input ({:?}, threshold {:.2})", filter, threshold);

        let expired = async {
            match timeout {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };

        let result = tokio::select! {
            detected = rx => detected.ok(),
            _ = cancel.cancelled() => {
                debug!("Calibration cancelled by caller");
                None
            }
            _ = expired => {
                debug!("Calibration timed out");
                None
            }
        };

        Ok(result)
    }

    /// Abort the pending session; its waiter resolves to `None`
    pub fn cancel(&self) {
        if self.state.lock().pending.take().is_some() {
            info!("Calibration session cancelled");
        }
    }
}

struct SessionGuard<'a> {
    service: &'a InputCalibrationService,
    id: u64,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.service.state.lock();
        if state.pending.as_ref().map(|p| p.id) == Some(self.id) {
            state.pending = None;
        }
    }
}
