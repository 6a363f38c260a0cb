//! One "press the control you want to bind" session
//!
//! Each device goes through its own phases:
//! 1. Settle: the first ticks are discarded while the hardware debounces
//! 2. Warmup: ticks are collected into a resting baseline
//! 3. Active: controls are compared against the baseline and the previous tick
//!
//! Detection order within a tick is buttons, then axes, then hats.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::baseline::{DeviceBaseline, WarmupSamples};
use super::{CalibrationConfig, DetectedInput, InputFilter};
use crate::input::{DeviceSnapshot, InputSource};

#[derive(Debug)]
enum Phase {
    Settle { remaining: u32 },
    Warmup(WarmupSamples),
    Active(ActiveDetection),
}

#[derive(Debug)]
struct ActiveDetection {
    baseline: DeviceBaseline,
    prev_buttons: Vec<bool>,
    prev_hats: Vec<Option<f32>>,
    /// Consecutive ticks each axis has been past the detection threshold
    confirmations: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct Session {
    config: CalibrationConfig,
    filter: InputFilter,
    threshold: f32,
    devices: HashMap<String, Phase>,
}

impl Session {
    pub fn new(config: CalibrationConfig, filter: InputFilter, threshold: f32) -> Self {
        Self {
            config,
            filter,
            threshold,
            devices: HashMap::new(),
        }
    }

    /// Feed one snapshot
    ///
    /// # Returns
    /// The detected input, once one is confirmed
    pub fn feed(&mut self, snapshot: &DeviceSnapshot) -> Option<DetectedInput> {
        let config = &self.config;
        let phase = self
            .devices
            .entry(snapshot.device_id.clone())
            .or_insert_with(|| initial_phase(config));

        let next = match phase {
            Phase::Settle { remaining } => {
                *remaining = remaining.saturating_sub(1);
                if *remaining > 0 {
                    return None;
                }
                Phase::Warmup(WarmupSamples::default())
            }
            Phase::Warmup(samples) => {
                samples.push(snapshot);
                if samples.count() < config.warmup_ticks.max(1) {
                    return None;
                }
                let baseline = std::mem::take(samples).finish(config.noisy_std_dev);
                report_baseline(snapshot, &baseline);
                Phase::Active(ActiveDetection {
                    baseline,
                    prev_buttons: snapshot.buttons.clone(),
                    prev_hats: snapshot.hats.clone(),
                    confirmations: vec![0; snapshot.axes.len()],
                })
            }
            Phase::Active(active) => {
                return active.detect(snapshot, config, self.filter, self.threshold);
            }
        };

        *phase = next;
        None
    }
}

fn initial_phase(config: &CalibrationConfig) -> Phase {
    if config.settle_ticks > 0 {
        Phase::Settle {
            remaining: config.settle_ticks,
        }
    } else {
        Phase::Warmup(WarmupSamples::default())
    }
}

fn report_baseline(snapshot: &DeviceSnapshot, baseline: &DeviceBaseline) {
    for (index, axis) in baseline.noisy_axes() {
        warn!(
            "Axis {} on '{}' is noisy at rest (σ = {:.3}), ignoring it for this session",
            index, snapshot.name, axis.std_dev
        );
    }
    if !baseline.ignored_buttons.is_empty() {
        debug!(
            "Buttons {:?} on '{}' were pressed during warmup, ignoring them",
            baseline.ignored_buttons, snapshot.name
        );
    }
    if !baseline.ignored_hats.is_empty() {
        debug!(
            "Hats {:?} on '{}' were off-center during warmup, ignoring them",
            baseline.ignored_hats, snapshot.name
        );
    }
    debug!("Baseline ready for '{}'", snapshot.name);
}

impl ActiveDetection {
    fn detect(
        &mut self,
        snapshot: &DeviceSnapshot,
        config: &CalibrationConfig,
        filter: InputFilter,
        threshold: f32,
    ) -> Option<DetectedInput> {
        let mut found = None;
        if filter.buttons {
            found = self.detect_button(snapshot);
        }
        if found.is_none() && filter.axes {
            found = self.detect_axis(snapshot, config, threshold);
        }
        if found.is_none() && filter.hats {
            found = self.detect_hat(snapshot);
        }

        self.prev_buttons.clone_from(&snapshot.buttons);
        self.prev_hats.clone_from(&snapshot.hats);
        found
    }

    /// Rising edge on a button that was released at baseline time
    fn detect_button(&self, snapshot: &DeviceSnapshot) -> Option<DetectedInput> {
        snapshot
            .buttons
            .iter()
            .enumerate()
            .find(|&(index, &pressed)| {
                let was_pressed = self.prev_buttons.get(index).copied().unwrap_or(false);
                pressed && !was_pressed && !self.baseline.ignored_buttons.contains(&index)
            })
            .map(|(index, _)| {
                DetectedInput::new(snapshot, InputSource::button(&snapshot.device_id, index), 1.0)
            })
    }

    /// Sustained deviation of a quiet axis from its resting mean
    fn detect_axis(
        &mut self,
        snapshot: &DeviceSnapshot,
        config: &CalibrationConfig,
        threshold: f32,
    ) -> Option<DetectedInput> {
        if self.confirmations.len() < snapshot.axes.len() {
            self.confirmations.resize(snapshot.axes.len(), 0);
        }

        let mut found = None;
        for (index, &value) in snapshot.axes.iter().enumerate() {
            // Axes that appeared after warmup have no baseline
            let Some(axis) = self.baseline.axes.get(index) else {
                continue;
            };
            if axis.noisy {
                continue;
            }

            let deviation = (value - axis.mean).abs();
            let count = &mut self.confirmations[index];
            if deviation > threshold {
                *count += 1;
            } else if deviation < config.jitter_threshold {
                *count = 0;
            }

            if found.is_none() && *count >= config.confirm_ticks.max(1) {
                found = Some(DetectedInput::new(
                    snapshot,
                    InputSource::axis(&snapshot.device_id, index),
                    value,
                ));
            }
        }
        found
    }

    /// Transition from centered to any direction
    fn detect_hat(&self, snapshot: &DeviceSnapshot) -> Option<DetectedInput> {
        snapshot
            .hats
            .iter()
            .enumerate()
            .find(|&(index, hat)| {
                let was_centered = self.prev_hats.get(index).copied().flatten().is_none();
                hat.is_some() && was_centered && !self.baseline.ignored_hats.contains(&index)
            })
            .and_then(|(index, hat)| {
                hat.map(|angle| {
                    DetectedInput::new(snapshot, InputSource::hat(&snapshot.device_id, index), angle)
                })
            })
    }
}
