//! Resting-state statistics gathered during warmup

use std::collections::BTreeSet;

use crate::input::DeviceSnapshot;

/// Rest statistics of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBaseline {
    pub mean: f32,
    pub std_dev: f32,
    /// Excluded from detection for the whole session
    pub noisy: bool,
}

impl AxisBaseline {
    /// Population mean and standard deviation of `samples`
    pub fn from_samples(samples: &[f32], noisy_std_dev: f32) -> Self {
        if samples.is_empty() {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                noisy: false,
            };
        }

        let n = samples.len() as f32;
        let mean = samples.iter().sum::<f32>() / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let std_dev = variance.sqrt();

        Self {
            mean,
            std_dev,
            noisy: std_dev > noisy_std_dev,
        }
    }
}

/// Samples collected while a device warms up
#[derive(Debug, Default)]
pub(crate) struct WarmupSamples {
    /// Values per axis index
    axes: Vec<Vec<f32>>,
    /// Buttons seen pressed in any sample
    pressed_buttons: BTreeSet<usize>,
    /// Hats seen off-center in any sample
    active_hats: BTreeSet<usize>,
    count: u32,
}

impl WarmupSamples {
    pub fn push(&mut self, snapshot: &DeviceSnapshot) {
        if self.axes.len() < snapshot.axes.len() {
            self.axes.resize_with(snapshot.axes.len(), Vec::new);
        }
        for (samples, &value) in self.axes.iter_mut().zip(&snapshot.axes) {
            samples.push(value);
        }

        self.pressed_buttons.extend(
            snapshot
                .buttons
                .iter()
                .enumerate()
                .filter(|(_, &pressed)| pressed)
                .map(|(i, _)| i),
        );
        self.active_hats.extend(
            snapshot
                .hats
                .iter()
                .enumerate()
                .filter(|(_, hat)| hat.is_some())
                .map(|(i, _)| i),
        );

        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn finish(self, noisy_std_dev: f32) -> DeviceBaseline {
        DeviceBaseline {
            axes: self
                .axes
                .iter()
                .map(|samples| AxisBaseline::from_samples(samples, noisy_std_dev))
                .collect(),
            ignored_buttons: self.pressed_buttons,
            ignored_hats: self.active_hats,
        }
    }
}

/// Everything detection needs to know about a device at rest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceBaseline {
    pub axes: Vec<AxisBaseline>,
    /// Buttons already pressed at baseline time; never reported
    pub ignored_buttons: BTreeSet<usize>,
    /// Hats already off-center at baseline time; never reported
    pub ignored_hats: BTreeSet<usize>,
}

impl DeviceBaseline {
    pub fn noisy_axes(&self) -> impl Iterator<Item = (usize, &AxisBaseline)> {
        self.axes.iter().enumerate().filter(|(_, a)| a.noisy)
    }
}
