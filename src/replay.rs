//! Recorded snapshot streams
//!
//! Stands in for a live device poller: a recording is a YAML list of
//! [`DeviceSnapshot`]s, played back one per tick at a fixed rate.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::input::DeviceSnapshot;

/// Snapshots in playback order
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub frames: Vec<DeviceSnapshot>,
}

impl Recording {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read recording: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse recording: {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let frames: Vec<DeviceSnapshot> = serde_yaml::from_str(contents)?;
        Ok(Self { frames })
    }

    /// First snapshot of every device, used for initial synchronization
    pub fn initial_state(&self) -> Vec<DeviceSnapshot> {
        let mut first: BTreeMap<&str, &DeviceSnapshot> = BTreeMap::new();
        for frame in &self.frames {
            first.entry(frame.device_id.as_str()).or_insert(frame);
        }
        first.into_values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Play a recording at `rate_hz`, calling `on_frame` once per tick
///
/// # Returns
/// Number of frames delivered before the end or cancellation
pub async fn play(
    recording: &Recording,
    rate_hz: u32,
    cancel: CancellationToken,
    mut on_frame: impl FnMut(&DeviceSnapshot),
) -> usize {
    let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1)));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("▶️  Replaying {} frames at {} Hz", recording.len(), rate_hz);

    let mut delivered = 0;
    for frame in &recording.frames {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Replay cancelled after {} frames", delivered);
                break;
            }
            _ = interval.tick() => {}
        }
        on_frame(frame);
        delivered += 1;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORDING: &str = r#"
- device_id: stick
  name: Stick
  axes: [0.0, 0.1]
  buttons: [false]
- device_id: throttle
  name: Throttle
  axes: [-1.0]
- device_id: stick
  name: Stick
  axes: [0.5, 0.1]
  buttons: [true]
  hats: [90.0, null]
"#;

    #[test]
    fn test_parse_and_initial_state() {
        let recording = Recording::from_yaml(RECORDING).unwrap();
        assert_eq!(recording.len(), 3);
        assert_eq!(recording.frames[2].hats, vec![Some(90.0), None]);

        let initial = recording.initial_state();
        assert_eq!(initial.len(), 2);
        assert_eq!(initial[0].device_id, "stick");
        assert_eq!(initial[0].axes, vec![0.0, 0.1]);
        assert_eq!(initial[1].device_id, "throttle");
    }

    #[tokio::test]
    async fn test_play_delivers_every_frame() {
        let recording = Recording::from_yaml(RECORDING).unwrap();
        let mut seen = Vec::new();

        let delivered = play(&recording, 1000, CancellationToken::new(), |frame| {
            seen.push(frame.device_id.clone())
        })
        .await;

        assert_eq!(delivered, 3);
        assert_eq!(seen, vec!["stick", "throttle", "stick"]);
    }

    #[tokio::test]
    async fn test_play_stops_on_cancel() {
        let recording = Recording::from_yaml(RECORDING).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let delivered = play(&recording, 1000, cancel, |_| {}).await;
        assert_eq!(delivered, 0);
    }
}
