//! Recording sink used by the engine tests

use parking_lot::Mutex;
use std::collections::HashSet;

use super::{AxisUsage, KeyboardOutput, OutputError, OutputSink, VirtualDeviceId};

/// One call made against the sink
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkCall {
    Acquire(VirtualDeviceId),
    Release(VirtualDeviceId),
    Reset(VirtualDeviceId),
    Axis(VirtualDeviceId, AxisUsage, f32),
    Button(VirtualDeviceId, usize, bool),
    DiscretePov(VirtualDeviceId, usize, Option<u8>),
    ContinuousPov(VirtualDeviceId, usize, Option<f32>),
    Key(String, bool, Vec<String>),
}

/// Sink that records every call and can be told to refuse devices or fail writes
#[derive(Default)]
pub(crate) struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
    refuse: HashSet<VirtualDeviceId>,
    failing_buttons: HashSet<(VirtualDeviceId, usize)>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Refuse acquisition of `id`
    pub(crate) fn refusing(mut self, id: VirtualDeviceId) -> Self {
        self.refuse.insert(id);
        self
    }

    /// Fail every write to button `index` of device `id`
    pub(crate) fn failing_button(mut self, id: VirtualDeviceId, index: usize) -> Self {
        self.failing_buttons.insert((id, index));
        self
    }

    pub(crate) fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Axis writes only
    pub(crate) fn axis_calls(&self) -> Vec<(VirtualDeviceId, AxisUsage, f32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Axis(id, usage, value) => Some((id, usage, value)),
                _ => None,
            })
            .collect()
    }

    /// Button writes only
    pub(crate) fn button_calls(&self) -> Vec<(VirtualDeviceId, usize, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Button(id, index, pressed) => Some((id, index, pressed)),
                _ => None,
            })
            .collect()
    }

    /// Last value written to an axis
    pub(crate) fn last_axis(&self, id: VirtualDeviceId, usage: AxisUsage) -> Option<f32> {
        self.axis_calls()
            .into_iter()
            .rev()
            .find(|(d, u, _)| *d == id && *u == usage)
            .map(|(_, _, v)| v)
    }

    /// Last state written to a button
    pub(crate) fn last_button(&self, id: VirtualDeviceId, index: usize) -> Option<bool> {
        self.button_calls()
            .into_iter()
            .rev()
            .find(|(d, i, _)| *d == id && *i == index)
            .map(|(_, _, p)| p)
    }

    fn push(&self, call: SinkCall) {
        self.calls.lock().push(call);
    }
}

impl OutputSink for RecordingSink {
    fn acquire_device(&self, id: VirtualDeviceId) -> bool {
        self.push(SinkCall::Acquire(id));
        !self.refuse.contains(&id)
    }

    fn release_device(&self, id: VirtualDeviceId) {
        self.push(SinkCall::Release(id));
    }

    fn reset_device(&self, id: VirtualDeviceId) {
        self.push(SinkCall::Reset(id));
    }

    fn set_axis(&self, id: VirtualDeviceId, usage: AxisUsage, value: f32) -> Result<(), OutputError> {
        self.push(SinkCall::Axis(id, usage, value));
        Ok(())
    }

    fn set_button(&self, id: VirtualDeviceId, index: usize, pressed: bool) -> Result<(), OutputError> {
        self.push(SinkCall::Button(id, index, pressed));
        if self.failing_buttons.contains(&(id, index)) {
            return Err(OutputError::Driver(format!("button {} rejected", index)));
        }
        Ok(())
    }

    fn set_discrete_pov(
        &self,
        id: VirtualDeviceId,
        pov: usize,
        direction: Option<u8>,
    ) -> Result<(), OutputError> {
        self.push(SinkCall::DiscretePov(id, pov, direction));
        Ok(())
    }

    fn set_continuous_pov(
        &self,
        id: VirtualDeviceId,
        pov: usize,
        angle: Option<f32>,
    ) -> Result<(), OutputError> {
        self.push(SinkCall::ContinuousPov(id, pov, angle));
        Ok(())
    }
}

impl KeyboardOutput for RecordingSink {
    fn set_key(&self, key: &str, pressed: bool, modifiers: &[String]) -> Result<(), OutputError> {
        self.push(SinkCall::Key(key.to_string(), pressed, modifiers.to_vec()));
        Ok(())
    }
}
