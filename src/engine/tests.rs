use super::*;
use crate::clock::ManualClock;
use crate::input::InputSource;
use crate::output::recording::{RecordingSink, SinkCall};
use crate::output::{AxisUsage, OutputTarget};
use crate::profile::{
    AxisCurve, AxisMapping, AxisToButtonMapping, ButtonMapping, ButtonMode, ButtonToAxisMapping,
    HatMapping, MappingBase, MergeOp, ShiftLayer,
};

const STICK: &str = "stick";
const THROTTLE: &str = "throttle";

fn axis_mapping(device: &str, index: usize, target: OutputTarget) -> AxisMapping {
    AxisMapping {
        base: MappingBase::new("axis", vec![InputSource::axis(device, index)], target),
        curve: AxisCurve::linear(),
    }
}

fn button_mapping(device: &str, index: usize, target: OutputTarget, mode: ButtonMode) -> ButtonMapping {
    ButtonMapping {
        base: MappingBase::new("button", vec![InputSource::button(device, index)], target),
        mode,
        pulse_ms: 100,
        hold_ms: 300,
    }
}

fn snapshot(device: &str) -> DeviceSnapshot {
    DeviceSnapshot::new(device, device)
}

fn engine_with(sink: &Arc<RecordingSink>) -> (MappingEngine, ManualClock) {
    let clock = ManualClock::new(1_000);
    let engine = MappingEngine::new(sink.clone())
        .with_keyboard(sink.clone())
        .with_clock(Arc::new(clock.clone()));
    (engine, clock)
}

fn running(profile: MappingProfile) -> (MappingEngine, Arc<RecordingSink>, ManualClock) {
    let sink = Arc::new(RecordingSink::new());
    let (engine, clock) = engine_with(&sink);
    engine.load_profile(profile).unwrap();
    engine.start(None).unwrap();
    sink.clear();
    (engine, sink, clock)
}

#[test]
fn test_axis_end_to_end() {
    let mut profile = MappingProfile::new("e2e");
    profile
        .axis_mappings
        .push(axis_mapping("D", 0, OutputTarget::axis(7, 0)));
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot("D").with_axes(vec![0.37]));

    assert_eq!(sink.calls(), vec![SinkCall::Axis(7, AxisUsage::X, 0.37)]);
}

#[test]
fn test_start_without_profile_fails() {
    let sink = Arc::new(RecordingSink::new());
    let (engine, _clock) = engine_with(&sink);

    assert!(matches!(engine.start(None), Err(EngineError::NoProfile)));
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(sink.calls().is_empty());
}

#[test]
fn test_invalid_profile_rejected() {
    let sink = Arc::new(RecordingSink::new());
    let (engine, _clock) = engine_with(&sink);

    let mut profile = MappingProfile::new("bad");
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 0, OutputTarget::button(1, 0)));

    assert!(matches!(
        engine.load_profile(profile),
        Err(EngineError::InvalidProfile(_))
    ));
    assert_eq!(engine.state(), EngineState::Idle);
}

#[test]
fn test_acquire_failure_releases_acquired_devices() {
    let sink = Arc::new(RecordingSink::new().refusing(3));
    let (engine, _clock) = engine_with(&sink);

    let mut profile = MappingProfile::new("three devices");
    for device in [1, 2, 3] {
        profile
            .axis_mappings
            .push(axis_mapping(STICK, 0, OutputTarget::axis(device, 0)));
    }
    engine.load_profile(profile).unwrap();

    assert!(matches!(
        engine.start(None),
        Err(EngineError::AcquireFailed(3))
    ));
    assert_eq!(engine.state(), EngineState::Loaded);
    assert!(engine.acquired_devices().is_empty());

    let calls = sink.calls();
    assert!(calls.contains(&SinkCall::Release(1)));
    assert!(calls.contains(&SinkCall::Release(2)));
    assert!(!calls.contains(&SinkCall::Release(3)));
}

#[test]
fn test_start_acquires_each_device_once() {
    let sink = Arc::new(RecordingSink::new());
    let (engine, _clock) = engine_with(&sink);

    let mut profile = MappingProfile::new("shared device");
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 0, OutputTarget::axis(1, 0)));
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 1, OutputTarget::axis(1, 1)));
    profile.button_mappings.push(button_mapping(
        STICK,
        0,
        OutputTarget::key("F1", vec![]),
        ButtonMode::Normal,
    ));
    engine.load_profile(profile).unwrap();
    engine.start(None).unwrap();

    assert_eq!(sink.calls(), vec![SinkCall::Acquire(1)]);
    assert_eq!(engine.acquired_devices(), BTreeSet::from([1]));
    assert!(matches!(engine.start(None), Err(EngineError::AlreadyRunning)));
}

#[test]
fn test_stop_resets_and_releases() {
    let mut profile = MappingProfile::new("stop");
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 0, OutputTarget::axis(1, 0)));
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 1, OutputTarget::axis(2, 0)));
    let (engine, sink, _clock) = running(profile);

    engine.stop();

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Reset(1),
            SinkCall::Release(1),
            SinkCall::Reset(2),
            SinkCall::Release(2),
        ]
    );
    assert_eq!(engine.state(), EngineState::Loaded);

    // Stopped engines ignore input and a second stop is a no-op
    sink.clear();
    engine.process_input(&snapshot(STICK).with_axes(vec![0.5, 0.5]));
    engine.stop();
    assert!(sink.calls().is_empty());
}

#[test]
fn test_drop_stops_engine() {
    let mut profile = MappingProfile::new("drop");
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 0, OutputTarget::axis(4, 0)));
    let (engine, sink, _clock) = running(profile);

    drop(engine);
    assert_eq!(sink.calls(), vec![SinkCall::Reset(4), SinkCall::Release(4)]);
}

#[test]
fn test_load_rejected_while_running() {
    let (engine, _sink, _clock) = running(MappingProfile::new("first"));

    assert!(matches!(
        engine.load_profile(MappingProfile::new("second")),
        Err(EngineError::AlreadyRunning)
    ));

    engine.stop();
    engine.load_profile(MappingProfile::new("second")).unwrap();
    assert_eq!(engine.profile().unwrap().name, "second");
}

#[test]
fn test_only_mappings_reading_snapshot_device_run() {
    let mut profile = MappingProfile::new("devices");
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 0, OutputTarget::axis(1, 0)));
    profile
        .axis_mappings
        .push(axis_mapping(THROTTLE, 0, OutputTarget::axis(1, 2)));
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(THROTTLE).with_axes(vec![-0.5]));

    assert_eq!(sink.axis_calls(), vec![(1, AxisUsage::Z, -0.5)]);
}

#[test]
fn test_merge_reads_cached_devices() {
    let mut mapping = axis_mapping(STICK, 0, OutputTarget::axis(1, 0));
    mapping.base.inputs.push(InputSource::axis(THROTTLE, 0));
    mapping.base.merge = MergeOp::Maximum;

    let mut profile = MappingProfile::new("merge");
    profile.axis_mappings.push(mapping);
    let (engine, sink, _clock) = running(profile);

    // Only one source cached so far: it passes through
    engine.process_input(&snapshot(STICK).with_axes(vec![0.2]));
    assert_eq!(sink.last_axis(1, AxisUsage::X), Some(0.2));

    engine.process_input(&snapshot(THROTTLE).with_axes(vec![0.6]));
    assert_eq!(sink.last_axis(1, AxisUsage::X), Some(0.6));

    // The throttle value stays cached while the stick moves
    engine.process_input(&snapshot(STICK).with_axes(vec![0.4]));
    assert_eq!(sink.last_axis(1, AxisUsage::X), Some(0.6));
}

#[test]
fn test_missing_input_skips_mapping() {
    let mut profile = MappingProfile::new("missing");
    profile
        .axis_mappings
        .push(axis_mapping(STICK, 5, OutputTarget::axis(1, 0)));
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_axes(vec![0.1]));
    assert!(sink.calls().is_empty());
}

#[test]
fn test_disabled_mapping_skipped() {
    let mut mapping = axis_mapping(STICK, 0, OutputTarget::axis(1, 0));
    mapping.base.enabled = false;

    let mut profile = MappingProfile::new("disabled");
    profile.axis_mappings.push(mapping);
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_axes(vec![0.9]));
    assert!(sink.calls().is_empty());
}

#[test]
fn test_axis_curve_and_invert() {
    let mut mapping = axis_mapping(STICK, 0, OutputTarget::axis(1, 1));
    mapping.curve = AxisCurve::linear().with_deadzone(0.2);
    mapping.base.invert = true;

    let mut profile = MappingProfile::new("curve");
    profile.axis_mappings.push(mapping);
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_axes(vec![0.1]));
    engine.process_input(&snapshot(STICK).with_axes(vec![0.6]));

    let values: Vec<f32> = sink.axis_calls().into_iter().map(|(_, _, v)| v).collect();
    assert_eq!(values[0], 0.0);
    assert!((values[1] - -0.5).abs() < 1e-5);
}

#[test]
fn test_shift_layer_eligibility() {
    let layer = ShiftLayer {
        id: Uuid::new_v4(),
        name: "shift".to_string(),
        activator: Some(InputSource::button(STICK, 4)),
    };

    let base = button_mapping(STICK, 0, OutputTarget::button(1, 0), ButtonMode::Normal);
    let mut shifted = button_mapping(STICK, 0, OutputTarget::button(1, 10), ButtonMode::Normal);
    shifted.base.layer = Some(layer.id);

    let mut profile = MappingProfile::new("layers");
    profile.shift_layers.push(layer.clone());
    profile.button_mappings.push(base);
    profile.button_mappings.push(shifted);
    let (engine, sink, _clock) = running(profile);

    // Layer released: only the base mapping fires
    engine.process_input(&snapshot(STICK).with_buttons(vec![true, false, false, false, false]));
    assert_eq!(sink.button_calls(), vec![(1, 0, true)]);
    assert!(engine.active_layers().is_empty());

    // Layer held: only the layered mapping fires
    sink.clear();
    engine.process_input(&snapshot(STICK).with_buttons(vec![true, false, false, false, true]));
    assert_eq!(sink.button_calls(), vec![(1, 10, true)]);
    assert_eq!(engine.active_layers(), BTreeSet::from([layer.id]));
}

#[test]
fn test_last_write_wins_across_kinds() {
    // A button-to-axis mapping runs after the axis mapping on the same output
    let axis = axis_mapping(STICK, 0, OutputTarget::axis(1, 0));
    let override_axis = ButtonToAxisMapping {
        base: MappingBase::new(
            "boost",
            vec![InputSource::button(STICK, 0)],
            OutputTarget::axis(1, 0),
        ),
        pressed_value: 1.0,
        released_value: -1.0,
        smoothing_ms: 0,
    };

    let mut profile = MappingProfile::new("lww");
    profile.axis_mappings.push(axis);
    profile.button_to_axis_mappings.push(override_axis);
    let (engine, sink, _clock) = running(profile);

    engine.process_input(
        &snapshot(STICK)
            .with_axes(vec![0.3])
            .with_buttons(vec![true]),
    );

    assert_eq!(
        sink.axis_calls(),
        vec![(1, AxisUsage::X, 0.3), (1, AxisUsage::X, 1.0)]
    );
    assert_eq!(sink.last_axis(1, AxisUsage::X), Some(1.0));
}

#[test]
fn test_failing_mapping_does_not_block_others() {
    let sink = Arc::new(RecordingSink::new().failing_button(1, 0));
    let (engine, _clock) = engine_with(&sink);

    let mut profile = MappingProfile::new("failure");
    profile
        .button_mappings
        .push(button_mapping(STICK, 0, OutputTarget::button(1, 0), ButtonMode::Normal));
    profile
        .button_mappings
        .push(button_mapping(STICK, 1, OutputTarget::button(1, 1), ButtonMode::Normal));
    profile
        .axis_to_button_mappings
        .push(AxisToButtonMapping {
            base: MappingBase::new(
                "a2b",
                vec![InputSource::axis(STICK, 0)],
                OutputTarget::button(1, 2),
            ),
            threshold: 0.5,
            activate_above: true,
            hysteresis: 0.05,
        });
    engine.load_profile(profile).unwrap();
    engine.start(None).unwrap();

    engine.process_input(
        &snapshot(STICK)
            .with_axes(vec![0.9])
            .with_buttons(vec![true, true]),
    );

    assert_eq!(sink.last_button(1, 1), Some(true));
    assert_eq!(sink.last_button(1, 2), Some(true));
}

#[test]
fn test_toggle_through_engine() {
    let mut profile = MappingProfile::new("toggle");
    profile
        .button_mappings
        .push(button_mapping(STICK, 0, OutputTarget::button(1, 0), ButtonMode::Toggle));
    let (engine, sink, clock) = running(profile);

    for pressed in [true, false, true, false] {
        engine.process_input(&snapshot(STICK).with_buttons(vec![pressed]));
        clock.advance(10);
    }

    let states: Vec<bool> = sink.button_calls().into_iter().map(|(_, _, p)| p).collect();
    assert_eq!(states, vec![true, true, false, false]);
}

#[test]
fn test_hold_to_activate_uses_clock() {
    let mut profile = MappingProfile::new("hold");
    profile.button_mappings.push(button_mapping(
        STICK,
        0,
        OutputTarget::button(1, 0),
        ButtonMode::HoldToActivate,
    ));
    let (engine, sink, clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_buttons(vec![true]));
    assert_eq!(sink.last_button(1, 0), Some(false));

    clock.advance(299);
    engine.process_input(&snapshot(STICK).with_buttons(vec![true]));
    assert_eq!(sink.last_button(1, 0), Some(false));

    clock.advance(1);
    engine.process_input(&snapshot(STICK).with_buttons(vec![true]));
    assert_eq!(sink.last_button(1, 0), Some(true));
}

#[test]
fn test_button_invert() {
    let mut mapping = button_mapping(STICK, 0, OutputTarget::button(1, 0), ButtonMode::Normal);
    mapping.base.invert = true;

    let mut profile = MappingProfile::new("invert");
    profile.button_mappings.push(mapping);
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_buttons(vec![false]));
    assert_eq!(sink.last_button(1, 0), Some(true));
}

#[test]
fn test_hat_discrete_and_continuous() {
    let discrete = HatMapping {
        base: MappingBase::new("hat", vec![InputSource::hat(STICK, 0)], OutputTarget::pov(1, 0)),
        continuous: false,
    };
    let continuous = HatMapping {
        base: MappingBase::new("hat", vec![InputSource::hat(STICK, 0)], OutputTarget::pov(1, 1)),
        continuous: true,
    };

    let mut profile = MappingProfile::new("hats");
    profile.hat_mappings.push(discrete);
    profile.hat_mappings.push(continuous);
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_hats(vec![Some(90.0)]));
    engine.process_input(&snapshot(STICK).with_hats(vec![None]));

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::DiscretePov(1, 0, Some(1)),
            SinkCall::ContinuousPov(1, 1, Some(90.0)),
            SinkCall::DiscretePov(1, 0, None),
            SinkCall::ContinuousPov(1, 1, None),
        ]
    );
}

#[test]
fn test_keyboard_keys_sent_on_change_only() {
    let mut profile = MappingProfile::new("keys");
    profile.button_mappings.push(button_mapping(
        STICK,
        0,
        OutputTarget::key("F1", vec!["LCtrl".to_string()]),
        ButtonMode::Normal,
    ));
    let (engine, sink, _clock) = running(profile);

    for pressed in [false, true, true, true, false, false] {
        engine.process_input(&snapshot(STICK).with_buttons(vec![pressed]));
    }

    let ctrl = vec!["LCtrl".to_string()];
    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Key("F1".to_string(), true, ctrl.clone()),
            SinkCall::Key("F1".to_string(), false, ctrl),
        ]
    );
}

#[test]
fn test_stop_releases_held_keys() {
    let mut profile = MappingProfile::new("held key");
    profile.button_mappings.push(button_mapping(
        STICK,
        0,
        OutputTarget::key("Space", vec![]),
        ButtonMode::Normal,
    ));
    let (engine, sink, _clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_buttons(vec![true]));
    engine.stop();

    assert_eq!(
        sink.calls(),
        vec![
            SinkCall::Key("Space".to_string(), true, vec![]),
            SinkCall::Key("Space".to_string(), false, vec![]),
        ]
    );
}

#[test]
fn test_button_to_axis_smoothing_through_engine() {
    let mut profile = MappingProfile::new("smooth");
    profile.button_to_axis_mappings.push(ButtonToAxisMapping {
        base: MappingBase::new(
            "brake",
            vec![InputSource::button(STICK, 0)],
            OutputTarget::axis(1, 6),
        ),
        pressed_value: 1.0,
        released_value: 0.0,
        smoothing_ms: 100,
    });
    let (engine, sink, clock) = running(profile);

    engine.process_input(&snapshot(STICK).with_buttons(vec![false]));
    clock.advance(50);
    engine.process_input(&snapshot(STICK).with_buttons(vec![true]));
    let half = sink.last_axis(1, AxisUsage::Slider).unwrap();
    assert!((half - 0.5).abs() < 1e-5);

    clock.advance(50);
    engine.process_input(&snapshot(STICK).with_buttons(vec![true]));
    assert_eq!(sink.last_axis(1, AxisUsage::Slider), Some(1.0));
}

#[test]
fn test_initial_sync_matches_hardware() {
    let sink = Arc::new(RecordingSink::new());
    let (engine, _clock) = engine_with(&sink);

    let mut profile = MappingProfile::new("sync");
    profile
        .axis_mappings
        .push(axis_mapping(THROTTLE, 0, OutputTarget::axis(1, 2)));
    profile
        .button_mappings
        .push(button_mapping(STICK, 0, OutputTarget::button(1, 0), ButtonMode::Toggle));
    profile
        .button_mappings
        .push(button_mapping(STICK, 1, OutputTarget::button(1, 1), ButtonMode::Normal));
    profile.button_to_axis_mappings.push(ButtonToAxisMapping {
        base: MappingBase::new(
            "b2a",
            vec![InputSource::button(STICK, 1)],
            OutputTarget::axis(1, 3),
        ),
        pressed_value: 1.0,
        released_value: -1.0,
        smoothing_ms: 500,
    });
    engine.load_profile(profile).unwrap();

    let initial = [
        snapshot(STICK).with_buttons(vec![true, true]),
        snapshot(THROTTLE).with_axes(vec![-0.8]),
    ];
    engine.start(Some(&initial)).unwrap();

    assert_eq!(sink.last_axis(1, AxisUsage::Z), Some(-0.8));
    // A toggle held at start does not flip
    assert_eq!(sink.last_button(1, 0), Some(false));
    assert_eq!(sink.last_button(1, 1), Some(true));
    // Smoothing starts at the target, not at rest
    assert_eq!(sink.last_axis(1, AxisUsage::Rx), Some(1.0));

    // Still held: no rising edge for the toggle
    engine.process_input(&snapshot(STICK).with_buttons(vec![true, true]));
    assert_eq!(sink.last_button(1, 0), Some(false));
}
