//! Joymap - real-time controller remapping
//!
//! Turns periodic snapshots of physical controllers (sticks, throttles, pedals,
//! gamepads) into virtual joystick and keyboard output, and detects which
//! control a user actuates when creating a binding.
//!
//! Main pieces:
//! - [`engine::MappingEngine`]: lifecycle and per-snapshot dispatch
//! - [`mapping`]: curves, merges, button modes, conversions, shift layers
//! - [`calibration::InputCalibrationService`]: single-input detection
//! - [`profile`]: mapping profile model, validation and YAML store

pub mod calibration;
pub mod clock;
pub mod config;
pub mod engine;
pub mod input;
pub mod mapping;
pub mod output;
pub mod profile;
pub mod replay;

pub use calibration::{DetectedInput, InputCalibrationService, InputFilter};
pub use engine::{EngineError, EngineState, MappingEngine};
pub use input::{DeviceSnapshot, InputKind, InputSource};
pub use output::{KeyboardOutput, OutputSink, OutputTarget};
pub use profile::MappingProfile;
