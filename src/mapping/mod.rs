//! Per-tick value transforms used by the engine
//!
//! Everything here is pure or owns only its own small state, so each piece can
//! be tested without an engine or a sink.

pub mod button_mode;
pub mod convert;
pub mod curve;
pub mod hat;
pub mod layers;
pub mod merge;

pub use button_mode::ButtonState;
pub use convert::{HysteresisState, SmoothingState};
pub use layers::ShiftLayerManager;
