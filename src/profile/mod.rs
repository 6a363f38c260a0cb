//! Mapping profiles: data model, validation and YAML store

pub mod store;
pub mod types;
pub mod validate;

pub use types::{
    AxisCurve, AxisMapping, AxisToButtonMapping, ButtonMapping, ButtonMode, ButtonToAxisMapping,
    CurveKind, DeadzoneBounds, HatMapping, MappingBase, MappingProfile, MergeOp, ShiftLayer,
};
pub use validate::ProfileError;
