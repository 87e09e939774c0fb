//! Recording domain: duration policy and session lifecycle

pub mod policy;
pub mod session;

pub use policy::{
    format_clock, DurationPolicy, DurationSpec, DurationVerdict, RecordingTiming,
    DEFAULT_TARGET_SECONDS, DEFAULT_TOLERANCE_MS, MAX_TARGET_SECONDS,
};
pub use session::{InvalidStateTransition, RecordingLifecycle, RecordingState};
