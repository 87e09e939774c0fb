//! Application layer - Use cases and port interfaces
//!
//! Contains the recording and conversion workflows and the trait
//! definitions for external system interactions.

pub mod attempt;
pub mod availability;
pub mod capture_timer;
pub mod conversion;
pub mod phrase_recorder;
pub mod ports;
pub mod recorder_session;

// Re-export use cases
pub use attempt::{
    AttemptCallbacks, AttemptError, AttemptInput, AttemptOutput, PracticeAttemptUseCase,
};
pub use availability::AvailabilityGate;
pub use capture_timer::{CaptureTimer, StopCause, StopEvent, TimerError, TimerSettings, TimerState};
pub use conversion::{
    ConversionError, ConversionProgressCallback, ConverterSettings, FormatConverter,
    NativeStrategy, SharedTranscoder, TranscoderStrategy,
};
pub use phrase_recorder::{CapturedTake, PhraseRecorder, RecordingCallbacks};
pub use recorder_session::{RawRecording, RecorderSession, RecorderSettings};
