//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod codec;
pub mod config;
pub mod probe;
pub mod transcoder;
pub mod upload;

// Re-export common types
pub use capture::{AudioSource, CaptureConstraints, CaptureError, CaptureStream};
pub use codec::{CodecError, NativeCodec, RenderSettings};
pub use config::ConfigStore;
pub use probe::{MetadataProbe, PlatformProbe, ProbeError, ProbedMetadata};
pub use transcoder::{EngineError, RatioCallback, Transcoder, TranscoderLoader};
pub use upload::{UploadError, UploadMetadata, UploadSink};
