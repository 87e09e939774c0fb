//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces, integrating with
//! the audio host (cpal), the codec stack (symphonia, flacenc, hound), an
//! external FFmpeg binary and HTTP upload endpoints.

pub mod capture;
pub mod codec;
pub mod config;
pub mod conversion;
pub mod platform;
pub mod upload;

// Re-export adapters
pub use capture::CpalAudioSource;
pub use codec::SymphoniaCodec;
pub use config::XdgConfigStore;
pub use conversion::{FfmpegLoader, SymphoniaProbe};
pub use platform::HostPlatform;
pub use upload::{DirectoryUploadSink, HttpUploadSink};
