//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer has no dependencies on external systems.

pub mod audio;
pub mod config;
pub mod conversion;
pub mod error;
pub mod recording;

// Re-export common types
pub use audio::{AudioBlob, AudioChunk, AudioMimeType, ContainerFormat, PcmBuffer, PcmFormat};
pub use config::AppConfig;
pub use conversion::{
    AudioMetadata, CapabilityVerdict, ConversionOptions, ConversionResult, Quality, StrategyKind,
};
pub use error::*;
pub use recording::{DurationPolicy, DurationSpec, RecordingState, RecordingTiming};
