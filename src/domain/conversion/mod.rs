//! Conversion domain: options, job tracking, results and capabilities

pub mod capability;
pub mod job;
pub mod options;
pub mod result;

pub use capability::CapabilityVerdict;
pub use job::{ConversionJob, ConversionProgress, JobStatus};
pub use options::{
    ConversionOptions, EncodePlan, Quality, BITRATE_RANGE, CHANNELS_RANGE, SAMPLE_RATE_RANGE,
};
pub use result::{
    AudioMetadata, ConversionResult, StrategyKind, FALLBACK_CHANNELS, FALLBACK_SAMPLE_RATE,
};
