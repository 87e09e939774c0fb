//! Metadata and platform probe port interfaces

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::AudioBlob;
use crate::domain::error::ErrorKind;

/// Metadata probe errors
#[derive(Debug, Clone, Error)]
pub enum ProbeError {
    #[error("Metadata probe timed out")]
    Timeout,

    #[error("Unreadable media: {0}")]
    Unreadable(String),
}

impl ProbeError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Timeout => Some(ErrorKind::ProbeTimeout),
            Self::Unreadable(_) => None,
        }
    }
}

/// Metadata read from an encoded blob. Any field may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbedMetadata {
    pub duration_seconds: Option<f64>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Port for reading media metadata
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    /// Read duration and format details from `blob`.
    ///
    /// Implementations may be slow; callers bound them with a deadline.
    async fn probe(&self, blob: &AudioBlob) -> Result<ProbedMetadata, ProbeError>;
}

/// Port for host capability checks
pub trait PlatformProbe: Send + Sync {
    /// Whether the transcoder can be given a shared private workspace
    fn shared_memory_supported(&self) -> bool;

    /// Whether that workspace is isolated from other users
    fn secure_context(&self) -> bool;

    /// Whether an audio capture API is present
    fn recorder_api_supported(&self) -> bool;
}
