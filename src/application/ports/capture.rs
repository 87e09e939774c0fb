//! Audio capture port interfaces

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::audio::{AudioChunk, ContainerFormat, PcmBuffer, PcmFormat};
use crate::domain::error::ErrorKind;

/// Capture errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("No audio input device found")]
    DeviceNotFound,

    #[error("Audio input device is busy: {0}")]
    DeviceBusy(String),

    #[error("Audio capture blocked by security policy: {0}")]
    SecurityPolicyBlocked(String),

    #[error("Audio capture is not supported: {0}")]
    Unsupported(String),

    #[error("Audio capture failed: {0}")]
    Failed(String),

    #[error("Recording was cancelled")]
    Cancelled,
}

impl CaptureError {
    /// Taxonomy kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::DeviceNotFound => ErrorKind::DeviceNotFound,
            Self::DeviceBusy(_) => ErrorKind::DeviceBusy,
            Self::SecurityPolicyBlocked(_) => ErrorKind::SecurityPolicyBlocked,
            Self::Unsupported(_) => ErrorKind::CaptureUnsupported,
            Self::Failed(_) | Self::Cancelled => ErrorKind::CaptureFailed,
        }
    }

    /// Cancellation is a requested teardown, not a failure worth reporting
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Processing requested from the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    /// Preferred device sample rate
    pub sample_rate: Option<u32>,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            sample_rate: Some(44_100),
        }
    }
}

/// Port for a microphone-like audio source
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Whether any capture backend is present at all
    fn is_available(&self) -> bool;

    /// Whether the source can finalize captures in `format`
    fn supports(&self, format: ContainerFormat) -> bool;

    /// Open the capture device.
    ///
    /// May wait on a user permission decision.
    ///
    /// # Arguments
    /// * `constraints` - Processing and format preferences
    ///
    /// # Returns
    /// A live stream that must be released exactly once
    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError>;

    /// Encode captured PCM into `format`.
    ///
    /// # Arguments
    /// * `format` - Target container, previously accepted by `supports`
    /// * `pcm` - Concatenated capture
    fn encode(&self, format: ContainerFormat, pcm: &PcmBuffer) -> Result<Vec<u8>, CaptureError>;
}

/// An acquired capture device
pub trait CaptureStream: Send {
    /// PCM layout of emitted chunks
    fn format(&self) -> PcmFormat;

    /// Begin emitting one chunk per `timeslice` into `chunks`
    fn start(
        &mut self,
        timeslice: StdDuration,
        chunks: UnboundedSender<AudioChunk>,
    ) -> Result<(), CaptureError>;

    /// Stop capturing and emit any pending partial chunk.
    /// Every chunk has been sent when this returns.
    fn flush(&mut self) -> Result<(), CaptureError>;

    /// Release the hardware
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_taxonomy() {
        assert_eq!(
            CaptureError::PermissionDenied("x".into()).kind(),
            ErrorKind::PermissionDenied
        );
        assert_eq!(CaptureError::DeviceNotFound.kind(), ErrorKind::DeviceNotFound);
        assert_eq!(
            CaptureError::Unsupported("x".into()).kind(),
            ErrorKind::CaptureUnsupported
        );
        assert_eq!(CaptureError::Cancelled.kind(), ErrorKind::CaptureFailed);
    }

    #[test]
    fn default_constraints_enable_processing() {
        let c = CaptureConstraints::default();
        assert!(c.echo_cancellation && c.noise_suppression && c.auto_gain_control);
        assert_eq!(c.sample_rate, Some(44_100));
    }
}
