//! Native codec port interface

use thiserror::Error;

use crate::domain::audio::{AudioBlob, ContainerFormat, PcmBuffer};

/// Codec errors
#[derive(Debug, Clone, Error)]
pub enum CodecError {
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Decoding failed: {0}")]
    Decode(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Offline render settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Output sample rate; None keeps the source rate
    pub sample_rate: Option<u32>,
    /// Output channels; None keeps the source layout
    pub channels: Option<u16>,
    /// Peak level to normalise to (fraction of full scale); None keeps unity gain
    pub normalize_peak: Option<f32>,
    /// Upper bound on the normalisation gain
    pub max_gain: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: None,
            channels: None,
            normalize_peak: Some(0.89),
            max_gain: 4.0,
        }
    }
}

/// Port for in-process decode, render and encode.
///
/// All operations are CPU bound and synchronous; callers run them on a
/// blocking thread.
pub trait NativeCodec: Send + Sync {
    /// Compressed output formats, most preferred first
    fn output_formats(&self) -> Vec<ContainerFormat>;

    /// Whether the pipeline can run at all
    fn is_supported(&self) -> bool {
        !self.output_formats().is_empty()
    }

    /// Decode an encoded blob to PCM
    fn decode(&self, blob: &AudioBlob) -> Result<PcmBuffer, CodecError>;

    /// Re-render PCM through gain, channel mix and resampling
    fn render(&self, pcm: PcmBuffer, settings: &RenderSettings) -> Result<PcmBuffer, CodecError>;

    /// Encode PCM into `format`
    fn encode(&self, pcm: &PcmBuffer, format: ContainerFormat) -> Result<Vec<u8>, CodecError>;
}
