//! In-process codecs
//!
//! FLAC and WAV encoding for captures, symphonia decoding and a rubato
//! render stage, combined into the native conversion pipeline.

pub mod decoder;
pub mod flac;
pub mod render;
pub mod wav;

use crate::application::ports::{CodecError, NativeCodec, RenderSettings};
use crate::domain::audio::{AudioBlob, ContainerFormat, PcmBuffer};

pub use decoder::decode_to_pcm;
pub use flac::encode_flac;
pub use render::{render, resample};
pub use wav::encode_wav;

/// Encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Encoder config error: {0}")]
    Config(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Write failed: {0}")]
    Write(String),
}

/// Encode `pcm` into `format`
pub fn encode(pcm: &PcmBuffer, format: ContainerFormat) -> Result<Vec<u8>, EncodingError> {
    match format {
        ContainerFormat::Flac => encode_flac(pcm),
        ContainerFormat::Wav => encode_wav(pcm),
    }
}

/// Native pipeline built on symphonia, rubato and flacenc
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaCodec;

impl SymphoniaCodec {
    pub fn new() -> Self {
        Self
    }
}

impl NativeCodec for SymphoniaCodec {
    fn output_formats(&self) -> Vec<ContainerFormat> {
        vec![ContainerFormat::Flac]
    }

    fn decode(&self, blob: &AudioBlob) -> Result<PcmBuffer, CodecError> {
        decode_to_pcm(blob)
    }

    fn render(&self, pcm: PcmBuffer, settings: &RenderSettings) -> Result<PcmBuffer, CodecError> {
        render(pcm, settings)
    }

    fn encode(&self, pcm: &PcmBuffer, format: ContainerFormat) -> Result<Vec<u8>, CodecError> {
        encode(pcm, format).map_err(|e| CodecError::Encode(e.to_string()))
    }
}
