//! Conversion result value objects

use std::fmt;

use crate::domain::audio::AudioBlob;

/// Fallback sample rate when the output cannot be probed
pub const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// Fallback channel count when the output cannot be probed
pub const FALLBACK_CHANNELS: u16 = 2;

/// Which path produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// External transcoder engine
    Transcoder,
    /// Built-in decode, render and re-encode pipeline
    Native,
    /// Raw capture returned unchanged
    PassThrough,
}

impl StrategyKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transcoder => "transcoder",
            Self::Native => "native",
            Self::PassThrough => "pass-through",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptive metadata of a converted blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMetadata {
    /// Requested bitrate (kbps); 0 when nothing was re-encoded
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Output of a conversion call. The caller owns the blob.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub compressed: AudioBlob,
    pub duration_seconds: f64,
    pub byte_size: usize,
    pub metadata: AudioMetadata,
    pub strategy: StrategyKind,
}

impl ConversionResult {
    /// Output size relative to the input (0.25 means 4x smaller)
    pub fn size_ratio(&self, input_bytes: usize) -> f64 {
        if input_bytes == 0 {
            return 0.0;
        }
        self.byte_size as f64 / input_bytes as f64
    }
}
