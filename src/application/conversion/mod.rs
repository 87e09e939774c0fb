//! Format conversion
//!
//! Turns a raw capture into a compressed blob through one of two
//! strategies: an external transcoder engine, or the in-process native
//! pipeline. When neither is usable the raw blob can be passed through.

pub mod converter;
pub mod engine;
pub mod native;
pub mod progress;
pub mod transcoder;

use std::sync::Arc;

use thiserror::Error;

use crate::domain::conversion::ConversionProgress;
use crate::domain::error::{ErrorKind, OptionsError};

use super::ports::{CodecError, EngineError};

pub use converter::{ConverterSettings, FormatConverter};
pub use engine::SharedTranscoder;
pub use native::NativeStrategy;
pub use progress::ProgressReporter;
pub use transcoder::TranscoderStrategy;

/// Progress callback for a single conversion
pub type ConversionProgressCallback = Arc<dyn Fn(ConversionProgress) + Send + Sync>;

/// Conversion errors
#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    #[error("No conversion strategy is available on this system")]
    Unsupported,

    #[error("Invalid conversion options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("Transcoder error: {0}")]
    Engine(#[from] EngineError),

    #[error("Native pipeline error: {0}")]
    Codec(#[from] CodecError),

    #[error("Conversion failed: {0}")]
    Failed(String),
}

impl ConversionError {
    /// Taxonomy kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unsupported => ErrorKind::ConversionUnsupported,
            _ => ErrorKind::ConversionFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unsupported_has_its_own_kind() {
        assert_eq!(
            ConversionError::Unsupported.kind(),
            ErrorKind::ConversionUnsupported
        );
        assert_eq!(
            ConversionError::from(OptionsError::BitrateOutOfRange(999)).kind(),
            ErrorKind::ConversionFailed
        );
        assert_eq!(
            ConversionError::from(EngineError::RunFailed("x".into())).kind(),
            ErrorKind::ConversionFailed
        );
        assert_eq!(
            ConversionError::from(CodecError::Decode("x".into())).kind(),
            ErrorKind::ConversionFailed
        );
    }
}
