//! Practice attempt use case
//!
//! Records one item, compresses the take and optionally hands it to an
//! upload sink.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::domain::conversion::{ConversionOptions, ConversionResult};
use crate::domain::error::ErrorKind;

use super::conversion::{ConversionError, ConversionProgressCallback, FormatConverter};
use super::phrase_recorder::{CapturedTake, PhraseRecorder, RecordingCallbacks};
use super::ports::{CaptureError, UploadError, UploadMetadata, UploadSink};

/// Errors from the practice attempt use case
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Recording failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl AttemptError {
    /// Taxonomy kind, when the failure has one
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Capture(e) => Some(e.kind()),
            Self::Conversion(e) => Some(e.kind()),
            Self::Upload(_) => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Capture(e) if e.is_cancellation())
    }
}

/// Input parameters for one attempt
#[derive(Debug, Clone, Default)]
pub struct AttemptInput {
    pub item_id: u32,
    /// Target used when the item has no duration entry
    pub fallback_seconds: Option<f64>,
    pub options: ConversionOptions,
    /// Skip the upload even when a sink is configured
    pub skip_upload: bool,
}

/// Output from one attempt
#[derive(Debug, Clone)]
pub struct AttemptOutput {
    pub take: CapturedTake,
    pub conversion: ConversionResult,
    /// Where the upload sink stored the recording
    pub upload_url: Option<String>,
}

/// Callbacks for progress and status updates
#[derive(Default)]
#[allow(clippy::type_complexity)]
pub struct AttemptCallbacks {
    pub recording: RecordingCallbacks,
    /// Called when conversion starts
    pub on_converting: Option<Box<dyn Fn() + Send + Sync>>,
    pub on_conversion_progress: Option<ConversionProgressCallback>,
    /// Called when the upload starts
    pub on_uploading: Option<Box<dyn Fn() + Send + Sync>>,
}

/// Record, convert and upload one practice item
pub struct PracticeAttemptUseCase {
    recorder: Arc<PhraseRecorder>,
    converter: Arc<FormatConverter>,
    uploader: Option<Arc<dyn UploadSink>>,
}

impl PracticeAttemptUseCase {
    pub fn new(
        recorder: Arc<PhraseRecorder>,
        converter: Arc<FormatConverter>,
        uploader: Option<Arc<dyn UploadSink>>,
    ) -> Self {
        Self {
            recorder,
            converter,
            uploader,
        }
    }

    /// Handle for cancelling from a signal handler
    pub fn recorder(&self) -> Arc<PhraseRecorder> {
        Arc::clone(&self.recorder)
    }

    /// Execute the attempt workflow
    pub async fn execute(
        &self,
        input: AttemptInput,
        callbacks: AttemptCallbacks,
    ) -> Result<AttemptOutput, AttemptError> {
        let take = self
            .recorder
            .start_recording(input.item_id, input.fallback_seconds, callbacks.recording)
            .await?;

        if let Some(ref cb) = callbacks.on_converting {
            cb();
        }
        let conversion = self
            .converter
            .convert(
                &take.recording.blob,
                &input.options,
                callbacks.on_conversion_progress,
            )
            .await?;

        let upload_url = match (&self.uploader, input.skip_upload) {
            (Some(uploader), false) => {
                if let Some(ref cb) = callbacks.on_uploading {
                    cb();
                }
                let metadata = UploadMetadata {
                    item_id: take.item_id,
                    duration_seconds: take.corrected_seconds,
                };
                let url = uploader.upload(&conversion.compressed, &metadata).await?;
                info!(item_id = take.item_id, url = %url, "recording uploaded");
                Some(url)
            }
            _ => None,
        };

        Ok(AttemptOutput {
            take,
            conversion,
            upload_url,
        })
    }
}
