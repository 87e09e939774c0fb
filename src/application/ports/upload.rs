//! Upload port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audio::AudioBlob;

/// Upload errors
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("Upload rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Upload failed: {0}")]
    Failed(String),
}

/// Context sent along with an uploaded recording
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub item_id: u32,
    pub duration_seconds: f64,
}

/// Port for handing a finished recording to storage
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Store `blob` and return where it can be fetched.
    ///
    /// # Arguments
    /// * `blob` - Recording to store
    /// * `metadata` - Item and duration context
    ///
    /// # Returns
    /// URL of the stored recording
    async fn upload(&self, blob: &AudioBlob, metadata: &UploadMetadata)
        -> Result<String, UploadError>;
}
