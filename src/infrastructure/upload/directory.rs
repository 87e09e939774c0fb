//! Local directory upload sink

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Url;
use tokio::fs;

use crate::application::ports::{UploadError, UploadMetadata, UploadSink};
use crate::domain::audio::AudioBlob;

/// Stores recordings as files and returns `file://` URLs
pub struct DirectoryUploadSink {
    dir: PathBuf,
}

impl DirectoryUploadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(blob: &AudioBlob, metadata: &UploadMetadata) -> String {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        format!(
            "item-{}-{}.{}",
            metadata.item_id,
            stamp,
            blob.mime_type().extension()
        )
    }
}

#[async_trait]
impl UploadSink for DirectoryUploadSink {
    async fn upload(
        &self,
        blob: &AudioBlob,
        metadata: &UploadMetadata,
    ) -> Result<String, UploadError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| UploadError::Failed(format!("{}: {}", self.dir.display(), e)))?;
        let dir = fs::canonicalize(&self.dir)
            .await
            .map_err(|e| UploadError::Failed(format!("{}: {}", self.dir.display(), e)))?;

        let path = dir.join(Self::file_name(blob, metadata));
        fs::write(&path, blob.data())
            .await
            .map_err(|e| UploadError::Failed(format!("{}: {}", path.display(), e)))?;

        Url::from_file_path(&path)
            .map(|url| url.to_string())
            .map_err(|_| UploadError::Failed(format!("not a file URL: {}", path.display())))
    }
}
