//! HTTP upload sink

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::Url;
use serde::Deserialize;

use crate::application::ports::{UploadError, UploadMetadata, UploadSink};
use crate::domain::audio::AudioBlob;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

/// POSTs the recording body to a fixed endpoint
pub struct HttpUploadSink {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpUploadSink {
    pub fn new(endpoint: &str) -> Result<Self, UploadError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| UploadError::Failed(format!("invalid upload URL '{}': {}", endpoint, e)))?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::new(),
        })
    }

    /// Endpoint with the item context appended as query parameters
    fn request_url(&self, metadata: &UploadMetadata) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("item", &metadata.item_id.to_string())
            .append_pair("duration", &format!("{:.3}", metadata.duration_seconds));
        url
    }
}

#[async_trait]
impl UploadSink for HttpUploadSink {
    async fn upload(
        &self,
        blob: &AudioBlob,
        metadata: &UploadMetadata,
    ) -> Result<String, UploadError> {
        let url = self.request_url(metadata);

        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, blob.mime_type().as_str())
            .body(blob.data().to_vec())
            .send()
            .await
            .map_err(|e| UploadError::Failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // A JSON body with a `url` field wins over the Location header
        let body = response.bytes().await.unwrap_or_default();
        let from_body = serde_json::from_slice::<UploadResponse>(&body)
            .ok()
            .and_then(|r| r.url);

        Ok(from_body
            .or(location)
            .unwrap_or_else(|| url.to_string()))
    }
}
