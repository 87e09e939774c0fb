//! Transcoder engine port interfaces

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use thiserror::Error;

/// Transcoder engine errors
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("Transcoder not found: {0}")]
    NotFound(String),

    #[error("Transcoder failed to load: {0}")]
    LoadFailed(String),

    #[error("Transcoder is missing the {0} encoder")]
    MissingEncoder(String),

    #[error("Invalid workspace file name: {0}")]
    InvalidFileName(String),

    #[error("Workspace I/O failed: {0}")]
    Io(String),

    #[error("Transcoder run failed: {0}")]
    RunFailed(String),
}

/// Ratio callback (0.0 - 1.0) reported while a run is in progress
pub type RatioCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Port for loading the transcoder engine
#[async_trait]
pub trait TranscoderLoader: Send + Sync {
    /// Load and verify the engine.
    ///
    /// # Returns
    /// A ready engine or the reason it cannot be used
    async fn load(&self) -> Result<Arc<dyn Transcoder>, EngineError>;
}

/// A loaded transcoder with its private file workspace.
///
/// File names are flat (no directories) and scoped to the workspace.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Human-readable engine description
    fn describe(&self) -> String;

    /// Write `data` to `name` inside the workspace
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError>;

    /// Run the engine with `args`, resolving file names in the workspace.
    ///
    /// # Arguments
    /// * `args` - Engine arguments
    /// * `media_duration` - Input duration used to turn timestamps into a ratio
    /// * `on_ratio` - Optional progress callback
    async fn run(
        &self,
        args: &[String],
        media_duration: Option<StdDuration>,
        on_ratio: Option<RatioCallback>,
    ) -> Result<(), EngineError>;

    /// Read `name` from the workspace
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError>;

    /// Remove `name` from the workspace. Missing files are not an error.
    async fn remove_file(&self, name: &str) -> Result<(), EngineError>;
}
