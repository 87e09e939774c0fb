//! Configuration port interface

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Persistent store for [`AppConfig`]
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the stored config. A missing file yields [`AppConfig::empty`].
    async fn load(&self) -> Result<AppConfig, ConfigError>;

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError>;

    fn path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Write [`AppConfig::defaults`]; fails with `AlreadyExists` when a file is present
    async fn init(&self) -> Result<(), ConfigError>;
}
