//! Application configuration value object

use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};

use crate::domain::conversion::{ConversionOptions, Quality};
use crate::domain::error::PolicyError;
use crate::domain::recording::{DurationPolicy, DurationSpec};

/// Default capture time slice (milliseconds)
pub const DEFAULT_TIMESLICE_MS: u64 = 1000;

/// Default transcoder executable
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";

/// Capture timer tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub tick_ms: Option<u64>,
    pub backup_margin_ms: Option<u64>,
    /// 0 disables the sanity check
    pub sanity_interval_ms: Option<u64>,
    pub overrun_margin_ms: Option<u64>,
}

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub quality: Option<String>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub allow_pass_through: Option<bool>,
    pub native_fallback: Option<bool>,
    pub timeslice_ms: Option<u64>,
    pub ffmpeg_path: Option<String>,
    pub output_dir: Option<String>,
    pub upload_url: Option<String>,
    pub timer: Option<TimerConfig>,
    pub items: Option<Vec<DurationSpec>>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            quality: Some(Quality::default().to_string()),
            bitrate: None,
            sample_rate: None,
            channels: None,
            allow_pass_through: Some(false),
            native_fallback: Some(true),
            timeslice_ms: Some(DEFAULT_TIMESLICE_MS),
            ffmpeg_path: Some(DEFAULT_FFMPEG_PATH.to_string()),
            output_dir: None,
            upload_url: None,
            timer: Some(TimerConfig {
                tick_ms: Some(100),
                backup_margin_ms: Some(1000),
                sanity_interval_ms: Some(500),
                overrun_margin_ms: Some(500),
            }),
            items: None,
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            quality: other.quality.or(self.quality),
            bitrate: other.bitrate.or(self.bitrate),
            sample_rate: other.sample_rate.or(self.sample_rate),
            channels: other.channels.or(self.channels),
            allow_pass_through: other.allow_pass_through.or(self.allow_pass_through),
            native_fallback: other.native_fallback.or(self.native_fallback),
            timeslice_ms: other.timeslice_ms.or(self.timeslice_ms),
            ffmpeg_path: other.ffmpeg_path.or(self.ffmpeg_path),
            output_dir: other.output_dir.or(self.output_dir),
            upload_url: other.upload_url.or(self.upload_url),
            timer: Self::merge_timer_config(self.timer, other.timer),
            items: other.items.or(self.items),
        }
    }

    /// Merge timer sections
    fn merge_timer_config(
        base: Option<TimerConfig>,
        other: Option<TimerConfig>,
    ) -> Option<TimerConfig> {
        match (base, other) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(TimerConfig {
                tick_ms: o.tick_ms.or(b.tick_ms),
                backup_margin_ms: o.backup_margin_ms.or(b.backup_margin_ms),
                sanity_interval_ms: o.sanity_interval_ms.or(b.sanity_interval_ms),
                overrun_margin_ms: o.overrun_margin_ms.or(b.overrun_margin_ms),
            }),
        }
    }

    /// Get quality as parsed Quality, or default if not set/invalid
    pub fn quality_or_default(&self) -> Quality {
        self.quality
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    /// Conversion options assembled from the quality and explicit overrides
    pub fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            quality: self.quality_or_default(),
            bitrate: self.bitrate,
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Get pass-through setting, or false if not set
    pub fn allow_pass_through_or_default(&self) -> bool {
        self.allow_pass_through.unwrap_or(false)
    }

    /// Get native fallback setting, or true if not set
    pub fn native_fallback_or_default(&self) -> bool {
        self.native_fallback.unwrap_or(true)
    }

    /// Get capture time slice, or 1s if not set or zero
    pub fn timeslice_or_default(&self) -> StdDuration {
        StdDuration::from_millis(
            self.timeslice_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMESLICE_MS),
        )
    }

    /// Get transcoder executable, or "ffmpeg" if not set
    pub fn ffmpeg_path_or_default(&self) -> &str {
        self.ffmpeg_path
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_FFMPEG_PATH)
    }

    /// Get the upload endpoint, if one is configured
    pub fn upload_url(&self) -> Option<&str> {
        self.upload_url.as_deref().filter(|s| !s.is_empty())
    }

    fn timer_value(&self, pick: impl Fn(&TimerConfig) -> Option<u64>) -> Option<u64> {
        self.timer.as_ref().and_then(pick)
    }

    /// Get timer tick interval, or 100ms if not set
    pub fn tick_interval_or_default(&self) -> StdDuration {
        StdDuration::from_millis(
            self.timer_value(|t| t.tick_ms)
                .filter(|ms| *ms > 0)
                .unwrap_or(100),
        )
    }

    /// Get backup stop margin, or 1s if not set
    pub fn backup_margin_or_default(&self) -> StdDuration {
        StdDuration::from_millis(self.timer_value(|t| t.backup_margin_ms).unwrap_or(1000))
    }

    /// Get sanity check interval; None when disabled with 0
    pub fn sanity_interval_or_default(&self) -> Option<StdDuration> {
        match self.timer_value(|t| t.sanity_interval_ms).unwrap_or(500) {
            0 => None,
            ms => Some(StdDuration::from_millis(ms)),
        }
    }

    /// Get overrun margin for the sanity check, or 0.5s if not set
    pub fn overrun_margin_or_default(&self) -> StdDuration {
        StdDuration::from_millis(self.timer_value(|t| t.overrun_margin_ms).unwrap_or(500))
    }

    /// Built-in duration table with configured items applied on top
    pub fn duration_policy(&self) -> Result<DurationPolicy, PolicyError> {
        let policy = DurationPolicy::builtin();
        match &self.items {
            Some(items) => policy.with_overrides(items.iter().copied()),
            None => Ok(policy),
        }
    }
}
