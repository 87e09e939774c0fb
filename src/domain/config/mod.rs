//! Configuration domain

pub mod app_config;

pub use app_config::{AppConfig, TimerConfig, DEFAULT_FFMPEG_PATH, DEFAULT_TIMESLICE_MS};
