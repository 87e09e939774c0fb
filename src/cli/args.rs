//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::config::AppConfig;
use crate::domain::conversion::Quality;

/// Phrase Recorder - bounded recording and compression for pronunciation practice
#[derive(Parser, Debug)]
#[command(name = "phrase-recorder")]
#[command(version)]
#[command(about = "Record practice phrases with an automatic stop and compress them to MP3")]
#[command(long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record one practice item and compress the take
    Record(RecordArgs),
    /// Compress an existing audio file
    Convert(ConvertArgs),
    /// List the duration table
    Items,
    /// Show which conversion paths this host supports
    Check,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for `record`
#[derive(clap::Args, Debug, Clone)]
pub struct RecordArgs {
    /// Practice item to record
    #[arg(short = 'i', long, value_name = "ID")]
    pub item: u32,

    /// Target length in seconds for items without a table entry
    #[arg(long, value_name = "SECONDS")]
    pub fallback: Option<f64>,

    /// Output quality preset
    #[arg(short = 'q', long, value_name = "QUALITY")]
    pub quality: Option<QualityArg>,

    /// Bitrate override in kbps
    #[arg(short = 'b', long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Keep the raw recording when no conversion path is available
    #[arg(long)]
    pub pass_through: bool,

    /// Do not upload even when an upload target is configured
    #[arg(long)]
    pub no_upload: bool,

    /// Write the compressed take to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl RecordArgs {
    /// Config values set on the command line
    pub fn config_overrides(&self) -> AppConfig {
        AppConfig {
            quality: self.quality.map(|q| Quality::from(q).to_string()),
            bitrate: self.bitrate,
            allow_pass_through: if self.pass_through { Some(true) } else { None },
            ..Default::default()
        }
    }
}

/// Options for `convert`
#[derive(clap::Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Audio file to compress (flac, wav, mp3)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output quality preset
    #[arg(short = 'q', long, value_name = "QUALITY")]
    pub quality: Option<QualityArg>,

    /// Bitrate override in kbps
    #[arg(short = 'b', long, value_name = "KBPS")]
    pub bitrate: Option<u32>,

    /// Output sample rate override
    #[arg(long, value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// Output channel count override
    #[arg(long, value_name = "N")]
    pub channels: Option<u16>,

    /// Keep the input unchanged when no conversion path is available
    #[arg(long)]
    pub pass_through: bool,

    /// Output file (defaults to the input name with the new extension)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl ConvertArgs {
    /// Config values set on the command line
    pub fn config_overrides(&self) -> AppConfig {
        AppConfig {
            quality: self.quality.map(|q| Quality::from(q).to_string()),
            bitrate: self.bitrate,
            sample_rate: self.sample_rate,
            channels: self.channels,
            allow_pass_through: if self.pass_through { Some(true) } else { None },
            ..Default::default()
        }
    }
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Quality argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Low => Quality::Low,
            QualityArg::Medium => Quality::Medium,
            QualityArg::High => Quality::High,
        }
    }
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "quality",
    "bitrate",
    "sample_rate",
    "channels",
    "allow_pass_through",
    "native_fallback",
    "timeslice_ms",
    "ffmpeg_path",
    "output_dir",
    "upload_url",
    "timer.tick_ms",
    "timer.backup_margin_ms",
    "timer.sanity_interval_ms",
    "timer.overrun_margin_ms",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
