//! Conversion options and the encode plan derived from them

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::OptionsError;

/// Accepted bitrate range (kbps)
pub const BITRATE_RANGE: std::ops::RangeInclusive<u32> = 8..=320;

/// Accepted sample rate range (Hz)
pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;

/// Accepted channel counts
pub const CHANNELS_RANGE: std::ops::RangeInclusive<u16> = 1..=2;

/// Output quality preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    #[default]
    Medium,
    High,
}

impl Quality {
    /// Nominal bitrate for this preset (kbps)
    pub const fn bitrate_kbps(&self) -> u32 {
        match self {
            Self::Low => 64,
            Self::Medium => 128,
            Self::High => 192,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Quality {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(OptionsError::InvalidQuality(s.to_string())),
        }
    }
}

/// Caller-supplied conversion settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConversionOptions {
    pub quality: Quality,
    /// Explicit bitrate in kbps; wins over the quality preset
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl ConversionOptions {
    pub fn with_quality(quality: Quality) -> Self {
        Self {
            quality,
            ..Default::default()
        }
    }

    /// Bitrate that will actually be requested from the encoder
    pub fn effective_bitrate(&self) -> u32 {
        self.bitrate.unwrap_or_else(|| self.quality.bitrate_kbps())
    }

    /// Check every explicit value against its accepted range
    pub fn validate(&self) -> Result<(), OptionsError> {
        if let Some(bitrate) = self.bitrate {
            if !BITRATE_RANGE.contains(&bitrate) {
                return Err(OptionsError::BitrateOutOfRange(bitrate));
            }
        }
        if let Some(rate) = self.sample_rate {
            if !SAMPLE_RATE_RANGE.contains(&rate) {
                return Err(OptionsError::SampleRateOutOfRange(rate));
            }
        }
        if let Some(channels) = self.channels {
            if !CHANNELS_RANGE.contains(&channels) {
                return Err(OptionsError::ChannelsOutOfRange(channels));
            }
        }
        Ok(())
    }

    /// Resolve into the concrete plan handed to a conversion strategy
    pub fn plan(&self) -> EncodePlan {
        EncodePlan {
            bitrate_kbps: self.effective_bitrate(),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Resolved encoder settings for one conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodePlan {
    pub bitrate_kbps: u32,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl EncodePlan {
    /// Transcoder arguments producing an MP3 from `input` into `output`
    pub fn transcoder_args(&self, input: &str, output: &str) -> Vec<String> {
        let mut args = vec![
            "-i".to_string(),
            input.to_string(),
            "-vn".to_string(),
            "-c:a".to_string(),
            "libmp3lame".to_string(),
            "-b:a".to_string(),
            format!("{}k", self.bitrate_kbps),
        ];

        if let Some(rate) = self.sample_rate {
            args.push("-ar".to_string());
            args.push(rate.to_string());
        }
        if let Some(channels) = self.channels {
            args.push("-ac".to_string());
            args.push(channels.to_string());
        }

        args.extend([
            "-map_metadata".to_string(),
            "0".to_string(),
            output.to_string(),
        ]);
        args
    }
}
