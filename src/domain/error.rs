//! Domain error types

use std::fmt;

use thiserror::Error;

/// Classification shared by every user-facing failure.
///
/// Each kind maps to exactly one stable message key so front-ends can
/// localize without matching on error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PermissionDenied,
    DeviceNotFound,
    DeviceBusy,
    SecurityPolicyBlocked,
    CaptureUnsupported,
    CaptureFailed,
    ConversionUnsupported,
    ConversionFailed,
    /// Metadata probe exceeded its deadline. Always recovered locally.
    ProbeTimeout,
}

impl ErrorKind {
    /// All kinds, in declaration order
    pub const ALL: [ErrorKind; 9] = [
        Self::PermissionDenied,
        Self::DeviceNotFound,
        Self::DeviceBusy,
        Self::SecurityPolicyBlocked,
        Self::CaptureUnsupported,
        Self::CaptureFailed,
        Self::ConversionUnsupported,
        Self::ConversionFailed,
        Self::ProbeTimeout,
    ];

    /// Stable message key for this kind
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "capture.permission_denied",
            Self::DeviceNotFound => "capture.device_not_found",
            Self::DeviceBusy => "capture.device_busy",
            Self::SecurityPolicyBlocked => "capture.security_policy_blocked",
            Self::CaptureUnsupported => "capture.unsupported",
            Self::CaptureFailed => "capture.failed",
            Self::ConversionUnsupported => "conversion.unsupported",
            Self::ConversionFailed => "conversion.failed",
            Self::ProbeTimeout => "conversion.probe_timeout",
        }
    }

    /// Short title shown next to the error
    pub const fn title(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Microphone access denied",
            Self::DeviceNotFound => "No microphone found",
            Self::DeviceBusy => "Microphone is busy",
            Self::SecurityPolicyBlocked => "Microphone blocked by security policy",
            Self::CaptureUnsupported => "Recording not supported",
            Self::CaptureFailed => "Recording failed",
            Self::ConversionUnsupported => "Conversion not available",
            Self::ConversionFailed => "Conversion failed",
            Self::ProbeTimeout => "Metadata probe timed out",
        }
    }

    /// Remediation steps for the user, if any
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::PermissionDenied => &[
                "Allow microphone access for this terminal in your system privacy settings",
                "On Linux, check that your user can open the capture device (audio group, PipeWire/PulseAudio session)",
                "Run the command again after granting access",
            ],
            Self::DeviceNotFound => &[
                "Connect a microphone or headset",
                "Check that the input device is enabled in your sound settings",
            ],
            Self::DeviceBusy => &[
                "Close other applications that may be using the microphone",
                "Unplug and reconnect the device if the problem persists",
            ],
            Self::SecurityPolicyBlocked => &[
                "A sandbox or system policy prevents audio capture",
                "Run from an environment that is allowed to access audio devices",
            ],
            Self::CaptureUnsupported => &[
                "No usable audio host or recording format is available on this system",
            ],
            Self::ConversionUnsupported => &[
                "Install FFmpeg with libmp3lame, or enable the native fallback",
                "Set allow_pass_through = true to keep the raw recording instead",
            ],
            Self::CaptureFailed | Self::ConversionFailed | Self::ProbeTimeout => &[],
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message_key())
    }
}

/// Error when the duration table is malformed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    #[error("Duplicate duration entry for item {0}")]
    DuplicateItem(u32),

    #[error("Invalid target duration for item {item_id}: {target_seconds}")]
    InvalidTarget { item_id: u32, target_seconds: f64 },

    #[error("Target duration {0} s is outside 0 to 3600 s")]
    TargetOutOfRange(f64),
}

/// Error when conversion options are out of range
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptionsError {
    #[error("Invalid quality: \"{0}\". Valid values are: low, medium, high")]
    InvalidQuality(String),

    #[error("Bitrate {0} kbps is out of range (8-320)")]
    BitrateOutOfRange(u32),

    #[error("Sample rate {0} Hz is out of range (8000-192000)")]
    SampleRateOutOfRange(u32),

    #[error("Channel count {0} is out of range (1-2)")]
    ChannelsOutOfRange(u16),
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
