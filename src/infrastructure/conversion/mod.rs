//! Conversion adapters: the FFmpeg engine and the metadata probe

pub mod ffmpeg;
pub mod probe;

pub use ffmpeg::{FfmpegLoader, FfmpegTranscoder};
pub use probe::SymphoniaProbe;
