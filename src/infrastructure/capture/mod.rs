//! Audio capture adapters

pub mod cpal_source;

pub use cpal_source::{CpalAudioSource, CpalCaptureStream};
