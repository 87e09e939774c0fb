//! Phrase Recorder - bounded recording and compression for pronunciation practice
//!
//! This crate records short practice phrases from the microphone, stops each
//! take automatically at its target length, and compresses the result to MP3
//! with an external FFmpeg, a built-in FLAC pipeline, or a raw pass-through.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Duration policy, audio and conversion value objects, errors
//! - **Application**: Capture timer, recorder session, converter, availability gate and port traits
//! - **Infrastructure**: Adapter implementations (cpal, FFmpeg, symphonia, uploads, config)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
