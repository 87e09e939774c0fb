//! Audio value objects

pub mod audio_blob;
pub mod pcm;

pub use audio_blob::{AudioBlob, AudioMimeType, ContainerFormat};
pub use pcm::{AudioChunk, PcmBuffer, PcmFormat};
