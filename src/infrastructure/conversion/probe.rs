//! Metadata probe backed by symphonia

use async_trait::async_trait;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::formats::FormatReader;

use crate::application::ports::{MetadataProbe, ProbeError, ProbedMetadata};
use crate::domain::audio::AudioBlob;
use crate::infrastructure::codec::decoder::{is_end_of_stream, open_track};

/// Reads duration, sample rate and channels by demuxing the blob
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProbe;

impl SymphoniaProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MetadataProbe for SymphoniaProbe {
    async fn probe(&self, blob: &AudioBlob) -> Result<ProbedMetadata, ProbeError> {
        let blob = blob.clone();
        tokio::task::spawn_blocking(move || probe_blob(&blob))
            .await
            .map_err(|e| ProbeError::Unreadable(e.to_string()))?
    }
}

/// Synchronous probe
pub fn probe_blob(blob: &AudioBlob) -> Result<ProbedMetadata, ProbeError> {
    let (mut reader, track_id, params) =
        open_track(blob).map_err(|e| ProbeError::Unreadable(e.to_string()))?;

    // Streams without a frame count in their header are measured by demuxing
    let frames = match params.n_frames {
        Some(n) => Some(n),
        None => count_frames(reader.as_mut(), track_id),
    };

    Ok(ProbedMetadata {
        duration_seconds: frames.and_then(|n| duration_of(&params, n)),
        sample_rate: params.sample_rate,
        channels: params.channels.map(|c| c.count() as u16),
    })
}

fn count_frames(reader: &mut dyn FormatReader, track_id: u32) -> Option<u64> {
    let mut total: u64 = 0;
    loop {
        match reader.next_packet() {
            Ok(packet) if packet.track_id() == track_id => total += packet.dur,
            Ok(_) => {}
            Err(e) if is_end_of_stream(&e) => break,
            Err(_) => return None,
        }
    }
    (total > 0).then_some(total)
}

fn duration_of(params: &CodecParameters, frames: u64) -> Option<f64> {
    if let Some(tb) = params.time_base {
        let time = tb.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    params
        .sample_rate
        .filter(|r| *r > 0)
        .map(|rate| frames as f64 / rate as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::{AudioMimeType, PcmBuffer, PcmFormat};
    use crate::infrastructure::codec::{encode_flac, encode_wav};

    #[test]
    fn probes_wav() {
        let pcm = PcmBuffer::new(vec![0; 2 * 22_050], PcmFormat::new(22_050, 2));
        let blob = AudioBlob::new(encode_wav(&pcm).unwrap(), AudioMimeType::Wav);

        let meta = probe_blob(&blob).unwrap();
        assert_eq!(meta.sample_rate, Some(22_050));
        assert_eq!(meta.channels, Some(2));
        let duration = meta.duration_seconds.unwrap();
        assert!((duration - 1.0).abs() < 0.01, "duration {}", duration);
    }

    #[test]
    fn probes_flac() {
        let pcm = PcmBuffer::new(vec![0; 3 * 16_000], PcmFormat::new(16_000, 1));
        let blob = AudioBlob::new(encode_flac(&pcm).unwrap(), AudioMimeType::Flac);

        let meta = probe_blob(&blob).unwrap();
        assert_eq!(meta.sample_rate, Some(16_000));
        assert_eq!(meta.channels, Some(1));
        let duration = meta.duration_seconds.unwrap();
        assert!((duration - 3.0).abs() < 0.1, "duration {}", duration);
    }

    #[tokio::test]
    async fn unreadable_input_is_an_error() {
        let blob = AudioBlob::new(b"not audio at all".to_vec(), AudioMimeType::Mpeg);
        assert!(matches!(
            SymphoniaProbe::new().probe(&blob).await,
            Err(ProbeError::Unreadable(_))
        ));
    }
}
