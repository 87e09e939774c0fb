//! FLAC encoder
//!
//! Lossless and compact, so it is the preferred container for raw
//! captures and the output of the native conversion pipeline.
//! Any sample rate and channel layout; 16-bit samples.

use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config;
use flacenc::error::Verify;
use flacenc::source::MemSource;

use crate::domain::audio::PcmBuffer;

use super::EncodingError;

/// Bits per sample (16-bit audio)
const BITS_PER_SAMPLE: usize = 16;

/// Encode interleaved PCM to FLAC bytes
pub fn encode_flac(pcm: &PcmBuffer) -> Result<Vec<u8>, EncodingError> {
    let format = pcm.format();
    if format.channels == 0 || format.sample_rate == 0 {
        return Err(EncodingError::Config(format!(
            "invalid PCM layout: {} Hz, {} channels",
            format.sample_rate, format.channels
        )));
    }

    // flacenc works on i32 samples
    let samples_i32: Vec<i32> = pcm.samples().iter().map(|&s| s as i32).collect();

    let config = config::Encoder::default()
        .into_verified()
        .map_err(|(_, e)| EncodingError::Config(format!("{:?}", e)))?;

    let source = MemSource::from_samples(
        &samples_i32,
        format.channels as usize,
        BITS_PER_SAMPLE,
        format.sample_rate as usize,
    );

    let flac_stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
        .map_err(|e| EncodingError::Encode(format!("{:?}", e)))?;

    let mut sink = ByteSink::new();
    flac_stream
        .write(&mut sink)
        .map_err(|e| EncodingError::Write(e.to_string()))?;

    Ok(sink.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::PcmFormat;

    const MONO_44K: PcmFormat = PcmFormat::new(44_100, 1);

    #[test]
    fn encode_silence() {
        let silence = PcmBuffer::new(vec![0; 44_100], MONO_44K);
        let flac_data = encode_flac(&silence).unwrap();
        assert!(flac_data.len() > 50);
        assert_eq!(&flac_data[0..4], b"fLaC");
    }

    #[test]
    fn encode_stereo_signal_compresses() {
        let format = PcmFormat::new(16_000, 2);
        let samples: Vec<i16> = (0..16_000)
            .flat_map(|i| {
                let t = i as f32 / 16_000.0;
                let s = (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 16000.0) as i16;
                [s, s]
            })
            .collect();
        let pcm = PcmBuffer::new(samples, format);

        let flac_data = encode_flac(&pcm).unwrap();
        assert!(flac_data.len() < pcm.samples().len() * 2);
    }

    #[test]
    fn rejects_zero_channels() {
        let pcm = PcmBuffer::new(vec![0; 10], PcmFormat::new(16_000, 0));
        assert!(matches!(encode_flac(&pcm), Err(EncodingError::Config(_))));
    }
}
