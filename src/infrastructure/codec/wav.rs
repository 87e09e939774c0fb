//! WAV encoder, the capture fallback container

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::domain::audio::PcmBuffer;

use super::EncodingError;

/// Encode interleaved PCM to 16-bit WAV bytes
pub fn encode_wav(pcm: &PcmBuffer) -> Result<Vec<u8>, EncodingError> {
    let format = pcm.format();
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| EncodingError::Write(e.to_string()))?;
        for &sample in pcm.samples() {
            writer
                .write_sample(sample)
                .map_err(|e| EncodingError::Write(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| EncodingError::Write(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::PcmFormat;

    #[test]
    fn writes_riff_header_and_samples() {
        let pcm = PcmBuffer::new(vec![1, -1, 2, -2], PcmFormat::new(8_000, 2));
        let data = encode_wav(&pcm).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(data.len(), 44 + 8);
    }

    #[test]
    fn reads_back_with_hound() {
        let pcm = PcmBuffer::new(vec![100, 200, 300], PcmFormat::new(22_050, 1));
        let data = encode_wav(&pcm).unwrap();
        let reader = hound::WavReader::new(Cursor::new(data)).unwrap();
        assert_eq!(reader.spec().sample_rate, 22_050);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, 200, 300]);
    }
}
