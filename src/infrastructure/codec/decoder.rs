//! Decoding with symphonia

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecParameters, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::application::ports::CodecError;
use crate::domain::audio::{AudioBlob, PcmBuffer, PcmFormat};

/// Open `blob` with symphonia's format probe and return the reader with
/// the id and parameters of its first audio track
pub(crate) fn open_track(
    blob: &AudioBlob,
) -> Result<(Box<dyn FormatReader>, u32, CodecParameters), SymphoniaError> {
    let cursor = Cursor::new(blob.data().to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(blob.mime_type().extension());
    hint.mime_type(blob.mime_type().as_str());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let reader = probed.format;

    let (track_id, params) = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .map(|t| (t.id, t.codec_params.clone()))
        .ok_or(SymphoniaError::Unsupported("no audio track"))?;

    Ok((reader, track_id, params))
}

/// Whether a reader error means the stream simply ended
pub(crate) fn is_end_of_stream(err: &SymphoniaError) -> bool {
    match err {
        SymphoniaError::IoError(e) => e.kind() == std::io::ErrorKind::UnexpectedEof,
        SymphoniaError::ResetRequired => true,
        _ => false,
    }
}

/// Decode any supported container to interleaved 16-bit PCM
pub fn decode_to_pcm(blob: &AudioBlob) -> Result<PcmBuffer, CodecError> {
    if blob.is_empty() {
        return Err(CodecError::UnsupportedInput("empty input".to_string()));
    }

    let (mut reader, track_id, params) =
        open_track(blob).map_err(|e| CodecError::UnsupportedInput(e.to_string()))?;
    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| CodecError::UnsupportedInput(e.to_string()))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut format: Option<PcmFormat> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(e) if is_end_of_stream(&e) => break,
            Err(e) => return Err(CodecError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
                format.get_or_insert(PcmFormat::new(spec.rate, spec.channels.count() as u16));
            }
            // Corrupt packets are skipped
            Err(SymphoniaError::DecodeError(e)) => debug!(error = e, "skipping bad packet"),
            Err(e) => return Err(CodecError::Decode(e.to_string())),
        }
    }

    let format = format
        .or_else(|| {
            let rate = params.sample_rate?;
            let channels = params.channels?.count() as u16;
            Some(PcmFormat::new(rate, channels))
        })
        .ok_or_else(|| CodecError::Decode("stream has no audio".to_string()))?;

    Ok(PcmBuffer::new(samples, format))
}
