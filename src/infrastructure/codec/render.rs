//! Offline render: channel mix, resample, gain

use rubato::{FftFixedIn, Resampler};

use crate::application::ports::{CodecError, RenderSettings};
use crate::domain::audio::{PcmBuffer, PcmFormat};

/// Resampler input chunk size (frames)
const CHUNK_SIZE: usize = 1024;

/// Apply `settings` to `pcm`
pub fn render(pcm: PcmBuffer, settings: &RenderSettings) -> Result<PcmBuffer, CodecError> {
    let mut pcm = match settings.channels {
        Some(channels) => pcm.mix_to_channels(channels),
        None => pcm,
    };

    if let Some(rate) = settings.sample_rate {
        if rate != pcm.format().sample_rate {
            pcm = resample(&pcm, rate)?;
        }
    }

    if let Some(peak) = settings.normalize_peak {
        pcm = pcm.normalize_peak(peak, settings.max_gain);
    }

    Ok(pcm)
}

/// Resample every channel to `target_rate`
pub fn resample(pcm: &PcmBuffer, target_rate: u32) -> Result<PcmBuffer, CodecError> {
    let format = pcm.format();
    let channels = format.channels as usize;
    if channels == 0 || format.sample_rate == 0 || target_rate == 0 {
        return Err(CodecError::Render(format!(
            "cannot resample {} Hz x{} to {} Hz",
            format.sample_rate, channels, target_rate
        )));
    }
    if pcm.is_empty() {
        return Ok(PcmBuffer::new(
            Vec::new(),
            PcmFormat::new(target_rate, format.channels),
        ));
    }

    // Deinterleave into per-channel f32 planes
    let frames = pcm.frames();
    let mut planes: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in pcm.samples().chunks_exact(channels) {
        for (plane, &s) in planes.iter_mut().zip(frame) {
            plane.push(s as f32 / 32768.0);
        }
    }

    let ratio = target_rate as f64 / format.sample_rate as f64;
    let output_len = (frames as f64 * ratio).ceil() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        format.sample_rate as usize,
        target_rate as usize,
        CHUNK_SIZE,
        2,
        channels,
    )
    .map_err(|e| CodecError::Render(format!("Resampler init failed: {}", e)))?;

    // The resampler lags its input by `delay` frames; keep feeding silence
    // until the tail has come out, then drop the lead-in
    let delay = resampler.output_delay();
    let wanted = delay + output_len;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];
    let mut input_pos = 0;

    while output[0].len() < wanted {
        let frames_needed = resampler.input_frames_next();
        let end_pos = (input_pos + frames_needed).min(frames);

        // Pad the last chunk with silence
        let chunk: Vec<Vec<f32>> = planes
            .iter()
            .map(|plane| {
                let mut part = plane[input_pos..end_pos].to_vec();
                part.resize(frames_needed, 0.0);
                part
            })
            .collect();

        let resampled = resampler
            .process(&chunk, None)
            .map_err(|e| CodecError::Render(format!("Resampling failed: {}", e)))?;
        if resampled[0].is_empty() {
            break;
        }
        for (out, res) in output.iter_mut().zip(resampled) {
            out.extend(res);
        }
        input_pos = end_pos;
    }

    // Interleave and trim to the expected length
    let available = output.iter().map(Vec::len).min().unwrap_or(0);
    let out_frames = available.saturating_sub(delay).min(output_len);
    let mut samples = Vec::with_capacity(out_frames * channels);
    for i in delay..delay + out_frames {
        for plane in &output {
            samples.push((plane[i] * 32767.0) as i16);
        }
    }

    Ok(PcmBuffer::new(
        samples,
        PcmFormat::new(target_rate, format.channels),
    ))
}
