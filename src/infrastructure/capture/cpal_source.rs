//! Microphone capture using cpal
//!
//! `cpal::Stream` is not `Send`, so every acquired device lives on its own
//! thread. The [`CaptureStream`] handle drives that thread through a
//! command channel: start emitting chunks, flush, release.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::application::ports::{AudioSource, CaptureConstraints, CaptureError, CaptureStream};
use crate::domain::audio::{AudioChunk, ContainerFormat, PcmBuffer, PcmFormat};
use crate::infrastructure::codec;

/// Sample rate used when the caller has no preference
const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// How often the capture thread checks for commands and full slices
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(20);

/// Upper bound on waiting for the capture thread to answer a command
const REPLY_TIMEOUT: StdDuration = StdDuration::from_secs(2);

/// Audio source for the host's default input device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalAudioSource;

impl CpalAudioSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioSource for CpalAudioSource {
    fn is_available(&self) -> bool {
        !cpal::available_hosts().is_empty()
    }

    fn supports(&self, format: ContainerFormat) -> bool {
        matches!(format, ContainerFormat::Flac | ContainerFormat::Wav)
    }

    async fn acquire(
        &self,
        constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (command_tx, command_rx) = mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || capture_thread(constraints, command_rx, ready_tx))
            .map_err(|e| CaptureError::Failed(format!("capture thread: {}", e)))?;

        let format = match ready_rx.await {
            Ok(result) => result?,
            Err(_) => {
                let _ = thread.join();
                return Err(CaptureError::Failed(
                    "capture thread exited before the device opened".to_string(),
                ));
            }
        };
        info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "capture device acquired"
        );

        Ok(Box::new(CpalCaptureStream {
            commands: command_tx,
            format,
            thread: Some(thread),
        }))
    }

    fn encode(&self, format: ContainerFormat, pcm: &PcmBuffer) -> Result<Vec<u8>, CaptureError> {
        codec::encode(pcm, format).map_err(|e| CaptureError::Failed(e.to_string()))
    }
}

enum Command {
    Start {
        timeslice: StdDuration,
        chunks: UnboundedSender<AudioChunk>,
        reply: Sender<Result<(), CaptureError>>,
    },
    Flush {
        reply: Sender<()>,
    },
    Release,
}

/// Handle to a device opened on the capture thread
pub struct CpalCaptureStream {
    commands: Sender<Command>,
    format: PcmFormat,
    thread: Option<JoinHandle<()>>,
}

impl CaptureStream for CpalCaptureStream {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn start(
        &mut self,
        timeslice: StdDuration,
        chunks: UnboundedSender<AudioChunk>,
    ) -> Result<(), CaptureError> {
        let (reply, response) = mpsc::channel();
        self.commands
            .send(Command::Start {
                timeslice,
                chunks,
                reply,
            })
            .map_err(|_| CaptureError::Failed("capture thread is gone".to_string()))?;
        response
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| CaptureError::Failed("capture thread did not start".to_string()))?
    }

    fn flush(&mut self) -> Result<(), CaptureError> {
        let (reply, response) = mpsc::channel();
        self.commands
            .send(Command::Flush { reply })
            .map_err(|_| CaptureError::Failed("capture thread is gone".to_string()))?;
        response
            .recv_timeout(REPLY_TIMEOUT)
            .map_err(|_| CaptureError::Failed("capture thread did not flush".to_string()))
    }

    fn release(&mut self) {
        let _ = self.commands.send(Command::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("capture thread panicked");
            }
        }
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owns the cpal stream for its whole life
fn capture_thread(
    constraints: CaptureConstraints,
    commands: Receiver<Command>,
    ready: oneshot::Sender<Result<PcmFormat, CaptureError>>,
) {
    let pending: Arc<Mutex<Vec<i16>>> = Arc::new(Mutex::new(Vec::new()));
    let capturing = Arc::new(AtomicBool::new(false));

    let opened = open_stream(&constraints, Arc::clone(&pending), Arc::clone(&capturing));
    let (stream, format) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(format)).is_err() {
        // Acquirer went away
        return;
    }

    let mut sink: Option<UnboundedSender<AudioChunk>> = None;
    let mut slice_len = 0usize;
    let mut sequence = 0u64;

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Start {
                timeslice,
                chunks,
                reply,
            }) => {
                let started = stream
                    .play()
                    .map_err(|e| classify_backend_error(&e.to_string()));
                if started.is_ok() {
                    slice_len = format
                        .samples_for_millis(timeslice.as_millis() as u64)
                        .max(format.channels as usize);
                    sequence = 0;
                    pending.lock().clear();
                    capturing.store(true, Ordering::SeqCst);
                    sink = Some(chunks);
                    debug!(slice_samples = slice_len, "capture started");
                }
                let _ = reply.send(started);
            }
            Ok(Command::Flush { reply }) => {
                capturing.store(false, Ordering::SeqCst);
                let _ = stream.pause();
                if let Some(tx) = sink.take() {
                    let rest = std::mem::take(&mut *pending.lock());
                    if !rest.is_empty() {
                        let _ = tx.send(AudioChunk {
                            sequence,
                            samples: rest,
                        });
                        sequence += 1;
                    }
                }
                let _ = reply.send(());
            }
            Ok(Command::Release) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if let Some(ref tx) = sink {
            let mut buffer = pending.lock();
            while slice_len > 0 && buffer.len() >= slice_len {
                let samples: Vec<i16> = buffer.drain(..slice_len).collect();
                if tx.send(AudioChunk { sequence, samples }).is_err() {
                    break;
                }
                sequence += 1;
            }
        }
    }

    capturing.store(false, Ordering::SeqCst);
    drop(stream);
    debug!("capture device released");
}

/// Open the default input device, paused, emitting mono i16
fn open_stream(
    constraints: &CaptureConstraints,
    pending: Arc<Mutex<Vec<i16>>>,
    capturing: Arc<AtomicBool>,
) -> Result<(cpal::Stream, PcmFormat), CaptureError> {
    if constraints.echo_cancellation || constraints.noise_suppression || constraints.auto_gain_control {
        debug!("input processing is left to the host audio stack");
    }

    let device = get_input_device()?;
    let preferred_rate = constraints.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
    let (config, sample_format) = get_input_config(&device, preferred_rate)?;
    let channels = config.channels;

    let on_error = |err: cpal::StreamError| warn!(error = %err, "audio stream error");

    let stream = match sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if capturing.load(Ordering::SeqCst) {
                    let mono = mix_to_mono(data, channels);
                    pending.lock().extend_from_slice(&mono);
                }
            },
            on_error,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if capturing.load(Ordering::SeqCst) {
                    let i16_data: Vec<i16> = data.iter().map(|&s| (s * 32767.0) as i16).collect();
                    let mono = mix_to_mono(&i16_data, channels);
                    pending.lock().extend_from_slice(&mono);
                }
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::Unsupported(format!(
                "sample format {:?}",
                other
            )))
        }
    }
    .map_err(map_build_error)?;

    // Some hosts start streams immediately
    let _ = stream.pause();

    Ok((stream, PcmFormat::new(config.sample_rate.0, 1)))
}

fn get_input_device() -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    host.default_input_device()
        .ok_or(CaptureError::DeviceNotFound)
}

/// Pick an i16/f32 config, preferring fewer channels and ranges that
/// include `preferred_rate`
fn get_input_config(
    device: &cpal::Device,
    preferred_rate: u32,
) -> Result<(StreamConfig, SampleFormat), CaptureError> {
    let supported_configs = device
        .supported_input_configs()
        .map_err(|e| classify_backend_error(&e.to_string()))?;

    let includes = |c: &cpal::SupportedStreamConfigRange| {
        c.min_sample_rate().0 <= preferred_rate && c.max_sample_rate().0 >= preferred_rate
    };

    let mut best: Option<cpal::SupportedStreamConfigRange> = None;
    for config in supported_configs {
        if config.sample_format() != SampleFormat::I16
            && config.sample_format() != SampleFormat::F32
        {
            continue;
        }
        let is_better = match &best {
            None => true,
            Some(current) => {
                (includes(&config) && !includes(current))
                    || (includes(&config) == includes(current)
                        && config.channels() < current.channels())
            }
        };
        if is_better {
            best = Some(config);
        }
    }

    let range = best.ok_or_else(|| {
        CaptureError::Unsupported("no 16-bit or float input configuration".to_string())
    })?;

    let sample_rate = if includes(&range) {
        SampleRate(preferred_rate)
    } else {
        range.max_sample_rate()
    };

    let sample_format = range.sample_format();
    let config = StreamConfig {
        channels: range.channels(),
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };
    Ok((config, sample_format))
}

/// Average interleaved frames down to one channel
fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / frame.len() as i32) as i16
        })
        .collect()
}

fn map_build_error(err: BuildStreamError) -> CaptureError {
    match err {
        BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        BuildStreamError::StreamConfigNotSupported => {
            CaptureError::Unsupported("stream configuration not supported".to_string())
        }
        other => classify_backend_error(&other.to_string()),
    }
}

/// Sort a backend error message into the capture taxonomy
pub(crate) fn classify_backend_error(message: &str) -> CaptureError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["permission", "denied", "not permitted", "access"]) {
        CaptureError::PermissionDenied(message.to_string())
    } else if has(&["busy", "in use", "resource temporarily unavailable"]) {
        CaptureError::DeviceBusy(message.to_string())
    } else if has(&["sandbox", "policy", "blocked"]) {
        CaptureError::SecurityPolicyBlocked(message.to_string())
    } else if has(&["no such device", "not found", "no device"]) {
        CaptureError::DeviceNotFound
    } else {
        CaptureError::Failed(message.to_string())
    }
}
