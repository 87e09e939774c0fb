//! Recorder session
//!
//! Owns one capture stream at a time, buffers its chunks in arrival order
//! and finalizes them into a single raw blob. Every acquired stream is
//! released exactly once, whichever way the session ends.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::domain::audio::{AudioBlob, AudioChunk, ContainerFormat, PcmBuffer, PcmFormat};
use crate::domain::recording::{RecordingLifecycle, RecordingState};

use super::ports::{AudioSource, CaptureConstraints, CaptureError, CaptureStream};

/// Recorder tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderSettings {
    /// Length of each emitted chunk
    pub timeslice: StdDuration,
    pub constraints: CaptureConstraints,
    /// Container preference, most preferred first
    pub containers: Vec<ContainerFormat>,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            timeslice: StdDuration::from_secs(1),
            constraints: CaptureConstraints::default(),
            containers: ContainerFormat::CAPTURE_PREFERENCE.to_vec(),
        }
    }
}

/// A finalized capture
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecording {
    pub blob: AudioBlob,
    pub container: ContainerFormat,
    /// Length of the captured audio
    pub duration_seconds: f64,
    pub chunk_count: usize,
}

#[derive(Default)]
struct SessionInner {
    lifecycle: RecordingLifecycle,
    abort_requested: bool,
    stream: Option<Box<dyn CaptureStream>>,
    chunk_rx: Option<UnboundedReceiver<AudioChunk>>,
    chunks: Vec<AudioChunk>,
    container: Option<ContainerFormat>,
    pcm_format: Option<PcmFormat>,
    last_recording: Option<RawRecording>,
}

impl SessionInner {
    /// Move everything the stream has sent so far into the buffer
    fn drain_chunks(&mut self) {
        if let Some(rx) = self.chunk_rx.as_mut() {
            while let Ok(chunk) = rx.try_recv() {
                self.chunks.push(chunk);
            }
        }
    }

    /// Detach the held stream and its channel. A second call yields nothing,
    /// so each stream is released by exactly one caller.
    fn take_stream(&mut self) -> Option<HeldStream> {
        let stream = self.stream.take()?;
        Some(HeldStream {
            stream,
            chunk_rx: self.chunk_rx.take(),
        })
    }
}

/// A stream taken out of the session so it can be torn down without the lock
struct HeldStream {
    stream: Box<dyn CaptureStream>,
    chunk_rx: Option<UnboundedReceiver<AudioChunk>>,
}

impl HeldStream {
    fn release(mut self) {
        self.stream.release();
        debug!("capture stream released");
    }
}

/// Recorder session over an [`AudioSource`]
pub struct RecorderSession {
    source: Arc<dyn AudioSource>,
    settings: RecorderSettings,
    inner: Mutex<SessionInner>,
}

impl RecorderSession {
    pub fn new(source: Arc<dyn AudioSource>, settings: RecorderSettings) -> Self {
        Self {
            source,
            settings,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.inner.lock().lifecycle.state()
    }

    /// Container chosen for the current or last capture
    pub fn container(&self) -> Option<ContainerFormat> {
        self.inner.lock().container
    }

    /// Chunks buffered so far in the current capture
    pub fn chunk_count(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.drain_chunks();
        inner.chunks.len()
    }

    /// Result of the last successful stop
    pub fn last_recording(&self) -> Option<RawRecording> {
        self.inner.lock().last_recording.clone()
    }

    fn select_container(&self) -> Option<ContainerFormat> {
        self.settings
            .containers
            .iter()
            .copied()
            .find(|f| self.source.supports(*f))
    }

    /// Acquire the device and begin chunked capture.
    ///
    /// Fails without touching hardware when capture is unsupported. If a
    /// stop or cancel arrives while the device is being acquired, the
    /// stream is released as soon as it resolves and `Cancelled` is
    /// returned.
    pub async fn start(&self) -> Result<(), CaptureError> {
        {
            let mut inner = self.inner.lock();
            let state = inner.lifecycle.state();
            if state.is_active() {
                return Err(CaptureError::Failed(format!(
                    "a recording session is already {}",
                    state
                )));
            }
            if !self.source.is_available() {
                return Err(CaptureError::Unsupported(
                    "no audio capture backend available".to_string(),
                ));
            }
            let container = self.select_container().ok_or_else(|| {
                CaptureError::Unsupported("no supported recording format".to_string())
            })?;

            inner
                .lifecycle
                .begin_acquire()
                .map_err(|e| CaptureError::Failed(e.to_string()))?;
            inner.abort_requested = false;
            inner.chunks.clear();
            inner.container = Some(container);
            inner.pcm_format = None;
            debug!(container = %container, "acquiring capture device");
        }

        let acquired = self.source.acquire(self.settings.constraints).await;

        let mut inner = self.inner.lock();
        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(e) => {
                let _ = inner.lifecycle.acquire_failed();
                warn!(error = %e, "failed to acquire capture device");
                return Err(e);
            }
        };

        if inner.abort_requested {
            let _ = inner.lifecycle.abort();
            drop(inner);
            stream.release();
            info!("recording cancelled while acquiring the device");
            return Err(CaptureError::Cancelled);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = stream.start(self.settings.timeslice, tx) {
            let _ = inner.lifecycle.acquire_failed();
            drop(inner);
            stream.release();
            warn!(error = %e, "failed to start capture");
            return Err(e);
        }

        inner.pcm_format = Some(stream.format());
        inner.stream = Some(stream);
        inner.chunk_rx = Some(rx);
        let _ = inner.lifecycle.acquired();
        info!("recording started");
        Ok(())
    }

    /// Finish the capture and build the raw blob.
    ///
    /// Idempotent: returns `Ok(None)` when nothing is recording. A stop
    /// during acquisition defers teardown to when the device resolves.
    ///
    /// Flushing and releasing the device may block on the audio thread;
    /// they run without holding the session lock.
    pub fn stop(&self) -> Result<Option<RawRecording>, CaptureError> {
        let (held, mut chunks, container, format) = {
            let mut inner = self.inner.lock();
            match inner.lifecycle.state() {
                RecordingState::Acquiring => {
                    inner.abort_requested = true;
                    return Ok(None);
                }
                RecordingState::Recording => {}
                _ => return Ok(None),
            }
            let _ = inner.lifecycle.begin_stop();
            inner.drain_chunks();
            (
                inner.take_stream(),
                std::mem::take(&mut inner.chunks),
                inner.container,
                inner.pcm_format,
            )
        };

        let flushed = match held {
            Some(mut held) => {
                let flushed = held.stream.flush();
                if let Some(rx) = held.chunk_rx.as_mut() {
                    while let Ok(chunk) = rx.try_recv() {
                        chunks.push(chunk);
                    }
                }
                held.release();
                flushed
            }
            None => Ok(()),
        };

        let result = flushed.and_then(|_| self.finalize(chunks, container, format));

        let mut inner = self.inner.lock();
        let _ = inner.lifecycle.finish_stop();
        match result {
            Ok(recording) => {
                info!(
                    bytes = recording.blob.size_bytes(),
                    duration_s = recording.duration_seconds,
                    chunks = recording.chunk_count,
                    "recording finalized"
                );
                inner.last_recording = Some(recording.clone());
                Ok(Some(recording))
            }
            Err(e) => {
                warn!(error = %e, "failed to finalize recording");
                Err(e)
            }
        }
    }

    /// Tear down without producing a blob
    pub fn cancel(&self) {
        let held = {
            let mut inner = self.inner.lock();
            match inner.lifecycle.state() {
                RecordingState::Acquiring => {
                    inner.abort_requested = true;
                    return;
                }
                RecordingState::Recording => {
                    inner.chunks.clear();
                    let _ = inner.lifecycle.abort();
                    info!("recording cancelled");
                    inner.take_stream()
                }
                _ => return,
            }
        };
        if let Some(held) = held {
            held.release();
        }
    }

    fn finalize(
        &self,
        chunks: Vec<AudioChunk>,
        container: Option<ContainerFormat>,
        format: Option<PcmFormat>,
    ) -> Result<RawRecording, CaptureError> {
        let (Some(container), Some(format)) = (container, format) else {
            return Err(CaptureError::Failed("capture format unknown".to_string()));
        };
        let chunk_count = chunks.len();
        let pcm = PcmBuffer::from_chunks(chunks, format);
        if pcm.is_empty() {
            return Err(CaptureError::Failed("no audio data captured".to_string()));
        }

        let data = self.source.encode(container, &pcm)?;
        Ok(RawRecording {
            blob: AudioBlob::new(data, container.mime_type()),
            container,
            duration_seconds: pcm.duration_seconds(),
            chunk_count,
        })
    }
}

impl Drop for RecorderSession {
    fn drop(&mut self) {
        if let Some(held) = self.inner.get_mut().take_stream() {
            held.release();
        }
    }
}
