//! Fake ports shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use phrase_recorder::application::ports::{
    AudioSource, CaptureConstraints, CaptureError, CaptureStream, EngineError, MetadataProbe,
    NativeCodec, PlatformProbe, ProbeError, ProbedMetadata, RatioCallback, Transcoder,
    TranscoderLoader,
};
use phrase_recorder::application::{
    AvailabilityGate, ConverterSettings, FormatConverter, NativeStrategy, SharedTranscoder,
    TranscoderStrategy,
};
use phrase_recorder::domain::audio::{
    AudioBlob, AudioChunk, ContainerFormat, PcmBuffer, PcmFormat,
};
use phrase_recorder::infrastructure::SymphoniaCodec;

pub const CAPTURE_FORMAT: PcmFormat = PcmFormat::new(8_000, 1);

#[derive(Default)]
pub struct DeviceCounters {
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl DeviceCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Microphone that produces a fixed amount of audio per capture
pub struct FakeSource {
    pub counters: Arc<DeviceCounters>,
    fail_with: Mutex<Option<CaptureError>>,
    captured_seconds: f64,
    acquire_delay: Option<StdDuration>,
}

impl FakeSource {
    pub fn new(captured_seconds: f64) -> Self {
        Self {
            counters: Arc::new(DeviceCounters::default()),
            fail_with: Mutex::new(None),
            captured_seconds,
            acquire_delay: None,
        }
    }

    /// Device whose permission prompt takes `delay` to resolve
    pub fn with_acquire_delay(mut self, delay: StdDuration) -> Self {
        self.acquire_delay = Some(delay);
        self
    }

    pub fn failing(error: CaptureError) -> Self {
        let source = Self::new(1.0);
        *source.fail_with.lock() = Some(error);
        source
    }
}

#[async_trait]
impl AudioSource for FakeSource {
    fn is_available(&self) -> bool {
        true
    }

    fn supports(&self, format: ContainerFormat) -> bool {
        format == ContainerFormat::Flac
    }

    async fn acquire(
        &self,
        _constraints: CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, CaptureError> {
        if let Some(delay) = self.acquire_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = self.fail_with.lock().clone() {
            return Err(e);
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            counters: Arc::clone(&self.counters),
            samples: (self.captured_seconds * CAPTURE_FORMAT.sample_rate as f64) as usize,
        }))
    }

    fn encode(&self, _format: ContainerFormat, pcm: &PcmBuffer) -> Result<Vec<u8>, CaptureError> {
        let mut data = b"fLaC".to_vec();
        data.extend(pcm.samples().iter().map(|&s| s as u8));
        Ok(data)
    }
}

struct FakeStream {
    counters: Arc<DeviceCounters>,
    samples: usize,
}

impl CaptureStream for FakeStream {
    fn format(&self) -> PcmFormat {
        CAPTURE_FORMAT
    }

    fn start(
        &mut self,
        _timeslice: StdDuration,
        chunks: UnboundedSender<AudioChunk>,
    ) -> Result<(), CaptureError> {
        let _ = chunks.send(AudioChunk {
            sequence: 0,
            samples: vec![0; self.samples],
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn release(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Host capabilities fixed at construction
pub struct FakePlatform {
    pub shared_memory: bool,
    pub secure: bool,
    pub recorder: bool,
}

impl FakePlatform {
    pub fn capable() -> Self {
        Self {
            shared_memory: true,
            secure: true,
            recorder: true,
        }
    }
}

impl PlatformProbe for FakePlatform {
    fn shared_memory_supported(&self) -> bool {
        self.shared_memory
    }

    fn secure_context(&self) -> bool {
        self.secure
    }

    fn recorder_api_supported(&self) -> bool {
        self.recorder
    }
}

/// In-memory transcoder that "encodes" by prefixing an ID3 tag
#[derive(Default)]
pub struct FakeTranscoder {
    files: Mutex<HashMap<String, Vec<u8>>>,
    pub runs: AtomicUsize,
    pub last_args: Mutex<Vec<String>>,
    pub fail_runs: bool,
}

impl FakeTranscoder {
    pub fn failing() -> Self {
        Self {
            fail_runs: true,
            ..Self::default()
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn describe(&self) -> String {
        "fake transcoder".to_string()
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        self.files.lock().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn run(
        &self,
        args: &[String],
        _media_duration: Option<StdDuration>,
        on_ratio: Option<RatioCallback>,
    ) -> Result<(), EngineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock() = args.to_vec();
        if self.fail_runs {
            return Err(EngineError::RunFailed("encoder crashed".to_string()));
        }

        let input = args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .ok_or_else(|| EngineError::RunFailed("no input".to_string()))?;
        let output = args
            .last()
            .cloned()
            .ok_or_else(|| EngineError::RunFailed("no output".to_string()))?;

        if let Some(cb) = on_ratio {
            cb(0.5);
            cb(1.0);
        }

        let mut files = self.files.lock();
        let size = files.get(&input).map(Vec::len).unwrap_or(0);
        let mut data = b"ID3".to_vec();
        data.resize(3 + size / 4, 0);
        files.insert(output, data);
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineError> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Io(format!("{}: not found", name)))
    }

    async fn remove_file(&self, name: &str) -> Result<(), EngineError> {
        self.files.lock().remove(name);
        Ok(())
    }
}

/// Loader that counts loads and can be told to fail
pub struct FakeLoader {
    pub engine: Arc<FakeTranscoder>,
    pub loads: AtomicUsize,
    pub fail: bool,
    pub delay: StdDuration,
}

impl FakeLoader {
    pub fn new(engine: Arc<FakeTranscoder>) -> Self {
        Self {
            engine,
            loads: AtomicUsize::new(0),
            fail: false,
            delay: StdDuration::from_millis(50),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Arc::new(FakeTranscoder::default()))
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscoderLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn Transcoder>, EngineError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(EngineError::NotFound("ffmpeg".to_string()));
        }
        Ok(Arc::clone(&self.engine) as Arc<dyn Transcoder>)
    }
}

/// Probe answering with fixed metadata
pub struct FakeProbe {
    pub metadata: Option<ProbedMetadata>,
    pub calls: AtomicUsize,
}

impl FakeProbe {
    pub fn returning(metadata: ProbedMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            metadata: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MetadataProbe for FakeProbe {
    async fn probe(&self, _blob: &AudioBlob) -> Result<ProbedMetadata, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.metadata
            .ok_or_else(|| ProbeError::Unreadable("not audio".to_string()))
    }
}

pub fn mono_44k(duration_seconds: f64) -> ProbedMetadata {
    ProbedMetadata {
        duration_seconds: Some(duration_seconds),
        sample_rate: Some(44_100),
        channels: Some(1),
    }
}

/// Converter over the given fakes. `native` adds the real symphonia pipeline.
pub fn converter(
    platform: FakePlatform,
    loader: Arc<FakeLoader>,
    probe: Arc<FakeProbe>,
    native: bool,
    settings: ConverterSettings,
) -> Arc<FormatConverter> {
    let engine = Arc::new(SharedTranscoder::new(loader));
    let codec: Arc<dyn NativeCodec> = Arc::new(SymphoniaCodec::new());
    let gate = Arc::new(AvailabilityGate::new(
        Arc::new(platform),
        Arc::clone(&engine),
        native.then(|| Arc::clone(&codec)),
        native,
    ));
    Arc::new(FormatConverter::new(
        gate,
        TranscoderStrategy::new(engine),
        native.then(|| NativeStrategy::new(codec)),
        probe,
        settings,
    ))
}
