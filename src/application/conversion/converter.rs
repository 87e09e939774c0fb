//! Format converter

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tracing::{debug, info, warn};

use crate::application::availability::AvailabilityGate;
use crate::application::ports::{MetadataProbe, ProbeError, ProbedMetadata};
use crate::domain::audio::AudioBlob;
use crate::domain::config::AppConfig;
use crate::domain::conversion::{
    AudioMetadata, ConversionOptions, ConversionResult, EncodePlan, StrategyKind,
    FALLBACK_CHANNELS, FALLBACK_SAMPLE_RATE,
};

use super::native::NativeStrategy;
use super::progress::ProgressReporter;
use super::transcoder::TranscoderStrategy;
use super::{ConversionError, ConversionProgressCallback};

/// Converter behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConverterSettings {
    /// Return the raw blob when no strategy is usable
    pub allow_pass_through: bool,
    /// Deadline for every metadata probe
    pub probe_timeout: StdDuration,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            allow_pass_through: false,
            probe_timeout: StdDuration::from_secs(2),
        }
    }
}

impl From<&AppConfig> for ConverterSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            allow_pass_through: config.allow_pass_through_or_default(),
            ..Self::default()
        }
    }
}

/// Converts raw captures into compressed blobs
pub struct FormatConverter {
    gate: Arc<AvailabilityGate>,
    transcoder: TranscoderStrategy,
    native: Option<NativeStrategy>,
    probe: Arc<dyn MetadataProbe>,
    settings: ConverterSettings,
    next_job_id: AtomicU64,
}

impl FormatConverter {
    pub fn new(
        gate: Arc<AvailabilityGate>,
        transcoder: TranscoderStrategy,
        native: Option<NativeStrategy>,
        probe: Arc<dyn MetadataProbe>,
        settings: ConverterSettings,
    ) -> Self {
        Self {
            gate,
            transcoder,
            native,
            probe,
            settings,
            next_job_id: AtomicU64::new(1),
        }
    }

    pub fn gate(&self) -> &AvailabilityGate {
        &self.gate
    }

    /// Convert `raw` according to `options`.
    ///
    /// # Arguments
    /// * `raw` - Captured audio
    /// * `options` - Quality, bitrate and format overrides
    /// * `on_progress` - Called whenever the job's percentage moves forward
    ///
    /// # Returns
    /// The compressed blob with its metadata, the raw blob when passing
    /// through, or `ConversionError::Unsupported` when nothing can run
    pub async fn convert(
        &self,
        raw: &AudioBlob,
        options: &ConversionOptions,
        on_progress: Option<ConversionProgressCallback>,
    ) -> Result<ConversionResult, ConversionError> {
        options.validate()?;
        let plan = options.plan();

        let strategy = self.gate.strategy().await;
        let Some(strategy) = strategy else {
            if self.settings.allow_pass_through {
                info!("no conversion strategy available, passing raw recording through");
                return Ok(self.pass_through(raw).await);
            }
            return Err(ConversionError::Unsupported);
        };

        let input_meta = self.probe_with_timeout(raw).await;
        let job_id = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        let progress = Arc::new(ProgressReporter::new(
            job_id,
            input_meta.duration_seconds,
            on_progress,
        ));
        progress.start();
        info!(
            job_id,
            strategy = %strategy,
            bitrate_kbps = plan.bitrate_kbps,
            input_bytes = raw.size_bytes(),
            "conversion started"
        );

        let outcome = match strategy {
            StrategyKind::Transcoder => {
                self.transcoder
                    .convert(raw, &plan, input_meta.duration_seconds, Arc::clone(&progress))
                    .await
            }
            StrategyKind::Native => match self.native.as_ref() {
                Some(native) => {
                    native
                        .convert(raw, &plan, input_meta.duration_seconds, Arc::clone(&progress))
                        .await
                }
                None => Err(ConversionError::Unsupported),
            },
            StrategyKind::PassThrough => Ok(raw.clone()),
        };

        let compressed = match outcome {
            Ok(blob) => blob,
            Err(e) => {
                progress.fail();
                warn!(job_id, error = %e, "conversion failed");
                return Err(e);
            }
        };
        progress.succeed();

        let output_meta = self.probe_with_timeout(&compressed).await;
        let result = build_result(compressed, &plan, &input_meta, &output_meta, strategy);
        info!(
            job_id,
            output_bytes = result.byte_size,
            ratio = %format!("{:.2}", result.size_ratio(raw.size_bytes())),
            "conversion finished"
        );
        Ok(result)
    }

    async fn pass_through(&self, raw: &AudioBlob) -> ConversionResult {
        let meta = self.probe_with_timeout(raw).await;
        ConversionResult {
            compressed: raw.clone(),
            duration_seconds: meta.duration_seconds.unwrap_or(0.0),
            byte_size: raw.size_bytes(),
            metadata: AudioMetadata {
                bitrate_kbps: 0,
                sample_rate: meta.sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE),
                channels: meta.channels.unwrap_or(FALLBACK_CHANNELS),
            },
            strategy: StrategyKind::PassThrough,
        }
    }

    /// Probe under the configured deadline. Failures yield unknown fields.
    async fn probe_with_timeout(&self, blob: &AudioBlob) -> ProbedMetadata {
        let probed = tokio::time::timeout(self.settings.probe_timeout, self.probe.probe(blob))
            .await
            .unwrap_or(Err(ProbeError::Timeout));
        match probed {
            Ok(meta) => meta,
            Err(e) => {
                match e.kind() {
                    Some(kind) => debug!(key = kind.message_key(), "metadata probe fell back"),
                    None => debug!(error = %e, "metadata probe fell back"),
                }
                ProbedMetadata::default()
            }
        }
    }
}

fn build_result(
    compressed: AudioBlob,
    plan: &EncodePlan,
    input: &ProbedMetadata,
    output: &ProbedMetadata,
    strategy: StrategyKind,
) -> ConversionResult {
    let duration_seconds = output
        .duration_seconds
        .or(input.duration_seconds)
        .unwrap_or(0.0);
    let sample_rate = output
        .sample_rate
        .or(plan.sample_rate)
        .unwrap_or(FALLBACK_SAMPLE_RATE);
    let channels = output
        .channels
        .or(plan.channels)
        .unwrap_or(FALLBACK_CHANNELS);

    ConversionResult {
        byte_size: compressed.size_bytes(),
        compressed,
        duration_seconds,
        metadata: AudioMetadata {
            bitrate_kbps: plan.bitrate_kbps,
            sample_rate,
            channels,
        },
        strategy,
    }
}
