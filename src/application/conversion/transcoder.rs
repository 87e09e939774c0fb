//! Transcoder conversion strategy

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tracing::{debug, warn};

use crate::application::ports::{RatioCallback, Transcoder};
use crate::domain::audio::{AudioBlob, AudioMimeType};
use crate::domain::conversion::EncodePlan;

use super::engine::SharedTranscoder;
use super::progress::ProgressReporter;
use super::ConversionError;

/// Converts through the shared transcoder engine into MP3
pub struct TranscoderStrategy {
    engine: Arc<SharedTranscoder>,
}

impl TranscoderStrategy {
    pub fn new(engine: Arc<SharedTranscoder>) -> Self {
        Self { engine }
    }

    /// Workspace file names for job `id`
    pub fn file_names(id: u64, input: &AudioBlob) -> (String, String) {
        (
            format!("input-{}.{}", id, input.mime_type().extension()),
            format!("output-{}.mp3", id),
        )
    }

    /// Run one conversion job.
    ///
    /// Both workspace files are removed afterwards whatever the outcome.
    pub async fn convert(
        &self,
        input: &AudioBlob,
        plan: &EncodePlan,
        media_duration: Option<f64>,
        progress: Arc<ProgressReporter>,
    ) -> Result<AudioBlob, ConversionError> {
        let engine = self.engine.get().await?;
        let (input_name, output_name) = Self::file_names(progress.job_id(), input);

        let result = run_job(
            engine.as_ref(),
            input,
            plan,
            &input_name,
            &output_name,
            media_duration,
            progress,
        )
        .await;

        for name in [&input_name, &output_name] {
            if let Err(e) = engine.remove_file(name).await {
                warn!(file = %name, error = %e, "failed to clean up transcoder workspace");
            }
        }

        result
    }
}

async fn run_job(
    engine: &dyn Transcoder,
    input: &AudioBlob,
    plan: &EncodePlan,
    input_name: &str,
    output_name: &str,
    media_duration: Option<f64>,
    progress: Arc<ProgressReporter>,
) -> Result<AudioBlob, ConversionError> {
    engine.write_file(input_name, input.data()).await?;

    let args = plan.transcoder_args(input_name, output_name);
    debug!(args = ?args, "running transcoder");

    let on_ratio: RatioCallback = Arc::new(move |ratio| progress.report_ratio(ratio));
    let duration = media_duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(StdDuration::from_secs_f64);
    engine.run(&args, duration, Some(on_ratio)).await?;

    let data = engine.read_file(output_name).await?;
    if data.is_empty() {
        return Err(ConversionError::Failed(
            "transcoder produced no output".to_string(),
        ));
    }
    Ok(AudioBlob::new(data, AudioMimeType::Mpeg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::AudioMimeType;

    #[test]
    fn file_names_use_job_id_and_input_extension() {
        let blob = AudioBlob::new(vec![1, 2, 3], AudioMimeType::Wav);
        let (input, output) = TranscoderStrategy::file_names(42, &blob);
        assert_eq!(input, "input-42.wav");
        assert_eq!(output, "output-42.mp3");
    }
}
