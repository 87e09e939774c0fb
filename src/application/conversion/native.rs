//! Native conversion strategy
//!
//! Decode, re-render and re-encode in process. The codec work is CPU bound
//! and runs on a blocking thread while a ticker reports estimated progress.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::application::ports::{NativeCodec, RenderSettings};
use crate::domain::audio::AudioBlob;
use crate::domain::conversion::EncodePlan;

use super::progress::ProgressReporter;
use super::ConversionError;

/// Estimated progress never passes this until the work is done
const SYNTHETIC_PROGRESS_CAP: f64 = 95.0;

/// Converts through a [`NativeCodec`]
pub struct NativeStrategy {
    codec: Arc<dyn NativeCodec>,
    tick: StdDuration,
}

impl NativeStrategy {
    pub fn new(codec: Arc<dyn NativeCodec>) -> Self {
        Self {
            codec,
            tick: StdDuration::from_millis(100),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.codec.is_supported()
    }

    pub async fn convert(
        &self,
        input: &AudioBlob,
        plan: &EncodePlan,
        media_duration: Option<f64>,
        progress: Arc<ProgressReporter>,
    ) -> Result<AudioBlob, ConversionError> {
        let format = self
            .codec
            .output_formats()
            .into_iter()
            .next()
            .ok_or(ConversionError::Unsupported)?;
        let settings = RenderSettings {
            sample_rate: plan.sample_rate,
            channels: plan.channels,
            ..RenderSettings::default()
        };
        debug!(format = %format, ?settings, "running native pipeline");

        let _ticker = TickerGuard(tokio::spawn(estimate_progress(
            Arc::clone(&progress),
            media_duration.filter(|d| d.is_finite() && *d > 0.0).unwrap_or(1.0),
            self.tick,
        )));

        let codec = Arc::clone(&self.codec);
        let blob = input.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let pcm = codec.decode(&blob)?;
            let rendered = codec.render(pcm, &settings)?;
            codec.encode(&rendered, format)
        })
        .await;

        let data = outcome
            .map_err(|e| ConversionError::Failed(format!("native pipeline panicked: {}", e)))??;
        Ok(AudioBlob::new(data, format.mime_type()))
    }
}

/// Stops the progress ticker when the conversion finishes or its future is
/// dropped
struct TickerGuard(JoinHandle<()>);

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Time-proportional progress, assuming the work takes about as long as
/// the media itself
async fn estimate_progress(progress: Arc<ProgressReporter>, estimate_s: f64, tick: StdDuration) {
    let started = Instant::now();
    let mut interval = time::interval(tick);
    loop {
        interval.tick().await;
        let elapsed = started.elapsed().as_secs_f64();
        let percent = (elapsed / estimate_s * 100.0).min(SYNTHETIC_PROGRESS_CAP);
        progress.report_percent(percent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn estimate_caps_below_completion() {
        let progress = Arc::new(ProgressReporter::new(1, None, None));
        progress.start();
        let task = tokio::spawn(estimate_progress(
            Arc::clone(&progress),
            1.0,
            StdDuration::from_millis(100),
        ));

        time::sleep(StdDuration::from_millis(550)).await;
        let midway = progress.percent();
        assert!((40..=60).contains(&midway), "midway was {}", midway);

        time::sleep(StdDuration::from_secs(3)).await;
        assert_eq!(progress.percent(), 95);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_guard_stops_the_ticker() {
        let progress = Arc::new(ProgressReporter::new(1, None, None));
        progress.start();
        let guard = TickerGuard(tokio::spawn(estimate_progress(
            Arc::clone(&progress),
            10.0,
            StdDuration::from_millis(100),
        )));

        time::sleep(StdDuration::from_millis(1050)).await;
        drop(guard);
        let frozen = progress.percent();
        assert!(frozen > 0);

        time::sleep(StdDuration::from_secs(5)).await;
        assert_eq!(progress.percent(), frozen);
    }
}
