//! Progress tracking for one conversion job

use parking_lot::Mutex;

use crate::domain::conversion::{ConversionJob, ConversionProgress, JobStatus};

use super::ConversionProgressCallback;

/// Wraps a [`ConversionJob`] and forwards every forward step to the caller
pub struct ProgressReporter {
    job: Mutex<ConversionJob>,
    duration_seconds: Option<f64>,
    callback: Option<ConversionProgressCallback>,
}

impl ProgressReporter {
    pub fn new(
        job_id: u64,
        duration_seconds: Option<f64>,
        callback: Option<ConversionProgressCallback>,
    ) -> Self {
        Self {
            job: Mutex::new(ConversionJob::new(job_id)),
            duration_seconds,
            callback,
        }
    }

    pub fn job_id(&self) -> u64 {
        self.job.lock().id()
    }

    pub fn status(&self) -> JobStatus {
        self.job.lock().status()
    }

    pub fn percent(&self) -> u8 {
        self.job.lock().progress_percent()
    }

    pub fn start(&self) {
        self.job.lock().start();
    }

    /// Report a completion ratio (0.0 - 1.0)
    pub fn report_ratio(&self, ratio: f64) {
        self.report_percent(ratio * 100.0);
    }

    /// Report a completion percentage. Backwards steps are dropped.
    pub fn report_percent(&self, percent: f64) {
        let moved = self.job.lock().advance(percent);
        if let Some(percent) = moved {
            self.emit(percent);
        }
    }

    /// Mark the job done; progress ends at 100
    pub fn succeed(&self) {
        let moved = self.job.lock().succeed();
        if moved {
            self.emit(100);
        }
    }

    pub fn fail(&self) {
        self.job.lock().fail();
    }

    fn emit(&self, percent: u8) {
        let Some(ref cb) = self.callback else {
            return;
        };
        let time_seconds = self
            .duration_seconds
            .map(|d| d * f64::from(percent) / 100.0);
        cb(ConversionProgress {
            percent,
            time_seconds,
            duration_seconds: self.duration_seconds,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recording_reporter() -> (ProgressReporter, Arc<Mutex<Vec<ConversionProgress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(
            3,
            Some(10.0),
            Some(Arc::new(move |p| sink.lock().push(p))),
        );
        (reporter, seen)
    }

    #[test]
    fn emits_only_forward_steps() {
        let (reporter, seen) = recording_reporter();
        reporter.start();
        reporter.report_ratio(0.25);
        reporter.report_ratio(0.1);
        reporter.report_ratio(1.7);
        reporter.succeed();

        let percents: Vec<u8> = seen.lock().iter().map(|p| p.percent).collect();
        assert_eq!(percents, vec![25, 100]);
        assert_eq!(reporter.status(), JobStatus::Succeeded);
    }

    #[test]
    fn success_pins_to_hundred() {
        let (reporter, seen) = recording_reporter();
        reporter.start();
        reporter.report_percent(40.0);
        reporter.succeed();

        let last = *seen.lock().last().unwrap();
        assert_eq!(last.percent, 100);
        assert_eq!(last.time_seconds, Some(10.0));
        assert_eq!(reporter.percent(), 100);
    }

    #[test]
    fn failure_stops_updates() {
        let (reporter, seen) = recording_reporter();
        reporter.start();
        reporter.report_percent(30.0);
        reporter.fail();
        reporter.report_percent(60.0);
        reporter.succeed();

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(reporter.status(), JobStatus::Failed);
        assert_eq!(reporter.percent(), 30);
    }
}
