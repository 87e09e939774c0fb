//! Per-call conversion job tracking

use std::fmt;

/// Lifecycle of a single conversion call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress snapshot delivered to callers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionProgress {
    /// 0-100, never decreasing within a job
    pub percent: u8,
    /// Media time processed so far (seconds), when known
    pub time_seconds: Option<f64>,
    /// Total media time (seconds), when known
    pub duration_seconds: Option<f64>,
}

/// State of one conversion call. Created per call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    id: u64,
    status: JobStatus,
    progress_percent: u8,
}

impl ConversionJob {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress_percent: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    /// Pending -> Running
    pub fn start(&mut self) {
        if self.status == JobStatus::Pending {
            self.status = JobStatus::Running;
        }
    }

    /// Raise progress. Returns the new value when it moved forward.
    ///
    /// Values are clamped to 0-100 and ignored once the job is finished.
    pub fn advance(&mut self, percent: f64) -> Option<u8> {
        if self.status.is_finished() || !percent.is_finite() {
            return None;
        }
        let clamped = percent.clamp(0.0, 100.0).floor() as u8;
        if clamped > self.progress_percent {
            self.progress_percent = clamped;
            Some(clamped)
        } else {
            None
        }
    }

    /// Mark success and pin progress at 100
    pub fn succeed(&mut self) -> bool {
        if self.status.is_finished() {
            return false;
        }
        let moved = self.progress_percent < 100;
        self.progress_percent = 100;
        self.status = JobStatus::Succeeded;
        moved
    }

    pub fn fail(&mut self) {
        if !self.status.is_finished() {
            self.status = JobStatus::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending() {
        let job = ConversionJob::new(7);
        assert_eq!(job.id(), 7);
        assert_eq!(job.status(), JobStatus::Pending);
        assert_eq!(job.progress_percent(), 0);
    }

    #[test]
    fn progress_is_monotonic() {
        let mut job = ConversionJob::new(1);
        job.start();
        assert_eq!(job.advance(40.0), Some(40));
        assert_eq!(job.advance(20.0), None);
        assert_eq!(job.progress_percent(), 40);
        assert_eq!(job.advance(40.9), None);
        assert_eq!(job.advance(55.5), Some(55));
    }

    #[test]
    fn progress_is_clamped() {
        let mut job = ConversionJob::new(1);
        job.start();
        assert_eq!(job.advance(250.0), Some(100));
        assert_eq!(job.advance(-5.0), None);
        assert_eq!(job.advance(f64::NAN), None);
    }

    #[test]
    fn succeed_pins_to_hundred() {
        let mut job = ConversionJob::new(1);
        job.start();
        job.advance(80.0);
        assert!(job.succeed());
        assert_eq!(job.progress_percent(), 100);
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert_eq!(job.advance(100.0), None);
    }

    #[test]
    fn fail_is_terminal() {
        let mut job = ConversionJob::new(1);
        job.start();
        job.fail();
        assert_eq!(job.status(), JobStatus::Failed);
        assert!(!job.succeed());
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[test]
    fn status_display() {
        assert_eq!(JobStatus::Running.to_string(), "running");
    }
}
