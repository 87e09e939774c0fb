//! Phrase recording use case
//!
//! Ties the duration policy, the capture timer and the recorder session
//! together: one call records one practice item and stops on its own at
//! the item's target length.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::error::ErrorKind;
use crate::domain::recording::{DurationPolicy, DurationVerdict, RecordingTiming};

use super::capture_timer::{CaptureTimer, StopCause, TickCallback, TimerSettings};
use super::ports::CaptureError;
use super::recorder_session::{RawRecording, RecorderSession};

/// Callbacks for recording progress and outcome
#[derive(Default)]
#[allow(clippy::type_complexity)]
pub struct RecordingCallbacks {
    /// Called on every timer tick with the elapsed seconds
    pub on_progress_tick: Option<Box<dyn Fn(f64) + Send + Sync>>,
    /// Called once the raw recording is finalized
    pub on_stopped: Option<Box<dyn Fn(&RawRecording) + Send + Sync>>,
    /// Called with the error kind and message when recording fails
    pub on_error: Option<Box<dyn Fn(ErrorKind, &str) + Send + Sync>>,
}

/// A finished recording of one item
#[derive(Debug, Clone)]
pub struct CapturedTake {
    pub item_id: u32,
    pub recording: RawRecording,
    pub timing: RecordingTiming,
    pub stop_cause: StopCause,
    /// Length actually captured
    pub observed_seconds: f64,
    /// Observed length, or the target when it fell outside tolerance
    pub corrected_seconds: f64,
}

impl CapturedTake {
    pub fn verdict(&self) -> DurationVerdict {
        self.timing.assess(self.observed_seconds)
    }

    /// Feedback line for the observed length
    pub fn message(&self) -> String {
        self.timing.message(self.observed_seconds)
    }
}

/// Records practice items with an automatic stop at their target length
pub struct PhraseRecorder {
    policy: DurationPolicy,
    session: Arc<RecorderSession>,
    timer: CaptureTimer,
    cancel: watch::Sender<bool>,
}

impl PhraseRecorder {
    pub fn new(policy: DurationPolicy, session: RecorderSession, timer: TimerSettings) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            policy,
            session: Arc::new(session),
            timer: CaptureTimer::new(timer),
            cancel,
        }
    }

    pub fn policy(&self) -> &DurationPolicy {
        &self.policy
    }

    pub fn session(&self) -> &RecorderSession {
        &self.session
    }

    /// Record `item_id` until its target length is reached.
    ///
    /// # Arguments
    /// * `item_id` - Practice item to record
    /// * `fallback_seconds` - Target used when the item has no table entry
    /// * `callbacks` - Progress and outcome notifications
    ///
    /// # Returns
    /// The captured take, or `CaptureError::Cancelled` after [`cancel`](Self::cancel)
    pub async fn start_recording(
        &self,
        item_id: u32,
        fallback_seconds: Option<f64>,
        callbacks: RecordingCallbacks,
    ) -> Result<CapturedTake, CaptureError> {
        let RecordingCallbacks {
            on_progress_tick,
            on_stopped,
            on_error,
        } = callbacks;
        let report = |e: &CaptureError| {
            if e.is_cancellation() {
                return;
            }
            if let Some(ref cb) = on_error {
                cb(e.kind(), &e.to_string());
            }
        };

        let timing = self.policy.compute_timing(item_id, fallback_seconds);
        debug!(
            item_id,
            target_s = timing.target_duration,
            tolerance_ms = timing.tolerance_ms,
            "computed recording timing"
        );
        let target = match timing.target() {
            Ok(target) => target,
            Err(e) => {
                let err = CaptureError::Failed(e.to_string());
                report(&err);
                return Err(err);
            }
        };

        self.cancel.send_replace(false);
        let mut cancel_rx = self.cancel.subscribe();

        if let Err(e) = self.session.start().await {
            report(&e);
            return Err(e);
        }

        let on_tick: Option<TickCallback> = on_progress_tick.map(|cb| {
            let cb: Arc<dyn Fn(f64) + Send + Sync> = Arc::from(cb);
            Arc::new(move |elapsed: std::time::Duration| cb(elapsed.as_secs_f64())) as TickCallback
        });

        let stop_rx = match self.timer.start(target, on_tick) {
            Ok(rx) => rx,
            Err(e) => {
                let _ = self.teardown(RecorderSession::cancel).await;
                let err = CaptureError::Failed(e.to_string());
                report(&err);
                return Err(err);
            }
        };

        let stop_event = tokio::select! {
            event = stop_rx => event.ok(),
            _ = async { let _ = cancel_rx.wait_for(|cancelled| *cancelled).await; } => None,
        };

        let Some(stop_event) = stop_event else {
            self.timer.cancel();
            let _ = self.teardown(RecorderSession::cancel).await;
            info!(item_id, "recording cancelled");
            return Err(CaptureError::Cancelled);
        };
        debug!(cause = %stop_event.cause, elapsed_ms = stop_event.elapsed.as_millis() as u64, "capture timer stopped");

        let recording = match self.teardown(RecorderSession::stop).await.and_then(|r| r) {
            Ok(Some(recording)) => recording,
            Ok(None) => return Err(CaptureError::Cancelled),
            Err(e) => {
                report(&e);
                return Err(e);
            }
        };

        if let Some(ref cb) = on_stopped {
            cb(&recording);
        }

        let observed = recording.duration_seconds;
        let corrected = timing.correct(observed);
        if corrected != observed {
            warn!(
                item_id,
                observed_s = observed,
                target_s = timing.target_duration,
                "recorded length outside tolerance, snapped to target"
            );
        }

        Ok(CapturedTake {
            item_id,
            recording,
            timing,
            stop_cause: stop_event.cause,
            observed_seconds: observed,
            corrected_seconds: corrected,
        })
    }

    /// Abort an in-flight recording. No stop signal is emitted and the
    /// capture device is released.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
        self.timer.cancel();
        self.session.cancel();
    }

    /// Run a session teardown on the blocking pool. Flushing and releasing a
    /// device stream can wait on the audio thread.
    async fn teardown<T, F>(&self, op: F) -> Result<T, CaptureError>
    where
        F: FnOnce(&RecorderSession) -> T + Send + 'static,
        T: Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || op(&session))
            .await
            .map_err(|e| CaptureError::Failed(format!("session teardown failed: {}", e)))
    }
}
