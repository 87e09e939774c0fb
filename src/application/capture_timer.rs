//! Bounded capture timer
//!
//! A recording must end at its target length even when the periodic tick
//! is delayed or starved. Three independent paths can stop the timer:
//!
//! - the primary tick, which also drives progress reporting
//! - a one-shot backup armed for `target + backup_margin`
//! - a coarse sanity check that fires once the overrun exceeds `overrun_margin`
//!
//! Whichever fires first wins; the others become no-ops.

use std::fmt;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::domain::config::AppConfig;

/// Tick callback receiving the elapsed capture time
pub type TickCallback = Arc<dyn Fn(StdDuration) + Send + Sync>;

/// Timer errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("Timer is already running")]
    AlreadyRunning,

    #[error("Target duration must be greater than zero")]
    ZeroTarget,

    #[error("Target duration of {0:?} is too long to schedule")]
    TargetTooLong(StdDuration),
}

/// Timer tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub tick_interval: StdDuration,
    pub backup_margin: StdDuration,
    /// None disables the sanity check
    pub sanity_interval: Option<StdDuration>,
    pub overrun_margin: StdDuration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            tick_interval: StdDuration::from_millis(100),
            backup_margin: StdDuration::from_secs(1),
            sanity_interval: Some(StdDuration::from_millis(500)),
            overrun_margin: StdDuration::from_millis(500),
        }
    }
}

impl From<&AppConfig> for TimerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            tick_interval: config.tick_interval_or_default(),
            backup_margin: config.backup_margin_or_default(),
            sanity_interval: config.sanity_interval_or_default(),
            overrun_margin: config.overrun_margin_or_default(),
        }
    }
}

/// Timer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// Which path stopped the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    TargetReached,
    Backup,
    SanityCheck,
    Manual,
}

impl StopCause {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TargetReached => "target reached",
            Self::Backup => "backup timer",
            Self::SanityCheck => "sanity check",
            Self::Manual => "manual stop",
        }
    }
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The single stop signal of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopEvent {
    pub cause: StopCause,
    pub elapsed: StdDuration,
}

#[derive(Default)]
struct Shared {
    state: TimerState,
    started_at: Option<Instant>,
    stop_tx: Option<oneshot::Sender<StopEvent>>,
    stop_event: Option<StopEvent>,
    tasks: Vec<JoinHandle<()>>,
}

/// Capture timer with redundant stop paths
pub struct CaptureTimer {
    settings: TimerSettings,
    shared: Arc<Mutex<Shared>>,
}

impl CaptureTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            settings,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn state(&self) -> TimerState {
        self.shared.lock().state
    }

    /// Elapsed time of the current or last run
    pub fn elapsed(&self) -> StdDuration {
        let shared = self.shared.lock();
        match shared.state {
            TimerState::Running => shared
                .started_at
                .map(|s| s.elapsed())
                .unwrap_or_default(),
            TimerState::Stopped => shared.stop_event.map(|e| e.elapsed).unwrap_or_default(),
            TimerState::Idle => StdDuration::ZERO,
        }
    }

    /// Start a run towards `target`.
    ///
    /// # Arguments
    /// * `target` - Capture length to stop at
    /// * `on_tick` - Called on every primary tick with the elapsed time
    ///
    /// # Returns
    /// A receiver resolved exactly once with the stop event. It errors if
    /// the run is cancelled instead.
    pub fn start(
        &self,
        target: StdDuration,
        on_tick: Option<TickCallback>,
    ) -> Result<oneshot::Receiver<StopEvent>, TimerError> {
        if target.is_zero() {
            return Err(TimerError::ZeroTarget);
        }

        let settings = self.settings;
        let started = Instant::now();
        let (backup_deadline, overrun_limit) = target
            .checked_add(settings.backup_margin)
            .and_then(|d| started.checked_add(d))
            .zip(target.checked_add(settings.overrun_margin))
            .ok_or(TimerError::TargetTooLong(target))?;

        let mut shared = self.shared.lock();
        if shared.state == TimerState::Running {
            return Err(TimerError::AlreadyRunning);
        }
        for task in shared.tasks.drain(..) {
            task.abort();
        }

        let (tx, rx) = oneshot::channel();
        shared.state = TimerState::Running;
        shared.started_at = Some(started);
        shared.stop_tx = Some(tx);
        shared.stop_event = None;

        debug!(
            target_ms = target.as_millis() as u64,
            tick_ms = settings.tick_interval.as_millis() as u64,
            "capture timer started"
        );

        shared.tasks.push(tokio::spawn(run_ticks(
            Arc::clone(&self.shared),
            started,
            target,
            settings.tick_interval,
            on_tick,
        )));

        let backup_shared = Arc::clone(&self.shared);
        shared.tasks.push(tokio::spawn(async move {
            time::sleep_until(backup_deadline).await;
            if fire(&backup_shared, StopCause::Backup) {
                warn!("primary tick missed the target, backup timer stopped capture");
            }
        }));

        if let Some(period) = settings.sanity_interval {
            shared.tasks.push(tokio::spawn(run_sanity_check(
                Arc::clone(&self.shared),
                started,
                overrun_limit,
                period,
            )));
        }

        Ok(rx)
    }

    /// Stop the current run now. Returns false if nothing was running.
    pub fn stop(&self) -> bool {
        fire(&self.shared, StopCause::Manual)
    }

    /// Abort every pending path without emitting a stop signal
    pub fn cancel(&self) {
        let tasks = {
            let mut shared = self.shared.lock();
            shared.state = TimerState::Idle;
            shared.started_at = None;
            shared.stop_event = None;
            shared.stop_tx = None;
            std::mem::take(&mut shared.tasks)
        };
        for task in tasks {
            task.abort();
        }
    }
}

impl Default for CaptureTimer {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

impl Drop for CaptureTimer {
    fn drop(&mut self) {
        for task in self.shared.lock().tasks.drain(..) {
            task.abort();
        }
    }
}

/// Transition Running -> Stopped and emit the stop event.
/// Returns false when another path already stopped the run.
fn fire(shared: &Mutex<Shared>, cause: StopCause) -> bool {
    let (event, tx, tasks) = {
        let mut guard = shared.lock();
        if guard.state != TimerState::Running {
            return false;
        }
        let elapsed = guard
            .started_at
            .map(|s| s.elapsed())
            .unwrap_or_default();
        let event = StopEvent { cause, elapsed };
        guard.state = TimerState::Stopped;
        guard.stop_event = Some(event);
        (event, guard.stop_tx.take(), std::mem::take(&mut guard.tasks))
    };

    debug!(cause = %cause, elapsed_ms = event.elapsed.as_millis() as u64, "capture timer stopped");
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
    for task in tasks {
        task.abort();
    }
    true
}

fn is_running(shared: &Mutex<Shared>) -> bool {
    shared.lock().state == TimerState::Running
}

async fn run_ticks(
    shared: Arc<Mutex<Shared>>,
    started: Instant,
    target: StdDuration,
    period: StdDuration,
    on_tick: Option<TickCallback>,
) {
    let mut ticker = time::interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !is_running(&shared) {
            break;
        }
        let elapsed = started.elapsed();
        if let Some(ref cb) = on_tick {
            cb(elapsed.min(target));
        }
        if elapsed >= target {
            fire(&shared, StopCause::TargetReached);
            break;
        }
    }
}

async fn run_sanity_check(
    shared: Arc<Mutex<Shared>>,
    started: Instant,
    limit: StdDuration,
    period: StdDuration,
) {
    let mut ticker = time::interval_at(started + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !is_running(&shared) {
            break;
        }
        if started.elapsed() > limit {
            if fire(&shared, StopCause::SanityCheck) {
                warn!("capture overran its target, sanity check stopped capture");
            }
            break;
        }
    }
}
