//! Recording session state machine

use std::fmt;
use thiserror::Error;

/// Recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    /// Waiting for the capture device (permission prompt window)
    Acquiring,
    Recording,
    Stopping,
    Stopped,
}

impl RecordingState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a session in this state holds or is obtaining the device
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Acquiring | Self::Recording | Self::Stopping)
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: RecordingState,
    pub action: String,
}

/// Recording lifecycle entity.
///
/// State machine:
///   IDLE | STOPPED -> ACQUIRING (begin_acquire)
///   ACQUIRING -> RECORDING (acquired)
///   ACQUIRING -> IDLE (acquire_failed)
///   ACQUIRING -> STOPPED (abort)
///   RECORDING -> STOPPING (begin_stop)
///   RECORDING -> STOPPED (abort)
///   STOPPING -> STOPPED (finish_stop)
#[derive(Debug, Default)]
pub struct RecordingLifecycle {
    state: RecordingState,
}

impl RecordingLifecycle {
    /// Create a lifecycle in idle state
    pub fn new() -> Self {
        Self {
            state: RecordingState::Idle,
        }
    }

    /// Get the current state
    pub fn state(&self) -> RecordingState {
        self.state
    }

    fn transition(
        &mut self,
        allowed: &[RecordingState],
        next: RecordingState,
        action: &str,
    ) -> Result<(), InvalidStateTransition> {
        if !allowed.contains(&self.state) {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: action.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }

    /// Transition from IDLE or STOPPED to ACQUIRING
    pub fn begin_acquire(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Idle, RecordingState::Stopped],
            RecordingState::Acquiring,
            "start recording",
        )
    }

    /// Transition from ACQUIRING to RECORDING
    pub fn acquired(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Acquiring],
            RecordingState::Recording,
            "begin capture",
        )
    }

    /// Transition from ACQUIRING back to IDLE
    pub fn acquire_failed(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Acquiring],
            RecordingState::Idle,
            "fail acquisition",
        )
    }

    /// Transition from RECORDING to STOPPING
    pub fn begin_stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Recording],
            RecordingState::Stopping,
            "stop recording",
        )
    }

    /// Transition from STOPPING to STOPPED
    pub fn finish_stop(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Stopping],
            RecordingState::Stopped,
            "finish stopping",
        )
    }

    /// Tear down from ACQUIRING or RECORDING without producing output
    pub fn abort(&mut self) -> Result<(), InvalidStateTransition> {
        self.transition(
            &[RecordingState::Acquiring, RecordingState::Recording],
            RecordingState::Stopped,
            "abort recording",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lifecycle_is_idle() {
        let lifecycle = RecordingLifecycle::new();
        assert_eq!(lifecycle.state(), RecordingState::Idle);
        assert!(!lifecycle.state().is_active());
    }

    #[test]
    fn full_cycle() {
        let mut lifecycle = RecordingLifecycle::new();
        lifecycle.begin_acquire().unwrap();
        assert!(lifecycle.state().is_active());
        lifecycle.acquired().unwrap();
        assert_eq!(lifecycle.state(), RecordingState::Recording);
        lifecycle.begin_stop().unwrap();
        assert_eq!(lifecycle.state(), RecordingState::Stopping);
        lifecycle.finish_stop().unwrap();
        assert_eq!(lifecycle.state(), RecordingState::Stopped);

        // A stopped session can start again
        lifecycle.begin_acquire().unwrap();
        assert_eq!(lifecycle.state(), RecordingState::Acquiring);
    }

    #[test]
    fn acquire_failure_returns_to_idle() {
        let mut lifecycle = RecordingLifecycle::new();
        lifecycle.begin_acquire().unwrap();
        lifecycle.acquire_failed().unwrap();
        assert_eq!(lifecycle.state(), RecordingState::Idle);
    }

    #[test]
    fn begin_acquire_while_recording_fails() {
        let mut lifecycle = RecordingLifecycle::new();
        lifecycle.begin_acquire().unwrap();
        lifecycle.acquired().unwrap();

        let err = lifecycle.begin_acquire().unwrap_err();
        assert_eq!(err.current_state, RecordingState::Recording);
        assert!(err.action.contains("start recording"));
    }

    #[test]
    fn stop_from_idle_fails() {
        let mut lifecycle = RecordingLifecycle::new();
        let err = lifecycle.begin_stop().unwrap_err();
        assert_eq!(err.current_state, RecordingState::Idle);
    }

    #[test]
    fn abort_while_acquiring() {
        let mut lifecycle = RecordingLifecycle::new();
        lifecycle.begin_acquire().unwrap();
        lifecycle.abort().unwrap();
        assert_eq!(lifecycle.state(), RecordingState::Stopped);
    }

    #[test]
    fn abort_while_stopping_fails() {
        let mut lifecycle = RecordingLifecycle::new();
        lifecycle.begin_acquire().unwrap();
        lifecycle.acquired().unwrap();
        lifecycle.begin_stop().unwrap();
        assert!(lifecycle.abort().is_err());
    }

    #[test]
    fn state_display() {
        assert_eq!(RecordingState::Idle.to_string(), "idle");
        assert_eq!(RecordingState::Acquiring.to_string(), "acquiring");
        assert_eq!(RecordingState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn error_display() {
        let err = InvalidStateTransition {
            current_state: RecordingState::Stopping,
            action: "start recording".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("start recording"));
        assert!(msg.contains("stopping"));
    }
}
