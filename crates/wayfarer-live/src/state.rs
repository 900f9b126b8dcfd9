//! Live session state machine with thread-safe transitions.
//!
//! Enforces valid state transitions for the live connection lifecycle:
//! - Idle -> Connecting (session start requested)
//! - Connecting -> Connected (realtime channel open, mic streaming)
//! - Connecting -> Closed (teardown before the channel opened)
//! - Connected -> Closed (orderly teardown)
//! - Connecting -> Error, Connected -> Error (failure)
//!
//! Error is terminal. There is no auto-reconnect; a new session starts from a
//! fresh machine.

use std::fmt;
use std::sync::{Arc, Mutex};

use wayfarer_core::error::WayfarerError;

/// Operational state of a live voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveState {
    /// No session in progress. Ready to start.
    Idle,
    /// Opening the realtime channel and the microphone.
    Connecting,
    /// Bidirectional audio is flowing.
    Connected,
    /// Orderly teardown completed.
    Closed,
    /// Device or transport failure. Terminal.
    Error,
}

impl fmt::Display for LiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveState::Idle => write!(f, "Idle"),
            LiveState::Connecting => write!(f, "Connecting"),
            LiveState::Connected => write!(f, "Connected"),
            LiveState::Closed => write!(f, "Closed"),
            LiveState::Error => write!(f, "Error"),
        }
    }
}

impl LiveState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &LiveState) -> bool {
        matches!(
            (self, target),
            (LiveState::Idle, LiveState::Connecting)
                | (LiveState::Connecting, LiveState::Connected)
                | (LiveState::Connecting, LiveState::Closed)
                | (LiveState::Connecting, LiveState::Error)
                | (LiveState::Connected, LiveState::Closed)
                | (LiveState::Connected, LiveState::Error)
        )
    }

    /// Whether the session has reached a state it cannot leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LiveState::Closed | LiveState::Error)
    }
}

/// Thread-safe state machine for the live session lifecycle.
///
/// All transitions are validated before being applied, returning an error if
/// the requested transition is not permitted.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<LiveState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LiveState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> LiveState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: LiveState) -> Result<(), WayfarerError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Live state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(WayfarerError::Live(format!(
                "Invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Move to `target` if currently in `from`; otherwise leave the state
    /// alone. Used where a racing teardown may already have won.
    pub fn transition_if(&self, from: LiveState, target: LiveState) -> bool {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if *state == from && state.can_transition_to(&target) {
            tracing::debug!("Live state: {} -> {}", *state, target);
            *state = target;
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(LiveState::Idle.to_string(), "Idle");
        assert_eq!(LiveState::Connecting.to_string(), "Connecting");
        assert_eq!(LiveState::Connected.to_string(), "Connected");
        assert_eq!(LiveState::Closed.to_string(), "Closed");
        assert_eq!(LiveState::Error.to_string(), "Error");
    }

    #[test]
    fn test_valid_transitions() {
        assert!(LiveState::Idle.can_transition_to(&LiveState::Connecting));
        assert!(LiveState::Connecting.can_transition_to(&LiveState::Connected));
        assert!(LiveState::Connecting.can_transition_to(&LiveState::Closed));
        assert!(LiveState::Connecting.can_transition_to(&LiveState::Error));
        assert!(LiveState::Connected.can_transition_to(&LiveState::Closed));
        assert!(LiveState::Connected.can_transition_to(&LiveState::Error));
    }

    #[test]
    fn test_invalid_transitions() {
        // Cannot skip the connecting phase
        assert!(!LiveState::Idle.can_transition_to(&LiveState::Connected));
        assert!(!LiveState::Idle.can_transition_to(&LiveState::Closed));

        // Error is terminal, no reconnect
        assert!(!LiveState::Error.can_transition_to(&LiveState::Idle));
        assert!(!LiveState::Error.can_transition_to(&LiveState::Connecting));
        assert!(!LiveState::Error.can_transition_to(&LiveState::Closed));

        // Closed is terminal too
        assert!(!LiveState::Closed.can_transition_to(&LiveState::Connecting));
        assert!(!LiveState::Closed.can_transition_to(&LiveState::Connected));

        // Cannot transition to self
        assert!(!LiveState::Idle.can_transition_to(&LiveState::Idle));
        assert!(!LiveState::Connected.can_transition_to(&LiveState::Connected));
    }

    #[test]
    fn test_terminal_states() {
        assert!(LiveState::Closed.is_terminal());
        assert!(LiveState::Error.is_terminal());
        assert!(!LiveState::Idle.is_terminal());
        assert!(!LiveState::Connecting.is_terminal());
        assert!(!LiveState::Connected.is_terminal());
    }

    #[test]
    fn test_state_machine_happy_path() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), LiveState::Idle);

        sm.transition(LiveState::Connecting).unwrap();
        sm.transition(LiveState::Connected).unwrap();
        sm.transition(LiveState::Closed).unwrap();
        assert_eq!(sm.current(), LiveState::Closed);
    }

    #[test]
    fn test_state_machine_error_path() {
        let sm = StateMachine::new();
        sm.transition(LiveState::Connecting).unwrap();
        sm.transition(LiveState::Error).unwrap();
        assert_eq!(sm.current(), LiveState::Error);
        assert!(sm.transition(LiveState::Connecting).is_err());
    }

    #[test]
    fn test_state_machine_invalid_transition() {
        let sm = StateMachine::new();
        let result = sm.transition(LiveState::Connected);
        assert!(result.is_err());
        assert_eq!(sm.current(), LiveState::Idle);
    }

    #[test]
    fn test_transition_if_only_fires_from_expected_state() {
        let sm = StateMachine::new();
        sm.transition(LiveState::Connecting).unwrap();
        sm.transition(LiveState::Connected).unwrap();

        assert!(sm.transition_if(LiveState::Connected, LiveState::Closed));
        // Already closed; a late error report must not overwrite it.
        assert!(!sm.transition_if(LiveState::Connected, LiveState::Error));
        assert_eq!(sm.current(), LiveState::Closed);
    }

    #[test]
    fn test_state_machine_clone_is_shared() {
        let sm1 = StateMachine::new();
        let sm2 = sm1.clone();
        sm1.transition(LiveState::Connecting).unwrap();
        assert_eq!(sm2.current(), LiveState::Connecting);
    }

    #[test]
    fn test_transition_error_message() {
        let sm = StateMachine::new();
        match sm.transition(LiveState::Closed) {
            Err(WayfarerError::Live(msg)) => {
                assert!(msg.contains("Idle"));
                assert!(msg.contains("Closed"));
            }
            other => panic!("Expected Live error variant, got {:?}", other),
        }
    }
}
