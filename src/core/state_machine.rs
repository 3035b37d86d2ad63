//! Session lifecycle states
//!
//! `Starting → Running → ShuttingDown → Stopped`, with a direct
//! `Starting → Stopped` edge for a connection that never opened.
//! `Stopped` is terminal.

use chrono::{DateTime, Local};
use std::fmt;
use thiserror::Error;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Opening connection and log file
    Starting,
    /// Capturing records
    Running,
    /// Releasing resources
    ShuttingDown,
    /// Finished; the session cannot be reused
    Stopped,
}

impl SessionState {
    /// `Stopped` cannot be left
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "Starting"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Rejected transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid transition from {from} to {to}")]
pub struct TransitionError {
    /// State the machine was in
    pub from: SessionState,
    /// Requested state
    pub to: SessionState,
}

/// One recorded state change
#[derive(Debug, Clone)]
pub struct StateTransition {
    /// State left
    pub from: SessionState,
    /// State entered
    pub to: SessionState,
    /// Wall-clock time of the change
    pub timestamp: DateTime<Local>,
    /// What triggered it
    pub reason: Option<String>,
}

/// Tracks the session state and rejects transitions outside the lifecycle
#[derive(Debug)]
pub struct SessionStateMachine {
    state: SessionState,
    history: Vec<StateTransition>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Create a new state machine in `Starting`
    pub fn new() -> Self {
        Self {
            state: SessionState::Starting,
            history: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Every accepted transition, oldest first
    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    /// Move to `new_state`, or leave the state untouched and report why not
    pub fn transition(&mut self, new_state: SessionState, reason: Option<&str>) -> Result<(), TransitionError> {
        if !self.is_valid_transition(new_state) {
            return Err(TransitionError {
                from: self.state,
                to: new_state,
            });
        }

        tracing::debug!(from = %self.state, to = %new_state, reason = reason.unwrap_or(""), "session state change");

        self.history.push(StateTransition {
            from: self.state,
            to: new_state,
            timestamp: Local::now(),
            reason: reason.map(String::from),
        });
        self.state = new_state;

        Ok(())
    }

    fn is_valid_transition(&self, new_state: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self.state, new_state),
            (Starting, Running)
                | (Starting, ShuttingDown)
                | (Starting, Stopped)
                | (Running, ShuttingDown)
                | (ShuttingDown, Stopped)
        )
    }
}
