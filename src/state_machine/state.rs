use std::fmt;

use serde::{Deserialize, Serialize};

/// Run control flag of a batch.
///
/// Flow: IDLE → RUNNING ⇄ PAUSED, then one of the terminal states
/// STOPPED, COMPLETED or ABORTED.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopped,
    CompletedSuccessfully,
    Aborted(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "IDLE"),
            RunState::Running => write!(f, "RUNNING"),
            RunState::Paused => write!(f, "PAUSED"),
            RunState::Stopped => write!(f, "STOPPED"),
            RunState::CompletedSuccessfully => write!(f, "COMPLETED"),
            RunState::Aborted(reason) => write!(f, "ABORTED({reason})"),
        }
    }
}

/// Something that asks the run to change state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    Start,
    Pause,
    Resume,
    Stop,
    /// The cursor ran past the last row.
    Exhaust,
    /// A fatal failure ended the run.
    Abort(String),
}

impl RunEvent {
    /// Verb used in error messages.
    pub fn action(&self) -> &'static str {
        match self {
            RunEvent::Start => "start",
            RunEvent::Pause => "pause",
            RunEvent::Resume => "resume",
            RunEvent::Stop => "stop",
            RunEvent::Exhaust => "complete",
            RunEvent::Abort(_) => "abort",
        }
    }
}

impl RunState {
    /// Compute the state reached by applying `event`, or `None` when the
    /// transition is not allowed from here.
    pub fn apply(&self, event: &RunEvent) -> Option<RunState> {
        match (self, event) {
            (RunState::Idle, RunEvent::Start) => Some(RunState::Running),
            (RunState::Running, RunEvent::Pause) => Some(RunState::Paused),
            (RunState::Paused, RunEvent::Resume) => Some(RunState::Running),
            (RunState::Running | RunState::Paused, RunEvent::Stop) => Some(RunState::Stopped),
            (RunState::Running, RunEvent::Exhaust) => Some(RunState::CompletedSuccessfully),
            (RunState::Running, RunEvent::Abort(reason)) => Some(RunState::Aborted(reason.clone())),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Stopped | RunState::CompletedSuccessfully | RunState::Aborted(_)
        )
    }
}
