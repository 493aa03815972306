//! # Chunk Runner Lifecycle
//!
//! States and events of a single chunk runner execution:
//!
//! ```text
//! Opening --Opened--> Running --InputExhausted--> Closing --Closed--> Completed
//!                        |
//!                        +--StopRequested--> Stopping --Closed--> Stopped
//!
//! any non-terminal state --Fail--> Failed
//! ```

use crate::context::BatchStatus;
use crate::error::{BatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerState {
    /// Opening reader and writer resources
    Opening,
    /// Driving the read/process/write loop
    Running,
    /// Input exhausted, closing resources
    Closing,
    /// Stop requested, closing resources after the last checkpoint
    Stopping,
    Completed,
    Failed,
    Stopped,
}

impl RunnerState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Batch status reported to the step context for this state
    pub fn batch_status(&self) -> BatchStatus {
        match self {
            Self::Opening => BatchStatus::Starting,
            Self::Running | Self::Closing => BatchStatus::Started,
            Self::Stopping => BatchStatus::Stopping,
            Self::Completed => BatchStatus::Completed,
            Self::Failed => BatchStatus::Failed,
            Self::Stopped => BatchStatus::Stopped,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opening => write!(f, "opening"),
            Self::Running => write!(f, "running"),
            Self::Closing => write!(f, "closing"),
            Self::Stopping => write!(f, "stopping"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerEvent {
    Opened,
    InputExhausted,
    StopRequested,
    Closed,
    Fail,
}

impl fmt::Display for RunnerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opened => write!(f, "opened"),
            Self::InputExhausted => write!(f, "input_exhausted"),
            Self::StopRequested => write!(f, "stop_requested"),
            Self::Closed => write!(f, "closed"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Target state for `event` in `current`, or `InvalidTransition`
pub fn transition(current: RunnerState, event: RunnerEvent) -> Result<RunnerState> {
    let target = match (current, event) {
        (RunnerState::Opening, RunnerEvent::Opened) => RunnerState::Running,

        (RunnerState::Running, RunnerEvent::InputExhausted) => RunnerState::Closing,
        (RunnerState::Running, RunnerEvent::StopRequested) => RunnerState::Stopping,

        (RunnerState::Closing, RunnerEvent::Closed) => RunnerState::Completed,
        (RunnerState::Stopping, RunnerEvent::Closed) => RunnerState::Stopped,

        (state, RunnerEvent::Fail) if !state.is_terminal() => RunnerState::Failed,

        (from, event) => {
            return Err(BatchError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            })
        }
    };

    Ok(target)
}
