//! # Step Execution Context
//!
//! The enclosing step runner creates one [`StepContext`] per step execution
//! and shares it (behind an `Arc`) with the chunk runner. The chunk runner
//! reports its batch status, terminal failure and metrics through it; the
//! step runner can observe them or request a stop while the chunk runner's
//! task is still executing.

use crate::error::BatchError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Batch status of a step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Created, not yet running
    Starting,
    /// Chunk processing in progress
    Started,
    /// Stop requested, finishing the current chunk
    Stopping,
    /// Stopped on request after a clean checkpoint
    Stopped,
    /// All items processed and resources closed
    Completed,
    /// Terminated by an unhandled failure
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Completed | Self::Failed)
    }
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Starting
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "STARTING"),
            Self::Started => write!(f, "STARTED"),
            Self::Stopping => write!(f, "STOPPING"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Running counters for one step execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Items successfully returned by the reader
    pub read_count: u64,
    /// Items the processor filtered out
    pub filter_count: u64,
    /// Items handed to a successful write
    pub write_count: u64,
    /// Checkpoints completed
    pub commit_count: u64,
    pub read_skip_count: u64,
    pub process_skip_count: u64,
    /// Skipped write batches
    pub write_skip_count: u64,
    /// Failures handed back to the enclosing step runner as retry-eligible
    pub retry_count: u64,
}

impl StepMetrics {
    pub fn skip_count(&self) -> u64 {
        self.read_skip_count + self.process_skip_count + self.write_skip_count
    }
}

/// How the enclosing step runner may treat a terminal failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDisposition {
    /// The failure is retryable and the retry limit had room for it
    pub retry_eligible: bool,
    /// The failure is in the no-rollback class
    pub no_rollback: bool,
}

#[derive(Debug, Default)]
struct ExecutionRecord {
    batch_status: BatchStatus,
    failure: Option<Arc<BatchError>>,
    disposition: Option<FailureDisposition>,
    metrics: StepMetrics,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
}

/// Context of one step execution, shared between the step runner and its chunk runner
#[derive(Debug)]
pub struct StepContext {
    job_name: String,
    step_name: String,
    step_execution_id: Uuid,
    stop_requested: AtomicBool,
    record: RwLock<ExecutionRecord>,
}

impl StepContext {
    pub fn new(job_name: impl Into<String>, step_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            step_name: step_name.into(),
            step_execution_id: Uuid::new_v4(),
            stop_requested: AtomicBool::new(false),
            record: RwLock::new(ExecutionRecord::default()),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn step_execution_id(&self) -> Uuid {
        self.step_execution_id
    }

    pub fn batch_status(&self) -> BatchStatus {
        self.record.read().batch_status
    }

    /// Set the batch status, stamping start and end times on the way
    pub fn set_batch_status(&self, status: BatchStatus) {
        let mut record = self.record.write();
        if status == BatchStatus::Started && record.started_at.is_none() {
            record.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            record.ended_at = Some(Utc::now());
        }
        record.batch_status = status;
    }

    pub fn failure(&self) -> Option<Arc<BatchError>> {
        self.record.read().failure.clone()
    }

    pub fn set_failure(&self, failure: Arc<BatchError>) {
        self.record.write().failure = Some(failure);
    }

    /// Retry and no-rollback classification of the recorded failure
    pub fn failure_disposition(&self) -> Option<FailureDisposition> {
        self.record.read().disposition
    }

    pub(crate) fn set_failure_disposition(&self, disposition: FailureDisposition) {
        self.record.write().disposition = Some(disposition);
    }

    pub fn metrics(&self) -> StepMetrics {
        self.record.read().metrics
    }

    pub(crate) fn update_metrics(&self, update: impl FnOnce(&mut StepMetrics)) {
        update(&mut self.record.write().metrics);
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.record.read().started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.record.read().ended_at
    }

    /// Ask the chunk runner to stop after checkpointing the chunk in progress
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        let mut record = self.record.write();
        if !record.batch_status.is_terminal() {
            record.batch_status = BatchStatus::Stopping;
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}
