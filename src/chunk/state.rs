//! Per-execution chunk bookkeeping.
//!
//! Each runner owns exactly one [`ChunkExecutionState`]. The only piece that
//! leaves the runner's task is the timer flag, which the item/time
//! checkpoint timer sets from its own task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct ChunkExecutionState {
    items_since_checkpoint: u32,
    timer_expired: Arc<AtomicBool>,
    at_chunk_boundary: bool,
}

impl ChunkExecutionState {
    pub fn new() -> Self {
        Self {
            items_since_checkpoint: 0,
            timer_expired: Arc::new(AtomicBool::new(false)),
            at_chunk_boundary: true,
        }
    }

    pub fn items_since_checkpoint(&self) -> u32 {
        self.items_since_checkpoint
    }

    pub fn timer_expired(&self) -> bool {
        self.timer_expired.load(Ordering::Acquire)
    }

    /// True when the next read starts a new checkpoint interval
    pub fn at_chunk_boundary(&self) -> bool {
        self.at_chunk_boundary
    }

    pub(crate) fn record_item(&mut self) {
        self.items_since_checkpoint += 1;
    }

    pub(crate) fn mark_chunk_started(&mut self) {
        self.at_chunk_boundary = false;
    }

    /// Handle the checkpoint timer uses to signal expiry
    pub(crate) fn timer_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.timer_expired)
    }

    /// Back to the start-of-interval values after a checkpoint
    pub(crate) fn reset(&mut self) {
        self.items_since_checkpoint = 0;
        self.timer_expired.store(false, Ordering::Release);
        self.at_chunk_boundary = true;
    }
}

impl Default for ChunkExecutionState {
    fn default() -> Self {
        Self::new()
    }
}
