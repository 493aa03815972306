//! # Checkpoint Policies
//!
//! Decides where one chunk ends and the next begins. The runner drives the
//! same four calls for every chunk regardless of the policy in use:
//!
//! ```text
//! timeout() -> begin() -> ready()? after each item ... -> end()
//! ```
//!
//! - [`CheckpointPolicy::ItemTime`] checkpoints after a fixed number of
//!   items, or once a time limit has elapsed since `begin()`. The time limit
//!   is cooperative: a one-shot tokio task flips the execution state's timer
//!   flag and the runner observes it on its next `ready()` poll.
//! - [`CheckpointPolicy::Custom`] delegates all four calls to an externally
//!   supplied [`CheckpointAlgorithm`].

use crate::artifacts::CheckpointAlgorithm;
use crate::chunk::state::ChunkExecutionState;
use crate::constants::defaults;
use crate::error::{BatchError, Result};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Item-count / time-limit checkpointing
#[derive(Debug)]
pub struct ItemTimePolicy {
    item_count: u32,
    time_limit: Duration,
    timer: Option<JoinHandle<()>>,
}

impl ItemTimePolicy {
    /// A zero `time_limit` disables the timer
    pub fn new(item_count: u32, time_limit: Duration) -> Self {
        Self {
            item_count,
            time_limit,
            timer: None,
        }
    }

    pub fn item_count(&self) -> u32 {
        self.item_count
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// True while a checkpoint timer is armed and has not fired
    pub fn timer_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn arm_timer(&mut self, state: &ChunkExecutionState) {
        self.cancel_timer();
        let flag = state.timer_flag();
        let limit = self.time_limit;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            flag.store(true, Ordering::Release);
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    fn ready(&self, state: &ChunkExecutionState) -> bool {
        if state.items_since_checkpoint() >= self.item_count {
            return true;
        }
        !self.time_limit.is_zero() && state.timer_expired()
    }
}

impl Drop for ItemTimePolicy {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

/// Checkpoint strategy selected once when the runner is built
pub enum CheckpointPolicy {
    ItemTime(ItemTimePolicy),
    Custom(Box<dyn CheckpointAlgorithm>),
}

impl CheckpointPolicy {
    pub fn item_time(item_count: u32, time_limit: Duration) -> Self {
        Self::ItemTime(ItemTimePolicy::new(item_count, time_limit))
    }

    pub fn custom(algorithm: Box<dyn CheckpointAlgorithm>) -> Self {
        Self::Custom(algorithm)
    }

    /// Checkpoint timeout in seconds, used only to size outer supervision
    pub async fn timeout(&mut self) -> Result<u64> {
        match self {
            Self::ItemTime(_) => Ok(defaults::CHECKPOINT_TIMEOUT_SECS),
            Self::Custom(algorithm) => algorithm
                .timeout()
                .await
                .map_err(|e| BatchError::checkpoint("timeout", e)),
        }
    }

    /// Start a checkpoint interval
    pub async fn begin(&mut self, state: &ChunkExecutionState) -> Result<()> {
        match self {
            Self::ItemTime(policy) => {
                if !policy.time_limit.is_zero() {
                    policy.arm_timer(state);
                    debug!(
                        time_limit_secs = policy.time_limit.as_secs_f64(),
                        "Checkpoint timer armed"
                    );
                }
                Ok(())
            }
            Self::Custom(algorithm) => algorithm
                .begin_checkpoint()
                .await
                .map_err(|e| BatchError::checkpoint("begin_checkpoint", e)),
        }
    }

    /// Has the current interval reached a checkpoint
    pub async fn ready(&mut self, state: &ChunkExecutionState) -> Result<bool> {
        match self {
            Self::ItemTime(policy) => Ok(policy.ready(state)),
            Self::Custom(algorithm) => algorithm
                .is_ready_to_checkpoint()
                .await
                .map_err(|e| BatchError::checkpoint("is_ready_to_checkpoint", e)),
        }
    }

    /// Close the interval. A still-pending item/time timer is cancelled so it
    /// cannot fire into the next interval.
    pub async fn end(&mut self) -> Result<()> {
        match self {
            Self::ItemTime(policy) => {
                policy.cancel_timer();
                Ok(())
            }
            Self::Custom(algorithm) => algorithm
                .end_checkpoint()
                .await
                .map_err(|e| BatchError::checkpoint("end_checkpoint", e)),
        }
    }

    pub fn policy_name(&self) -> &'static str {
        match self {
            Self::ItemTime(_) => crate::constants::policies::ITEM,
            Self::Custom(_) => crate::constants::policies::CUSTOM,
        }
    }
}

impl std::fmt::Debug for CheckpointPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemTime(policy) => f.debug_tuple("ItemTime").field(policy).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<algorithm>").finish(),
        }
    }
}
