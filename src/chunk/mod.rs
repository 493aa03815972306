//! # Chunk Processing
//!
//! The chunk runner and the pieces it is built from, leaf first:
//!
//! - [`classifier`]: include/exclude failure classification and skip/retry limits
//! - [`checkpoint`]: item/time and custom checkpoint policies
//! - [`state`]: per-execution chunk bookkeeping
//! - `pipeline`: the read/process/write stages with listener fan-out and skips
//! - [`lifecycle`]: runner states and transitions
//! - [`runner`]: the [`ChunkRunner`] itself

pub mod checkpoint;
pub mod classifier;
pub mod lifecycle;
mod pipeline;
pub mod runner;
pub mod state;

pub use checkpoint::{CheckpointPolicy, ItemTimePolicy};
pub use classifier::{ExceptionClassifier, FailurePolicy};
pub use lifecycle::{RunnerEvent, RunnerState};
pub use runner::ChunkRunner;
pub use state::ChunkExecutionState;
