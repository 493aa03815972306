#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Core
//!
//! Chunk-oriented batch execution engine: drives a read, process, write
//! pipeline over a potentially unbounded item stream, grouping items into
//! chunks that are committed together at checkpoint boundaries.
//!
//! ## Key Features
//!
//! - **Checkpoint Policies**: item count and/or elapsed time, or a pluggable
//!   [`CheckpointAlgorithm`](artifacts::CheckpointAlgorithm)
//! - **Skip Handling**: hierarchy-aware include/exclude classification of
//!   failures with a per-execution skip limit
//! - **Retry and No-Rollback Eligibility**: classification queries for the
//!   enclosing step orchestration
//! - **Listener Protocol**: chunk, read, process, write and skip listeners
//!   fired in registration order
//! - **Isolated Executions**: every runner owns its execution state, so
//!   runners can be spawned concurrently on one tokio runtime
//!
//! ## Module Organization
//!
//! - [`artifacts`] - Reader, processor, writer and checkpoint algorithm traits plus resolution
//! - [`chunk`] - The chunk runner, checkpoint policies and failure classification
//! - [`config`] - Chunk options, validation and file/environment loading
//! - [`context`] - Step execution context shared with the enclosing step runner
//! - [`listeners`] - Listener traits and registrations
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use async_trait::async_trait;
//! use batch_core::artifacts::{ArtifactRegistry, ItemReader, ItemWriter};
//! use batch_core::config::{ArtifactRef, ChunkOptions};
//! use batch_core::{BatchStatus, ChunkRunner, ItemResult, Listeners, StepContext};
//! use std::sync::Arc;
//!
//! struct Range(std::ops::Range<u32>);
//!
//! #[async_trait]
//! impl ItemReader<u32> for Range {
//!     async fn read_item(&mut self) -> ItemResult<Option<u32>> {
//!         Ok(self.0.next())
//!     }
//! }
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl ItemWriter<u32> for Stdout {
//!     async fn write_items(&mut self, items: &[u32]) -> ItemResult<()> {
//!         println!("{items:?}");
//!         Ok(())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let registry: ArtifactRegistry<u32, u32> = ArtifactRegistry::new();
//! registry.register_reader("range", |_, _| Ok(Box::new(Range(0..5))));
//! registry.register_writer("stdout", |_, _| Ok(Box::new(Stdout)));
//!
//! let options = ChunkOptions {
//!     item_count: Some(2),
//!     ..ChunkOptions::new(ArtifactRef::new("range"), ArtifactRef::new("stdout"))
//! };
//! let context = Arc::new(StepContext::new("export", "print_numbers"));
//! let runner = ChunkRunner::from_options(options, context, &registry, Listeners::new()).unwrap();
//!
//! assert_eq!(runner.run().await.unwrap(), BatchStatus::Completed);
//! # });
//! ```

pub mod artifacts;
pub mod chunk;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod listeners;
pub mod logging;

pub use artifacts::{ArtifactRegistry, ArtifactResolver, BatchItem};
pub use chunk::{ChunkRunner, ExceptionClassifier, RunnerState};
pub use config::{ArtifactRef, ChunkConfig, ChunkConfigLoader, ChunkOptions, ConfigurationError};
pub use context::{BatchStatus, FailureDisposition, StepContext, StepMetrics};
pub use error::{BatchError, FailureType, ItemError, ItemResult, Result, Stage};
pub use listeners::Listeners;
