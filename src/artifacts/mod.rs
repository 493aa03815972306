//! # Batch Artifacts
//!
//! Traits implemented by the pluggable pieces a chunk runner drives: the
//! item reader, the optional item processor, the item writer and the
//! optional custom checkpoint algorithm. Artifacts are obtained by logical
//! reference name through an [`ArtifactResolver`].
//!
//! ## Usage
//!
//! ```rust
//! use async_trait::async_trait;
//! use batch_core::artifacts::ItemReader;
//! use batch_core::ItemResult;
//!
//! struct Countdown(u32);
//!
//! #[async_trait]
//! impl ItemReader<u32> for Countdown {
//!     async fn read_item(&mut self) -> ItemResult<Option<u32>> {
//!         if self.0 == 0 {
//!             return Ok(None);
//!         }
//!         self.0 -= 1;
//!         Ok(Some(self.0))
//!     }
//! }
//! ```

pub mod registry;

use crate::config::ArtifactRef;
use crate::context::StepContext;
use crate::error::{ItemResult, Result};
use async_trait::async_trait;
use serde_json::Value;

pub use registry::ArtifactRegistry;

/// Bound shared by every item type flowing through a chunk runner
pub trait BatchItem: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> BatchItem for T {}

/// Source of items, read one at a time
#[async_trait]
pub trait ItemReader<I>: Send {
    /// Prepare the reader. `checkpoint` carries resume data when restarting;
    /// the chunk runner currently always passes `None`.
    async fn open(&mut self, checkpoint: Option<Value>) -> ItemResult<()> {
        let _ = checkpoint;
        Ok(())
    }

    /// Next item, or `None` at end of stream
    async fn read_item(&mut self) -> ItemResult<Option<I>>;

    async fn close(&mut self) -> ItemResult<()> {
        Ok(())
    }
}

/// Transformation applied to every read item
#[async_trait]
pub trait ItemProcessor<I, O>: Send {
    /// Transformed item, or `None` to filter the item out of the chunk
    async fn process_item(&mut self, item: &I) -> ItemResult<Option<O>>;
}

/// Sink receiving each checkpoint's buffered items as one batch
#[async_trait]
pub trait ItemWriter<O>: Send {
    async fn open(&mut self, checkpoint: Option<Value>) -> ItemResult<()> {
        let _ = checkpoint;
        Ok(())
    }

    async fn write_items(&mut self, items: &[O]) -> ItemResult<()>;

    async fn close(&mut self) -> ItemResult<()> {
        Ok(())
    }
}

/// Externally defined checkpoint timing, queried once per chunk in the
/// order `timeout`, `begin_checkpoint`, `is_ready_to_checkpoint` (after
/// every item), `end_checkpoint`.
#[async_trait]
pub trait CheckpointAlgorithm: Send {
    /// Checkpoint timeout in seconds
    async fn timeout(&mut self) -> ItemResult<u64>;

    async fn begin_checkpoint(&mut self) -> ItemResult<()> {
        Ok(())
    }

    async fn is_ready_to_checkpoint(&mut self) -> ItemResult<bool>;

    async fn end_checkpoint(&mut self) -> ItemResult<()> {
        Ok(())
    }
}

/// Maps logical artifact references to constructed artifact instances.
///
/// Resolution failures must describe which reference could not be built.
pub trait ArtifactResolver<I, O>: Send + Sync {
    fn resolve_reader(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn ItemReader<I>>>;

    fn resolve_writer(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn ItemWriter<O>>>;

    fn resolve_processor(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn ItemProcessor<I, O>>>;

    fn resolve_checkpoint_algorithm(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn CheckpointAlgorithm>>;
}
