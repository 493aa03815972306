//! # Chunk Listeners
//!
//! Observer hooks fired synchronously, in registration order, around each
//! lifecycle event of a chunk runner. Every hook has a no-op default so a
//! listener implements only what it cares about.
//!
//! Failures raised by `before_*`/`after_*` item hooks count as failures of
//! the stage attempt they surround and go through skip classification like
//! any artifact failure. Failures raised by error and skip hooks escalate.
//!
//! Listener lists are resolved by the enclosing step runner and handed to
//! the chunk runner as a read-only [`Listeners`] registration.

use crate::artifacts::BatchItem;
use crate::error::{BatchError, ItemError, ItemResult};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ChunkListener: Send + Sync {
    async fn before_chunk(&self) -> ItemResult<()> {
        Ok(())
    }

    async fn after_chunk(&self) -> ItemResult<()> {
        Ok(())
    }

    /// Called once per unhandled failure before it leaves the chunk loop
    async fn on_error(&self, error: &BatchError) -> ItemResult<()> {
        let _ = error;
        Ok(())
    }
}

#[async_trait]
pub trait ItemReadListener<I: BatchItem>: Send + Sync {
    async fn before_read(&self) -> ItemResult<()> {
        Ok(())
    }

    /// `None` signals end of stream
    async fn after_read(&self, item: Option<&I>) -> ItemResult<()> {
        let _ = item;
        Ok(())
    }

    async fn on_read_error(&self, error: &ItemError) -> ItemResult<()> {
        let _ = error;
        Ok(())
    }
}

#[async_trait]
pub trait ItemProcessListener<I: BatchItem, O: BatchItem>: Send + Sync {
    async fn before_process(&self, item: &I) -> ItemResult<()> {
        let _ = item;
        Ok(())
    }

    /// `result` is `None` when the processor filtered the item
    async fn after_process(&self, item: &I, result: Option<&O>) -> ItemResult<()> {
        let _ = (item, result);
        Ok(())
    }

    async fn on_process_error(&self, item: &I, error: &ItemError) -> ItemResult<()> {
        let _ = (item, error);
        Ok(())
    }
}

#[async_trait]
pub trait ItemWriteListener<O: BatchItem>: Send + Sync {
    async fn before_write(&self, items: &[O]) -> ItemResult<()> {
        let _ = items;
        Ok(())
    }

    async fn after_write(&self, items: &[O]) -> ItemResult<()> {
        let _ = items;
        Ok(())
    }

    async fn on_write_error(&self, items: &[O], error: &ItemError) -> ItemResult<()> {
        let _ = (items, error);
        Ok(())
    }
}

#[async_trait]
pub trait SkipReadListener: Send + Sync {
    async fn on_skip_read_item(&self, error: &ItemError) -> ItemResult<()>;
}

#[async_trait]
pub trait SkipProcessListener<I: BatchItem>: Send + Sync {
    async fn on_skip_process_item(&self, item: &I, error: &ItemError) -> ItemResult<()>;
}

#[async_trait]
pub trait SkipWriteListener<O: BatchItem>: Send + Sync {
    /// The whole batch is skipped as one unit
    async fn on_skip_write_items(&self, items: &[O], error: &ItemError) -> ItemResult<()>;
}

/// Ordered listener registrations for one chunk runner
pub struct Listeners<I: BatchItem, O: BatchItem> {
    pub chunk: Vec<Arc<dyn ChunkListener>>,
    pub read: Vec<Arc<dyn ItemReadListener<I>>>,
    pub process: Vec<Arc<dyn ItemProcessListener<I, O>>>,
    pub write: Vec<Arc<dyn ItemWriteListener<O>>>,
    pub skip_read: Vec<Arc<dyn SkipReadListener>>,
    pub skip_process: Vec<Arc<dyn SkipProcessListener<I>>>,
    pub skip_write: Vec<Arc<dyn SkipWriteListener<O>>>,
}

impl<I: BatchItem, O: BatchItem> Listeners<I, O> {
    pub fn new() -> Self {
        Self {
            chunk: Vec::new(),
            read: Vec::new(),
            process: Vec::new(),
            write: Vec::new(),
            skip_read: Vec::new(),
            skip_process: Vec::new(),
            skip_write: Vec::new(),
        }
    }

    pub fn with_chunk_listener(mut self, listener: Arc<dyn ChunkListener>) -> Self {
        self.chunk.push(listener);
        self
    }

    pub fn with_read_listener(mut self, listener: Arc<dyn ItemReadListener<I>>) -> Self {
        self.read.push(listener);
        self
    }

    pub fn with_process_listener(mut self, listener: Arc<dyn ItemProcessListener<I, O>>) -> Self {
        self.process.push(listener);
        self
    }

    pub fn with_write_listener(mut self, listener: Arc<dyn ItemWriteListener<O>>) -> Self {
        self.write.push(listener);
        self
    }

    pub fn with_skip_read_listener(mut self, listener: Arc<dyn SkipReadListener>) -> Self {
        self.skip_read.push(listener);
        self
    }

    pub fn with_skip_process_listener(mut self, listener: Arc<dyn SkipProcessListener<I>>) -> Self {
        self.skip_process.push(listener);
        self
    }

    pub fn with_skip_write_listener(mut self, listener: Arc<dyn SkipWriteListener<O>>) -> Self {
        self.skip_write.push(listener);
        self
    }

    pub fn len(&self) -> usize {
        self.chunk.len()
            + self.read.len()
            + self.process.len()
            + self.write.len()
            + self.skip_read.len()
            + self.skip_process.len()
            + self.skip_write.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I: BatchItem, O: BatchItem> Default for Listeners<I, O> {
    fn default() -> Self {
        Self::new()
    }
}
