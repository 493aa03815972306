//! Listener recording every hook into a [`Journal`]

use super::artifacts::failure;
use super::Journal;
use async_trait::async_trait;
use batch_core::listeners::{
    ChunkListener, ItemProcessListener, ItemReadListener, ItemWriteListener, SkipProcessListener,
    SkipReadListener, SkipWriteListener,
};
use batch_core::{BatchError, BatchItem, ItemError, ItemResult, Listeners, StepContext};
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

pub struct RecordingListener {
    name: &'static str,
    journal: Journal,
    failing_hooks: HashSet<&'static str>,
    stop_after_read: Option<(u32, Arc<StepContext>)>,
}

impl RecordingListener {
    pub fn new(journal: Journal) -> Self {
        Self::named("", journal)
    }

    /// Entries are prefixed with `name:` when a name is given
    pub fn named(name: &'static str, journal: Journal) -> Self {
        Self {
            name,
            journal,
            failing_hooks: HashSet::new(),
            stop_after_read: None,
        }
    }

    /// Make `hook` fail every time it is called
    pub fn failing(mut self, hook: &'static str) -> Self {
        self.failing_hooks.insert(hook);
        self
    }

    /// Request a stop on `context` once `item` has been read
    pub fn stopping_after(mut self, item: u32, context: Arc<StepContext>) -> Self {
        self.stop_after_read = Some((item, context));
        self
    }

    fn hook(&self, hook: &'static str, detail: String) -> ItemResult<()> {
        let entry = match (self.name.is_empty(), detail.is_empty()) {
            (true, true) => hook.to_string(),
            (true, false) => format!("{hook}({detail})"),
            (false, true) => format!("{}:{hook}", self.name),
            (false, false) => format!("{}:{hook}({detail})", self.name),
        };
        self.journal.record(entry);
        if self.failing_hooks.contains(hook) {
            return Err(failure("listener_error", &[], hook));
        }
        Ok(())
    }

    /// Register this listener for every listener family
    pub fn register_all<O: BatchItem + Debug>(self: Arc<Self>) -> Listeners<u32, O> {
        Listeners::new()
            .with_chunk_listener(self.clone())
            .with_read_listener(self.clone())
            .with_process_listener(self.clone())
            .with_write_listener(self.clone())
            .with_skip_read_listener(self.clone())
            .with_skip_process_listener(self.clone())
            .with_skip_write_listener(self)
    }
}

#[async_trait]
impl ChunkListener for RecordingListener {
    async fn before_chunk(&self) -> ItemResult<()> {
        self.hook("before_chunk", String::new())
    }

    async fn after_chunk(&self) -> ItemResult<()> {
        self.hook("after_chunk", String::new())
    }

    async fn on_error(&self, error: &BatchError) -> ItemResult<()> {
        let failure_type = error
            .item_error()
            .map(|e| e.failure_type().to_string())
            .unwrap_or_default();
        self.hook("on_error", failure_type)
    }
}

#[async_trait]
impl ItemReadListener<u32> for RecordingListener {
    async fn before_read(&self) -> ItemResult<()> {
        self.hook("before_read", String::new())
    }

    async fn after_read(&self, item: Option<&u32>) -> ItemResult<()> {
        if let (Some(read), Some((target, context))) = (item, &self.stop_after_read) {
            if read == target {
                context.request_stop();
            }
        }
        self.hook("after_read", format!("{item:?}"))
    }

    async fn on_read_error(&self, error: &ItemError) -> ItemResult<()> {
        self.hook("on_read_error", error.failure_type().to_string())
    }
}

#[async_trait]
impl<O: BatchItem + Debug> ItemProcessListener<u32, O> for RecordingListener {
    async fn before_process(&self, item: &u32) -> ItemResult<()> {
        self.hook("before_process", item.to_string())
    }

    async fn after_process(&self, item: &u32, result: Option<&O>) -> ItemResult<()> {
        self.hook("after_process", format!("{item}, {result:?}"))
    }

    async fn on_process_error(&self, item: &u32, error: &ItemError) -> ItemResult<()> {
        self.hook("on_process_error", format!("{item}, {}", error.failure_type()))
    }
}

#[async_trait]
impl<O: BatchItem + Debug> ItemWriteListener<O> for RecordingListener {
    async fn before_write(&self, items: &[O]) -> ItemResult<()> {
        self.hook("before_write", format!("{items:?}"))
    }

    async fn after_write(&self, items: &[O]) -> ItemResult<()> {
        self.hook("after_write", format!("{items:?}"))
    }

    async fn on_write_error(&self, items: &[O], error: &ItemError) -> ItemResult<()> {
        self.hook("on_write_error", format!("{items:?}, {}", error.failure_type()))
    }
}

#[async_trait]
impl SkipReadListener for RecordingListener {
    async fn on_skip_read_item(&self, error: &ItemError) -> ItemResult<()> {
        self.hook("on_skip_read_item", error.failure_type().to_string())
    }
}

#[async_trait]
impl SkipProcessListener<u32> for RecordingListener {
    async fn on_skip_process_item(&self, item: &u32, error: &ItemError) -> ItemResult<()> {
        self.hook("on_skip_process_item", format!("{item}, {}", error.failure_type()))
    }
}

#[async_trait]
impl<O: BatchItem + Debug> SkipWriteListener<O> for RecordingListener {
    async fn on_skip_write_items(&self, items: &[O], error: &ItemError) -> ItemResult<()> {
        self.hook("on_skip_write_items", format!("{items:?}, {}", error.failure_type()))
    }
}
