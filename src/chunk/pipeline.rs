//! # Stage Pipeline
//!
//! The read, process and write stages of a chunk runner together with their
//! listener fan-out and skip handling. The pipeline owns the resolved
//! artifacts, the output buffer and the skip counter of one execution.
//!
//! Skip decisions are made once per failure:
//!
//! - **read**: a skippable failure is counted and the read is attempted
//!   again in a loop, until an item or end of stream is produced or a
//!   failure escalates. Listener hooks fire for every physical attempt.
//! - **process**: a skippable failure is counted and the item is dropped; it
//!   does not advance the checkpoint item count.
//! - **write**: a skippable failure skips the whole buffered batch as one
//!   unit and the buffer is cleared. A non-skippable failure leaves the
//!   buffer untouched.

use crate::artifacts::{BatchItem, ItemProcessor, ItemReader, ItemWriter};
use crate::chunk::classifier::FailurePolicy;
use crate::constants::events;
use crate::context::StepContext;
use crate::error::{BatchError, ItemError, ItemResult, Resource, Result, Stage};
use crate::listeners::{ItemProcessListener, ItemWriteListener, Listeners};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, warn};

/// How read items become output items
pub(crate) enum Processing<I, O> {
    Processor(Box<dyn ItemProcessor<I, O>>),
    /// No processor configured; `I` and `O` are the same type
    PassThrough,
}

/// Outcome of the process stage for one read item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessOutcome {
    /// Output appended to the buffer
    Buffered,
    /// Processor returned no output
    Filtered,
    /// Failure was skipped; the item does not count towards the checkpoint
    Skipped,
}

impl ProcessOutcome {
    pub(crate) fn counts_towards_checkpoint(self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

pub(crate) struct StagePipeline<I: BatchItem, O: BatchItem> {
    reader: Box<dyn ItemReader<I>>,
    processing: Processing<I, O>,
    writer: Box<dyn ItemWriter<O>>,
    listeners: Listeners<I, O>,
    skip: FailurePolicy,
    buffer: Vec<O>,
    context: Arc<StepContext>,
}

impl<I: BatchItem, O: BatchItem> StagePipeline<I, O> {
    pub(crate) fn new(
        reader: Box<dyn ItemReader<I>>,
        processing: Processing<I, O>,
        writer: Box<dyn ItemWriter<O>>,
        listeners: Listeners<I, O>,
        skip: FailurePolicy,
        context: Arc<StepContext>,
    ) -> Self {
        Self {
            reader,
            processing,
            writer,
            listeners,
            skip,
            buffer: Vec::new(),
            context,
        }
    }

    pub(crate) fn skip_policy(&self) -> &FailurePolicy {
        &self.skip
    }

    pub(crate) fn buffered(&self) -> &[O] {
        &self.buffer
    }

    /// Open the reader, then the writer. If the writer fails to open the
    /// already opened reader is closed again.
    pub(crate) async fn open(&mut self) -> Result<()> {
        self.reader
            .open(None)
            .await
            .map_err(|source| BatchError::ResourceOpen {
                resource: Resource::Reader,
                source,
            })?;

        if let Err(source) = self.writer.open(None).await {
            if let Err(close_error) = self.reader.close().await {
                warn!(error = %close_error, "Failed to close item reader after writer open failure");
            }
            return Err(BatchError::ResourceOpen {
                resource: Resource::Writer,
                source,
            });
        }
        Ok(())
    }

    /// Close the reader, then the writer. Both are always attempted; the
    /// first failure is returned.
    pub(crate) async fn close(&mut self) -> Result<()> {
        let reader = self.reader.close().await;
        let writer = self.writer.close().await;

        reader.map_err(|source| BatchError::ResourceClose {
            resource: Resource::Reader,
            source,
        })?;
        writer.map_err(|source| BatchError::ResourceClose {
            resource: Resource::Writer,
            source,
        })
    }

    /// Read the next item, skipping skippable read failures.
    ///
    /// `None` is end of stream.
    pub(crate) async fn read(&mut self) -> Result<Option<I>> {
        loop {
            let error = match self.attempt_read().await {
                Ok(item) => {
                    if item.is_some() {
                        self.context.update_metrics(|m| m.read_count += 1);
                    }
                    return Ok(item);
                }
                Err(error) => error,
            };

            for listener in &self.listeners.read {
                listener
                    .on_read_error(&error)
                    .await
                    .map_err(|e| BatchError::listener("on_read_error", e))?;
            }

            if !self.skip.permits(&error) {
                return Err(BatchError::stage(Stage::Read, error));
            }
            self.skip.record();
            self.context.update_metrics(|m| m.read_skip_count += 1);
            warn!(
                operation = events::ITEM_SKIPPED,
                job_name = %self.context.job_name(),
                step_name = %self.context.step_name(),
                failure_type = %error.failure_type(),
                skip_count = self.skip.count(),
                error = %error,
                "Skipping failed read"
            );

            for listener in &self.listeners.skip_read {
                listener
                    .on_skip_read_item(&error)
                    .await
                    .map_err(|e| BatchError::listener("on_skip_read_item", e))?;
            }
        }
    }

    async fn attempt_read(&mut self) -> ItemResult<Option<I>> {
        for listener in &self.listeners.read {
            listener.before_read().await?;
        }
        let item = self.reader.read_item().await?;
        for listener in &self.listeners.read {
            listener.after_read(item.as_ref()).await?;
        }
        Ok(item)
    }

    /// Run the process stage for one read item and buffer its output
    pub(crate) async fn process(&mut self, item: I) -> Result<ProcessOutcome> {
        let processor = match &mut self.processing {
            Processing::Processor(processor) => processor,
            Processing::PassThrough => {
                let boxed: Box<dyn Any + Send> = Box::new(item);
                let output = boxed.downcast::<O>().map_err(|_| {
                    BatchError::Internal(
                        "pass-through item type does not match the writer item type".to_string(),
                    )
                })?;
                self.buffer.push(*output);
                return Ok(ProcessOutcome::Buffered);
            }
        };

        let error = match attempt_process(processor.as_mut(), &self.listeners.process, &item).await
        {
            Ok(Some(output)) => {
                self.buffer.push(output);
                return Ok(ProcessOutcome::Buffered);
            }
            Ok(None) => {
                self.context.update_metrics(|m| m.filter_count += 1);
                return Ok(ProcessOutcome::Filtered);
            }
            Err(error) => error,
        };

        for listener in &self.listeners.process {
            listener
                .on_process_error(&item, &error)
                .await
                .map_err(|e| BatchError::listener("on_process_error", e))?;
        }

        if !self.skip.permits(&error) {
            return Err(BatchError::stage(Stage::Process, error));
        }
        self.skip.record();
        self.context.update_metrics(|m| m.process_skip_count += 1);
        warn!(
            operation = events::ITEM_SKIPPED,
            job_name = %self.context.job_name(),
            step_name = %self.context.step_name(),
            failure_type = %error.failure_type(),
            skip_count = self.skip.count(),
            error = %error,
            "Skipping failed item process"
        );

        for listener in &self.listeners.skip_process {
            listener
                .on_skip_process_item(&item, &error)
                .await
                .map_err(|e| BatchError::listener("on_skip_process_item", e))?;
        }
        Ok(ProcessOutcome::Skipped)
    }

    /// Write the buffered batch, if any. The buffer is cleared on success and
    /// when the batch is skipped.
    pub(crate) async fn write(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let error = match attempt_write(
            self.writer.as_mut(),
            &self.listeners.write,
            &self.buffer,
        )
        .await
        {
            Ok(()) => {
                let written = self.buffer.len() as u64;
                self.context.update_metrics(|m| m.write_count += written);
                debug!(items = written, "Wrote chunk");
                self.buffer.clear();
                return Ok(());
            }
            Err(error) => error,
        };

        for listener in &self.listeners.write {
            listener
                .on_write_error(&self.buffer, &error)
                .await
                .map_err(|e| BatchError::listener("on_write_error", e))?;
        }

        if !self.skip.permits(&error) {
            return Err(BatchError::stage(Stage::Write, error));
        }
        self.skip.record();
        self.context.update_metrics(|m| m.write_skip_count += 1);
        warn!(
            operation = events::ITEM_SKIPPED,
            job_name = %self.context.job_name(),
            step_name = %self.context.step_name(),
            failure_type = %error.failure_type(),
            skip_count = self.skip.count(),
            items = self.buffer.len(),
            error = %error,
            "Skipping failed write batch"
        );

        for listener in &self.listeners.skip_write {
            listener
                .on_skip_write_items(&self.buffer, &error)
                .await
                .map_err(|e| BatchError::listener("on_skip_write_items", e))?;
        }
        self.buffer.clear();
        Ok(())
    }
}

async fn attempt_process<I: BatchItem, O: BatchItem>(
    processor: &mut dyn ItemProcessor<I, O>,
    listeners: &[Arc<dyn ItemProcessListener<I, O>>],
    item: &I,
) -> ItemResult<Option<O>> {
    for listener in listeners {
        listener.before_process(item).await?;
    }
    let output = processor.process_item(item).await?;
    for listener in listeners {
        listener.after_process(item, output.as_ref()).await?;
    }
    Ok(output)
}

async fn attempt_write<O: BatchItem>(
    writer: &mut dyn ItemWriter<O>,
    listeners: &[Arc<dyn ItemWriteListener<O>>],
    items: &[O],
) -> ItemResult<()> {
    for listener in listeners {
        listener.before_write(items).await?;
    }
    writer.write_items(items).await?;
    for listener in listeners {
        listener.after_write(items).await?;
    }
    Ok(())
}
