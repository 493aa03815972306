//! # Chunk Runner
//!
//! Drives the stage pipeline against a checkpoint policy for one step
//! execution:
//!
//! 1. **Opening**: open the item reader and item writer.
//! 2. **Running**: for each item, start a new chunk if at a boundary
//!    (`before_chunk`, `timeout()`, `begin()`), read, process and buffer it,
//!    then checkpoint when the policy is ready or the input is exhausted
//!    (write, `after_chunk`, `end()`, reset).
//! 3. **Closing**: close the reader and writer.
//!
//! Any unhandled failure in the loop is reported to every chunk listener's
//! `on_error` hook and then recorded on the [`StepContext`], which ends in
//! `FAILED`. A stop requested through the context is honored between items:
//! the chunk in progress is checkpointed, resources are closed and the
//! runner ends in `STOPPED`.
//!
//! Retry is never attempted here. A terminal failure is classified against
//! the retryable and no-rollback classifiers and the result is recorded on the
//! context as a [`FailureDisposition`]. Handing back a retry-eligible failure
//! consumes one unit of the retry limit; the count lives in the context's
//! metrics, so a runner built for a re-drive on the same context continues
//! from it.
//!
//! Every runner owns its execution state and output buffer, so any number of
//! runners can be spawned concurrently.

use crate::artifacts::{ArtifactResolver, BatchItem};
use crate::chunk::checkpoint::CheckpointPolicy;
use crate::chunk::classifier::{ExceptionClassifier, FailurePolicy};
use crate::chunk::lifecycle::{transition, RunnerEvent, RunnerState};
use crate::chunk::pipeline::{Processing, StagePipeline};
use crate::chunk::state::ChunkExecutionState;
use crate::config::{CheckpointSettings, ChunkConfig, ChunkOptions, ConfigurationError};
use crate::constants::events;
use crate::context::{BatchStatus, FailureDisposition, StepContext};
use crate::error::{BatchError, ItemError, Result};
use crate::listeners::{ChunkListener, Listeners};
use crate::logging::{log_chunk_operation, log_error};
use std::any::{type_name, TypeId};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Chunk-oriented read/process/write runner for one step execution
pub struct ChunkRunner<I: BatchItem, O: BatchItem> {
    context: Arc<StepContext>,
    pipeline: StagePipeline<I, O>,
    policy: CheckpointPolicy,
    state: ChunkExecutionState,
    chunk_listeners: Vec<Arc<dyn ChunkListener>>,
    retry: FailurePolicy,
    no_rollback: Option<ExceptionClassifier>,
    lifecycle: RunnerState,
}

impl<I: BatchItem, O: BatchItem> ChunkRunner<I, O> {
    /// Resolve the configured artifacts and build a runner.
    ///
    /// Fails with a configuration error when no processor is configured and
    /// `I` differs from `O`, and with an artifact resolution error when any
    /// reference cannot be built.
    pub fn new(
        config: ChunkConfig,
        context: Arc<StepContext>,
        resolver: &dyn ArtifactResolver<I, O>,
        mut listeners: Listeners<I, O>,
    ) -> Result<Self> {
        let processing = match &config.processor {
            Some(reference) => {
                Processing::Processor(resolver.resolve_processor(reference, &context)?)
            }
            None if TypeId::of::<I>() == TypeId::of::<O>() => Processing::PassThrough,
            None => {
                return Err(ConfigurationError::PassThroughTypeMismatch {
                    input: type_name::<I>(),
                    output: type_name::<O>(),
                }
                .into())
            }
        };
        let reader = resolver.resolve_reader(&config.reader, &context)?;
        let writer = resolver.resolve_writer(&config.writer, &context)?;

        let policy = match &config.checkpoint {
            CheckpointSettings::Item {
                item_count,
                time_limit,
            } => CheckpointPolicy::item_time(*item_count, *time_limit),
            CheckpointSettings::Custom { algorithm } => {
                CheckpointPolicy::custom(resolver.resolve_checkpoint_algorithm(algorithm, &context)?)
            }
        };

        let listener_count = listeners.len();
        let chunk_listeners = std::mem::take(&mut listeners.chunk);
        let pipeline = StagePipeline::new(
            reader,
            processing,
            writer,
            listeners,
            FailurePolicy::new(config.skippable_exceptions, config.skip_limit),
            Arc::clone(&context),
        );

        let retries_taken = u32::try_from(context.metrics().retry_count).unwrap_or(u32::MAX);
        let retry = FailurePolicy::new(config.retryable_exceptions, config.retry_limit)
            .resuming_from(retries_taken);
        debug!(
            listeners = listener_count,
            skip_limit = config.skip_limit,
            retry_limit = retry.limit(),
            retries_taken,
            "Resolved chunk artifacts"
        );
        log_chunk_operation(
            events::RUNNER_CREATED,
            context.job_name(),
            context.step_name(),
            "created",
            Some(policy.policy_name()),
        );

        Ok(Self {
            context,
            pipeline,
            policy,
            state: ChunkExecutionState::new(),
            chunk_listeners,
            retry,
            no_rollback: config.no_rollback_exceptions,
            lifecycle: RunnerState::Opening,
        })
    }

    /// Validate raw options and build a runner from them
    pub fn from_options(
        options: ChunkOptions,
        context: Arc<StepContext>,
        resolver: &dyn ArtifactResolver<I, O>,
        listeners: Listeners<I, O>,
    ) -> Result<Self> {
        let config = ChunkConfig::from_options(options)?;
        Self::new(config, context, resolver, listeners)
    }

    pub fn context(&self) -> &Arc<StepContext> {
        &self.context
    }

    pub fn lifecycle_state(&self) -> RunnerState {
        self.lifecycle
    }

    pub fn checkpoint_policy(&self) -> &CheckpointPolicy {
        &self.policy
    }

    /// Skips taken so far across the read, process and write stages
    pub fn skip_count(&self) -> u32 {
        self.pipeline.skip_policy().count()
    }

    /// Does this failure qualify for a re-drive by the enclosing orchestration
    pub fn is_retry_eligible(&self, error: &ItemError) -> bool {
        self.retry.permits(error)
    }

    /// Count one retry against the retry limit
    pub fn record_retry(&mut self) {
        self.retry.record();
        self.context.update_metrics(|m| m.retry_count += 1);
    }

    pub fn retry_count(&self) -> u32 {
        self.retry.count()
    }

    /// Is this failure in the no-rollback class
    pub fn is_no_rollback(&self, error: &ItemError) -> bool {
        self.no_rollback
            .as_ref()
            .is_some_and(|classifier| classifier.matches_error(error))
    }

    /// Run the step to a terminal status.
    ///
    /// On failure the error is recorded on the step context and the same
    /// shared error is returned.
    #[instrument(skip(self), fields(
        job_name = %self.context.job_name(),
        step_name = %self.context.step_name(),
        step_execution_id = %self.context.step_execution_id()
    ))]
    pub async fn run(mut self) -> std::result::Result<BatchStatus, Arc<BatchError>> {
        match self.execute().await {
            Ok(status) => {
                let operation = match status {
                    BatchStatus::Stopped => events::STOP_REQUESTED,
                    _ => events::RUNNER_COMPLETED,
                };
                log_chunk_operation(
                    operation,
                    self.context.job_name(),
                    self.context.step_name(),
                    &status.to_string(),
                    None,
                );
                Ok(status)
            }
            Err(error) => Err(self.fail(error)),
        }
    }

    async fn execute(&mut self) -> Result<BatchStatus> {
        self.pipeline.open().await?;
        self.advance(RunnerEvent::Opened)?;
        log_chunk_operation(
            events::RESOURCES_OPENED,
            self.context.job_name(),
            self.context.step_name(),
            "running",
            Some(self.policy.policy_name()),
        );

        let finished = match self.run_chunks().await {
            Ok(event) => event,
            Err(error) => {
                self.notify_chunk_error(&error).await;
                if let Err(close_error) = self.pipeline.close().await {
                    warn!(error = %close_error, "Failed to close resources after chunk failure");
                }
                return Err(error);
            }
        };

        self.advance(finished)?;
        self.pipeline.close().await?;
        self.advance(RunnerEvent::Closed)?;
        info!(
            status = %self.lifecycle.batch_status(),
            metrics = ?self.context.metrics(),
            "Closed item reader and writer"
        );

        Ok(self.lifecycle.batch_status())
    }

    /// The read/process/write loop. Returns the event that ended it.
    async fn run_chunks(&mut self) -> Result<RunnerEvent> {
        loop {
            if self.context.is_stop_requested() {
                if !self.state.at_chunk_boundary() {
                    self.commit_chunk().await?;
                }
                info!(skip_count = self.skip_count(), "Stop requested, leaving chunk loop");
                return Ok(RunnerEvent::StopRequested);
            }

            if self.state.at_chunk_boundary() {
                self.begin_chunk().await?;
            }

            let item = self.pipeline.read().await?;
            let exhausted = item.is_none();
            if let Some(item) = item {
                let outcome = self.pipeline.process(item).await?;
                if outcome.counts_towards_checkpoint() {
                    self.state.record_item();
                }
            }

            if self.policy.ready(&self.state).await? || exhausted {
                self.commit_chunk().await?;
            }
            if exhausted {
                return Ok(RunnerEvent::InputExhausted);
            }
        }
    }

    async fn begin_chunk(&mut self) -> Result<()> {
        for listener in &self.chunk_listeners {
            listener
                .before_chunk()
                .await
                .map_err(|e| BatchError::listener("before_chunk", e))?;
        }
        let timeout = self.policy.timeout().await?;
        self.policy.begin(&self.state).await?;
        self.state.mark_chunk_started();
        debug!(checkpoint_timeout_secs = timeout, "Began chunk");
        Ok(())
    }

    async fn commit_chunk(&mut self) -> Result<()> {
        let items = self.pipeline.buffered().len();
        self.pipeline.write().await?;
        for listener in &self.chunk_listeners {
            listener
                .after_chunk()
                .await
                .map_err(|e| BatchError::listener("after_chunk", e))?;
        }
        self.policy.end().await?;
        self.state.reset();
        self.context.update_metrics(|m| m.commit_count += 1);
        debug!(
            operation = events::CHECKPOINT_COMMITTED,
            items,
            skip_count = self.skip_count(),
            "Checkpoint committed"
        );
        Ok(())
    }

    async fn notify_chunk_error(&mut self, error: &BatchError) {
        for listener in &self.chunk_listeners {
            if let Err(hook_error) = listener.on_error(error).await {
                warn!(
                    error = %hook_error,
                    original_error = %error,
                    "Chunk listener on_error hook failed"
                );
            }
        }
    }

    fn advance(&mut self, event: RunnerEvent) -> Result<()> {
        let next = transition(self.lifecycle, event)?;
        debug!(from = %self.lifecycle, to = %next, event = %event, "Chunk runner transition");
        self.lifecycle = next;
        if next != RunnerState::Closing {
            self.context.set_batch_status(next.batch_status());
        }
        Ok(())
    }

    fn classify_failure(&mut self, error: &BatchError) -> FailureDisposition {
        let Some(item_error) = error.item_error() else {
            return FailureDisposition::default();
        };
        let retry_eligible = self.is_retry_eligible(item_error);
        if retry_eligible {
            self.record_retry();
        }
        FailureDisposition {
            retry_eligible,
            no_rollback: self.is_no_rollback(item_error),
        }
    }

    fn fail(&mut self, error: BatchError) -> Arc<BatchError> {
        let error = Arc::new(error);
        match transition(self.lifecycle, RunnerEvent::Fail) {
            Ok(next) => self.lifecycle = next,
            Err(e) => warn!(error = %e, "Failure reported outside an active state"),
        }
        let disposition = self.classify_failure(&error);
        self.context.set_failure(Arc::clone(&error));
        self.context.set_failure_disposition(disposition);
        self.context.set_batch_status(BatchStatus::Failed);
        info!(
            retry_eligible = disposition.retry_eligible,
            no_rollback = disposition.no_rollback,
            retry_count = self.retry.count(),
            "Classified terminal failure"
        );

        let context = format!(
            "job={} step={}",
            self.context.job_name(),
            self.context.step_name()
        );
        log_error(
            "chunk_runner",
            events::RUNNER_FAILED,
            &error.to_string(),
            Some(&context),
        );
        error
    }
}

impl<I: BatchItem, O: BatchItem> std::fmt::Debug for ChunkRunner<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkRunner")
            .field("job_name", &self.context.job_name())
            .field("step_name", &self.context.step_name())
            .field("policy", &self.policy)
            .field("state", &self.state)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
