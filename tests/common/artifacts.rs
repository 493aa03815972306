//! Scripted readers, processors, writers and checkpoint algorithms

use super::Journal;
use async_trait::async_trait;
use batch_core::artifacts::{CheckpointAlgorithm, ItemProcessor, ItemReader, ItemWriter};
use batch_core::config::Properties;
use batch_core::{FailureType, ItemError, ItemResult, StepContext};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Registry factory handing out `value` exactly once
pub fn single_use<T: Send + 'static>(
    value: T,
) -> impl Fn(&Properties, &StepContext) -> anyhow::Result<T> + Send + Sync + 'static {
    let slot = Mutex::new(Some(value));
    move |_, _| {
        slot.lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("artifact already handed out"))
    }
}

pub fn boxed_reader(reader: impl ItemReader<u32> + 'static) -> Box<dyn ItemReader<u32>> {
    Box::new(reader)
}

pub fn boxed_processor<O: 'static>(
    processor: impl ItemProcessor<u32, O> + 'static,
) -> Box<dyn ItemProcessor<u32, O>> {
    Box::new(processor)
}

pub fn boxed_writer<T: 'static>(writer: impl ItemWriter<T> + 'static) -> Box<dyn ItemWriter<T>> {
    Box::new(writer)
}

pub fn boxed_algorithm(algorithm: impl CheckpointAlgorithm + 'static) -> Box<dyn CheckpointAlgorithm> {
    Box::new(algorithm)
}

/// Failure of type `name` with the given ancestors, nearest first
pub fn failure(name: &str, ancestors: &[&str], message: &str) -> ItemError {
    let failure_type = ancestors
        .iter()
        .fold(FailureType::new(name), |t, a| t.extending(*a));
    ItemError::new(failure_type, message)
}

/// One scripted reader call
#[derive(Debug, Clone)]
pub enum Read {
    Item(u32),
    Fail(&'static str, &'static [&'static str]),
}

pub fn items(values: impl IntoIterator<Item = u32>) -> Vec<Read> {
    values.into_iter().map(Read::Item).collect()
}

/// Reader replaying a script, then reporting end of stream
pub struct ScriptedReader {
    script: VecDeque<Read>,
    journal: Journal,
    delay: Option<Duration>,
    fail_open: bool,
    fail_close: bool,
}

impl ScriptedReader {
    pub fn new(script: Vec<Read>, journal: Journal) -> Self {
        Self {
            script: script.into(),
            journal,
            delay: None,
            fail_open: false,
            fail_close: false,
        }
    }

    /// Sleep before every read call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

#[async_trait]
impl ItemReader<u32> for ScriptedReader {
    async fn open(&mut self, checkpoint: Option<Value>) -> ItemResult<()> {
        self.journal.record(format!("reader.open({checkpoint:?})"));
        if self.fail_open {
            return Err(failure("io_error", &[], "input unavailable"));
        }
        Ok(())
    }

    async fn read_item(&mut self) -> ItemResult<Option<u32>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.pop_front() {
            Some(Read::Item(value)) => {
                self.journal.record(format!("read({value})"));
                Ok(Some(value))
            }
            Some(Read::Fail(name, ancestors)) => {
                self.journal.record(format!("read_failed({name})"));
                Err(failure(name, ancestors, "scripted read failure"))
            }
            None => {
                self.journal.record("read(end)");
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> ItemResult<()> {
        self.journal.record("reader.close");
        if self.fail_close {
            return Err(failure("io_error", &[], "close refused"));
        }
        Ok(())
    }
}

type ProcessFn<O> = Box<dyn Fn(u32) -> ItemResult<Option<O>> + Send>;

/// Processor delegating to a closure
pub struct FnProcessor<O> {
    f: ProcessFn<O>,
    journal: Journal,
}

impl<O> FnProcessor<O> {
    pub fn new(journal: Journal, f: impl Fn(u32) -> ItemResult<Option<O>> + Send + 'static) -> Self {
        Self {
            f: Box::new(f),
            journal,
        }
    }
}

#[async_trait]
impl<O: Send + 'static> ItemProcessor<u32, O> for FnProcessor<O> {
    async fn process_item(&mut self, item: &u32) -> ItemResult<Option<O>> {
        self.journal.record(format!("process({item})"));
        (self.f)(*item)
    }
}

/// Writer recording every batch it is handed
pub struct RecordingWriter<T> {
    batches: Arc<Mutex<Vec<Vec<T>>>>,
    journal: Journal,
    failures: VecDeque<Option<&'static str>>,
    fail_open: bool,
}

impl<T> RecordingWriter<T> {
    pub fn new(journal: Journal) -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
            journal,
            failures: VecDeque::new(),
            fail_open: false,
        }
    }

    /// Per-call failure types; `None` entries and calls past the end succeed
    pub fn with_failures(mut self, failures: Vec<Option<&'static str>>) -> Self {
        self.failures = failures.into();
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Handle onto the batches written so far
    pub fn batches(&self) -> Arc<Mutex<Vec<Vec<T>>>> {
        Arc::clone(&self.batches)
    }
}

#[async_trait]
impl<T: Clone + Debug + Send + Sync + 'static> ItemWriter<T> for RecordingWriter<T> {
    async fn open(&mut self, checkpoint: Option<Value>) -> ItemResult<()> {
        self.journal.record(format!("writer.open({checkpoint:?})"));
        if self.fail_open {
            return Err(failure("io_error", &[], "output unavailable"));
        }
        Ok(())
    }

    async fn write_items(&mut self, items: &[T]) -> ItemResult<()> {
        if let Some(Some(name)) = self.failures.pop_front() {
            self.journal.record(format!("write_failed({items:?})"));
            return Err(failure(name, &[], "scripted write failure"));
        }
        self.journal.record(format!("write({items:?})"));
        self.batches.lock().unwrap().push(items.to_vec());
        Ok(())
    }

    async fn close(&mut self) -> ItemResult<()> {
        self.journal.record("writer.close");
        Ok(())
    }
}

/// Custom checkpoint algorithm ready on every `every`-th poll
pub struct EveryNthPoll {
    every: u32,
    polls: u32,
    journal: Journal,
    fail_begin: bool,
}

impl EveryNthPoll {
    pub fn new(every: u32, journal: Journal) -> Self {
        Self {
            every,
            polls: 0,
            journal,
            fail_begin: false,
        }
    }

    pub fn failing_begin(mut self) -> Self {
        self.fail_begin = true;
        self
    }
}

#[async_trait]
impl CheckpointAlgorithm for EveryNthPoll {
    async fn timeout(&mut self) -> ItemResult<u64> {
        self.journal.record("algorithm.timeout");
        Ok(30)
    }

    async fn begin_checkpoint(&mut self) -> ItemResult<()> {
        self.journal.record("algorithm.begin");
        if self.fail_begin {
            return Err(failure("algorithm_error", &[], "cannot begin"));
        }
        self.polls = 0;
        Ok(())
    }

    async fn is_ready_to_checkpoint(&mut self) -> ItemResult<bool> {
        self.polls += 1;
        Ok(self.polls % self.every == 0)
    }

    async fn end_checkpoint(&mut self) -> ItemResult<()> {
        self.journal.record("algorithm.end");
        Ok(())
    }
}
