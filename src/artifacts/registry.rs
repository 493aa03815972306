//! # Artifact Registry
//!
//! In-memory [`ArtifactResolver`] keyed by reference name. Each entry is a
//! factory closure that builds a fresh artifact from the reference's
//! properties and the step context, so concurrently running chunk runners
//! never share an artifact instance.
//!
//! ## Usage
//!
//! ```rust
//! use batch_core::artifacts::{ArtifactRegistry, ArtifactResolver};
//! use batch_core::config::ArtifactRef;
//! use batch_core::context::StepContext;
//! # use async_trait::async_trait;
//! # use batch_core::artifacts::ItemReader;
//! # use batch_core::ItemResult;
//! # struct Empty;
//! # #[async_trait]
//! # impl ItemReader<String> for Empty {
//! #     async fn read_item(&mut self) -> ItemResult<Option<String>> { Ok(None) }
//! # }
//!
//! let registry: ArtifactRegistry<String, String> = ArtifactRegistry::new();
//! registry.register_reader("empty", |_props, _ctx| Ok(Box::new(Empty)));
//!
//! let context = StepContext::new("job", "step");
//! assert!(registry.resolve_reader(&ArtifactRef::new("empty"), &context).is_ok());
//! assert!(registry.resolve_reader(&ArtifactRef::new("missing"), &context).is_err());
//! ```

use super::{ArtifactResolver, CheckpointAlgorithm, ItemProcessor, ItemReader, ItemWriter};
use crate::config::{ArtifactRef, Properties};
use crate::context::StepContext;
use crate::error::{BatchError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

type Factory<T> = Arc<dyn Fn(&Properties, &StepContext) -> anyhow::Result<T> + Send + Sync>;

/// Artifact kinds held by the registry, used in resolution messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactKind {
    Reader,
    Writer,
    Processor,
    CheckpointAlgorithm,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Reader => write!(f, "item reader"),
            ArtifactKind::Writer => write!(f, "item writer"),
            ArtifactKind::Processor => write!(f, "item processor"),
            ArtifactKind::CheckpointAlgorithm => write!(f, "checkpoint algorithm"),
        }
    }
}

/// Registry of artifact factories for one reader/writer item type pair
pub struct ArtifactRegistry<I, O> {
    readers: DashMap<String, Factory<Box<dyn ItemReader<I>>>>,
    writers: DashMap<String, Factory<Box<dyn ItemWriter<O>>>>,
    processors: DashMap<String, Factory<Box<dyn ItemProcessor<I, O>>>>,
    algorithms: DashMap<String, Factory<Box<dyn CheckpointAlgorithm>>>,
}

impl<I, O> ArtifactRegistry<I, O> {
    pub fn new() -> Self {
        Self {
            readers: DashMap::new(),
            writers: DashMap::new(),
            processors: DashMap::new(),
            algorithms: DashMap::new(),
        }
    }

    pub fn register_reader<F>(&self, reference: impl Into<String>, factory: F)
    where
        F: Fn(&Properties, &StepContext) -> anyhow::Result<Box<dyn ItemReader<I>>>
            + Send
            + Sync
            + 'static,
    {
        let reference = reference.into();
        debug!(reference = %reference, kind = %ArtifactKind::Reader, "Registered artifact");
        self.readers.insert(reference, Arc::new(factory));
    }

    pub fn register_writer<F>(&self, reference: impl Into<String>, factory: F)
    where
        F: Fn(&Properties, &StepContext) -> anyhow::Result<Box<dyn ItemWriter<O>>>
            + Send
            + Sync
            + 'static,
    {
        let reference = reference.into();
        debug!(reference = %reference, kind = %ArtifactKind::Writer, "Registered artifact");
        self.writers.insert(reference, Arc::new(factory));
    }

    pub fn register_processor<F>(&self, reference: impl Into<String>, factory: F)
    where
        F: Fn(&Properties, &StepContext) -> anyhow::Result<Box<dyn ItemProcessor<I, O>>>
            + Send
            + Sync
            + 'static,
    {
        let reference = reference.into();
        debug!(reference = %reference, kind = %ArtifactKind::Processor, "Registered artifact");
        self.processors.insert(reference, Arc::new(factory));
    }

    pub fn register_checkpoint_algorithm<F>(&self, reference: impl Into<String>, factory: F)
    where
        F: Fn(&Properties, &StepContext) -> anyhow::Result<Box<dyn CheckpointAlgorithm>>
            + Send
            + Sync
            + 'static,
    {
        let reference = reference.into();
        debug!(
            reference = %reference,
            kind = %ArtifactKind::CheckpointAlgorithm,
            "Registered artifact"
        );
        self.algorithms.insert(reference, Arc::new(factory));
    }

    /// Registered reference names of every kind, sorted
    pub fn references(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .readers
            .iter()
            .map(|e| e.key().clone())
            .chain(self.writers.iter().map(|e| e.key().clone()))
            .chain(self.processors.iter().map(|e| e.key().clone()))
            .chain(self.algorithms.iter().map(|e| e.key().clone()))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

impl<I, O> Default for ArtifactRegistry<I, O> {
    fn default() -> Self {
        Self::new()
    }
}

fn build<T>(
    factories: &DashMap<String, Factory<T>>,
    kind: ArtifactKind,
    artifact: &ArtifactRef,
    context: &StepContext,
) -> Result<T> {
    // Clone the factory out so the shard lock is not held while it runs
    let factory = factories
        .get(&artifact.reference)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| BatchError::ArtifactResolution {
            reference: artifact.reference.clone(),
            reason: format!("no {kind} is registered under this name"),
        })?;

    factory(&artifact.properties, context).map_err(|e| BatchError::ArtifactResolution {
        reference: artifact.reference.clone(),
        reason: format!("{kind} factory failed: {e:#}"),
    })
}

impl<I, O> ArtifactResolver<I, O> for ArtifactRegistry<I, O>
where
    I: Send + Sync,
    O: Send + Sync,
{
    fn resolve_reader(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn ItemReader<I>>> {
        build(&self.readers, ArtifactKind::Reader, artifact, context)
    }

    fn resolve_writer(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn ItemWriter<O>>> {
        build(&self.writers, ArtifactKind::Writer, artifact, context)
    }

    fn resolve_processor(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn ItemProcessor<I, O>>> {
        build(&self.processors, ArtifactKind::Processor, artifact, context)
    }

    fn resolve_checkpoint_algorithm(
        &self,
        artifact: &ArtifactRef,
        context: &StepContext,
    ) -> Result<Box<dyn CheckpointAlgorithm>> {
        build(
            &self.algorithms,
            ArtifactKind::CheckpointAlgorithm,
            artifact,
            context,
        )
    }
}
