//! # Error Types
//!
//! Two layers of failure flow through the chunk runtime:
//!
//! - [`ItemError`] is what artifacts and listeners raise. It carries a
//!   [`FailureType`] so the skip/retry/no-rollback classifiers can match it by
//!   name or by any of its ancestor names.
//! - [`BatchError`] is what the runtime itself surfaces: configuration and
//!   resolution problems at construction, escalated stage failures, and
//!   resource open/close failures.

use crate::config::ConfigurationError;
use std::fmt;
use thiserror::Error;

/// Named failure type with its ancestry, nearest ancestor first.
///
/// ```rust
/// use batch_core::FailureType;
///
/// let kind = FailureType::new("connection_reset")
///     .extending("io_error")
///     .extending("transient");
///
/// assert!(kind.is_a("io_error"));
/// assert_eq!(
///     kind.lineage().collect::<Vec<_>>(),
///     vec!["connection_reset", "io_error", "transient"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailureType {
    name: String,
    ancestors: Vec<String>,
}

impl FailureType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestors: Vec::new(),
        }
    }

    /// Append the next (more general) ancestor.
    pub fn extending(mut self, ancestor: impl Into<String>) -> Self {
        self.ancestors.push(ancestor.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ancestors(&self) -> &[String] {
        &self.ancestors
    }

    /// The type itself followed by its ancestors, most specific first.
    pub fn lineage(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.ancestors.iter().map(String::as_str))
    }

    /// True if `name` is this type or one of its ancestors.
    pub fn is_a(&self, name: &str) -> bool {
        self.lineage().any(|n| n == name)
    }
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Failure raised by a reader, processor, writer, checkpoint algorithm or listener.
#[derive(Debug)]
pub struct ItemError {
    failure_type: FailureType,
    message: String,
    source: Option<anyhow::Error>,
}

impl ItemError {
    pub fn new(failure_type: FailureType, message: impl Into<String>) -> Self {
        Self {
            failure_type,
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a failure whose type has no ancestors.
    pub fn of_type(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureType::new(name), message)
    }

    /// Attach the underlying cause.
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn failure_type(&self) -> &FailureType {
        &self.failure_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.failure_type, self.message)
    }
}

impl std::error::Error for ItemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| -> &(dyn std::error::Error + 'static) { e.as_ref() })
    }
}

/// Stage of the read/process/write pipeline a failure escaped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Read,
    Process,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Read => write!(f, "read"),
            Stage::Process => write!(f, "process"),
            Stage::Write => write!(f, "write"),
        }
    }
}

/// Resource whose open/close lifecycle call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Reader,
    Writer,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Reader => write!(f, "item reader"),
            Resource::Writer => write!(f, "item writer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to resolve artifact '{reference}': {reason}")]
    ArtifactResolution { reference: String, reason: String },

    #[error("Item {stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ItemError,
    },

    #[error("Failed to open {resource}: {source}")]
    ResourceOpen {
        resource: Resource,
        #[source]
        source: ItemError,
    },

    #[error("Failed to close {resource}: {source}")]
    ResourceClose {
        resource: Resource,
        #[source]
        source: ItemError,
    },

    #[error("Checkpoint algorithm {operation} failed: {source}")]
    Checkpoint {
        operation: &'static str,
        #[source]
        source: ItemError,
    },

    #[error("Listener hook {hook} failed: {source}")]
    Listener {
        hook: &'static str,
        #[source]
        source: ItemError,
    },

    #[error("Invalid chunk runner transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    pub(crate) fn stage(stage: Stage, source: ItemError) -> Self {
        Self::Stage { stage, source }
    }

    pub(crate) fn listener(hook: &'static str, source: ItemError) -> Self {
        Self::Listener { hook, source }
    }

    pub(crate) fn checkpoint(operation: &'static str, source: ItemError) -> Self {
        Self::Checkpoint { operation, source }
    }

    /// The artifact or listener failure underneath, if there is one.
    pub fn item_error(&self) -> Option<&ItemError> {
        match self {
            Self::Stage { source, .. }
            | Self::ResourceOpen { source, .. }
            | Self::ResourceClose { source, .. }
            | Self::Checkpoint { source, .. }
            | Self::Listener { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

/// Result type for artifact and listener calls
pub type ItemResult<T> = std::result::Result<T, ItemError>;
