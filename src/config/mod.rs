//! # Chunk Configuration
//!
//! Chunk options arrive as loosely typed values (a job definition, a config
//! file, environment overrides) and are validated exactly once into an
//! immutable [`ChunkConfig`] before a runner is built.
//!
//! ## Usage
//!
//! ```rust
//! use batch_core::config::{ArtifactRef, ChunkConfig, ChunkOptions};
//!
//! let options = ChunkOptions {
//!     item_count: Some(2),
//!     ..ChunkOptions::new(ArtifactRef::new("numbers"), ArtifactRef::new("sink"))
//! };
//!
//! let config = ChunkConfig::from_options(options).unwrap();
//! assert_eq!(config.checkpoint.item_count(), Some(2));
//! ```

pub mod error;
pub mod loader;

use crate::chunk::classifier::ExceptionClassifier;
use crate::constants::{defaults, policies};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ChunkConfigLoader;

/// Opaque artifact properties, ordered by key
pub type Properties = BTreeMap<String, String>;

/// Logical reference to a reader, writer, processor or checkpoint algorithm
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArtifactRef {
    pub reference: String,
    #[serde(default)]
    pub properties: Properties,
}

impl ArtifactRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Include/exclude lists of failure type names
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClassifierSpec {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ClassifierSpec {
    pub fn including<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            include: names.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Raw chunk options as they appear in job definitions and config files.
///
/// Numeric options are kept signed so out-of-range values can be reported
/// instead of failing deserialization with a type error.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChunkOptions {
    pub reader: ArtifactRef,
    pub writer: ArtifactRef,
    #[serde(default)]
    pub processor: Option<ArtifactRef>,
    #[serde(default)]
    pub checkpoint_policy: Option<String>,
    #[serde(default)]
    pub checkpoint_algorithm: Option<ArtifactRef>,
    #[serde(default)]
    pub item_count: Option<i64>,
    #[serde(default)]
    pub time_limit: Option<i64>,
    #[serde(default)]
    pub skip_limit: Option<i64>,
    #[serde(default)]
    pub retry_limit: Option<i64>,
    #[serde(default)]
    pub skippable_exceptions: Option<ClassifierSpec>,
    #[serde(default)]
    pub retryable_exceptions: Option<ClassifierSpec>,
    #[serde(default)]
    pub no_rollback_exceptions: Option<ClassifierSpec>,
}

impl ChunkOptions {
    /// Options with only the mandatory reader and writer set
    pub fn new(reader: ArtifactRef, writer: ArtifactRef) -> Self {
        Self {
            reader,
            writer,
            processor: None,
            checkpoint_policy: None,
            checkpoint_algorithm: None,
            item_count: None,
            time_limit: None,
            skip_limit: None,
            retry_limit: None,
            skippable_exceptions: None,
            retryable_exceptions: None,
            no_rollback_exceptions: None,
        }
    }
}

/// Validated checkpoint policy selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckpointSettings {
    /// Checkpoint after `item_count` items or once `time_limit` elapses
    Item {
        item_count: u32,
        time_limit: Duration,
    },
    /// Checkpoint whenever the named algorithm says so
    Custom { algorithm: ArtifactRef },
}

impl CheckpointSettings {
    pub fn policy_name(&self) -> &'static str {
        match self {
            Self::Item { .. } => policies::ITEM,
            Self::Custom { .. } => policies::CUSTOM,
        }
    }

    pub fn item_count(&self) -> Option<u32> {
        match self {
            Self::Item { item_count, .. } => Some(*item_count),
            Self::Custom { .. } => None,
        }
    }
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self::Item {
            item_count: defaults::ITEM_COUNT,
            time_limit: Duration::from_secs(defaults::TIME_LIMIT_SECS),
        }
    }
}

/// Immutable chunk configuration, built once per runner
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub reader: ArtifactRef,
    pub writer: ArtifactRef,
    pub processor: Option<ArtifactRef>,
    pub checkpoint: CheckpointSettings,
    /// 0 means unlimited
    pub skip_limit: u32,
    /// 0 means unlimited
    pub retry_limit: u32,
    pub skippable_exceptions: Option<ExceptionClassifier>,
    pub retryable_exceptions: Option<ExceptionClassifier>,
    pub no_rollback_exceptions: Option<ExceptionClassifier>,
}

impl ChunkConfig {
    /// Validate raw options into a runner configuration
    pub fn from_options(options: ChunkOptions) -> ConfigResult<Self> {
        let checkpoint = match options.checkpoint_policy.as_deref() {
            None | Some(policies::ITEM) => {
                let item_count = match options.item_count {
                    None => defaults::ITEM_COUNT,
                    Some(value) if value < 1 => {
                        return Err(ConfigurationError::InvalidItemCount { value })
                    }
                    Some(value) => non_negative("item_count", value)?,
                };
                let time_limit = match options.time_limit {
                    None => defaults::TIME_LIMIT_SECS,
                    Some(value) => non_negative::<u64>("time_limit", value)?,
                };
                CheckpointSettings::Item {
                    item_count,
                    time_limit: Duration::from_secs(time_limit),
                }
            }
            Some(policies::CUSTOM) => match options.checkpoint_algorithm {
                Some(algorithm) => CheckpointSettings::Custom { algorithm },
                None => return Err(ConfigurationError::CheckpointAlgorithmMissing),
            },
            Some(other) => {
                return Err(ConfigurationError::InvalidCheckpointPolicy {
                    policy: other.to_string(),
                })
            }
        };

        let skip_limit = options
            .skip_limit
            .map(|v| non_negative("skip_limit", v))
            .transpose()?
            .unwrap_or(defaults::SKIP_LIMIT);
        let retry_limit = options
            .retry_limit
            .map(|v| non_negative("retry_limit", v))
            .transpose()?
            .unwrap_or(defaults::RETRY_LIMIT);

        Ok(Self {
            reader: options.reader,
            writer: options.writer,
            processor: options.processor,
            checkpoint,
            skip_limit,
            retry_limit,
            skippable_exceptions: options.skippable_exceptions.map(ExceptionClassifier::from),
            retryable_exceptions: options.retryable_exceptions.map(ExceptionClassifier::from),
            no_rollback_exceptions: options.no_rollback_exceptions.map(ExceptionClassifier::from),
        })
    }
}

impl TryFrom<ChunkOptions> for ChunkConfig {
    type Error = ConfigurationError;

    fn try_from(options: ChunkOptions) -> ConfigResult<Self> {
        Self::from_options(options)
    }
}

fn non_negative<T: TryFrom<i64>>(field: &str, value: i64) -> ConfigResult<T> {
    if value < 0 {
        return Err(ConfigurationError::invalid_value(
            field,
            value.to_string(),
            "must not be negative",
        ));
    }
    T::try_from(value).map_err(|_| {
        ConfigurationError::invalid_value(field, value.to_string(), "value is out of range")
    })
}
