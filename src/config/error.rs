//! Configuration Error Types
//!
//! Configuration errors are fatal and raised while a chunk runner is being
//! built. They are never retried.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Item count below 1 under the item checkpoint policy
    #[error("Invalid item count {value}: item_count must be at least 1")]
    InvalidItemCount { value: i64 },

    /// Checkpoint policy other than "item" or "custom"
    #[error("Invalid checkpoint policy '{policy}': expected 'item' or 'custom'")]
    InvalidCheckpointPolicy { policy: String },

    /// Custom checkpoint policy without an algorithm reference
    #[error("Checkpoint policy 'custom' requires a checkpoint_algorithm reference")]
    CheckpointAlgorithmMissing,

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// No processor configured while reader and writer item types differ
    #[error("No processor configured but reader items ({input}) differ from writer items ({output})")]
    PassThroughTypeMismatch {
        input: &'static str,
        output: &'static str,
    },

    /// Configuration source could not be read or deserialized
    #[error("Failed to load chunk configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigurationError {
    /// Create an invalid value error
    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
