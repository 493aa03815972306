//! # Runtime Constants
//!
//! Defaults and well-known names shared by the configuration layer, the
//! checkpoint policies and the chunk runner's structured logging.

/// Checkpoint policy names accepted in chunk configuration
pub mod policies {
    pub const ITEM: &str = "item";
    pub const CUSTOM: &str = "custom";
}

/// Chunk defaults applied when an option is absent
pub mod defaults {
    /// Items per checkpoint under the item policy
    pub const ITEM_COUNT: u32 = 10;

    /// Checkpoint interval time limit in seconds, 0 disables the timer
    pub const TIME_LIMIT_SECS: u64 = 0;

    /// Skip limit, 0 means unlimited
    pub const SKIP_LIMIT: u32 = 0;

    /// Retry limit, 0 means unlimited
    pub const RETRY_LIMIT: u32 = 0;

    /// Checkpoint timeout reported by the item policy
    pub const CHECKPOINT_TIMEOUT_SECS: u64 = 600;
}

/// Operation names emitted by the chunk runner's structured logging
pub mod events {
    pub const RUNNER_CREATED: &str = "chunk.runner_created";
    pub const RESOURCES_OPENED: &str = "chunk.resources_opened";
    pub const CHECKPOINT_COMMITTED: &str = "chunk.checkpoint_committed";
    pub const ITEM_SKIPPED: &str = "chunk.item_skipped";
    pub const STOP_REQUESTED: &str = "chunk.stop_requested";
    pub const RUNNER_COMPLETED: &str = "chunk.runner_completed";
    pub const RUNNER_FAILED: &str = "chunk.runner_failed";
}

/// System-wide constants
pub mod system {
    /// Version compatibility marker
    pub const BATCH_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Environment variable selecting the runtime environment
    pub const ENVIRONMENT_VAR: &str = "BATCH_ENV";

    /// Prefix for chunk configuration environment overrides
    pub const CONFIG_ENV_PREFIX: &str = "BATCH_CHUNK";
}
