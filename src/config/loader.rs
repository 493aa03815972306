//! Configuration Loader
//!
//! Reads chunk options from a TOML, YAML or JSON file and layers
//! `BATCH_CHUNK__*` environment overrides on top, e.g.
//! `BATCH_CHUNK__ITEM_COUNT=50` or `BATCH_CHUNK__READER__REFERENCE=csv`.
//!
//! Keys are case-insensitive and normalized to lower case, so artifact
//! property names should be written in snake_case.

use super::error::ConfigResult;
use super::{ChunkConfig, ChunkOptions};
use crate::constants::system;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Loads and validates chunk configuration
#[derive(Debug, Clone)]
pub struct ChunkConfigLoader {
    env_prefix: String,
}

impl ChunkConfigLoader {
    pub fn new() -> Self {
        Self {
            env_prefix: system::CONFIG_ENV_PREFIX.to_string(),
        }
    }

    /// Use a different environment override prefix
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load options from a file, format chosen by extension
    pub fn load_options(&self, path: impl AsRef<Path>) -> ConfigResult<ChunkOptions> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Loading chunk configuration");

        let options = Config::builder()
            .add_source(File::from(path))
            .add_source(self.environment())
            .build()?
            .try_deserialize::<ChunkOptions>()?;

        Ok(options)
    }

    /// Load and validate a chunk configuration file
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ChunkConfig> {
        ChunkConfig::from_options(self.load_options(path)?)
    }

    /// Load and validate chunk configuration from an in-memory document
    pub fn load_str(&self, contents: &str, format: FileFormat) -> ConfigResult<ChunkConfig> {
        let options = Config::builder()
            .add_source(File::from_str(contents, format))
            .add_source(self.environment())
            .build()?
            .try_deserialize::<ChunkOptions>()?;

        ChunkConfig::from_options(options)
    }

    fn environment(&self) -> Environment {
        Environment::with_prefix(&self.env_prefix)
            .separator("__")
            .try_parsing(true)
    }
}

impl Default for ChunkConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
