use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LifecycleError, LifecycleResult};

/// Module name the configuration must select for the cache to run.
pub const MODULE_NAME: &str = "ObjectCacheModule";

/// Default directory for durable records.
pub const DEFAULT_RECORD_DIR: &str = "ObjectCache/";

/// Top-level configuration document.
///
/// ```toml
/// [object_cache]
/// module = "ObjectCacheModule"
/// path_to_save_files = "ObjectCache/"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub object_cache: CacheConfig,
}

/// Settings of the object cache section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name of the cache module to run; the cache is enabled only when this
    /// is [`MODULE_NAME`].
    pub module: String,
    /// Directory holding one record per `(agent, region)`.
    pub path_to_save_files: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            module: MODULE_NAME.to_string(),
            path_to_save_files: PathBuf::from(DEFAULT_RECORD_DIR),
        }
    }
}

impl CacheConfig {
    /// Parse the `[object_cache]` section out of a TOML document.
    pub fn from_toml_str(text: &str) -> LifecycleResult<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| LifecycleError::Config(e.to_string()))?;
        Ok(file.object_cache)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> LifecycleResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LifecycleError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn is_enabled(&self) -> bool {
        self.module == MODULE_NAME
    }
}
