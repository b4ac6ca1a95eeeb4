//! Configuration for projects and the project registry

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default lifetime of cached listing/statistics views
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

/// Per-project settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Cached views older than this are recomputed
    pub cache_ttl: Duration,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Registry settings, loadable from a TOML file
///
/// ```toml
/// cache_ttl_secs = 30
/// max_loaded_projects = 10
/// idle_eviction_secs = 1800
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Cache TTL applied to every project the registry creates or loads
    pub cache_ttl_secs: u64,

    /// Projects kept in memory when backed by a data directory
    pub max_loaded_projects: u64,

    /// Loaded projects idle this long are written back and dropped
    pub idle_eviction_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            max_loaded_projects: 10,
            idle_eviction_secs: 30 * 60,
        }
    }
}

impl RegistryConfig {
    /// Load from a TOML file; missing keys fall back to defaults
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| CoreError::InvalidConfig {
            message: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_loaded_projects == 0 {
            return Err(CoreError::InvalidConfig {
                message: "max_loaded_projects must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn project_config(&self) -> ProjectConfig {
        ProjectConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        }
    }

    pub fn idle_eviction(&self) -> Duration {
        Duration::from_secs(self.idle_eviction_secs)
    }
}
