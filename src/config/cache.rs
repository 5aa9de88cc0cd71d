use super::traits::{invalid, ConfigSection};
use crate::error::NeurofitError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Append-only store file. In-memory only when unset.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl ConfigSection for CacheConfig {
    fn section_name() -> &'static str {
        "cache"
    }

    fn validate(&self) -> Result<(), NeurofitError> {
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(invalid(Self::section_name(), "Cache path must not be empty"));
            }
        }
        Ok(())
    }
}
