use std::path::Path;

use serde::{Deserialize, Serialize};

use relist_filler::FillerConfig;
use relist_types::ListOrder;

use crate::error::ConfigError;

/// Per-context reconciliation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Ordering model re-applied after every merge.
    pub order: ListOrder,
    /// Whether fillers are interleaved into published lists.
    pub interleave_fillers: bool,
    /// Run the diff on the blocking worker pool instead of inline.
    pub offload_diff: bool,
    /// Buffer size of each publication channel.
    pub channel_capacity: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            order: ListOrder::NewestFirst,
            interleave_fillers: true,
            offload_diff: true,
            channel_capacity: 64,
        }
    }
}

/// Top-level configuration file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelistConfig {
    pub reconcile: ReconcileConfig,
    pub filler: FillerConfig,
}

impl RelistConfig {
    /// Parse from TOML text; absent keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
