//! Metadata index configuration.
//!
//! Loaded from JSON, built in code, or picked from a [`ConfigPreset`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_COLUMN_STATS_PARTITION: &str = "column_stats";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// When false the table has no metadata index to query
    pub enabled: bool,
    /// Partition of the metadata index holding per-column statistics
    pub column_stats_partition: String,
    /// Minimum number of files before the per-file fold runs in parallel
    pub parallel_fold_threshold: usize,
    /// Dedicated fold pool size; `None` uses the global rayon pool
    pub fold_threads: Option<usize>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            column_stats_partition: DEFAULT_COLUMN_STATS_PARTITION.to_string(),
            parallel_fold_threshold: 1024,
            fold_threads: None,
        }
    }
}

impl MetadataConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MetadataConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.column_stats_partition.trim().is_empty() {
            return Err(Error::Config(
                "Column stats partition name must not be empty".into(),
            ));
        }

        if self.fold_threads == Some(0) {
            return Err(Error::Config(
                "Fold pool must have at least 1 thread".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    Default,
    /// Few files per table; folding stays on the calling thread
    SmallTables,
    /// Tens of thousands of files; fold early and wide
    LargeTables,
}

impl ConfigPreset {
    pub fn to_config(self) -> MetadataConfig {
        match self {
            ConfigPreset::Default => MetadataConfig::default(),
            ConfigPreset::SmallTables => MetadataConfig {
                parallel_fold_threshold: usize::MAX,
                ..MetadataConfig::default()
            },
            ConfigPreset::LargeTables => MetadataConfig {
                parallel_fold_threshold: 256,
                fold_threads: std::thread::available_parallelism()
                    .ok()
                    .map(|n| n.get()),
                ..MetadataConfig::default()
            },
        }
    }
}
