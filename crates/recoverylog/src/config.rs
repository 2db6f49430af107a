// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorder configuration
//!
//! ```toml
//! journal = "recovery/shard-000"
//! strip_prefix = "/var/lib/db"
//! property_files = ["/IDENTITY"]
//! ```

use crate::path::clean_path;
use gz_core::JournalName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default journal of the recovery log
pub const DEFAULT_JOURNAL: &str = "recovery-log";

/// Well-known storage engine files recorded as properties rather than Fnodes
pub const DEFAULT_PROPERTY_FILES: &[&str] = &[
    // Database GUID, written once at initialization of an empty database.
    "/IDENTITY",
];

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration of a `Recorder`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    /// Journal the recovery log is written to
    pub journal: JournalName,
    /// Prefix removed from observed paths before they are normalized
    pub strip_prefix: String,
    /// Normalized paths recorded as property content
    pub property_files: BTreeSet<String>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            journal: JournalName::new(DEFAULT_JOURNAL),
            strip_prefix: String::new(),
            property_files: DEFAULT_PROPERTY_FILES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl RecorderConfig {
    pub fn new(journal: impl Into<JournalName>) -> Self {
        Self {
            journal: journal.into(),
            ..Self::default()
        }
    }

    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = prefix.into();
        self
    }

    /// Parse and validate a TOML config
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.journal.is_empty() {
            return Err(ConfigError::Invalid("journal must not be empty".into()));
        }
        for path in &self.property_files {
            if !path.starts_with('/') || clean_path(path) != *path {
                return Err(ConfigError::Invalid(format!(
                    "property file {path:?} must be an absolute, normalized path"
                )));
            }
        }
        Ok(())
    }

    /// Whether the normalized `path` is a property file
    pub fn is_property(&self, path: &str) -> bool {
        self.property_files.contains(path)
    }
}
