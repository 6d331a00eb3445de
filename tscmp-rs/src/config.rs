//! Optional configuration file.
//!
//! ```toml
//! [compare]
//! search_reorder = true
//! min_reorder = 7
//! threshold_diff = 0
//! pcr_ignore = true
//!
//! [logging]
//! level = "info"
//!
//! [report]
//! format = "normalized"
//! ```
//!
//! Values given on the command line take precedence.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use tscmp_core::CompareOptions;

use crate::context::OutputFormat;

/// Looked up in the current directory when no file is given.
pub const DEFAULT_CONFIG_FILE: &str = "tscmp.toml";

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub compare: CompareOptions,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub report: ReportSection,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ReportSection {
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Explicit path first, then [`DEFAULT_CONFIG_FILE`] if it exists.
pub fn locate_config(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            Some(default_path)
        } else {
            None
        }
    })
}

pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
