//! Configuration management
//!
//! This module handles loading and managing configuration from:
//! - Command-line arguments
//! - Configuration files (TOML)
//! - Defaults

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub labels: LabelsConfig,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings used by the session model when building results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Depth of "what happens next" trees
    #[serde(default = "default_tree_size")]
    pub outgoing_tree_size: usize,

    /// Depth of "what happened before" trees
    #[serde(default = "default_tree_size")]
    pub incoming_tree_size: usize,

    /// Preferred label layer for display strings and normalization
    pub label_layer: Option<String>,
}

/// Label dictionary location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabelsConfig {
    /// Path to the TOML label dictionary
    pub dictionary: Option<PathBuf>,
}

/// Graph export settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Directory where `.graph.dot` files are written
    pub directory: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_tree_size() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            outgoing_tree_size: default_tree_size(),
            incoming_tree_size: default_tree_size(),
            label_layer: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read config file {:?}: {}", path, e)))?;

        Self::from_toml_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./sequence-search.toml
    /// 2. ~/.sequence-search/config.toml
    /// 3. /etc/sequence-search/config.toml
    pub fn load() -> Result<Self> {
        let mut paths = vec![PathBuf::from("sequence-search.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".sequence-search").join("config.toml"));
        }
        paths.push(PathBuf::from("/etc/sequence-search/config.toml"));

        for path in paths {
            if path.exists() {
                tracing::info!("Loading config from {:?}", path);
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Directory for graph exports, falling back to the working directory
    pub fn export_directory(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
