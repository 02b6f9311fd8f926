//! Application configuration structures.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::catalog::MetricCatalog;
use crate::plugin::LoadedPlugin;

use super::manifest::{PluginManifest, load_manifests_from_dir, validate_manifests};
use super::validation::ConfigError;

// =============================================================================
// Constants
// =============================================================================

/// Default tracing filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "info,pulse_catalog=debug";

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Log line format.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive (default: "info,pulse_catalog=debug").
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Output format (default: text).
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::Text,
        }
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Plugins loaded into the catalog.
    #[serde(default)]
    pub plugins: Vec<PluginManifest>,

    /// Path to a directory with additional plugin manifest files.
    #[serde(default)]
    pub plugin_path: Option<String>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration including the `plugin_path` directory.
    ///
    /// If `plugin_path` is specified, every YAML file in it is scanned and
    /// its plugins are appended after the ones in the main file.
    pub fn load_with_plugin_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;

        if let Some(ref plugin_dir) = config.plugin_path {
            let additional = load_manifests_from_dir(plugin_dir)?;
            config.plugins.extend(additional);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "log filter cannot be empty".to_string(),
            ));
        }

        validate_manifests(&self.plugins)?;

        Ok(())
    }

    /// Register every enabled plugin's metrics in `catalog`.
    ///
    /// Returns the plugins that were loaded, in manifest order.
    pub fn load_plugins(&self, catalog: &MetricCatalog) -> Result<Vec<LoadedPlugin>, ConfigError> {
        let advertised_at = Utc::now();
        let mut loaded = Vec::new();

        for manifest in &self.plugins {
            if !manifest.enabled {
                tracing::debug!(plugin = %manifest.reference(), "Skipping disabled plugin");
                continue;
            }
            let plugin = manifest.to_loaded_plugin()?;
            let metrics = manifest.advertised_metrics(advertised_at)?;
            catalog.register_plugin(&plugin, &metrics);
            loaded.push(plugin);
        }

        Ok(loaded)
    }
}
