//! Configuration module for the catalog binary.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Logging settings (filter, output format)
//! - Plugin manifests (identity, policy tree, advertised metrics)
//! - An optional directory of additional manifest files

mod app;
mod manifest;
mod validation;

pub use app::{AppConfig, DEFAULT_LOG_FILTER, LogConfig, LogFormat};
pub use manifest::{MetricManifest, PluginManifest, PolicyManifest};
pub use validation::{ConfigError, parse_manifest_namespace};
