//! Configuration validation utilities.

use thiserror::Error;

use crate::catalog::parse_namespace;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Parse a `/seg/seg/seg` namespace from a manifest.
///
/// Segments may not contain `.`, which separates segments in catalog
/// enumeration keys.
///
/// # Examples
///
/// ```
/// use pulse_catalog::config::parse_manifest_namespace;
///
/// assert_eq!(
///     parse_manifest_namespace("/intel/cpu/load").unwrap(),
///     vec!["intel", "cpu", "load"]
/// );
/// assert!(parse_manifest_namespace("/").is_err());
/// assert!(parse_manifest_namespace("/intel/cpu.load").is_err());
/// ```
pub fn parse_manifest_namespace(path: &str) -> Result<Vec<String>, String> {
    let segments = parse_namespace(path.trim());
    if segments.is_empty() {
        return Err(format!("namespace '{}' has no segments", path));
    }
    if let Some(segment) = segments.iter().find(|s| s.contains('.')) {
        return Err(format!(
            "namespace '{}': segment '{}' must not contain '.'",
            path, segment
        ));
    }
    Ok(segments)
}
