//! Plugin manifest structures.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::AdvertisedMetric;
use crate::plugin::{
    ConfigPolicyNode, ConfigPolicyTree, LoadedPlugin, PluginRef, PluginType, PolicyRule,
};

use super::validation::{ConfigError, parse_manifest_namespace};

fn default_enabled() -> bool {
    true
}

fn default_plugin_type() -> PluginType {
    PluginType::Collector
}

/// Policy rules attached to a namespace subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyManifest {
    /// Subtree root (e.g. `/intel/cpu`).
    pub namespace: String,
    /// Rules keyed by configuration key.
    #[serde(default)]
    pub rules: BTreeMap<String, PolicyRule>,
}

/// A metric a plugin advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricManifest {
    /// Metric namespace (e.g. `/intel/cpu/load`).
    pub namespace: String,
    /// Advertised version (default: 0, defer to the plugin version).
    #[serde(default)]
    pub version: i32,
}

/// Description of one loaded plugin and what it advertises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name.
    pub name: String,
    /// Plugin role (default: collector).
    #[serde(rename = "type", default = "default_plugin_type")]
    pub plugin_type: PluginType,
    /// Plugin version (must be positive).
    pub version: i32,
    /// Load this plugin (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Config policy tree.
    #[serde(default)]
    pub policy: Vec<PolicyManifest>,
    /// Advertised metrics.
    #[serde(default)]
    pub metrics: Vec<MetricManifest>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

impl PluginManifest {
    /// Create an enabled manifest with no policy and no metrics.
    pub fn new(plugin_type: PluginType, name: impl Into<String>, version: i32) -> Self {
        Self {
            name: name.into(),
            plugin_type,
            version,
            enabled: true,
            policy: Vec::new(),
            metrics: Vec::new(),
            description: None,
        }
    }

    /// Add an advertised metric.
    pub fn with_metric(mut self, namespace: impl Into<String>, version: i32) -> Self {
        self.metrics.push(MetricManifest {
            namespace: namespace.into(),
            version,
        });
        self
    }

    /// Add a policy subtree.
    pub fn with_policy(
        mut self,
        namespace: impl Into<String>,
        rules: BTreeMap<String, PolicyRule>,
    ) -> Self {
        self.policy.push(PolicyManifest {
            namespace: namespace.into(),
            rules,
        });
        self
    }

    /// Set enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Identity of the plugin this manifest describes.
    pub fn reference(&self) -> PluginRef {
        PluginRef::new(self.plugin_type, self.name.clone(), self.version)
    }

    /// Validate the manifest.
    pub fn validate(&self) -> Result<(), String> {
        if self.version < 1 {
            return Err(format!("version must be positive, got {}", self.version));
        }
        for policy in &self.policy {
            parse_manifest_namespace(&policy.namespace)
                .map_err(|e| format!("policy: {}", e))?;
        }
        for metric in &self.metrics {
            parse_manifest_namespace(&metric.namespace)
                .map_err(|e| format!("metric: {}", e))?;
        }
        Ok(())
    }

    /// Build the plugin record, including its policy tree.
    ///
    /// The tree is always present, empty when the manifest lists no policy.
    pub fn to_loaded_plugin(&self) -> Result<LoadedPlugin, ConfigError> {
        let mut tree = ConfigPolicyTree::new();
        for policy in &self.policy {
            let namespace = parse_manifest_namespace(&policy.namespace)
                .map_err(|e| self.validation_error(e))?;
            let node = policy
                .rules
                .iter()
                .fold(ConfigPolicyNode::new(), |node, (key, rule)| {
                    node.with_rule(key, rule.clone())
                });
            tree.add(namespace.as_slice(), node);
        }

        Ok(LoadedPlugin::new(self.plugin_type, &self.name, self.version).with_policy(tree))
    }

    /// Descriptors for every advertised metric, stamped with `advertised_at`.
    pub fn advertised_metrics(
        &self,
        advertised_at: DateTime<Utc>,
    ) -> Result<Vec<AdvertisedMetric>, ConfigError> {
        self.metrics
            .iter()
            .map(|metric| {
                let namespace = parse_manifest_namespace(&metric.namespace)
                    .map_err(|e| self.validation_error(e))?;
                Ok(AdvertisedMetric::new(namespace.as_slice(), metric.version)
                    .with_last_advertised_time(advertised_at))
            })
            .collect()
    }

    fn validation_error(&self, message: String) -> ConfigError {
        ConfigError::ValidationError(format!("plugin '{}': {}", self.name, message))
    }
}

/// Shape of a manifest file in the plugin directory.
#[derive(Debug, Default, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    plugins: Vec<PluginManifest>,
}

/// Validate a set of manifests.
///
/// Names must be non-empty and `type:name:version` unique across the set.
pub(crate) fn validate_manifests(manifests: &[PluginManifest]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for manifest in manifests {
        if manifest.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "plugin name cannot be empty".to_string(),
            ));
        }
        let reference = manifest.reference();
        if !seen.insert(reference.key()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate plugin: '{}'",
                reference
            )));
        }
        manifest
            .validate()
            .map_err(|e| manifest.validation_error(e))?;
    }

    Ok(())
}

/// Load plugin manifests from all YAML files in a directory.
///
/// Files are read in file-name order.
pub(crate) fn load_manifests_from_dir(dir_path: &str) -> Result<Vec<PluginManifest>, ConfigError> {
    let dir = Path::new(dir_path);
    if !dir.exists() {
        return Err(ConfigError::ValidationError(format!(
            "plugin_path '{}' does not exist",
            dir_path
        )));
    }
    if !dir.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "plugin_path '{}' is not a directory",
            dir_path
        )));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if ext == "yaml" || ext == "yml" {
            paths.push(path);
        }
    }
    paths.sort();

    let mut merged = Vec::new();
    for path in paths {
        tracing::debug!("Loading plugin manifest from: {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        let file: ManifestFile = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ValidationError(format!("failed to parse '{}': {}", path.display(), e))
        })?;
        merged.extend(file.plugins);
    }

    Ok(merged)
}
