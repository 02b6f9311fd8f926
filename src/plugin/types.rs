//! Plugin records as seen by the catalog.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::policy::ConfigPolicyTree;

/// Plugin role within the collection pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PluginType {
    /// Produces metric values.
    Collector,
    /// Transforms metric values in flight.
    Processor,
    /// Ships metric values to an external sink.
    Publisher,
}

/// Non-owning reference to a loaded plugin.
///
/// Metric entries keep one of these instead of the plugin itself. Two
/// references are the same plugin when type, name and version all match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginRef {
    pub plugin_type: PluginType,
    pub name: String,
    pub version: i32,
}

impl PluginRef {
    pub fn new(plugin_type: PluginType, name: impl Into<String>, version: i32) -> Self {
        Self {
            plugin_type,
            name: name.into(),
            version,
        }
    }

    /// Identity key in `type:name:version` form.
    pub fn key(&self) -> String {
        format!("{}:{}:{}", self.plugin_type, self.name, self.version)
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.plugin_type, self.name, self.version)
    }
}

/// A plugin that has been loaded by the plugin manager.
///
/// Lifecycle is owned by the plugin manager; the catalog only reads the
/// version and the policy tree when the plugin advertises its metrics.
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    name: String,
    plugin_type: PluginType,
    version: i32,
    config_policy: Option<ConfigPolicyTree>,
    loaded_at: DateTime<Utc>,
}

impl LoadedPlugin {
    pub fn new(plugin_type: PluginType, name: impl Into<String>, version: i32) -> Self {
        Self {
            name: name.into(),
            plugin_type,
            version,
            config_policy: None,
            loaded_at: Utc::now(),
        }
    }

    /// Set the config policy tree.
    #[must_use]
    pub fn with_policy(mut self, policy: ConfigPolicyTree) -> Self {
        self.config_policy = Some(policy);
        self
    }

    /// Set the load time.
    #[must_use]
    pub fn with_loaded_at(mut self, loaded_at: DateTime<Utc>) -> Self {
        self.loaded_at = loaded_at;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin_type(&self) -> PluginType {
        self.plugin_type
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn config_policy(&self) -> Option<&ConfigPolicyTree> {
        self.config_policy.as_ref()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Back-reference suitable for storing on metric entries.
    pub fn reference(&self) -> PluginRef {
        PluginRef::new(self.plugin_type, self.name.clone(), self.version)
    }

    pub fn key(&self) -> String {
        self.reference().key()
    }
}
