//! Metric entries tracked by the catalog.
//!
//! A [`MetricType`] describes one `(namespace, version)` pair a plugin can
//! produce, together with the subscription count that tells the scheduler
//! whether anyone currently needs it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plugin::{ConfigDataNode, ConfigPolicyNode, PluginRef};

use super::error::CatalogError;

/// Resolved version of an entry with no explicit version and no plugin.
pub const UNRESOLVED_VERSION: i32 = -1;

/// Version selector meaning "newest available".
pub const LATEST_VERSION: i32 = -1;

/// Render a namespace as `/seg/seg/seg`.
pub fn namespace_to_string<S: AsRef<str>>(namespace: &[S]) -> String {
    let mut out = String::new();
    for segment in namespace {
        out.push('/');
        out.push_str(segment.as_ref());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Split `/seg/seg/seg` into its segments, ignoring empty ones.
pub fn parse_namespace(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// What a plugin reports about each metric it can produce.
pub trait MetricDescriptor {
    fn namespace(&self) -> &[String];

    /// Advertised version; `0` defers to the plugin's version.
    fn version(&self) -> i32;

    fn last_advertised_time(&self) -> DateTime<Utc>;
}

/// Plain descriptor used by manifests and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertisedMetric {
    pub namespace: Vec<String>,
    #[serde(default)]
    pub version: i32,
    pub last_advertised_time: DateTime<Utc>,
}

impl AdvertisedMetric {
    /// Create a descriptor advertised now.
    pub fn new<S: AsRef<str>>(namespace: &[S], version: i32) -> Self {
        Self {
            namespace: namespace.iter().map(|s| s.as_ref().to_string()).collect(),
            version,
            last_advertised_time: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_last_advertised_time(mut self, at: DateTime<Utc>) -> Self {
        self.last_advertised_time = at;
        self
    }
}

impl MetricDescriptor for AdvertisedMetric {
    fn namespace(&self) -> &[String] {
        &self.namespace
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn last_advertised_time(&self) -> DateTime<Utc> {
        self.last_advertised_time
    }
}

/// A catalogued metric and its subscription state.
#[derive(Debug, Clone)]
pub struct MetricType {
    namespace: Vec<String>,
    version: i32,
    plugin: Option<PluginRef>,
    last_advertised_time: DateTime<Utc>,
    timestamp: Option<DateTime<Utc>>,
    subscriptions: u64,
    policy: Option<Arc<ConfigPolicyNode>>,
    config: Option<ConfigDataNode>,
    source: String,
    data: Option<serde_json::Value>,
}

impl MetricType {
    /// Create an entry whose version defers to `plugin`.
    pub fn new<S: AsRef<str>>(
        namespace: &[S],
        last_advertised_time: DateTime<Utc>,
        plugin: Option<PluginRef>,
    ) -> Self {
        Self {
            namespace: namespace.iter().map(|s| s.as_ref().to_string()).collect(),
            version: 0,
            plugin,
            last_advertised_time,
            timestamp: None,
            subscriptions: 0,
            policy: None,
            config: None,
            source: String::new(),
            data: None,
        }
    }

    /// Set an explicit version. Values `<= 0` defer to the plugin.
    #[must_use]
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Option<Arc<ConfigPolicyNode>>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ConfigDataNode) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    /// Namespace rendered as `/seg/seg/seg`.
    pub fn namespace_as_string(&self) -> String {
        namespace_to_string(&self.namespace)
    }

    /// Resolved version.
    ///
    /// The explicit version when positive, otherwise the owning plugin's
    /// version, otherwise [`UNRESOLVED_VERSION`].
    pub fn version(&self) -> i32 {
        if self.version > 0 {
            return self.version;
        }
        self.plugin
            .as_ref()
            .map_or(UNRESOLVED_VERSION, |plugin| plugin.version)
    }

    /// Version used when a caller selects an entry by number: the owning
    /// plugin's version, or the resolved version for plugin-less entries.
    pub(crate) fn plugin_version(&self) -> i32 {
        self.plugin
            .as_ref()
            .map_or_else(|| self.version(), |plugin| plugin.version)
    }

    /// `/seg/seg/seg/<resolved version>`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace_as_string(), self.version())
    }

    pub fn plugin(&self) -> Option<&PluginRef> {
        self.plugin.as_ref()
    }

    pub fn last_advertised_time(&self) -> DateTime<Utc> {
        self.last_advertised_time
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn policy(&self) -> Option<&Arc<ConfigPolicyNode>> {
        self.policy.as_ref()
    }

    pub fn config(&self) -> Option<&ConfigDataNode> {
        self.config.as_ref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    pub fn subscription_count(&self) -> u64 {
        self.subscriptions
    }

    pub fn subscribe(&mut self) {
        self.subscriptions += 1;
    }

    /// Drop one subscription.
    ///
    /// # Errors
    /// Returns [`CatalogError::NegativeSubscriptionCount`] when there are no
    /// subscribers; the count is left untouched.
    pub fn unsubscribe(&mut self) -> Result<(), CatalogError> {
        if self.subscriptions == 0 {
            return Err(CatalogError::NegativeSubscriptionCount { key: self.key() });
        }
        self.subscriptions -= 1;
        Ok(())
    }
}
