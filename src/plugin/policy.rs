//! Configuration policy types published by plugins.
//!
//! A plugin ships a [`ConfigPolicyTree`] describing which configuration keys
//! each namespace subtree accepts. The catalog binds the matching
//! [`ConfigPolicyNode`] to a metric when the plugin advertises it. Evaluating
//! rules against user-supplied values is done by the task layer, not here.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A scalar configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Constraint on a single configuration key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Whether a value must be supplied.
    #[serde(default)]
    pub required: bool,
    /// Value used when none is supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,
}

impl PolicyRule {
    /// A rule that must be satisfied by the caller.
    pub fn required() -> Self {
        Self {
            required: true,
            default: None,
        }
    }

    /// An optional rule falling back to `default`.
    pub fn optional(default: impl Into<ConfigValue>) -> Self {
        Self {
            required: false,
            default: Some(default.into()),
        }
    }
}

/// The set of rules attached to one namespace subtree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigPolicyNode {
    rules: BTreeMap<String, PolicyRule>,
}

impl ConfigPolicyNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for `key`.
    #[must_use]
    pub fn with_rule(mut self, key: impl Into<String>, rule: PolicyRule) -> Self {
        self.rules.insert(key.into(), rule);
        self
    }

    pub fn rule(&self, key: &str) -> Option<&PolicyRule> {
        self.rules.get(key)
    }

    pub fn rules(&self) -> &BTreeMap<String, PolicyRule> {
        &self.rules
    }

    /// Names of keys that have no default and must be supplied.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(|(_, rule)| rule.required)
            .map(|(key, _)| key.as_str())
    }
}

/// Resolved configuration values for a metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDataNode {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigDataNode {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn values(&self) -> &BTreeMap<String, ConfigValue> {
        &self.values
    }
}

/// Policy nodes keyed by the namespace prefix they govern.
///
/// Lookups resolve to the node registered at the longest prefix of the
/// requested namespace, so a policy attached to `/intel/cpu` covers
/// `/intel/cpu/load` unless a more specific one is registered.
#[derive(Debug, Clone, Default)]
pub struct ConfigPolicyTree {
    nodes: BTreeMap<Vec<String>, Arc<ConfigPolicyNode>>,
}

impl ConfigPolicyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `node` to the subtree rooted at `namespace`, replacing any
    /// node already registered there.
    pub fn add<S: AsRef<str>>(&mut self, namespace: &[S], node: ConfigPolicyNode) {
        let key = namespace.iter().map(|s| s.as_ref().to_string()).collect();
        self.nodes.insert(key, Arc::new(node));
    }

    /// Builder form of [`add`](Self::add).
    #[must_use]
    pub fn with_node<S: AsRef<str>>(mut self, namespace: &[S], node: ConfigPolicyNode) -> Self {
        self.add(namespace, node);
        self
    }

    /// Policy governing `namespace`, if any prefix of it has one.
    pub fn get<S: AsRef<str>>(&self, namespace: &[S]) -> Option<Arc<ConfigPolicyNode>> {
        let path: Vec<String> = namespace.iter().map(|s| s.as_ref().to_string()).collect();
        (0..=path.len())
            .rev()
            .find_map(|len| self.nodes.get(&path[..len]))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
