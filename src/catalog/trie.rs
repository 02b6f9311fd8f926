//! Namespace trie.
//!
//! Each node is keyed by one namespace segment. A node that terminates a
//! registered namespace carries a leaf map from resolved version to entry.
//! Nodes that end up with neither leaves nor children are pruned, so the
//! tree never holds dangling branches.

use std::collections::BTreeMap;

use crate::plugin::PluginRef;

use super::error::CatalogError;
use super::metric::MetricType;

/// Entries stored at one namespace, keyed by resolved version.
pub type Versions = BTreeMap<i32, MetricType>;

#[derive(Debug, Default)]
struct Node {
    children: BTreeMap<String, Node>,
    leaves: Option<Versions>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.leaves.is_none()
    }

    fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, segment| node.children.get(segment.as_ref()))
    }

    fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Node> {
        path.iter()
            .try_fold(self, |node, segment| node.children.get_mut(segment.as_ref()))
    }

    fn collect(&self, out: &mut Vec<MetricType>) {
        if let Some(leaves) = &self.leaves {
            out.extend(leaves.values().cloned());
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }

    fn remove<S: AsRef<str>>(&mut self, path: &[S]) -> Option<Versions> {
        let Some((head, rest)) = path.split_first() else {
            return self.leaves.take();
        };
        let child = self.children.get_mut(head.as_ref())?;
        let removed = child.remove(rest);
        if child.is_empty() {
            self.children.remove(head.as_ref());
        }
        removed
    }

    fn delete_by_plugin(&mut self, plugin: &PluginRef) -> usize {
        let mut removed = 0;
        if let Some(leaves) = &mut self.leaves {
            let before = leaves.len();
            leaves.retain(|_, mt| mt.plugin() != Some(plugin));
            removed += before - leaves.len();
        }
        if self.leaves.as_ref().is_some_and(BTreeMap::is_empty) {
            self.leaves = None;
        }
        self.children.retain(|_, child| {
            removed += child.delete_by_plugin(plugin);
            !child.is_empty()
        });
        removed
    }
}

/// Hierarchical index of metric entries by namespace.
#[derive(Debug, Default)]
pub struct MetricTrie {
    root: Node,
}

impl MetricTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `metric` under its namespace at its resolved version.
    ///
    /// Missing intermediate nodes are created. An entry already stored at
    /// the same namespace and version is replaced and returned.
    pub fn add(&mut self, metric: MetricType) -> Option<MetricType> {
        let mut node = &mut self.root;
        for segment in metric.namespace() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.leaves
            .get_or_insert_with(BTreeMap::new)
            .insert(metric.version(), metric)
    }

    /// All versions stored at exactly `namespace`.
    ///
    /// # Errors
    /// [`CatalogError::MetricNotFound`] when no entry terminates there.
    pub fn get<S: AsRef<str>>(&self, namespace: &[S]) -> Result<&Versions, CatalogError> {
        self.root
            .find(namespace)
            .and_then(|node| node.leaves.as_ref())
            .ok_or_else(|| CatalogError::metric_not_found(namespace))
    }

    /// Mutable form of [`get`](Self::get).
    pub fn get_mut<S: AsRef<str>>(
        &mut self,
        namespace: &[S],
    ) -> Result<&mut Versions, CatalogError> {
        self.root
            .find_mut(namespace)
            .and_then(|node| node.leaves.as_mut())
            .ok_or_else(|| CatalogError::metric_not_found(namespace))
    }

    /// Every entry at `namespace` or anywhere beneath it.
    ///
    /// Entries are ordered depth-first with siblings in segment order and
    /// versions ascending within a namespace.
    ///
    /// # Errors
    /// [`CatalogError::MetricNotFound`] when the subtree holds no entries.
    pub fn fetch<S: AsRef<str>>(
        &self,
        namespace: &[S],
    ) -> Result<Vec<MetricType>, CatalogError> {
        let mut out = Vec::new();
        if let Some(node) = self.root.find(namespace) {
            node.collect(&mut out);
        }
        if out.is_empty() {
            return Err(CatalogError::metric_not_found(namespace));
        }
        Ok(out)
    }

    /// Drop the leaf map at exactly `namespace` and prune emptied ancestors.
    ///
    /// Descendant namespaces are left alone. Returns the removed entries.
    pub fn remove<S: AsRef<str>>(&mut self, namespace: &[S]) -> Vec<MetricType> {
        self.root
            .remove(namespace)
            .map(|versions| versions.into_values().collect())
            .unwrap_or_default()
    }

    /// Remove every entry owned by `plugin`, pruning emptied branches.
    ///
    /// Returns the number of entries removed.
    pub fn delete_by_plugin(&mut self, plugin: &PluginRef) -> usize {
        self.root.delete_by_plugin(plugin)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginType;
    use chrono::Utc;

    fn plugin(name: &str, version: i32) -> PluginRef {
        PluginRef::new(PluginType::Collector, name, version)
    }

    fn metric(ns: &[&str], owner: &PluginRef) -> MetricType {
        MetricType::new(ns, Utc::now(), Some(owner.clone()))
    }

    fn namespaces(metrics: &[MetricType]) -> Vec<String> {
        metrics.iter().map(MetricType::key).collect()
    }

    // =========================================================================
    // Add / Get
    // =========================================================================

    #[test]
    fn test_add_and_get_exact() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));

        let versions = trie.get(&["intel", "cpu", "load"]).unwrap();
        assert_eq!(versions.len(), 1);
        assert!(versions.contains_key(&1));
    }

    #[test]
    fn test_get_intermediate_node_is_not_found() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));

        let err = trie.get(&["intel", "cpu"]).unwrap_err();
        assert_eq!(err.to_string(), "metric not found: /intel/cpu");
        assert!(trie.get(&["intel", "cpu", "load", "avg"]).is_err());
        assert!(trie.get(&["acme"]).is_err());
    }

    #[test]
    fn test_add_same_version_replaces() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        assert!(trie.add(metric(&["intel", "cpu", "load"], &a)).is_none());

        let replaced = trie.add(metric(&["intel", "cpu", "load"], &a).with_source("second"));
        assert!(replaced.is_some());

        let versions = trie.get(&["intel", "cpu", "load"]).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[&1].source(), "second");
    }

    #[test]
    fn test_add_keeps_versions_apart() {
        let a = plugin("cpu", 1);
        let b = plugin("cpu", 2);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));
        trie.add(metric(&["intel", "cpu", "load"], &b));

        let versions = trie.get(&["intel", "cpu", "load"]).unwrap();
        assert_eq!(versions.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    // =========================================================================
    // Fetch
    // =========================================================================

    #[test]
    fn test_fetch_collects_subtree() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));
        trie.add(metric(&["intel", "cpu", "temperature"], &a));
        trie.add(metric(&["intel", "mem", "free"], &a));

        let fetched = trie.fetch(&["intel", "cpu"]).unwrap();
        assert_eq!(
            namespaces(&fetched),
            vec!["/intel/cpu/load/1", "/intel/cpu/temperature/1"]
        );

        let all = trie.fetch(&["intel"]).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_fetch_includes_node_own_leaves() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu"], &a));
        trie.add(metric(&["intel", "cpu", "load"], &a));

        let fetched = trie.fetch(&["intel", "cpu"]).unwrap();
        assert_eq!(namespaces(&fetched), vec!["/intel/cpu/1", "/intel/cpu/load/1"]);
    }

    #[test]
    fn test_fetch_missing_path() {
        let trie = MetricTrie::new();
        assert!(trie.fetch(&["intel"]).unwrap_err().is_not_found());
    }

    // =========================================================================
    // Remove / DeleteByPlugin
    // =========================================================================

    #[test]
    fn test_remove_prunes_ancestors() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));

        let removed = trie.remove(&["intel", "cpu", "load"]);
        assert_eq!(removed.len(), 1);
        assert!(trie.is_empty());
        assert!(trie.fetch(&["intel"]).is_err());
    }

    #[test]
    fn test_remove_keeps_siblings_and_descendants() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu"], &a));
        trie.add(metric(&["intel", "cpu", "load"], &a));
        trie.add(metric(&["intel", "mem", "free"], &a));

        trie.remove(&["intel", "cpu"]);
        assert!(trie.get(&["intel", "cpu"]).is_err());
        assert!(trie.get(&["intel", "cpu", "load"]).is_ok());
        assert!(trie.get(&["intel", "mem", "free"]).is_ok());
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));

        assert!(trie.remove(&["intel", "cpu"]).is_empty());
        assert!(trie.remove(&["acme", "disk"]).is_empty());
        assert!(trie.get(&["intel", "cpu", "load"]).is_ok());
    }

    #[test]
    fn test_delete_by_plugin() {
        let a = plugin("cpu", 1);
        let b = plugin("cpu", 2);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));
        trie.add(metric(&["intel", "cpu", "load"], &b));
        trie.add(metric(&["intel", "cpu", "temperature"], &b));
        trie.add(metric(&["intel", "mem", "free"], &a));

        assert_eq!(trie.delete_by_plugin(&b), 2);

        let versions = trie.get(&["intel", "cpu", "load"]).unwrap();
        assert_eq!(versions.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert!(trie.get(&["intel", "cpu", "temperature"]).is_err());
        assert!(trie.get(&["intel", "mem", "free"]).is_ok());
    }

    #[test]
    fn test_delete_by_plugin_prunes_whole_tree() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));
        trie.add(metric(&["intel", "mem", "free"], &a));

        assert_eq!(trie.delete_by_plugin(&a), 2);
        assert!(trie.is_empty());
        assert_eq!(trie.delete_by_plugin(&a), 0);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let a = plugin("cpu", 1);
        let mut trie = MetricTrie::new();
        trie.add(metric(&["intel", "cpu", "load"], &a));

        if let Some(mt) = trie.get_mut(&["intel", "cpu", "load"]).unwrap().get_mut(&1) {
            mt.subscribe();
        }
        assert_eq!(trie.get(&["intel", "cpu", "load"]).unwrap()[&1].subscription_count(), 1);
    }
}
