//! Thread-safe metric catalog.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::Mutex;

use crate::plugin::{LoadedPlugin, PluginRef};

use super::error::CatalogError;
use super::metric::{MetricDescriptor, MetricType, namespace_to_string};
use super::trie::{MetricTrie, Versions};

/// Dotted form of a namespace used as the enumeration key.
fn enumeration_key<S: AsRef<str>>(namespace: &[S]) -> String {
    namespace
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// One namespace captured by [`MetricCatalog::snapshot`].
#[derive(Debug, Clone)]
pub struct CatalogItem {
    key: String,
    namespace: Vec<String>,
    versions: Versions,
}

impl CatalogItem {
    /// Dotted namespace, e.g. `intel.cpu.load`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn namespace(&self) -> &[String] {
        &self.namespace
    }

    /// Entries by resolved version. Empty for namespaces removed after
    /// they were first registered.
    pub fn versions(&self) -> &BTreeMap<i32, MetricType> {
        &self.versions
    }

    pub fn metrics(&self) -> impl Iterator<Item = &MetricType> {
        self.versions.values()
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    tree: MetricTrie,
    /// Namespaces in first-seen order. Never pruned; drives enumeration only.
    keys: Vec<Vec<String>>,
    cursor: usize,
}

impl CatalogState {
    fn item(&self, namespace: &[String]) -> CatalogItem {
        CatalogItem {
            key: enumeration_key(namespace),
            namespace: namespace.to_vec(),
            versions: self.tree.get(namespace).cloned().unwrap_or_default(),
        }
    }
}

/// Catalog of every metric the loaded plugins can produce.
///
/// A single lock serializes structural changes, lookups, subscription
/// counters and the enumeration cursor, giving every caller one
/// consistent view of the catalog.
#[derive(Default)]
pub struct MetricCatalog {
    state: Mutex<CatalogState>,
}

impl fmt::Debug for MetricCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricCatalog")
            .field(
                "key_count",
                &self.state.try_lock().map(|s| s.keys.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl MetricCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric advertised by `plugin`.
    ///
    /// The entry is bound to the plugin, takes the descriptor's namespace,
    /// version and advertisement time, and picks up the policy node that
    /// governs its namespace in the plugin's policy tree.
    ///
    /// # Panics
    /// If `plugin` carries no config policy tree. Every loaded plugin must
    /// have one, so this indicates a broken plugin manager.
    pub fn add_loaded_metric_type<D>(&self, plugin: &LoadedPlugin, descriptor: &D)
    where
        D: MetricDescriptor + ?Sized,
    {
        let Some(policy_tree) = plugin.config_policy() else {
            panic!(
                "plugin {} advertised metrics without a config policy tree",
                plugin.key()
            );
        };

        let metric = MetricType::new(
            descriptor.namespace(),
            descriptor.last_advertised_time(),
            Some(plugin.reference()),
        )
        .with_version(descriptor.version())
        .with_policy(policy_tree.get(descriptor.namespace()));

        self.add(metric);
    }

    /// Register every metric `plugin` advertises. Returns how many were added.
    ///
    /// # Panics
    /// Same contract as [`add_loaded_metric_type`](Self::add_loaded_metric_type).
    pub fn register_plugin<D: MetricDescriptor>(
        &self,
        plugin: &LoadedPlugin,
        metrics: &[D],
    ) -> usize {
        for descriptor in metrics {
            self.add_loaded_metric_type(plugin, descriptor);
        }
        tracing::info!(
            plugin = %plugin.key(),
            count = metrics.len(),
            "Plugin metrics registered"
        );
        metrics.len()
    }

    /// Drop every entry owned by an unloaded plugin.
    ///
    /// Returns the number of entries removed.
    pub fn rm_unloaded_plugin_metrics(&self, plugin: &PluginRef) -> usize {
        let removed = self.state.lock().tree.delete_by_plugin(plugin);
        tracing::info!(plugin = %plugin, removed, "Unloaded plugin metrics removed");
        removed
    }

    /// Insert `metric`, replacing any entry with the same namespace and
    /// resolved version.
    pub fn add(&self, metric: MetricType) {
        let key = metric.key();
        let mut state = self.state.lock();
        if !state.keys.iter().any(|ns| ns.as_slice() == metric.namespace()) {
            state.keys.push(metric.namespace().to_vec());
        }
        let replaced = state.tree.add(metric).is_some();
        tracing::debug!(metric = %key, replaced, "Metric added");
    }

    /// Resolve one entry at `namespace`.
    ///
    /// A namespace holding a single entry returns it whatever `version`
    /// asks for. Otherwise a non-negative `version` selects the entry whose
    /// owning plugin has that version, and a negative one (see
    /// [`LATEST_VERSION`](super::LATEST_VERSION)) selects the highest
    /// resolved version.
    ///
    /// # Errors
    /// [`CatalogError::MetricNotFound`] or [`CatalogError::VersionNotFound`].
    pub fn get<S: AsRef<str>>(
        &self,
        namespace: &[S],
        version: i32,
    ) -> Result<MetricType, CatalogError> {
        let state = self.state.lock();
        let versions = state.tree.get(namespace)?;
        let selected = select_version(namespace, versions, version)?;
        versions
            .get(&selected)
            .cloned()
            .ok_or_else(|| CatalogError::metric_not_found(namespace))
    }

    /// Every entry at or beneath `namespace`.
    ///
    /// # Errors
    /// [`CatalogError::MetricNotFound`] when the subtree is empty.
    pub fn fetch<S: AsRef<str>>(
        &self,
        namespace: &[S],
    ) -> Result<Vec<MetricType>, CatalogError> {
        self.state.lock().tree.fetch(namespace)
    }

    /// Remove all versions stored at exactly `namespace`.
    ///
    /// The namespace keeps its enumeration slot and shows up with no
    /// entries in [`item`](Self::item) and [`snapshot`](Self::snapshot).
    pub fn remove<S: AsRef<str>>(&self, namespace: &[S]) {
        let removed = self.state.lock().tree.remove(namespace);
        tracing::debug!(
            namespace = %namespace_to_string(namespace),
            removed = removed.len(),
            "Metric namespace removed"
        );
    }

    /// Increment the subscription count of the resolved entry.
    ///
    /// # Errors
    /// Propagates lookup failures from [`get`](Self::get).
    pub fn subscribe<S: AsRef<str>>(
        &self,
        namespace: &[S],
        version: i32,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        let metric = resolve_mut(&mut state.tree, namespace, version)?;
        metric.subscribe();
        tracing::debug!(
            metric = %metric.key(),
            subscriptions = metric.subscription_count(),
            "Metric subscribed"
        );
        Ok(())
    }

    /// Decrement the subscription count of the resolved entry.
    ///
    /// # Errors
    /// Lookup failures from [`get`](Self::get), or
    /// [`CatalogError::NegativeSubscriptionCount`] when the entry has no
    /// subscribers. Nothing is modified on error.
    pub fn unsubscribe<S: AsRef<str>>(
        &self,
        namespace: &[S],
        version: i32,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        let metric = resolve_mut(&mut state.tree, namespace, version)?;
        metric
            .unsubscribe()
            .inspect_err(|e| tracing::warn!(error = %e, "Unsubscribe rejected"))?;
        tracing::debug!(
            metric = %metric.key(),
            subscriptions = metric.subscription_count(),
            "Metric unsubscribed"
        );
        Ok(())
    }

    /// Owning plugin of the resolved entry, if it has one.
    ///
    /// # Errors
    /// Propagates lookup failures from [`get`](Self::get).
    pub fn get_plugin<S: AsRef<str>>(
        &self,
        namespace: &[S],
        version: i32,
    ) -> Result<Option<PluginRef>, CatalogError> {
        Ok(self.get(namespace, version)?.plugin().cloned())
    }

    /// Advance the shared enumeration cursor.
    ///
    /// Returns `true` while the cursor points at a key. Past the last key
    /// the cursor resets to the start and `false` is returned. Only one
    /// consumer should walk the cursor at a time; concurrent callers see
    /// each other's advances. Prefer [`snapshot`](Self::snapshot).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> bool {
        let mut state = self.state.lock();
        state.cursor += 1;
        if state.cursor > state.keys.len() {
            state.cursor = 0;
            return false;
        }
        true
    }

    /// Dotted key under the cursor and the entries currently stored there.
    ///
    /// Returns `None` when [`next`](Self::next) has not positioned the
    /// cursor on a key.
    pub fn item(&self) -> Option<(String, Vec<MetricType>)> {
        let state = self.state.lock();
        let namespace = state.keys.get(state.cursor.checked_sub(1)?)?;
        let item = state.item(namespace);
        Some((item.key, item.versions.into_values().collect()))
    }

    /// Every enumeration key with its current entries, in first-seen order.
    pub fn snapshot(&self) -> Vec<CatalogItem> {
        let state = self.state.lock();
        state.keys.iter().map(|ns| state.item(ns)).collect()
    }

    /// Number of distinct namespaces ever added.
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick the leaf version of the entry a `(namespace, version)` request
/// resolves to.
///
/// Ties on the latest version go to the lowest leaf key, which is the
/// first one visited.
fn select_version<S: AsRef<str>>(
    namespace: &[S],
    versions: &Versions,
    version: i32,
) -> Result<i32, CatalogError> {
    let mut entries = versions.iter();
    let Some((first_key, first)) = entries.next() else {
        return Err(CatalogError::metric_not_found(namespace));
    };
    if versions.len() == 1 {
        return Ok(*first_key);
    }

    if version >= 0 {
        return versions
            .iter()
            .find(|(_, mt)| mt.plugin_version() == version)
            .map(|(key, _)| *key)
            .ok_or_else(|| CatalogError::version_not_found(namespace, version));
    }

    let (latest, _) = entries.fold((first_key, first), |(cur_key, cur), (key, mt)| {
        if mt.version() > cur.version() {
            (key, mt)
        } else {
            (cur_key, cur)
        }
    });
    Ok(*latest)
}

fn resolve_mut<'a, S: AsRef<str>>(
    tree: &'a mut MetricTrie,
    namespace: &[S],
    version: i32,
) -> Result<&'a mut MetricType, CatalogError> {
    let versions = tree.get_mut(namespace)?;
    let selected = select_version(namespace, versions, version)?;
    versions
        .get_mut(&selected)
        .ok_or_else(|| CatalogError::metric_not_found(namespace))
}
