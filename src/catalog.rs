//! Metric Catalog
//!
//! In-memory index of every metric the loaded plugins can produce, keyed by
//! namespace and version, with per-metric subscription counts.
//!
//! # Components
//!
//! - [`MetricType`]: one `(namespace, version)` entry and its subscription state
//! - [`MetricTrie`]: namespace trie holding the entries
//! - [`MetricCatalog`]: thread-safe façade with version resolution,
//!   subscription bookkeeping and enumeration
//!
//! # Example
//!
//! ```
//! use pulse_catalog::catalog::{AdvertisedMetric, LATEST_VERSION, MetricCatalog};
//! use pulse_catalog::plugin::{ConfigPolicyTree, LoadedPlugin, PluginType};
//!
//! let plugin = LoadedPlugin::new(PluginType::Collector, "intel-cpu", 2)
//!     .with_policy(ConfigPolicyTree::new());
//!
//! let catalog = MetricCatalog::new();
//! catalog.add_loaded_metric_type(&plugin, &AdvertisedMetric::new(&["intel", "cpu", "load"], 0));
//!
//! catalog.subscribe(&["intel", "cpu", "load"], LATEST_VERSION)?;
//! let metric = catalog.get(&["intel", "cpu", "load"], LATEST_VERSION)?;
//! assert_eq!(metric.key(), "/intel/cpu/load/2");
//! assert_eq!(metric.subscription_count(), 1);
//! # Ok::<(), pulse_catalog::catalog::CatalogError>(())
//! ```

mod error;
mod metric;
mod registry;
mod trie;

pub use error::CatalogError;
pub use metric::{
    AdvertisedMetric, LATEST_VERSION, MetricDescriptor, MetricType, UNRESOLVED_VERSION,
    namespace_to_string, parse_namespace,
};
pub use registry::{CatalogItem, MetricCatalog};
pub use trie::{MetricTrie, Versions};
