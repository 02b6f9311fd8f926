//! Pulse Catalog - Metric Catalog for Plugin-Based Telemetry
//!
//! This crate tracks every metric that loaded collector plugins can
//! produce, indexed by hierarchical namespace (e.g. `/intel/cpu/load`).
//! Several versions of a metric can coexist when different plugin
//! versions advertise it, and each entry carries the subscription count
//! schedulers use to decide what needs collecting.
//!
//! # Architecture
//!
//! - **Catalog**: namespace trie plus a locked façade for lookups,
//!   subtree fetches, subscriptions and enumeration
//! - **Plugin**: the plugin records and policy trees the catalog reads
//! - **Config**: YAML plugin manifests used by the `pulse-catalog` binary
//!
//! The catalog is purely in-memory. It does not run plugins, collect
//! values or persist anything.

pub mod catalog;
pub mod config;
pub mod plugin;

pub use catalog::{
    AdvertisedMetric, CatalogError, CatalogItem, LATEST_VERSION, MetricCatalog, MetricDescriptor,
    MetricType,
};
pub use plugin::{ConfigPolicyTree, LoadedPlugin, PluginRef, PluginType};
