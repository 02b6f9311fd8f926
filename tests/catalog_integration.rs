//! Catalog Integration Tests
//!
//! Exercises the public catalog API end to end: plugin registration,
//! version resolution, subscriptions, unloads, enumeration and manifest
//! loading.

use std::sync::Arc;
use std::thread;

use pulse_catalog::catalog::{
    AdvertisedMetric, CatalogError, LATEST_VERSION, MetricCatalog, MetricType,
};
use pulse_catalog::config::AppConfig;
use pulse_catalog::plugin::{ConfigPolicyTree, LoadedPlugin, PluginType};

// =============================================================================
// Test Helpers
// =============================================================================

const LOAD: [&str; 3] = ["intel", "cpu", "load"];

fn collector(name: &str, version: i32) -> LoadedPlugin {
    LoadedPlugin::new(PluginType::Collector, name, version).with_policy(ConfigPolicyTree::new())
}

/// Plugin A advertises `/intel/cpu/load` at version 1, plugin B at version 2.
fn two_plugin_catalog() -> (MetricCatalog, LoadedPlugin, LoadedPlugin) {
    let a = collector("intel-cpu", 1);
    let b = collector("intel-cpu", 2);
    let catalog = MetricCatalog::new();
    catalog.add_loaded_metric_type(&a, &AdvertisedMetric::new(&LOAD, 1));
    catalog.add_loaded_metric_type(&b, &AdvertisedMetric::new(&LOAD, 2));
    (catalog, a, b)
}

fn keys(metrics: &[MetricType]) -> Vec<String> {
    metrics.iter().map(MetricType::key).collect()
}

// =============================================================================
// Version Resolution Scenario
// =============================================================================

#[test]
fn test_two_versions_scenario() {
    let (catalog, a, b) = two_plugin_catalog();

    let latest = catalog.get(&LOAD, LATEST_VERSION).unwrap();
    assert_eq!(latest.version(), 2);
    assert_eq!(latest.plugin(), Some(&b.reference()));

    let v1 = catalog.get(&LOAD, 1).unwrap();
    assert_eq!(v1.version(), 1);
    assert_eq!(v1.plugin(), Some(&a.reference()));

    let fetched = catalog.fetch(&["intel", "cpu"]).unwrap();
    assert_eq!(keys(&fetched), vec!["/intel/cpu/load/1", "/intel/cpu/load/2"]);

    catalog.subscribe(&LOAD, 2).unwrap();
    catalog.subscribe(&LOAD, 1).unwrap();
    catalog.unsubscribe(&LOAD, 1).unwrap();
    assert_eq!(catalog.get(&LOAD, 1).unwrap().subscription_count(), 0);
    assert_eq!(catalog.get(&LOAD, 2).unwrap().subscription_count(), 1);
}

#[test]
fn test_unsubscribe_never_subscribed() {
    let (catalog, _, _) = two_plugin_catalog();

    let err = catalog.unsubscribe(&LOAD, 2).unwrap_err();
    assert!(matches!(err, CatalogError::NegativeSubscriptionCount { .. }));

    // Catalog is intact and usable afterwards.
    assert_eq!(catalog.fetch(&LOAD).unwrap().len(), 2);
    catalog.subscribe(&LOAD, 2).unwrap();
    catalog.unsubscribe(&LOAD, 2).unwrap();
    assert_eq!(catalog.get(&LOAD, 2).unwrap().subscription_count(), 0);
}

#[test]
fn test_unload_plugin_scenario() {
    let (catalog, a, b) = two_plugin_catalog();

    assert_eq!(catalog.rm_unloaded_plugin_metrics(&b.reference()), 1);

    let latest = catalog.get(&LOAD, LATEST_VERSION).unwrap();
    assert_eq!(latest.version(), 1);
    assert_eq!(latest.plugin(), Some(&a.reference()));
    assert_eq!(
        keys(&catalog.fetch(&["intel", "cpu"]).unwrap()),
        vec!["/intel/cpu/load/1"]
    );
}

#[test]
fn test_latest_is_max_version_regardless_of_insert_order() {
    let orders: [&[i32]; 4] = [&[1, 2, 3], &[3, 2, 1], &[2, 3, 1], &[5, 1, 4, 2]];

    for order in orders {
        let catalog = MetricCatalog::new();
        for &version in order {
            catalog.add_loaded_metric_type(
                &collector("intel-cpu", version),
                &AdvertisedMetric::new(&LOAD, 0),
            );
        }
        let max = order.iter().copied().max().unwrap();
        assert_eq!(catalog.get(&LOAD, LATEST_VERSION).unwrap().version(), max);
    }
}

// =============================================================================
// Fetch / Get Scope
// =============================================================================

#[test]
fn test_fetch_is_subtree_get_is_exact() {
    let plugin = collector("intel", 1);
    let catalog = MetricCatalog::new();
    catalog.register_plugin(
        &plugin,
        &[
            AdvertisedMetric::new(&["intel", "cpu"], 0),
            AdvertisedMetric::new(&LOAD, 0),
            AdvertisedMetric::new(&["intel", "cpu", "temperature"], 0),
            AdvertisedMetric::new(&["intel", "cpufreq"], 0),
            AdvertisedMetric::new(&["intel", "mem", "free"], 0),
        ],
    );

    assert_eq!(
        keys(&catalog.fetch(&["intel", "cpu"]).unwrap()),
        vec![
            "/intel/cpu/1",
            "/intel/cpu/load/1",
            "/intel/cpu/temperature/1"
        ]
    );
    assert_eq!(catalog.get(&["intel", "cpu"], LATEST_VERSION).unwrap().key(), "/intel/cpu/1");
    assert_eq!(catalog.fetch(&["intel"]).unwrap().len(), 5);
    assert!(catalog.get(&["intel"], LATEST_VERSION).unwrap_err().is_not_found());
    assert!(catalog.fetch(&["acme"]).unwrap_err().is_not_found());
}

#[test]
fn test_unload_leaves_other_plugins_untouched() {
    let cpu = collector("cpu", 1);
    let mem = collector("mem", 1);
    let catalog = MetricCatalog::new();
    catalog.register_plugin(
        &cpu,
        &[
            AdvertisedMetric::new(&LOAD, 0),
            AdvertisedMetric::new(&["intel", "shared"], 0),
        ],
    );
    catalog.register_plugin(
        &mem,
        &[
            AdvertisedMetric::new(&["intel", "mem", "free"], 0),
            AdvertisedMetric::new(&["intel", "shared"], 7),
        ],
    );
    catalog.subscribe(&["intel", "mem", "free"], LATEST_VERSION).unwrap();

    assert_eq!(catalog.rm_unloaded_plugin_metrics(&cpu.reference()), 2);

    assert!(catalog.get(&LOAD, LATEST_VERSION).unwrap_err().is_not_found());
    let shared = catalog.get(&["intel", "shared"], LATEST_VERSION).unwrap();
    assert_eq!(shared.plugin(), Some(&mem.reference()));
    assert_eq!(
        catalog
            .get(&["intel", "mem", "free"], LATEST_VERSION)
            .unwrap()
            .subscription_count(),
        1
    );
}

// =============================================================================
// Enumeration
// =============================================================================

#[test]
fn test_next_item_protocol() {
    let plugin = collector("intel", 1);
    let catalog = MetricCatalog::new();
    let namespaces = [
        vec!["intel", "cpu", "load"],
        vec!["intel", "mem", "free"],
        vec!["intel", "disk", "io"],
    ];
    for ns in &namespaces {
        catalog.add_loaded_metric_type(&plugin, &AdvertisedMetric::new(ns, 0));
    }
    // Re-adding an existing namespace does not create a new key.
    catalog.add_loaded_metric_type(&collector("intel", 2), &AdvertisedMetric::new(&LOAD, 0));

    for ns in &namespaces {
        assert!(catalog.next());
        let (key, metrics) = catalog.item().unwrap();
        assert_eq!(key, ns.join("."));
        assert!(!metrics.is_empty());
    }
    assert!(!catalog.next());

    // Auto-reset.
    assert!(catalog.next());
    let (key, metrics) = catalog.item().unwrap();
    assert_eq!(key, "intel.cpu.load");
    assert_eq!(metrics.len(), 2);
}

#[test]
fn test_removed_namespace_still_enumerated() {
    let (catalog, _, _) = two_plugin_catalog();
    catalog.remove(&LOAD);

    assert!(catalog.fetch(&LOAD).unwrap_err().is_not_found());

    // Stale key: the namespace stays enumerable with no entries.
    assert!(catalog.next());
    let (key, metrics) = catalog.item().unwrap();
    assert_eq!(key, "intel.cpu.load");
    assert!(metrics.is_empty());
    assert!(!catalog.next());

    let snapshot = catalog.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].metrics().count(), 0);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_subscriptions() {
    let (catalog, _, _) = two_plugin_catalog();
    let catalog = Arc::new(catalog);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                let version = if i % 2 == 0 { 1 } else { 2 };
                for _ in 0..100 {
                    catalog.subscribe(&LOAD, version).unwrap();
                }
                for _ in 0..40 {
                    catalog.unsubscribe(&LOAD, version).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(catalog.get(&LOAD, 1).unwrap().subscription_count(), 240);
    assert_eq!(catalog.get(&LOAD, 2).unwrap().subscription_count(), 240);
}

#[test]
fn test_concurrent_registration_and_unload() {
    let catalog = Arc::new(MetricCatalog::new());

    let handles: Vec<_> = (1..=6)
        .map(|version| {
            let catalog = Arc::clone(&catalog);
            thread::spawn(move || {
                let plugin = collector("intel-cpu", version);
                let metrics: Vec<_> = (0..20)
                    .map(|n| {
                        let core = format!("core{}", n);
                        AdvertisedMetric::new(&["intel", "cpu", core.as_str()], 0)
                    })
                    .collect();
                catalog.register_plugin(&plugin, &metrics);
                if version % 2 == 0 {
                    catalog.rm_unloaded_plugin_metrics(&plugin.reference());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let remaining = catalog.fetch(&["intel", "cpu"]).unwrap();
    assert_eq!(remaining.len(), 60);
    assert!(remaining.iter().all(|m| m.version() % 2 == 1));
    assert_eq!(catalog.len(), 20);
    assert_eq!(
        catalog.get(&["intel", "cpu", "core0"], LATEST_VERSION).unwrap().version(),
        5
    );
}

// =============================================================================
// Manifest Loading
// =============================================================================

#[test]
fn test_load_manifest_with_plugin_path() {
    let dir = tempfile::tempdir().unwrap();
    let plugin_dir = dir.path().join("plugins.d");
    std::fs::create_dir(&plugin_dir).unwrap();

    std::fs::write(
        plugin_dir.join("mem.yaml"),
        r#"
plugins:
  - name: intel-mem
    version: 1
    metrics:
      - namespace: /intel/mem/free
"#,
    )
    .unwrap();

    let config_path = dir.path().join("catalog.yaml");
    std::fs::write(
        &config_path,
        format!(
            r#"
log:
  filter: debug
  format: json
plugin_path: {}
plugins:
  - name: intel-cpu
    type: collector
    version: 2
    policy:
      - namespace: /intel/cpu
        rules:
          user: {{ required: true }}
    metrics:
      - namespace: /intel/cpu/load
      - namespace: /intel/cpu/temperature
        version: 5
"#,
            plugin_dir.display()
        ),
    )
    .unwrap();

    let config = AppConfig::load_with_plugin_path(&config_path).unwrap();
    assert_eq!(config.plugins.len(), 2);

    let catalog = MetricCatalog::new();
    let plugins = config.load_plugins(&catalog).unwrap();
    assert_eq!(plugins.len(), 2);

    let load = catalog.get(&LOAD, LATEST_VERSION).unwrap();
    assert_eq!(load.version(), 2);
    assert!(load.policy().unwrap().rule("user").unwrap().required);

    let temperature = catalog
        .get(&["intel", "cpu", "temperature"], LATEST_VERSION)
        .unwrap();
    assert_eq!(temperature.key(), "/intel/cpu/temperature/5");

    let free = catalog
        .get(&["intel", "mem", "free"], LATEST_VERSION)
        .unwrap();
    assert!(free.policy().is_none());

    let keys: Vec<_> = catalog
        .snapshot()
        .iter()
        .map(|item| item.key().to_string())
        .collect();
    assert_eq!(
        keys,
        vec!["intel.cpu.load", "intel.cpu.temperature", "intel.mem.free"]
    );
}

#[test]
fn test_load_manifest_rejects_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("catalog.yaml");
    std::fs::write(
        &config_path,
        r#"
plugins:
  - name: intel-cpu
    version: 1
  - name: intel-cpu
    version: 1
"#,
    )
    .unwrap();

    let err = AppConfig::load(&config_path).unwrap_err();
    assert!(err.to_string().contains("duplicate plugin"));
}
