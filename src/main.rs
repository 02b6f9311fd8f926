//! Pulse Catalog Binary Entry Point
//!
//! Loads plugin manifests, builds the metric catalog and answers one
//! query against it. Core functionality is provided by the
//! `pulse_catalog` library crate.

use clap::{Parser, Subcommand};
use pulse_catalog::{
    catalog::{LATEST_VERSION, MetricCatalog, MetricType, parse_namespace},
    config::{AppConfig, LogFormat},
    plugin::LoadedPlugin,
};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Pulse Catalog - metric catalog for plugin-based telemetry
#[derive(Parser, Debug)]
#[command(name = "pulse-catalog", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/catalog.yaml",
        env = "PULSE_CATALOG_CONFIG"
    )]
    config: String,

    /// Log format (overrides config file)
    #[arg(long, env = "PULSE_CATALOG_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Unload a plugin (by name or type:name:version) before querying
    #[arg(long)]
    unload: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every catalogued namespace with its versions
    List,
    /// Resolve a single metric
    Get {
        /// Metric namespace, e.g. /intel/cpu/load
        namespace: String,
        /// Plugin version to select (negative selects the latest)
        #[arg(long, default_value_t = LATEST_VERSION, allow_hyphen_values = true)]
        version: i32,
    },
    /// Fetch every metric at or beneath a namespace
    Fetch {
        /// Namespace prefix, e.g. /intel/cpu
        namespace: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_with_plugin_path(&cli.config)?;
    if let Some(format) = cli.log_format {
        config.log.format = format;
    }

    // Initialize tracing (RUST_LOG > config file)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let json = config.log.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    tracing::info!("Loaded configuration from: {}", cli.config);

    let catalog = MetricCatalog::new();
    let plugins = config.load_plugins(&catalog)?;
    tracing::info!(
        "Catalog ready: {} plugins, {} namespaces",
        plugins.len(),
        catalog.len()
    );

    for target in &cli.unload {
        unload_plugin(&catalog, &plugins, target)?;
    }

    let output = match cli.command {
        Command::List => list(&catalog),
        Command::Get { namespace, version } => {
            metric_json(&catalog.get(&parse_namespace(&namespace), version)?)
        }
        Command::Fetch { namespace } => Value::Array(
            catalog
                .fetch(&parse_namespace(&namespace))?
                .iter()
                .map(metric_json)
                .collect(),
        ),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Remove the metrics of every plugin matching `target`.
fn unload_plugin(
    catalog: &MetricCatalog,
    plugins: &[LoadedPlugin],
    target: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let matches: Vec<_> = plugins
        .iter()
        .filter(|p| p.name() == target || p.key() == target)
        .collect();
    if matches.is_empty() {
        return Err(format!("no loaded plugin matches '{}'", target).into());
    }

    for plugin in matches {
        let removed = catalog.rm_unloaded_plugin_metrics(&plugin.reference());
        tracing::info!("Unloaded {}: {} metrics removed", plugin.key(), removed);
    }
    Ok(())
}

fn list(catalog: &MetricCatalog) -> Value {
    Value::Array(
        catalog
            .snapshot()
            .iter()
            .map(|item| {
                json!({
                    "key": item.key(),
                    "metrics": item.metrics().map(metric_json).collect::<Vec<_>>(),
                })
            })
            .collect(),
    )
}

fn metric_json(metric: &MetricType) -> Value {
    json!({
        "key": metric.key(),
        "namespace": metric.namespace_as_string(),
        "version": metric.version(),
        "plugin": metric.plugin().map(|p| p.key()),
        "subscriptions": metric.subscription_count(),
        "last_advertised_time": metric.last_advertised_time().to_rfc3339(),
        "policy": metric.policy(),
    })
}
