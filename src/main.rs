use meshgate::config::Config;
use meshgate::node::NodeSummary;
use meshgate::provider::ProxyHandle;
use meshgate::registry::ProviderRegistry;
use std::path::PathBuf;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Loads the configuration, prepares a node for every proxied hostname and
/// prints the resulting plans. Nodes are not started.
fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("meshgate=debug".parse().expect("valid log directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("meshgate.toml"));

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path.display(), error = %e, "Failed to load configuration");
        e
    })?;

    info!(path = %config_path.display(), "Configuration loaded");
    print_startup_banner(&config);

    let registry = ProviderRegistry::from_config(&config);
    let proxies = registry.build_all(&config).map_err(|e| {
        error!(error = %e, "Failed to prepare proxies");
        e
    })?;

    for proxy in &proxies {
        info!(
            hostname = proxy.hostname(),
            dir = %proxy.node_config().dir.display(),
            "Mesh node prepared"
        );
    }

    let plans: Vec<NodeSummary> = proxies.iter().map(|p| p.node_config().summary()).collect();
    println!("{}", serde_json::to_string_pretty(&plans)?);

    Ok(())
}

fn print_startup_banner(config: &Config) {
    info!(name = PKG_NAME, version = VERSION, "Starting mesh provider");
    info!(
        data_dir = %config.mesh.data_dir.display(),
        default_provider = %config.mesh.default_provider,
        providers = config.mesh.providers.len(),
        proxies = config.proxies.len(),
        "Mesh configuration"
    );
}
