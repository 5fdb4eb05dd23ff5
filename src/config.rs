use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Control-plane endpoint used when a provider does not override it
pub const DEFAULT_CONTROL_URL: &str = "https://controlplane.tailscale.com";

/// Top-level configuration file
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Mesh network settings and providers
    #[serde(default)]
    pub mesh: MeshSettings,

    /// Proxied hostnames
    #[serde(default)]
    pub proxies: HashMap<String, ProxyConfig>,
}

/// Settings shared by every mesh provider
#[derive(Debug, Deserialize, Clone)]
pub struct MeshSettings {
    /// Root directory for node state; each provider gets `<data_dir>/<name>`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Provider used by proxies that don't name one
    #[serde(default = "default_provider_name")]
    pub default_provider: String,

    /// Named provider configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_provider: default_provider_name(),
            providers: HashMap::new(),
        }
    }
}

/// Credentials and endpoint for one mesh provider
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    /// OAuth client secret used to mint node keys
    #[serde(default)]
    pub oauth_key: String,

    /// Tags advertised by nodes registered with the OAuth key
    #[serde(default)]
    pub oauth_tags: Vec<String>,

    /// Pre-generated auth key
    #[serde(default)]
    pub auth_key: String,

    /// Control-plane URL (default: [`DEFAULT_CONTROL_URL`])
    pub control_url: Option<String>,
}

impl ProviderConfig {
    /// Provider authenticating with an OAuth client secret (builder pattern)
    pub fn oauth(key: &str, tags: &[&str]) -> Self {
        Self {
            oauth_key: key.to_string(),
            oauth_tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Provider authenticating with a static auth key (builder pattern)
    pub fn auth_key(key: &str) -> Self {
        Self {
            auth_key: key.to_string(),
            ..Self::default()
        }
    }

    /// Set the control-plane URL (builder pattern)
    pub fn with_control_url(mut self, url: &str) -> Self {
        self.control_url = Some(url.to_string());
        self
    }
}

/// Configuration for a single proxied hostname
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    /// Hostname the node registers as; filled from the table key on load
    #[serde(skip)]
    pub hostname: String,

    /// Provider name (default: `mesh.default_provider`)
    pub provider: Option<String>,

    /// Per-proxy mesh overrides
    #[serde(default)]
    pub mesh: MeshProxyConfig,
}

/// Per-proxy overrides for the mesh node
#[derive(Debug, Deserialize, Clone, Default)]
pub struct MeshProxyConfig {
    /// OAuth client secret overriding the provider's credentials
    #[serde(default)]
    pub oauth_key: String,

    /// Auth key used when no OAuth key is configured anywhere
    #[serde(default)]
    pub auth_key: String,

    /// Deregister the node when it disconnects
    #[serde(default)]
    pub ephemeral: bool,

    /// Serve the node's web client
    #[serde(default)]
    pub run_web_client: bool,

    /// Log the runtime's internal chatter at info instead of trace
    #[serde(default)]
    pub verbose: bool,
}

impl ProxyConfig {
    /// Create a proxy config for a hostname with no overrides
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            ..Self::default()
        }
    }

    /// Route this proxy through a named provider (builder pattern)
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    /// Set a per-proxy OAuth key (builder pattern)
    pub fn with_oauth_key(mut self, key: &str) -> Self {
        self.mesh.oauth_key = key.to_string();
        self
    }

    /// Set a per-proxy auth key (builder pattern)
    pub fn with_auth_key(mut self, key: &str) -> Self {
        self.mesh.auth_key = key.to_string();
        self
    }

    /// Mark the node ephemeral (builder pattern)
    pub fn ephemeral(mut self) -> Self {
        self.mesh.ephemeral = true;
        self
    }

    /// Enable the node's web client (builder pattern)
    pub fn with_web_client(mut self) -> Self {
        self.mesh.run_web_client = true;
        self
    }

    /// Promote runtime diagnostics to info (builder pattern)
    pub fn verbose(mut self) -> Self {
        self.mesh.verbose = true;
        self
    }

    /// Provider name this proxy resolves to
    pub fn provider_name<'a>(&'a self, settings: &'a MeshSettings) -> &'a str {
        self.provider
            .as_deref()
            .unwrap_or(&settings.default_provider)
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .map(|dir| dir.join("meshgate"))
        .unwrap_or_else(|| PathBuf::from("/data"))
}

fn default_provider_name() -> String {
    "default".to_string()
}

/// A hostname doubles as a directory name under the provider's data dir
fn is_plain_hostname(hostname: &str) -> bool {
    !hostname.contains(['/', '\\']) && hostname != "." && hostname != ".."
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        for (hostname, proxy) in config.proxies.iter_mut() {
            proxy.hostname = hostname.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate structural references. Key material is left to the runtime.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        for name in self.mesh.providers.keys() {
            if name.trim().is_empty() {
                errors.push("Provider names must not be empty".to_string());
            }
        }

        let mut hostnames: Vec<&String> = self.proxies.keys().collect();
        hostnames.sort();
        for hostname in hostnames {
            let proxy = &self.proxies[hostname];
            if hostname.trim().is_empty() {
                errors.push("Proxy hostnames must not be empty".to_string());
                continue;
            }
            if !is_plain_hostname(hostname) {
                errors.push(format!(
                    "Proxy '{}': hostname must not contain path separators or be '.' or '..'",
                    hostname
                ));
            }
            let provider = proxy.provider_name(&self.mesh);
            if !self.mesh.providers.contains_key(provider) {
                errors.push(format!(
                    "Proxy '{}': unknown provider '{}'",
                    hostname, provider
                ));
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration errors:\n  - {}", errors.join("\n  - "));
        }

        Ok(())
    }
}
