//! Registry of configured mesh providers

use crate::config::{Config, MeshSettings, ProxyConfig};
use crate::error::ProviderError;
use crate::provider::{MeshClient, MeshProxy, ProxyProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns one [`MeshClient`] per configured provider for the process lifetime
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<MeshClient>>,
    default_provider: String,
}

impl ProviderRegistry {
    /// Build clients for every provider in the mesh settings
    pub fn new(settings: &MeshSettings) -> Self {
        let clients = settings
            .providers
            .iter()
            .map(|(name, provider)| {
                debug!(provider = %name, "Registering mesh provider");
                (name.clone(), Arc::new(MeshClient::new(name, provider, settings)))
            })
            .collect::<HashMap<_, _>>();

        info!(
            providers = clients.len(),
            data_dir = %settings.data_dir.display(),
            "Mesh providers initialized"
        );

        Self {
            clients,
            default_provider: settings.default_provider.clone(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.mesh)
    }

    pub fn get(&self, name: &str) -> Option<Arc<MeshClient>> {
        self.clients.get(name).cloned()
    }

    /// Provider names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Client a proxy belongs to: its named provider, else the default
    pub fn resolve(&self, config: &ProxyConfig) -> Result<Arc<MeshClient>, ProviderError> {
        if self.clients.is_empty() {
            return Err(ProviderError::NoProviders {
                hostname: config.hostname.clone(),
            });
        }

        let name = config.provider.as_deref().unwrap_or(&self.default_provider);
        self.get(name).ok_or_else(|| ProviderError::UnknownProvider {
            provider: name.to_string(),
            hostname: config.hostname.clone(),
        })
    }

    pub fn new_proxy(&self, config: &ProxyConfig) -> Result<MeshProxy, ProviderError> {
        self.resolve(config)?.new_proxy(config)
    }

    /// Build a proxy for every configured hostname, ordered by hostname
    pub fn build_all(&self, config: &Config) -> Result<Vec<MeshProxy>, ProviderError> {
        let mut hostnames: Vec<&String> = config.proxies.keys().collect();
        hostnames.sort();

        hostnames
            .into_iter()
            .map(|hostname| self.new_proxy(&config.proxies[hostname]))
            .collect()
    }
}
