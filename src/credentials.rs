//! Credential selection for mesh nodes
//!
//! A node registers with exactly one key. Four sources can provide it and the
//! first non-empty one wins:
//! 1. OAuth key from the proxy config
//! 2. OAuth key from the provider
//! 3. Auth key from the proxy config
//! 4. Auth key from the provider
//!
//! Advertise tags only travel with OAuth keys. Static auth keys cannot carry
//! tags at registration time, so a winning auth key always has none.

use std::fmt;

/// Which configured source supplied the node key
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    ProxyOAuth,
    ProviderOAuth,
    ProxyAuthKey,
    ProviderAuthKey,
    /// Nothing configured; the runtime will reject registration
    None,
}

impl KeySource {
    /// True for the tiers that advertise tags
    pub fn is_oauth(&self) -> bool {
        matches!(self, KeySource::ProxyOAuth | KeySource::ProviderOAuth)
    }
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::ProxyOAuth => write!(f, "proxy_oauth"),
            KeySource::ProviderOAuth => write!(f, "provider_oauth"),
            KeySource::ProxyAuthKey => write!(f, "proxy_auth_key"),
            KeySource::ProviderAuthKey => write!(f, "provider_auth_key"),
            KeySource::None => write!(f, "none"),
        }
    }
}

/// Key and tags selected for one node
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub key: String,
    pub tags: Vec<String>,
    pub source: KeySource,
}

impl ResolvedCredential {
    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

// Keys never reach logs
impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("key", &if self.key.is_empty() { "" } else { "<redacted>" })
            .field("tags", &self.tags)
            .field("source", &self.source)
            .finish()
    }
}

/// The four candidate keys for a node, plus the provider's OAuth tags
#[derive(Clone, Copy, Default)]
pub struct CredentialSources<'a> {
    pub proxy_oauth_key: &'a str,
    pub provider_oauth_key: &'a str,
    pub provider_oauth_tags: &'a [String],
    pub proxy_auth_key: &'a str,
    pub provider_auth_key: &'a str,
}

impl CredentialSources<'_> {
    /// Pick the highest-priority non-empty key. Never fails: with nothing
    /// configured the key is empty and registration is left to fail later.
    pub fn resolve(&self) -> ResolvedCredential {
        let candidates = [
            (self.proxy_oauth_key, KeySource::ProxyOAuth),
            (self.provider_oauth_key, KeySource::ProviderOAuth),
            (self.proxy_auth_key, KeySource::ProxyAuthKey),
            (self.provider_auth_key, KeySource::ProviderAuthKey),
        ];

        for (key, source) in candidates {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let tags = if source.is_oauth() {
                self.provider_oauth_tags.to_vec()
            } else {
                Vec::new()
            };
            return ResolvedCredential {
                key: key.to_string(),
                tags,
                source,
            };
        }

        ResolvedCredential {
            key: String::new(),
            tags: Vec::new(),
            source: KeySource::None,
        }
    }
}
