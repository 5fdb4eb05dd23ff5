//! Errors surfaced by the provider registry

use thiserror::Error;

/// Failure to route a proxy to a provider.
///
/// Proxy construction itself never fails; these come from looking up the
/// provider a proxy belongs to.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("proxy '{hostname}': unknown provider '{provider}'")]
    UnknownProvider { provider: String, hostname: String },

    #[error("proxy '{hostname}': no providers are configured")]
    NoProviders { hostname: String },
}
