//! Meshgate - expose proxied services on a private mesh network
//!
//! This library provides the mesh-network provider for a reverse proxy:
//! - Prepares one embedded mesh node per proxied hostname
//! - Resolves node credentials from per-proxy and provider-level keys
//! - Isolates each node's state under `<data_dir>/<provider>/<hostname>`
//! - Bridges the node runtime's logs into `tracing`
//! - Hands each proxy a lifecycle event channel

pub mod config;
pub mod credentials;
pub mod error;
pub mod node;
pub mod provider;
pub mod registry;

#[cfg(test)]
mod test_support;
