//! Mesh network proxy provider
//!
//! A [`MeshClient`] is built once per configured provider. For every proxied
//! hostname it prepares an embedded node: it picks the credential, scopes the
//! node's state directory to the hostname, chooses the control plane, and
//! wires the runtime's logs into `tracing`. The result is a [`MeshProxy`]
//! holding the node configuration and a lifecycle event channel. Starting the
//! node belongs to the runtime.

use crate::config::{MeshSettings, ProviderConfig, ProxyConfig, DEFAULT_CONTROL_URL};
use crate::credentials::CredentialSources;
use crate::error::ProviderError;
use crate::node::{LogSink, NodeConfig, TracingSink};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn, Span};

/// Capacity of a proxy's lifecycle event channel. One is the smallest bound
/// tokio allows, so a sender waits on the consumer almost immediately.
const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Lifecycle transition of a proxy's node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    Starting,
    /// Node registered and reachable on the mesh
    Online,
    Stopping,
    Stopped,
    Error(String),
}

impl fmt::Display for ProxyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyEvent::Starting => write!(f, "starting"),
            ProxyEvent::Online => write!(f, "online"),
            ProxyEvent::Stopping => write!(f, "stopping"),
            ProxyEvent::Stopped => write!(f, "stopped"),
            ProxyEvent::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Something that can build proxies from per-hostname configuration
pub trait ProxyProvider: Send + Sync {
    type Proxy: ProxyHandle;

    fn name(&self) -> &str;

    fn new_proxy(&self, config: &ProxyConfig) -> Result<Self::Proxy, ProviderError>;
}

/// A constructed proxy whose lifecycle can be observed
pub trait ProxyHandle: Send + Sync {
    fn hostname(&self) -> &str;

    /// Take the event receiver. Only the first call gets it.
    fn take_events(&self) -> Option<mpsc::Receiver<ProxyEvent>>;
}

/// Mesh provider client, one per configured provider
pub struct MeshClient {
    name: String,
    oauth_key: String,
    oauth_tags: Vec<String>,
    auth_key: String,
    control_url: Option<String>,
    data_dir: PathBuf,
    span: Span,
}

impl MeshClient {
    /// Create a client for the provider `name`.
    ///
    /// Key material is trimmed here; nothing else about it is checked.
    pub fn new(name: &str, provider: &ProviderConfig, settings: &MeshSettings) -> Self {
        Self {
            name: name.to_string(),
            oauth_key: provider.oauth_key.trim().to_string(),
            oauth_tags: provider.oauth_tags.clone(),
            auth_key: provider.auth_key.trim().to_string(),
            control_url: provider.control_url.clone(),
            data_dir: settings.data_dir.join(name),
            span: tracing::info_span!("provider", provider = %name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn oauth_key(&self) -> &str {
        &self.oauth_key
    }

    pub fn oauth_tags(&self) -> &[String] {
        &self.oauth_tags
    }

    pub fn auth_key(&self) -> &str {
        &self.auth_key
    }

    /// Root of this provider's node state
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// State directory for the node serving `hostname`. Always under
    /// [`data_dir`](Self::data_dir): root, prefix, `.` and `..` components of
    /// the hostname are dropped.
    pub fn node_dir(&self, hostname: &str) -> PathBuf {
        let mut dir = self.data_dir.clone();
        for component in Path::new(hostname).components() {
            if let Component::Normal(part) = component {
                dir.push(part);
            }
        }
        dir
    }

    /// Control-plane URL nodes register against. Returned as configured.
    pub fn control_url(&self) -> &str {
        match self.control_url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => DEFAULT_CONTROL_URL,
        }
    }

    /// Build a proxy whose runtime logs go to a caller-supplied sink
    pub fn new_proxy_with_sink(&self, config: &ProxyConfig, sink: Arc<dyn LogSink>) -> MeshProxy {
        let span = tracing::info_span!(parent: &self.span, "proxy", hostname = %config.hostname);
        self.build_proxy(config, span, sink)
    }

    fn build_proxy(&self, config: &ProxyConfig, span: Span, sink: Arc<dyn LogSink>) -> MeshProxy {
        debug!(parent: &self.span, hostname = %config.hostname, "Setting up mesh node");

        let credential = CredentialSources {
            proxy_oauth_key: &config.mesh.oauth_key,
            provider_oauth_key: &self.oauth_key,
            provider_oauth_tags: &self.oauth_tags,
            proxy_auth_key: &config.mesh.auth_key,
            provider_auth_key: &self.auth_key,
        }
        .resolve();

        if credential.is_empty() {
            warn!(
                parent: &span,
                "No auth key or OAuth key configured; node registration will fail"
            );
        } else {
            debug!(
                parent: &span,
                key_source = %credential.source,
                tags = ?credential.tags,
                "Resolved node credential"
            );
        }

        let node = NodeConfig::assemble(
            &config.hostname,
            credential,
            self.node_dir(&config.hostname),
            &config.mesh,
            self.control_url().to_string(),
            sink,
        );

        MeshProxy::new(node, span)
    }
}

impl ProxyProvider for MeshClient {
    type Proxy = MeshProxy;

    fn name(&self) -> &str {
        &self.name
    }

    /// Always succeeds; bad credentials or storage surface when the node starts.
    fn new_proxy(&self, config: &ProxyConfig) -> Result<MeshProxy, ProviderError> {
        let span = tracing::info_span!(parent: &self.span, "proxy", hostname = %config.hostname);
        let sink = Arc::new(TracingSink::new(span.clone()));
        Ok(self.build_proxy(config, span, sink))
    }
}

impl fmt::Debug for MeshClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshClient")
            .field("name", &self.name)
            .field("oauth_tags", &self.oauth_tags)
            .field("control_url", &self.control_url())
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

/// Proxy backed by a not-yet-started mesh node
pub struct MeshProxy {
    node: NodeConfig,
    span: Span,
    events_tx: mpsc::Sender<ProxyEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<ProxyEvent>>>,
}

impl MeshProxy {
    fn new(node: NodeConfig, span: Span) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            node,
            span,
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    pub fn node_config(&self) -> &NodeConfig {
        &self.node
    }

    /// Span carrying this proxy's provider and hostname
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Sender for the runtime to publish lifecycle events on
    pub fn event_sender(&self) -> mpsc::Sender<ProxyEvent> {
        self.events_tx.clone()
    }
}

impl ProxyHandle for MeshProxy {
    fn hostname(&self) -> &str {
        &self.node.hostname
    }

    fn take_events(&self) -> Option<mpsc::Receiver<ProxyEvent>> {
        self.events_rx.lock().take()
    }
}

impl fmt::Debug for MeshProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshProxy")
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}
