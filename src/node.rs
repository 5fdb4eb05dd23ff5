//! Node configuration handed to the embedded mesh runtime
//!
//! Nothing here starts a node. [`NodeConfig`] is the complete description of
//! one node: identity, credentials, state directory, control plane, and the
//! two log callbacks the runtime writes through.

use crate::config::MeshProxyConfig;
use crate::credentials::{KeySource, ResolvedCredential};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Span;

/// Severity a runtime log line is written at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Info,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Info => write!(f, "info"),
        }
    }
}

/// Destination for runtime log lines
pub trait LogSink: Send + Sync {
    fn info(&self, message: &str);
    fn trace(&self, message: &str);
}

/// Writes runtime log lines as `tracing` events inside a proxy span
pub struct TracingSink {
    span: Span,
}

impl TracingSink {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

impl LogSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(parent: &self.span, "{}", message);
    }

    fn trace(&self, message: &str) {
        tracing::trace!(parent: &self.span, "{}", message);
    }
}

/// Callback form of a log channel, for runtimes that take plain closures
pub type LogFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Routes the runtime's two log streams into a sink.
///
/// User-facing lines always go to `info`. Backend diagnostics go to `trace`,
/// or to `info` when the proxy asked for verbose logging. The choice is made
/// once, when the bridge is built.
#[derive(Clone)]
pub struct LogBridge {
    sink: Arc<dyn LogSink>,
    backend_level: LogLevel,
}

impl LogBridge {
    pub fn new(sink: Arc<dyn LogSink>, verbose: bool) -> Self {
        let backend_level = if verbose {
            LogLevel::Info
        } else {
            LogLevel::Trace
        };
        Self {
            sink,
            backend_level,
        }
    }

    /// Log a user-facing runtime message
    pub fn user_log(&self, message: &str) {
        self.sink.info(message);
    }

    /// Log a low-level runtime diagnostic
    pub fn backend_log(&self, message: &str) {
        match self.backend_level {
            LogLevel::Info => self.sink.info(message),
            LogLevel::Trace => self.sink.trace(message),
        }
    }

    pub fn backend_level(&self) -> LogLevel {
        self.backend_level
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Split into `(user_log, backend_log)` closures
    pub fn callbacks(&self) -> (LogFn, LogFn) {
        let user = self.clone();
        let backend = self.clone();
        let user_log: LogFn = Arc::new(move |message: &str| user.user_log(message));
        let backend_log: LogFn = Arc::new(move |message: &str| backend.backend_log(message));
        (user_log, backend_log)
    }
}

impl fmt::Debug for LogBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBridge")
            .field("backend_level", &self.backend_level)
            .finish_non_exhaustive()
    }
}

/// Everything the embedded runtime needs to start one node
#[derive(Clone)]
pub struct NodeConfig {
    pub hostname: String,
    pub auth_key: String,
    pub key_source: KeySource,
    pub advertise_tags: Vec<String>,
    /// Node state directory; created by the runtime
    pub dir: PathBuf,
    pub ephemeral: bool,
    pub run_web_client: bool,
    pub control_url: String,
    pub logs: LogBridge,
}

impl NodeConfig {
    /// Assemble a node configuration. Flags are copied verbatim from the
    /// proxy's mesh overrides; the log bridge is bound to `sink`.
    pub fn assemble(
        hostname: &str,
        credential: ResolvedCredential,
        dir: PathBuf,
        options: &MeshProxyConfig,
        control_url: String,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            hostname: hostname.to_string(),
            auth_key: credential.key,
            key_source: credential.source,
            advertise_tags: credential.tags,
            dir,
            ephemeral: options.ephemeral,
            run_web_client: options.run_web_client,
            control_url,
            logs: LogBridge::new(sink, options.verbose),
        }
    }

    /// Serializable view with the key redacted
    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            hostname: self.hostname.clone(),
            auth_key: redact(&self.auth_key),
            key_source: self.key_source,
            advertise_tags: self.advertise_tags.clone(),
            dir: self.dir.clone(),
            ephemeral: self.ephemeral,
            run_web_client: self.run_web_client,
            control_url: self.control_url.clone(),
            backend_log_level: self.logs.backend_level(),
        }
    }
}

impl fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeConfig")
            .field("hostname", &self.hostname)
            .field("auth_key", &redact(&self.auth_key))
            .field("key_source", &self.key_source)
            .field("advertise_tags", &self.advertise_tags)
            .field("dir", &self.dir)
            .field("ephemeral", &self.ephemeral)
            .field("run_web_client", &self.run_web_client)
            .field("control_url", &self.control_url)
            .field("logs", &self.logs)
            .finish()
    }
}

/// Redacted, serializable description of a node
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub hostname: String,
    pub auth_key: &'static str,
    pub key_source: KeySource,
    pub advertise_tags: Vec<String>,
    pub dir: PathBuf,
    pub ephemeral: bool,
    pub run_web_client: bool,
    pub control_url: String,
    pub backend_log_level: LogLevel,
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}
