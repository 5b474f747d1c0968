//! Node configuration
//!
//! A `NodeConfig` describes one endpoint of the cluster. Its identity, used
//! by the pool for deduplication, is the `(scheme, host, port, path_prefix)`
//! tuple; every other field is a connection parameter the pool never looks at.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default number of pooled connections per node
pub const DEFAULT_CONNECTIONS_PER_NODE: usize = 10;

/// Default request timeout applied by the connection layer
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Scheme
// ============================================================================

/// URL scheme of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// Port used when a URL doesn't name one
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            _ => Err(Error::configuration(
                "'scheme' must be either 'http' or 'https'",
            )),
        }
    }
}

// ============================================================================
// Node Config
// ============================================================================

/// Immutable description of one endpoint
///
/// Deserialization goes through the same normalization and validation as
/// [`NodeConfigBuilder::build`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(try_from = "RawNodeConfig")]
pub struct NodeConfig {
    scheme: Scheme,
    host: String,
    port: u16,
    path_prefix: String,
    headers: BTreeMap<String, String>,
    connections_per_node: usize,
    request_timeout: Option<Duration>,
    http_compress: bool,
    verify_certs: bool,
    ca_certs: Option<PathBuf>,
    client_cert: Option<PathBuf>,
    client_key: Option<PathBuf>,
    ssl_assert_hostname: Option<String>,
    ssl_assert_fingerprint: Option<String>,
    ssl_show_warn: bool,
}

impl NodeConfig {
    /// Create a config with default connection parameters
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme,
            host: host.into(),
            port,
            path_prefix: String::new(),
            headers: BTreeMap::new(),
            connections_per_node: DEFAULT_CONNECTIONS_PER_NODE,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            http_compress: false,
            verify_certs: true,
            ca_certs: None,
            client_cert: None,
            client_key: None,
            ssl_assert_hostname: None,
            ssl_assert_fingerprint: None,
            ssl_show_warn: true,
        }
    }

    /// Start building a config with non-default parameters
    pub fn builder(scheme: Scheme, host: impl Into<String>, port: u16) -> NodeConfigBuilder {
        NodeConfigBuilder {
            config: Self::new(scheme, host, port),
        }
    }

    /// Builder seeded with this config, for producing a modified copy
    pub fn to_builder(&self) -> NodeConfigBuilder {
        NodeConfigBuilder {
            config: self.clone(),
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Normalized path prefix: empty, or `/segment[/segment...]`
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn connections_per_node(&self) -> usize {
        self.connections_per_node
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn http_compress(&self) -> bool {
        self.http_compress
    }

    pub fn verify_certs(&self) -> bool {
        self.verify_certs
    }

    pub fn ca_certs(&self) -> Option<&PathBuf> {
        self.ca_certs.as_ref()
    }

    pub fn client_cert(&self) -> Option<&PathBuf> {
        self.client_cert.as_ref()
    }

    pub fn client_key(&self) -> Option<&PathBuf> {
        self.client_key.as_ref()
    }

    pub fn ssl_assert_hostname(&self) -> Option<&str> {
        self.ssl_assert_hostname.as_deref()
    }

    pub fn ssl_assert_fingerprint(&self) -> Option<&str> {
        self.ssl_assert_fingerprint.as_deref()
    }

    pub fn ssl_show_warn(&self) -> bool {
        self.ssl_show_warn
    }

    /// Full base URL of the node, with IPv6 hosts bracketed
    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!(
                "{}://[{}]:{}{}",
                self.scheme, self.host, self.port, self.path_prefix
            )
        } else {
            format!(
                "{}://{}:{}{}",
                self.scheme, self.host, self.port, self.path_prefix
            )
        }
    }

    fn identity(&self) -> (Scheme, &str, u16, &str) {
        (self.scheme, &self.host, self.port, &self.path_prefix)
    }

    fn validate(&self) -> Result<()> {
        if self.connections_per_node == 0 {
            return Err(Error::configuration(
                "'connections_per_node' must be greater than zero",
            ));
        }

        if self.scheme != Scheme::Https {
            let tls_options = [
                ("ca_certs", self.ca_certs.is_some()),
                ("client_cert", self.client_cert.is_some()),
                ("client_key", self.client_key.is_some()),
                ("ssl_assert_hostname", self.ssl_assert_hostname.is_some()),
                ("ssl_assert_fingerprint", self.ssl_assert_fingerprint.is_some()),
            ];
            if let Some((name, _)) = tls_options.iter().find(|(_, set)| *set) {
                return Err(Error::configuration(format!(
                    "'{}' option should be only set for 'https' scheme",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl PartialEq for NodeConfig {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for NodeConfig {}

impl Hash for NodeConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Display for NodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// Strip surrounding slashes and re-add a single leading one
fn normalize_path_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Wire form of a [`NodeConfig`]; everything but the address is optional
#[derive(Deserialize)]
struct RawNodeConfig {
    scheme: Scheme,
    host: String,
    port: u16,
    #[serde(default)]
    path_prefix: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    connections_per_node: Option<usize>,
    #[serde(default = "default_request_timeout")]
    request_timeout: Option<Duration>,
    #[serde(default)]
    http_compress: bool,
    verify_certs: Option<bool>,
    ca_certs: Option<PathBuf>,
    client_cert: Option<PathBuf>,
    client_key: Option<PathBuf>,
    ssl_assert_hostname: Option<String>,
    ssl_assert_fingerprint: Option<String>,
    ssl_show_warn: Option<bool>,
}

fn default_request_timeout() -> Option<Duration> {
    Some(DEFAULT_REQUEST_TIMEOUT)
}

impl TryFrom<RawNodeConfig> for NodeConfig {
    type Error = Error;

    fn try_from(raw: RawNodeConfig) -> Result<Self> {
        let defaults = NodeConfig::new(raw.scheme, raw.host, raw.port);
        let config = NodeConfig {
            path_prefix: normalize_path_prefix(&raw.path_prefix),
            headers: raw.headers,
            connections_per_node: raw
                .connections_per_node
                .unwrap_or(defaults.connections_per_node),
            request_timeout: raw.request_timeout,
            http_compress: raw.http_compress,
            verify_certs: raw.verify_certs.unwrap_or(defaults.verify_certs),
            ca_certs: raw.ca_certs,
            client_cert: raw.client_cert,
            client_key: raw.client_key,
            ssl_assert_hostname: raw.ssl_assert_hostname,
            ssl_assert_fingerprint: raw.ssl_assert_fingerprint,
            ssl_show_warn: raw.ssl_show_warn.unwrap_or(defaults.ssl_show_warn),
            ..defaults
        };
        NodeConfigBuilder { config }.build()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`NodeConfig`]; validation happens in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn path_prefix(mut self, prefix: impl AsRef<str>) -> Self {
        self.config.path_prefix = normalize_path_prefix(prefix.as_ref());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.config.headers = headers;
        self
    }

    pub fn connections_per_node(mut self, connections: usize) -> Self {
        self.config.connections_per_node = connections;
        self
    }

    /// `None` disables the timeout
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn http_compress(mut self, enabled: bool) -> Self {
        self.config.http_compress = enabled;
        self
    }

    pub fn verify_certs(mut self, verify: bool) -> Self {
        self.config.verify_certs = verify;
        self
    }

    pub fn ca_certs(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_certs = Some(path.into());
        self
    }

    pub fn client_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_cert = Some(path.into());
        self
    }

    pub fn client_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.client_key = Some(path.into());
        self
    }

    pub fn ssl_assert_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.config.ssl_assert_hostname = Some(hostname.into());
        self
    }

    pub fn ssl_assert_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.config.ssl_assert_fingerprint = Some(fingerprint.into());
        self
    }

    pub fn ssl_show_warn(mut self, show: bool) -> Self {
        self.config.ssl_show_warn = show;
        self
    }

    pub fn build(self) -> Result<NodeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================
