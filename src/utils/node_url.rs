//! URL to node config conversion

use crate::error::{Error, Result};
use crate::node::{NodeConfig, Scheme};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use percent_encoding::percent_decode_str;
use url::{Host, Url};

const MISSING_COMPONENTS: &str =
    "URL must include a 'scheme', 'host', and 'port' component (ie 'https://localhost:9200')";

/// Turn `scheme://[user:pass@]host[:port][/prefix]` into a [`NodeConfig`]
///
/// Credentials in the URL become a basic `authorization` header. Without
/// an explicit port the URL is rejected unless `use_default_ports_for_scheme`
/// is set, in which case 80/443 are used.
pub fn url_to_node_config(url: &str, use_default_ports_for_scheme: bool) -> Result<NodeConfig> {
    let parsed = Url::parse(url).map_err(|_| missing_components())?;

    let scheme = match parsed.scheme() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        _ => return Err(missing_components()),
    };

    let host = match parsed.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(missing_components()),
    };

    // `Url` hides a port that matches the scheme default, even when written out
    let port = match parsed.port() {
        Some(port) => port,
        None if use_default_ports_for_scheme || has_explicit_port(url) => scheme.default_port(),
        None => return Err(missing_components()),
    };

    let mut builder = NodeConfig::builder(scheme, host, port).path_prefix(parsed.path());

    if !parsed.username().is_empty() || parsed.password().is_some() {
        let username = decode_component(parsed.username())?;
        let password = decode_component(parsed.password().unwrap_or_default())?;
        builder = builder.header("authorization", basic_auth_header(&username, &password));
    }

    builder.build()
}

/// `Basic <base64(username:password)>`
pub fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{}:{}", username, password)))
}

fn decode_component(component: &str) -> Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| Error::InvalidUrl("URL credentials must be valid UTF-8".to_string()))
}

fn missing_components() -> Error {
    Error::InvalidUrl(MISSING_COMPONENTS.to_string())
}

/// Whether the authority section of a raw URL carries a `:port`
fn has_explicit_port(url: &str) -> bool {
    let Some((_, rest)) = url.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    match host_port.rsplit_once(']') {
        Some((_, after_bracket)) => after_bracket.starts_with(':'),
        None => host_port.contains(':'),
    }
}
