//! Tunnel target assembly and validation
//!
//! Computes the local URL the tunnel forwards inbound traffic to. The scheme
//! is always plain HTTP: the tunnel terminates TLS at the edge, not locally.

use crate::constants::FALLBACK_TARGET_HOST;
use thiserror::Error;
use url::Url;

/// Errors that can occur while assembling the tunnel target
#[derive(Error, Debug)]
pub enum TargetError {
    #[error("invalid tunnel target {url}: {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("tunnel target {0} has no host")]
    MissingHost(String),

    #[error("no port available for tunnel target on {0}")]
    MissingPort(String),
}

/// Validate a constructed target URL string.
///
/// Pure function; accepts only absolute `http` URLs with a host. This is the
/// single gate every tunnel target passes through before launch.
pub fn validate_url(raw: &str) -> Result<Url, TargetError> {
    let url = Url::parse(raw).map_err(|source| TargetError::Invalid {
        url: raw.to_string(),
        source,
    })?;
    if url.host_str().is_none() {
        return Err(TargetError::MissingHost(raw.to_string()));
    }
    Ok(url)
}

/// Assemble the validated local URL the tunnel should forward to.
///
/// Empty strings mean "unset", matching the host's string-typed config
/// fields. The host falls back to `localhost`; the port falls through
/// configured site port, host-detected port, then host default port, in that
/// order. A non-empty listen port short-circuits the chain.
pub fn assemble(
    listen_host: &str,
    listen_port: &str,
    detected_port: &str,
    default_port: &str,
) -> Result<Url, TargetError> {
    let host = if listen_host.is_empty() {
        FALLBACK_TARGET_HOST
    } else {
        listen_host
    };

    let port = if !listen_port.is_empty() {
        listen_port
    } else if !detected_port.is_empty() {
        detected_port
    } else {
        default_port
    };
    if port.is_empty() {
        return Err(TargetError::MissingPort(host.to_string()));
    }

    validate_url(&format!("http://{}:{}", bracket_ipv6(host), port))
}

/// Wrap bare IPv6 literals in brackets so they form a valid URL authority.
fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}
