//! Tunnel service launch contract
//!
//! The actual tunnel protocol (edge registration, multiplexing, heartbeats,
//! retries) lives behind [`TunnelService`]. This crate decides what to start,
//! with what configuration, and when to stop it; the service does the rest.

use crate::constants;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use url::Url;

/// Opaque error produced by a [`TunnelService`] run.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Signal handles handed to the tunnel service at launch.
///
/// Both channels carry a single `false -> true` transition. The service is
/// the sole writer of `connected` and flips it once the tunnel is fully
/// established. The coordinator is the sole writer of `shutdown`; on
/// observing `true` the service begins its own bounded graceful teardown.
/// `watch` gives every clone of a receiver the same view, so the service can
/// fan the shutdown signal out to all of its HA connections without extra
/// synchronization.
#[derive(Debug)]
pub struct ServiceSignals {
    pub connected: watch::Sender<bool>,
    pub shutdown: watch::Receiver<bool>,
}

/// Immutable launch configuration for one tunnel instance.
///
/// Assembled once per startup and passed to the service by value; never
/// mutated afterward. Timeouts and limits are fixed constants today, not
/// user-configurable.
#[derive(Debug)]
pub struct TunnelRunConfig {
    /// Hostname advertised to the edge network.
    pub hostname: String,
    /// Validated local URL inbound traffic is forwarded to.
    pub target_url: Url,
    /// Path to the PEM credential authorizing the tunnel.
    pub credential_path: PathBuf,

    pub connect_timeout: Duration,
    pub keep_alive_interval: Duration,
    pub max_idle_connections: usize,
    pub idle_connection_timeout: Duration,
    pub tls_handshake_timeout: Duration,

    /// Connection retry budget, consumed by the service.
    pub retries: u32,
    pub heartbeat_interval: Duration,
    pub max_heartbeats: u64,
    /// Redundant edge connections opened in parallel.
    pub ha_connections: usize,

    /// Human-readable agent string reported to the edge (e.g. "myhost/2.1").
    pub reported_version: String,

    pub signals: ServiceSignals,
}

impl TunnelRunConfig {
    /// Build a launch configuration with the fixed default timeouts and
    /// limits from [`constants`].
    pub fn new(
        hostname: String,
        target_url: Url,
        credential_path: PathBuf,
        reported_version: String,
        signals: ServiceSignals,
    ) -> Self {
        Self {
            hostname,
            target_url,
            credential_path,
            connect_timeout: constants::CONNECT_TIMEOUT,
            keep_alive_interval: constants::KEEP_ALIVE_INTERVAL,
            max_idle_connections: constants::MAX_IDLE_CONNECTIONS,
            idle_connection_timeout: constants::IDLE_CONNECTION_TIMEOUT,
            tls_handshake_timeout: constants::TLS_HANDSHAKE_TIMEOUT,
            retries: constants::RETRIES,
            heartbeat_interval: constants::HEARTBEAT_INTERVAL,
            max_heartbeats: constants::MAX_HEARTBEATS,
            ha_connections: constants::HA_CONNECTIONS,
            reported_version,
            signals,
        }
    }
}

/// An opaque, long-running tunnel implementation.
///
/// `run` owns the configuration for the lifetime of the tunnel and returns
/// when the tunnel has torn down, either because the shutdown signal fired or
/// because the service failed. Launch failures are reported to the caller's
/// error log only; by the time they can occur the host's startup has already
/// succeeded.
#[async_trait]
pub trait TunnelService: Send + Sync + 'static {
    async fn run(&self, config: TunnelRunConfig) -> Result<(), ServiceError>;
}
