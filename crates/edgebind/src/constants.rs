//! Fixed defaults for tunnel launch configuration.
//!
//! Use these constants instead of magic numbers so defaults stay consistent
//! across the core library, the directive binding, and tests. None of these
//! are user-configurable today; they are baked into every launch.

use std::time::Duration;

/// Filename of the credential certificate kept in the host asset directory.
pub const CREDENTIAL_FILENAME: &str = "edgebind-origin.pem";

/// Filename the official edge client uses for its credential.
pub const EXTERNAL_CREDENTIAL_FILENAME: &str = "cert.pem";

/// Directory (under the user's home) where the official edge client keeps
/// its configuration and credential.
pub const EXTERNAL_CONFIG_DIR: &str = ".edgenet";

/// Host used for the tunnel target when the host server has no explicit
/// listen host configured.
pub const FALLBACK_TARGET_HOST: &str = "localhost";

/// Timeout for establishing each edge connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP keep-alive interval on edge connections.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum pooled idle connections toward the local listener.
pub const MAX_IDLE_CONNECTIONS: usize = 100;

/// Idle connections are closed after this long without traffic.
pub const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(90);

/// Timeout for the TLS handshake with an edge node.
pub const TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection retry budget, consumed by the tunnel service itself.
pub const RETRIES: u32 = 5;

/// Interval between tunnel heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Missed heartbeats tolerated before a connection is considered dead.
pub const MAX_HEARTBEATS: u64 = 5;

/// Redundant edge connections opened in parallel for high availability.
pub const HA_CONNECTIONS: usize = 4;
