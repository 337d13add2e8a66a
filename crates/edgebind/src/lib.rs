//! edgebind - binds a hosting web server's lifecycle to an outbound edge tunnel
//!
//! When the host server starts listening on a hostname/port, edgebind
//! resolves a tunnel credential, computes and validates the local target URL,
//! and launches an opaque [`TunnelService`] advertising the hostname to the
//! edge network. When the host shuts down, the tunnel is signaled to tear
//! down cleanly. The tunnel protocol itself lives behind the
//! [`TunnelService`] trait; this crate only decides what to start, with what
//! configuration, and when to stop it.
//!
//! # Quick start
//!
//! ```ignore
//! use edgebind::{CredentialResolver, LifecycleCoordinator};
//! use std::sync::Arc;
//!
//! let coordinator = Arc::new(LifecycleCoordinator::new(
//!     site,                                    // Arc<dyn SiteConfig> from the host
//!     CredentialResolver::new("/var/lib/host/assets"),
//!     login,                                   // Arc<dyn LoginFlow>
//!     service,                                 // Arc<dyn TunnelService>
//!     "myhost/2.1".to_string(),
//!     tokio::runtime::Handle::current(),
//! ));
//!
//! // Wire into the host's lifecycle hooks:
//! //   on startup:  coordinator.handle_startup()?
//! //   on shutdown: coordinator.handle_shutdown()?
//! ```

pub mod constants;
pub mod credential;
pub mod host;
pub mod lifecycle;
pub mod service;
pub mod target;

pub use credential::{
    CandidateLocation, CredentialError, CredentialResolver, LoginError, LoginFlow,
};
pub use host::SiteConfig;
pub use lifecycle::{LifecycleCoordinator, LifecycleState, ShutdownError, StartupError};
pub use service::{ServiceError, ServiceSignals, TunnelRunConfig, TunnelService};
pub use target::{assemble, validate_url, TargetError};
