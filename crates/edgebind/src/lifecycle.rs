//! Lifecycle coordination between the host server and the tunnel service
//!
//! The coordinator owns the two lifecycle signal channels and drives the
//! state machine `Idle -> Starting -> Running -> ShuttingDown` (with `Failed`
//! terminal from `Starting`). The host's startup hook runs target assembly
//! and credential resolution synchronously, then launches the tunnel service
//! fire-and-forget so host startup never waits on edge activation. The
//! shutdown hook signals the service and returns immediately.

use crate::credential::{CredentialError, CredentialResolver, LoginFlow};
use crate::host::SiteConfig;
use crate::service::{ServiceSignals, TunnelRunConfig, TunnelService};
use crate::target::{self, TargetError};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{error, info, Instrument};

/// Coordinator state, advanced only by the host's lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Directive registered; host has not started yet.
    Idle,
    /// Startup hook running: assembling the target and resolving credentials.
    Starting,
    /// Tunnel service launched.
    Running,
    /// Shutdown signaled; the service tears down on its own schedule.
    ShuttingDown,
    /// Startup failed; the error was returned to the host.
    Failed,
    /// Teardown finished. The coordinator never observes service exit, so
    /// this state is reached by the service, not tracked here.
    Stopped,
}

/// Errors returned to the host from the startup hook
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    /// The site lost its hostname between configuration and startup.
    #[error("missing hostname to tunnel")]
    MissingHostname,

    /// The startup hook ran more than once, or after shutdown.
    #[error("tunnel startup already handled (state: {0:?})")]
    AlreadyStarted(LifecycleState),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Errors returned to the host from the shutdown hook
#[derive(thiserror::Error, Debug)]
pub enum ShutdownError {
    /// The shutdown signal was already sent; it must fire at most once.
    #[error("tunnel shutdown already signaled")]
    AlreadySignaled,
}

struct Inner {
    state: LifecycleState,
    /// Service half of the signal channels, created at construction and
    /// handed over exactly once at launch.
    service_signals: Option<ServiceSignals>,
}

/// Binds one site's tunnel to the host's startup and shutdown hooks.
///
/// Both signal channels exist from construction onward, so a shutdown event
/// arriving before startup has launched anything is still safe to signal.
/// The coordinator holds the sole right to send shutdown; the connected
/// receiver is retained but not awaited today (a future readiness probe can
/// subscribe through [`LifecycleCoordinator::connected_signal`]).
pub struct LifecycleCoordinator {
    site: Arc<dyn SiteConfig>,
    resolver: CredentialResolver,
    login: Arc<dyn LoginFlow>,
    service: Arc<dyn TunnelService>,
    reported_version: String,
    runtime: tokio::runtime::Handle,
    shutdown_tx: watch::Sender<bool>,
    connected_rx: watch::Receiver<bool>,
    inner: Mutex<Inner>,
}

impl LifecycleCoordinator {
    pub fn new(
        site: Arc<dyn SiteConfig>,
        resolver: CredentialResolver,
        login: Arc<dyn LoginFlow>,
        service: Arc<dyn TunnelService>,
        reported_version: String,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (connected_tx, connected_rx) = watch::channel(false);
        Self {
            site,
            resolver,
            login,
            service,
            reported_version,
            runtime,
            shutdown_tx,
            connected_rx,
            inner: Mutex::new(Inner {
                state: LifecycleState::Idle,
                service_signals: Some(ServiceSignals {
                    connected: connected_tx,
                    shutdown: shutdown_rx,
                }),
            }),
        }
    }

    /// Current coordinator state.
    pub fn state(&self) -> LifecycleState {
        self.inner.lock().unwrap().state
    }

    /// A receiver that flips to `true` once the tunnel is established.
    pub fn connected_signal(&self) -> watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// A receiver that flips to `true` once shutdown has been signaled.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Host startup hook body.
    ///
    /// Synchronous up to the launch: target assembly first (pure and cheap,
    /// fails fast), then credential resolution (may block on an interactive
    /// login). On success the tunnel service is spawned and the hook returns
    /// without waiting for edge connectivity. Any failure is returned to the
    /// host, which decides whether it is fatal to the whole process.
    pub fn handle_startup(&self) -> Result<(), StartupError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state != LifecycleState::Idle {
                return Err(StartupError::AlreadyStarted(inner.state));
            }
            inner.state = LifecycleState::Starting;
        }
        // The lock is not held across assembly/resolution: the shutdown hook
        // must stay non-blocking even while an interactive login is pending.

        match self.try_start() {
            Ok(()) => Ok(()),
            Err(e) => {
                let mut inner = self.inner.lock().unwrap();
                if inner.state == LifecycleState::Starting {
                    inner.state = LifecycleState::Failed;
                }
                Err(e)
            }
        }
    }

    fn try_start(&self) -> Result<(), StartupError> {
        // Sanity check: the host may have mutated its configuration between
        // the parse phase and startup.
        let hostname = self.site.hostname();
        if hostname.is_empty() {
            return Err(StartupError::MissingHostname);
        }

        let target_url = target::assemble(
            &self.site.listen_host(),
            &self.site.port(),
            &self.site.detected_port(),
            &self.site.default_port(),
        )?;

        let credential_path = self.resolver.resolve(self.login.as_ref())?;

        let signals = {
            let mut inner = self.inner.lock().unwrap();
            let signals = inner
                .service_signals
                .take()
                .ok_or(StartupError::AlreadyStarted(inner.state))?;
            // A shutdown that raced the startup hook keeps its state; the
            // service observes the already-set signal and exits promptly.
            if inner.state == LifecycleState::Starting {
                inner.state = LifecycleState::Running;
            }
            signals
        };

        let config = TunnelRunConfig::new(
            hostname.clone(),
            target_url.clone(),
            credential_path,
            self.reported_version.clone(),
            signals,
        );

        let service = self.service.clone();
        let span = tracing::info_span!("tunnel", hostname = %hostname);
        self.runtime.spawn(
            async move {
                // Failures here are logged, never propagated: the host's
                // startup event has already returned success.
                if let Err(e) = service.run(config).await {
                    error!("tunnel service failed: {e}");
                }
            }
            .instrument(span),
        );

        info!(
            %hostname,
            target = %target_url,
            "tunnel is being created; allow up to a few minutes for all edge nodes to activate"
        );
        Ok(())
    }

    /// Host shutdown hook body.
    ///
    /// Sends the shutdown signal exactly once and returns immediately; the
    /// service is trusted to observe it and tear down within its own bounded
    /// time. Valid in any state, including before startup has completed.
    pub fn handle_shutdown(&self) -> Result<(), ShutdownError> {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == LifecycleState::ShuttingDown {
                return Err(ShutdownError::AlreadySignaled);
            }
            inner.state = LifecycleState::ShuttingDown;
        }
        self.shutdown_tx.send_replace(true);
        info!("tunnel shutdown signaled");
        Ok(())
    }
}
