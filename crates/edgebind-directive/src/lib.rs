//! Directive binding for the hosting web server
//!
//! Parse-and-register glue consuming the `edgebind` core. The host exposes a
//! single zero-argument configuration keyword per site; this crate validates
//! the directive, disables the host's own managed TLS for the site (the
//! tunnel makes the outbound TLS connection; the local listener stays plain
//! HTTP), and registers the startup and shutdown hooks that drive a shared
//! [`LifecycleCoordinator`].

use edgebind::{CredentialResolver, LifecycleCoordinator, LoginFlow, SiteConfig, TunnelService};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced while the host parses its configuration
#[derive(Error, Debug)]
pub enum SetupError {
    /// The directive can only be specified once per site.
    #[error("the tunnel directive can only be specified once per site")]
    DuplicateDirective,

    /// A hostname must already be established for the site.
    #[error("missing hostname to tunnel")]
    MissingHostname,
}

/// A zero-argument lifecycle hook returning an error/success outcome to the
/// host.
pub type LifecycleHook = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// The surface this binding consumes from the host's configuration
/// controller during parsing.
pub trait HostController {
    /// Advance to the next occurrence of the directive in the current site
    /// block; `false` when there are no more.
    fn next_directive(&mut self) -> bool;

    /// Current site configuration. The returned handle observes later host
    /// mutations, so hooks read fresh values at startup time.
    fn site(&self) -> Arc<dyn SiteConfig>;

    /// Host-managed asset directory (read/write for the credential).
    fn assets_dir(&self) -> PathBuf;

    /// Human-readable "name/version" string for the hosting server.
    fn agent_string(&self) -> String;

    /// Tell the host not to manage TLS for this site.
    fn disable_managed_tls(&mut self);

    /// Register a callback for the host's startup phase.
    fn on_startup(&mut self, hook: LifecycleHook);

    /// Register a callback for the host's shutdown phase. Runs at most once
    /// per process lifetime for this directive instance.
    fn on_shutdown(&mut self, hook: LifecycleHook);

    /// Runtime the tunnel service task is spawned onto.
    fn runtime(&self) -> tokio::runtime::Handle;
}

/// Externally-provided collaborators wired into the coordinator.
pub struct TunnelBinding {
    pub service: Arc<dyn TunnelService>,
    pub login: Arc<dyn LoginFlow>,
}

/// Parse the directive for one site and register its lifecycle hooks.
///
/// Called once per site block during host configuration parsing. Errors here
/// abort host startup entirely; everything after parsing is deferred to the
/// startup hook, because the listen address is not known until the host
/// finishes its own configuration.
pub fn setup(ctl: &mut dyn HostController, binding: TunnelBinding) -> Result<(), SetupError> {
    let mut count = 0;
    while ctl.next_directive() {
        count += 1;
        if count > 1 {
            return Err(SetupError::DuplicateDirective);
        }
    }

    let site = ctl.site();
    if site.hostname().is_empty() {
        return Err(SetupError::MissingHostname);
    }

    // The tunnel makes the outbound TLS connection; no local TLS needed.
    ctl.disable_managed_tls();

    let coordinator = Arc::new(LifecycleCoordinator::new(
        site,
        CredentialResolver::new(ctl.assets_dir()),
        binding.login,
        binding.service,
        ctl.agent_string(),
        ctl.runtime(),
    ));
    debug!("tunnel directive registered");

    let startup = coordinator.clone();
    ctl.on_startup(Box::new(move || {
        startup.handle_startup()?;
        Ok(())
    }));

    let shutdown = coordinator;
    ctl.on_shutdown(Box::new(move || {
        shutdown.handle_shutdown()?;
        Ok(())
    }));

    Ok(())
}
