//! Read-only view of the hosting web server's per-site configuration
//!
//! The host owns these values; this crate only reads them. All fields are
//! string-typed with the empty string meaning "unset", matching the host's
//! own configuration model. The startup hook re-reads them at startup time,
//! because the host may mutate its configuration between its parse and
//! startup phases.

/// Per-site configuration fields consumed from the host.
pub trait SiteConfig: Send + Sync {
    /// Public hostname configured for the site; advertised to the edge.
    fn hostname(&self) -> String;

    /// Port the site is configured to serve on ("" if unset).
    fn port(&self) -> String;

    /// Listen host the server actually bound to ("" if unset).
    fn listen_host(&self) -> String;

    /// Port the host detected for its listener ("" if unset).
    fn detected_port(&self) -> String;

    /// The host's process-wide default port.
    fn default_port(&self) -> String;
}
