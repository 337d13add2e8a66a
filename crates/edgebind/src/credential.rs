//! Credential discovery and one-time interactive acquisition
//!
//! Locates the PEM credential that authorizes this host to open tunnels.
//! Two fixed locations are checked in order: the host's own asset directory
//! (preferred) and the official edge client's default config directory
//! (fallback). When neither has a credential, a [`LoginFlow`] is run once to
//! obtain one into the asset directory.

use crate::constants::{
    CREDENTIAL_FILENAME, EXTERNAL_CONFIG_DIR, EXTERNAL_CREDENTIAL_FILENAME,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Opaque error produced by an external [`LoginFlow`].
pub type LoginError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while resolving a credential
#[derive(Error, Debug)]
pub enum CredentialError {
    /// An existence check failed for a reason other than the file being
    /// absent. Surfaced immediately; resolution does not continue.
    #[error("failed to check for credential at {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The interactive login flow failed to produce a credential.
    #[error("failed to obtain credential from login flow: {0}")]
    Acquisition(LoginError),

    /// The login flow reported success but the asset directory still has no
    /// credential. This is an invariant violation in the flow itself.
    #[error("no credential available after login")]
    Unavailable,
}

/// Interactive acquisition of a tunnel credential.
///
/// Implementations guide the user through the provider's login (typically a
/// browser round-trip) and write the resulting certificate as `filename`
/// inside `target_dir`. The call is synchronous and may block on network I/O
/// and human input; it cannot be cancelled once started.
pub trait LoginFlow: Send + Sync {
    fn login(&self, target_dir: &Path, filename: &str) -> Result<(), LoginError>;
}

/// One place a credential may already exist.
#[derive(Debug, Clone)]
pub struct CandidateLocation {
    pub dir: PathBuf,
    pub filename: String,
}

impl CandidateLocation {
    pub fn new(dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            filename: filename.into(),
        }
    }

    /// Full path of the credential file at this location.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.filename)
    }

    /// Check whether a credential file exists here.
    ///
    /// Only existence is checked; the file is never read or validated. Probe
    /// failures other than not-found are surfaced to the caller.
    fn probe(&self) -> Result<bool, CredentialError> {
        let path = self.path();
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CredentialError::Probe { path, source }),
        }
    }
}

/// Resolves the credential path used for a tunnel launch.
///
/// Selection order is strict: the host asset directory wins over the external
/// client's directory whenever both hold a credential, regardless of age or
/// content. Exactly one path is selected per resolution.
pub struct CredentialResolver {
    asset_location: CandidateLocation,
    external_location: CandidateLocation,
}

impl CredentialResolver {
    /// Create a resolver for the given host asset directory, with the
    /// external fallback under the user's home directory.
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        let external_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(EXTERNAL_CONFIG_DIR);
        Self::with_locations(
            CandidateLocation::new(asset_dir, CREDENTIAL_FILENAME),
            CandidateLocation::new(external_dir, EXTERNAL_CREDENTIAL_FILENAME),
        )
    }

    /// Create a resolver with explicit candidate locations.
    pub fn with_locations(
        asset_location: CandidateLocation,
        external_location: CandidateLocation,
    ) -> Self {
        Self {
            asset_location,
            external_location,
        }
    }

    /// Find an existing credential, or acquire one through `login`.
    ///
    /// The login flow runs at most once, and only when neither candidate
    /// location already holds a credential. On success it must have written
    /// the credential into the asset directory; the asset path is returned.
    pub fn resolve(&self, login: &dyn LoginFlow) -> Result<PathBuf, CredentialError> {
        let mut has_asset_credential = self.asset_location.probe()?;
        let has_external_credential = self.external_location.probe()?;

        if !has_asset_credential && !has_external_credential {
            info!(
                dir = %self.asset_location.dir.display(),
                "no credential found, starting interactive login"
            );
            login
                .login(&self.asset_location.dir, &self.asset_location.filename)
                .map_err(CredentialError::Acquisition)?;
            has_asset_credential = true;
        }

        if has_asset_credential {
            let path = self.asset_location.path();
            debug!(path = %path.display(), "using credential from asset directory");
            Ok(path)
        } else if has_external_credential {
            let path = self.external_location.path();
            debug!(path = %path.display(), "using credential from external client directory");
            Ok(path)
        } else {
            Err(CredentialError::Unavailable)
        }
    }
}
