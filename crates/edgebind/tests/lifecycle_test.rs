//! End-to-end lifecycle tests: host hooks -> credential resolution -> target
//! assembly -> tunnel launch -> shutdown signaling, with a recording tunnel
//! service standing in for the real protocol implementation.

use edgebind::{
    CandidateLocation, CredentialResolver, LifecycleCoordinator, LifecycleState, LoginError,
    LoginFlow, ServiceError, SiteConfig, StartupError, TunnelRunConfig, TunnelService,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

const ASSET_FILENAME: &str = "edgebind-origin.pem";
const EXTERNAL_FILENAME: &str = "cert.pem";

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
struct TestSite {
    hostname: String,
    port: String,
    listen_host: String,
    detected_port: String,
    default_port: String,
}

impl TestSite {
    fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            port: "8080".to_string(),
            listen_host: String::new(),
            detected_port: String::new(),
            default_port: "80".to_string(),
        }
    }
}

impl SiteConfig for TestSite {
    fn hostname(&self) -> String {
        self.hostname.clone()
    }
    fn port(&self) -> String {
        self.port.clone()
    }
    fn listen_host(&self) -> String {
        self.listen_host.clone()
    }
    fn detected_port(&self) -> String {
        self.detected_port.clone()
    }
    fn default_port(&self) -> String {
        self.default_port.clone()
    }
}

/// Login flow that writes the credential it was asked for, or fails.
struct ScriptedLogin {
    calls: AtomicUsize,
    succeed: bool,
}

impl ScriptedLogin {
    fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            succeed,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LoginFlow for ScriptedLogin {
    fn login(&self, target_dir: &Path, filename: &str) -> Result<(), LoginError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.succeed {
            return Err("provider rejected the login".into());
        }
        std::fs::write(target_dir.join(filename), b"-----BEGIN CERTIFICATE-----\n")
            .map_err(|e| Box::new(e) as LoginError)?;
        Ok(())
    }
}

/// Snapshot of one launch, handed to the test by the recording service.
struct LaunchRecord {
    config: TunnelRunConfig,
    shutdown: tokio::sync::watch::Receiver<bool>,
}

/// Tunnel service that hands each launch to the test, signals connected,
/// then waits for shutdown.
struct RecordingService {
    launches: mpsc::UnboundedSender<LaunchRecord>,
}

impl RecordingService {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<LaunchRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { launches: tx }), rx)
    }
}

#[async_trait::async_trait]
impl TunnelService for RecordingService {
    async fn run(&self, config: TunnelRunConfig) -> Result<(), ServiceError> {
        config.signals.connected.send_replace(true);
        let mut shutdown = config.signals.shutdown.clone();
        let record = LaunchRecord {
            shutdown: shutdown.clone(),
            config,
        };
        self.launches
            .send(record)
            .map_err(|_| "test receiver dropped")?;

        shutdown.wait_for(|stop| *stop).await?;
        Ok(())
    }
}

struct Fixture {
    asset_dir: TempDir,
    external_dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            asset_dir: TempDir::new().unwrap(),
            external_dir: TempDir::new().unwrap(),
        }
    }

    fn put_asset_credential(&self) {
        std::fs::write(self.asset_dir.path().join(ASSET_FILENAME), b"cert").unwrap();
    }

    fn put_external_credential(&self) {
        std::fs::write(self.external_dir.path().join(EXTERNAL_FILENAME), b"cert").unwrap();
    }

    fn resolver(&self) -> CredentialResolver {
        CredentialResolver::with_locations(
            CandidateLocation::new(self.asset_dir.path(), ASSET_FILENAME),
            CandidateLocation::new(self.external_dir.path(), EXTERNAL_FILENAME),
        )
    }

    fn coordinator(
        &self,
        site: TestSite,
        login: Arc<ScriptedLogin>,
        service: Arc<RecordingService>,
    ) -> LifecycleCoordinator {
        LifecycleCoordinator::new(
            Arc::new(site),
            self.resolver(),
            login,
            service,
            "testhost/0.1".to_string(),
            tokio::runtime::Handle::current(),
        )
    }
}

#[tokio::test]
async fn scenario_a_asset_credential_is_used_without_login() {
    init_tracing();
    let fixture = Fixture::new();
    fixture.put_asset_credential();

    let login = ScriptedLogin::new(true);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(TestSite::new("example.com"), login.clone(), service);

    coordinator.handle_startup().unwrap();

    let launch = launches.recv().await.unwrap();
    assert_eq!(
        launch.config.credential_path,
        fixture.asset_dir.path().join(ASSET_FILENAME)
    );
    assert_eq!(login.calls(), 0);
}

#[tokio::test]
async fn scenario_b_login_provisions_asset_credential() {
    init_tracing();
    let fixture = Fixture::new();

    let login = ScriptedLogin::new(true);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(TestSite::new("example.com"), login.clone(), service);

    coordinator.handle_startup().unwrap();

    let launch = launches.recv().await.unwrap();
    assert_eq!(
        launch.config.credential_path,
        fixture.asset_dir.path().join(ASSET_FILENAME)
    );
    assert_eq!(login.calls(), 1);
    assert!(fixture.asset_dir.path().join(ASSET_FILENAME).exists());
}

#[tokio::test]
async fn scenario_c_login_failure_fails_startup_and_never_launches() {
    init_tracing();
    let fixture = Fixture::new();

    let login = ScriptedLogin::new(false);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(TestSite::new("example.com"), login.clone(), service);

    let err = coordinator.handle_startup().unwrap_err();
    assert!(matches!(err, StartupError::Credential(_)));
    assert_eq!(coordinator.state(), LifecycleState::Failed);

    // Nothing was launched.
    assert!(launches.try_recv().is_err());
}

#[tokio::test]
async fn scenario_d_target_falls_back_to_detected_port() {
    init_tracing();
    let fixture = Fixture::new();
    fixture.put_asset_credential();

    let mut site = TestSite::new("example.com");
    site.listen_host = String::new();
    site.port = String::new();
    site.detected_port = "8443".to_string();
    site.default_port = "80".to_string();

    let login = ScriptedLogin::new(true);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(site, login, service);

    coordinator.handle_startup().unwrap();

    let launch = launches.recv().await.unwrap();
    assert_eq!(launch.config.target_url.host_str(), Some("localhost"));
    assert_eq!(launch.config.target_url.port(), Some(8443));
}

#[tokio::test]
async fn external_credential_wins_only_when_asset_is_absent() {
    init_tracing();
    let fixture = Fixture::new();
    fixture.put_external_credential();

    let login = ScriptedLogin::new(true);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(TestSite::new("example.com"), login.clone(), service);

    coordinator.handle_startup().unwrap();

    let launch = launches.recv().await.unwrap();
    assert_eq!(
        launch.config.credential_path,
        fixture.external_dir.path().join(EXTERNAL_FILENAME)
    );
    assert_eq!(login.calls(), 0);
}

#[tokio::test]
async fn launch_config_carries_hostname_and_fixed_defaults() {
    init_tracing();
    let fixture = Fixture::new();
    fixture.put_asset_credential();

    let login = ScriptedLogin::new(true);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(TestSite::new("tunneled.example.com"), login, service);

    coordinator.handle_startup().unwrap();

    let launch = launches.recv().await.unwrap();
    assert_eq!(launch.config.hostname, "tunneled.example.com");
    assert_eq!(launch.config.reported_version, "testhost/0.1");
    assert_eq!(
        launch.config.connect_timeout,
        edgebind::constants::CONNECT_TIMEOUT
    );
    assert_eq!(launch.config.retries, edgebind::constants::RETRIES);
    assert_eq!(
        launch.config.ha_connections,
        edgebind::constants::HA_CONNECTIONS
    );
}

#[tokio::test]
async fn full_lifecycle_connects_then_tears_down_on_shutdown() {
    init_tracing();
    let fixture = Fixture::new();
    fixture.put_asset_credential();

    let login = ScriptedLogin::new(true);
    let (service, mut launches) = RecordingService::new();
    let coordinator = fixture.coordinator(TestSite::new("example.com"), login, service);

    let mut connected = coordinator.connected_signal();
    coordinator.handle_startup().unwrap();
    let launch = launches.recv().await.unwrap();

    // The service flips the connected signal once established. The
    // coordinator only threads this handle through; tests are the first
    // consumer to actually await it.
    connected.wait_for(|up| *up).await.unwrap();

    coordinator.handle_shutdown().unwrap();
    let mut shutdown = launch.shutdown.clone();
    shutdown.wait_for(|stop| *stop).await.unwrap();
    assert_eq!(coordinator.state(), LifecycleState::ShuttingDown);
}
