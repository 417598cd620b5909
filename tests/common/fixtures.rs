//! Fake system fixtures
//!
//! The starting state mirrors a typical desktop: balanced power plan, three
//! of the managed services running, one disabled by the user, and the
//! multimedia registry values at non-default settings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chaos::config::Config;
use chaos::platform::mock::MockPlatform;
use chaos::platform::{Hive, RegistryKey, RegistryValue, SchemeId, ServiceStatus, StartMode};
use chaos::primitive::WaitPolicy;
use chaos::status::{self, StatusReceiver};
use chaos::{Orchestrator, StatusEvent};
use tempfile::TempDir;

/// Managed services running before the boost
pub const RUNNING_SERVICES: [&str; 3] = ["DiagTrack", "WSearch", "SysMain"];

/// Managed service the user has disabled
pub const DISABLED_SERVICE: &str = "dmwappushservice";

const SYSTEM_PROFILE: &str =
    "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile";

pub fn responsiveness_key() -> RegistryKey {
    RegistryKey::new(Hive::LocalMachine, SYSTEM_PROFILE, "SystemResponsiveness")
}

pub fn throttling_key() -> RegistryKey {
    RegistryKey::new(Hive::LocalMachine, SYSTEM_PROFILE, "NetworkThrottlingIndex")
}

pub fn game_dvr_key() -> RegistryKey {
    RegistryKey::new(Hive::CurrentUser, "System\\GameConfigStore", "GameDVR_Enabled")
}

pub fn color_key() -> RegistryKey {
    RegistryKey::new(
        Hive::CurrentUser,
        "Software\\Microsoft\\Windows\\CurrentVersion\\VideoSettings",
        "DisableHWGamma",
    )
}

/// Fake system in its pre-boost state
pub fn desktop_platform() -> MockPlatform {
    let mut platform = MockPlatform::new().with_active_scheme(SchemeId::balanced());
    for name in RUNNING_SERVICES {
        platform = platform.with_service(name, ServiceStatus::Running, StartMode::Automatic);
    }
    platform
        .with_service(DISABLED_SERVICE, ServiceStatus::Stopped, StartMode::Disabled)
        .with_registry_value(responsiveness_key(), RegistryValue::Dword(20))
        .with_registry_value(throttling_key(), RegistryValue::Dword(10))
}

/// Default config with no scratch directories, no settle delay and short
/// service waits
pub fn test_config() -> Config {
    let mut managed: Vec<String> = RUNNING_SERVICES.iter().map(|s| s.to_string()).collect();
    managed.push(DISABLED_SERVICE.to_string());

    Config::default()
        .with_scratch_dirs(Vec::new())
        .with_managed_services(managed)
        .with_step_settle(Duration::ZERO)
        .with_service_wait(WaitPolicy {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
        })
}

/// Orchestrator wired to a fake platform, with the status stream captured
pub struct Rig {
    pub platform: MockPlatform,
    pub orchestrator: Arc<Orchestrator>,
    pub events: StatusReceiver,
}

impl Rig {
    pub fn new(platform: MockPlatform) -> Self {
        Self::with_config(platform, test_config())
    }

    pub fn with_config(platform: MockPlatform, config: Config) -> Self {
        let (sender, events) = status::channel();
        let orchestrator = Arc::new(Orchestrator::new(platform.capabilities(), config, sender));
        Self {
            platform,
            orchestrator,
            events,
        }
    }

    /// Status events emitted so far
    pub fn drain_events(&mut self) -> Vec<StatusEvent> {
        let mut events = Vec::new();
        while let Ok(update) = self.events.try_recv() {
            events.push(update.event);
        }
        events
    }
}

/// A file standing in for a game executable
pub struct FakeGame {
    _dir: TempDir,
    pub path: PathBuf,
}

impl FakeGame {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("game.exe");
        std::fs::write(&path, b"MZ").expect("Failed to write fake executable");
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
