use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::platform::{Hive, RegistryKey, RegistryValue, SchemeId};
use crate::primitive::WaitPolicy;
use crate::util::paths::config_path;
use crate::util::tools::ToolPaths;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Floor for `[services] poll_interval_ms`; zero would spin `sc query`
const MIN_SERVICE_POLL_INTERVAL: Duration = Duration::from_millis(10);

const SYSTEM_PROFILE: &str = "SOFTWARE\\Microsoft\\Windows NT\\CurrentVersion\\Multimedia\\SystemProfile";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Power schemes used by boost, restore and the modes
    pub power: PowerConfig,
    /// Background services suspended while boosted
    pub services: ServiceConfig,
    /// Registry tuning
    pub registry: RegistryConfig,
    /// Directories whose files are purged before boosting
    pub scratch_dirs: Vec<PathBuf>,
    /// Pause after the power plan switch and after service suspension
    pub step_settle: Duration,
    /// Telemetry sampling
    pub telemetry: TelemetryConfig,
    /// Configured paths for external tools (powercfg, sc, reg, ...)
    pub tool_paths: ToolPaths,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerConfig {
    /// Scheme activated by boost and competitive mode
    pub boost_scheme: SchemeId,
    /// Scheme activated by graphics mode
    pub high_performance_scheme: SchemeId,
    /// Scheme activated by balanced mode, and by restore when the
    /// pre-boost scheme could not be captured
    pub balanced_scheme: SchemeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub managed: Vec<String>,
    pub wait: WaitPolicy,
}

/// One registry value the launcher tunes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryTweak {
    pub hive: Hive,
    pub path: String,
    pub name: String,
    /// Value written while boosted
    pub boosted: RegistryValue,
    /// Stock value written by the graphics and balanced modes; `None` leaves it alone
    #[serde(default)]
    pub baseline: Option<RegistryValue>,
}

impl RegistryTweak {
    pub fn key(&self) -> RegistryKey {
        RegistryKey::new(self.hive, self.path.clone(), self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Latency tweaks applied by boost and competitive mode
    pub tweaks: Vec<RegistryTweak>,
    /// Tweak applied by color mode
    pub color: RegistryTweak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Delay before re-reading the first (discarded) sample
    pub settle: Duration,
    /// Interval between samples in watch mode
    pub interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            power: PowerConfig {
                boost_scheme: SchemeId::high_performance(),
                high_performance_scheme: SchemeId::high_performance(),
                balanced_scheme: SchemeId::balanced(),
            },
            services: ServiceConfig {
                managed: vec![
                    "DiagTrack".into(),
                    "WSearch".into(),
                    "dmwappushservice".into(),
                    "SysMain".into(),
                ],
                wait: WaitPolicy::default(),
            },
            registry: RegistryConfig {
                tweaks: default_tweaks(),
                color: RegistryTweak {
                    hive: Hive::CurrentUser,
                    path: "Software\\Microsoft\\Windows\\CurrentVersion\\VideoSettings".into(),
                    name: "DisableHWGamma".into(),
                    boosted: RegistryValue::Dword(1),
                    baseline: None,
                },
            },
            scratch_dirs: default_scratch_dirs(),
            step_settle: Duration::from_millis(500),
            telemetry: TelemetryConfig {
                settle: Duration::from_millis(100),
                interval: Duration::from_secs(1),
            },
            tool_paths: ToolPaths::default(),
        }
    }
}

fn default_tweaks() -> Vec<RegistryTweak> {
    vec![
        RegistryTweak {
            hive: Hive::LocalMachine,
            path: SYSTEM_PROFILE.into(),
            name: "SystemResponsiveness".into(),
            boosted: RegistryValue::Dword(0),
            baseline: Some(RegistryValue::Dword(10)),
        },
        RegistryTweak {
            hive: Hive::LocalMachine,
            path: SYSTEM_PROFILE.into(),
            name: "NetworkThrottlingIndex".into(),
            boosted: RegistryValue::Dword(0xFFFF_FFFF),
            baseline: Some(RegistryValue::Dword(10)),
        },
        RegistryTweak {
            hive: Hive::CurrentUser,
            path: "System\\GameConfigStore".into(),
            name: "GameDVR_Enabled".into(),
            boosted: RegistryValue::Dword(0),
            baseline: None,
        },
    ]
}

fn default_scratch_dirs() -> Vec<PathBuf> {
    vec![
        std::env::temp_dir(),
        PathBuf::from(r"C:\Windows\Temp"),
        PathBuf::from(r"C:\Windows\Prefetch"),
    ]
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlPowerConfig {
    pub boost_scheme: Option<SchemeId>,
    pub high_performance_scheme: Option<SchemeId>,
    pub balanced_scheme: Option<SchemeId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlServiceConfig {
    pub managed: Option<Vec<String>>,
    pub wait_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlRegistryConfig {
    pub tweaks: Option<Vec<RegistryTweak>>,
    pub color: Option<RegistryTweak>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlScratchConfig {
    pub dirs: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlBoostConfig {
    pub step_settle_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTelemetryConfig {
    pub settle_ms: Option<u64>,
    pub interval_ms: Option<u64>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub power: Option<TomlPowerConfig>,
    pub services: Option<TomlServiceConfig>,
    pub registry: Option<TomlRegistryConfig>,
    pub scratch: Option<TomlScratchConfig>,
    pub boost: Option<TomlBoostConfig>,
    pub telemetry: Option<TomlTelemetryConfig>,
    pub tools: Option<ToolPaths>,
}

impl Config {
    /// Load configuration from file, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        match fs::read_to_string(&config_file) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %config_file.display(),
                        error = %e,
                        "Ignoring invalid config file"
                    );
                    Config::default()
                }
            },
            Err(e) => {
                tracing::debug!(path = %config_file.display(), error = %e, "No config file");
                Config::default()
            }
        }
    }

    /// Parse config file contents on top of the defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let toml_config = toml::from_str::<TomlConfig>(contents)?;
        let mut config = Config::default();
        config.merge(toml_config);
        Ok(config)
    }

    fn merge(&mut self, toml_config: TomlConfig) {
        if let Some(power) = toml_config.power {
            if let Some(scheme) = power.boost_scheme {
                self.power.boost_scheme = scheme;
            }
            if let Some(scheme) = power.high_performance_scheme {
                self.power.high_performance_scheme = scheme;
            }
            if let Some(scheme) = power.balanced_scheme {
                self.power.balanced_scheme = scheme;
            }
        }

        if let Some(services) = toml_config.services {
            if let Some(managed) = services.managed {
                self.services.managed = managed;
            }
            if let Some(ms) = services.wait_timeout_ms {
                self.services.wait.timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = services.poll_interval_ms {
                self.services.wait.poll_interval =
                    Duration::from_millis(ms).max(MIN_SERVICE_POLL_INTERVAL);
            }
        }

        if let Some(registry) = toml_config.registry {
            if let Some(tweaks) = registry.tweaks {
                self.registry.tweaks = tweaks;
            }
            if let Some(color) = registry.color {
                self.registry.color = color;
            }
        }

        if let Some(dirs) = toml_config.scratch.and_then(|s| s.dirs) {
            self.scratch_dirs = dirs;
        }

        if let Some(ms) = toml_config.boost.and_then(|b| b.step_settle_ms) {
            self.step_settle = Duration::from_millis(ms);
        }

        if let Some(telemetry) = toml_config.telemetry {
            if let Some(ms) = telemetry.settle_ms {
                self.telemetry.settle = Duration::from_millis(ms);
            }
            if let Some(ms) = telemetry.interval_ms {
                self.telemetry.interval = Duration::from_millis(ms);
            }
        }

        if let Some(tools) = toml_config.tools {
            self.tool_paths = tools;
        }
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    tracing::warn!(error = %e, "Failed to create config directory");
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_scratch_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.scratch_dirs = dirs;
        self
    }

    pub fn with_managed_services(mut self, services: Vec<String>) -> Self {
        self.services.managed = services;
        self
    }

    pub fn with_service_wait(mut self, wait: WaitPolicy) -> Self {
        self.services.wait = wait;
        self
    }

    pub fn with_step_settle(mut self, settle: Duration) -> Self {
        self.step_settle = settle;
        self
    }
}
