use std::fmt;

use serde::{Deserialize, Serialize};

/// Power scheme identifier (a GUID as printed by `powercfg`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SchemeId(String);

impl SchemeId {
    pub const BALANCED: &'static str = "381b4222-f694-41f0-9685-ff5bb260df2e";
    pub const HIGH_PERFORMANCE: &'static str = "8c5e7fda-e8bf-45a6-a6cc-4b3c3f7e5efa";
    pub const POWER_SAVER: &'static str = "a1841308-3541-4fab-bc81-f71556f20b4a";
    pub const ULTIMATE_PERFORMANCE: &'static str = "e9a42b02-d5df-448d-aa00-03f14749eb61";

    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into().trim().to_ascii_lowercase())
    }

    pub fn balanced() -> Self {
        Self::new(Self::BALANCED)
    }

    pub fn high_performance() -> Self {
        Self::new(Self::HIGH_PERFORMANCE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Friendly name for the schemes Windows ships with
    pub fn friendly_name(&self) -> Option<&'static str> {
        match self.0.as_str() {
            Self::BALANCED => Some("Balanced"),
            Self::HIGH_PERFORMANCE => Some("High performance"),
            Self::POWER_SAVER => Some("Power saver"),
            Self::ULTIMATE_PERFORMANCE => Some("Ultimate Performance"),
            _ => None,
        }
    }

    /// Friendly name if known, otherwise the raw GUID
    pub fn label(&self) -> String {
        self.friendly_name()
            .map(String::from)
            .unwrap_or_else(|| self.0.clone())
    }
}

impl From<String> for SchemeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<SchemeId> for String {
    fn from(value: SchemeId) -> Self {
        value.0
    }
}

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current status of a background service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
}

impl ServiceStatus {
    /// Parse the state keyword printed by `sc query`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STOPPED" => Some(Self::Stopped),
            "START_PENDING" => Some(Self::StartPending),
            "STOP_PENDING" => Some(Self::StopPending),
            "RUNNING" => Some(Self::Running),
            "CONTINUE_PENDING" => Some(Self::ContinuePending),
            "PAUSE_PENDING" => Some(Self::PausePending),
            "PAUSED" => Some(Self::Paused),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::StartPending => "start pending",
            Self::StopPending => "stop pending",
            Self::Running => "running",
            Self::ContinuePending => "continue pending",
            Self::PausePending => "pause pending",
            Self::Paused => "paused",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured start mode of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    Boot,
    System,
    Automatic,
    Manual,
    Disabled,
}

impl StartMode {
    /// Parse the start type keyword printed by `sc qc`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "BOOT_START" => Some(Self::Boot),
            "SYSTEM_START" => Some(Self::System),
            "AUTO_START" => Some(Self::Automatic),
            "DEMAND_START" => Some(Self::Manual),
            "DISABLED" => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Point-in-time view of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub status: ServiceStatus,
    pub start_mode: StartMode,
}

impl ServiceState {
    pub fn new(status: ServiceStatus, start_mode: StartMode) -> Self {
        Self { status, start_mode }
    }

    pub fn is_running(&self) -> bool {
        self.status == ServiceStatus::Running
    }
}

/// Registry root a value lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hive {
    #[serde(rename = "HKLM", alias = "HKEY_LOCAL_MACHINE")]
    LocalMachine,
    #[serde(rename = "HKCU", alias = "HKEY_CURRENT_USER")]
    CurrentUser,
}

impl Hive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
        }
    }
}

/// Fully qualified registry value location (hive, key path, value name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegistryKey {
    pub hive: Hive,
    pub path: String,
    pub name: String,
}

impl RegistryKey {
    pub fn new(hive: Hive, path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hive,
            path: path.into(),
            name: name.into(),
        }
    }

    /// Key path in the form `reg.exe` expects (`HKLM\SOFTWARE\...`)
    pub fn qualified_path(&self) -> String {
        format!("{}\\{}", self.hive.as_str(), self.path.trim_matches('\\'))
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.qualified_path(), self.name)
    }
}

/// Registry value payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryValue {
    Dword(u32),
    Sz(String),
    /// Only ever read back from the registry; config strings are plain `Sz`
    #[serde(skip_deserializing)]
    ExpandSz(String),
}

impl RegistryValue {
    /// Type name as used by `reg add /t`
    pub fn type_name(&self) -> &'static str {
        match self {
            RegistryValue::Dword(_) => "REG_DWORD",
            RegistryValue::Sz(_) => "REG_SZ",
            RegistryValue::ExpandSz(_) => "REG_EXPAND_SZ",
        }
    }

    /// Data argument as used by `reg add /d`
    pub fn data(&self) -> String {
        match self {
            RegistryValue::Dword(v) => v.to_string(),
            RegistryValue::Sz(s) | RegistryValue::ExpandSz(s) => s.clone(),
        }
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryValue::Dword(v) => write!(f, "0x{v:x}"),
            RegistryValue::Sz(s) | RegistryValue::ExpandSz(s) => write!(f, "\"{s}\""),
        }
    }
}
