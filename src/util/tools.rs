//! Tool availability detection
//!
//! Every system change is made by shelling out to one of the stock Windows
//! command-line tools below. Paths can be pinned in config.toml; otherwise
//! the binaries are looked up on PATH.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// External tools the launcher drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Power scheme control - REQUIRED for boosting
    Powercfg,
    /// Service control manager CLI
    Sc,
    /// Registry editor CLI
    Reg,
    /// Network shell, used by network mode
    Netsh,
    /// Performance counter sampler, used by stats
    Typeperf,
    /// WMI command line, used for memory stats
    Wmic,
}

impl Tool {
    /// Get the binary name for this tool
    pub fn binary_name(&self) -> &'static str {
        match self {
            Tool::Powercfg => "powercfg",
            Tool::Sc => "sc",
            Tool::Reg => "reg",
            Tool::Netsh => "netsh",
            Tool::Typeperf => "typeperf",
            Tool::Wmic => "wmic",
        }
    }

    /// What the launcher loses without this tool
    pub fn description(&self) -> &'static str {
        match self {
            Tool::Powercfg => "Power plan switching is unavailable.",
            Tool::Sc => "Background services cannot be suspended.",
            Tool::Reg => "Latency and color registry tweaks cannot be applied.",
            Tool::Netsh => "Network mode cannot be applied.",
            Tool::Typeperf => "CPU and GPU load will read as 0%.",
            Tool::Wmic => "Memory usage will read as 0 GB.",
        }
    }

    /// Check if this tool is required for a boost to do anything useful
    pub fn is_required(&self) -> bool {
        matches!(self, Tool::Powercfg | Tool::Sc | Tool::Reg)
    }

    /// Get all tools
    pub fn all() -> &'static [Tool] {
        &[
            Tool::Powercfg,
            Tool::Sc,
            Tool::Reg,
            Tool::Netsh,
            Tool::Typeperf,
            Tool::Wmic,
        ]
    }
}

/// Status of a tool's availability
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolStatus {
    /// Tool is available at the given path
    Available(PathBuf),
    /// Tool was not found in PATH or configured location
    #[default]
    NotFound,
    /// A path was configured in config.toml but it's invalid
    ConfiguredPathInvalid(PathBuf),
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ToolStatus::Available(_))
    }

    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ToolStatus::Available(p) => Some(p),
            _ => None,
        }
    }
}

/// Configured tool paths from the `[tools]` table of config.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolPaths {
    pub powercfg: Option<PathBuf>,
    pub sc: Option<PathBuf>,
    pub reg: Option<PathBuf>,
    pub netsh: Option<PathBuf>,
    pub typeperf: Option<PathBuf>,
    pub wmic: Option<PathBuf>,
}

impl ToolPaths {
    /// Get the configured path for a tool
    pub fn get(&self, tool: Tool) -> Option<&PathBuf> {
        match tool {
            Tool::Powercfg => self.powercfg.as_ref(),
            Tool::Sc => self.sc.as_ref(),
            Tool::Reg => self.reg.as_ref(),
            Tool::Netsh => self.netsh.as_ref(),
            Tool::Typeperf => self.typeperf.as_ref(),
            Tool::Wmic => self.wmic.as_ref(),
        }
    }

    /// Program to execute for a tool: the configured path, or the bare
    /// binary name so the OS resolves it from PATH
    pub fn program(&self, tool: Tool) -> PathBuf {
        self.get(tool)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(tool.binary_name()))
    }
}

/// Tracks the availability of all tools
#[derive(Debug, Clone, Default)]
pub struct ToolAvailability {
    powercfg: ToolStatus,
    sc: ToolStatus,
    reg: ToolStatus,
    netsh: ToolStatus,
    typeperf: ToolStatus,
    wmic: ToolStatus,
}

impl ToolAvailability {
    /// Detect availability of all tools
    ///
    /// A configured path is validated as-is; otherwise `which` searches PATH.
    pub fn detect(configured_paths: &ToolPaths) -> Self {
        let detect = |tool: Tool| Self::detect_tool(tool, configured_paths.get(tool));
        Self {
            powercfg: detect(Tool::Powercfg),
            sc: detect(Tool::Sc),
            reg: detect(Tool::Reg),
            netsh: detect(Tool::Netsh),
            typeperf: detect(Tool::Typeperf),
            wmic: detect(Tool::Wmic),
        }
    }

    fn detect_tool(tool: Tool, configured_path: Option<&PathBuf>) -> ToolStatus {
        if let Some(path) = configured_path {
            if Self::is_valid_executable(path) {
                return ToolStatus::Available(path.clone());
            } else {
                return ToolStatus::ConfiguredPathInvalid(path.clone());
            }
        }

        match which::which(tool.binary_name()) {
            Ok(path) => ToolStatus::Available(path),
            Err(_) => ToolStatus::NotFound,
        }
    }

    fn is_valid_executable(path: &Path) -> bool {
        if !path.exists() {
            return false;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = path.metadata() {
                return metadata.permissions().mode() & 0o111 != 0;
            }
            false
        }

        #[cfg(not(unix))]
        {
            path.is_file()
        }
    }

    pub fn status(&self, tool: Tool) -> &ToolStatus {
        match tool {
            Tool::Powercfg => &self.powercfg,
            Tool::Sc => &self.sc,
            Tool::Reg => &self.reg,
            Tool::Netsh => &self.netsh,
            Tool::Typeperf => &self.typeperf,
            Tool::Wmic => &self.wmic,
        }
    }

    pub fn is_available(&self, tool: Tool) -> bool {
        self.status(tool).is_available()
    }

    pub fn missing_tools(&self) -> Vec<Tool> {
        Tool::all()
            .iter()
            .filter(|&&tool| !self.is_available(tool))
            .copied()
            .collect()
    }

    pub fn missing_required_tools(&self) -> Vec<Tool> {
        self.missing_tools()
            .into_iter()
            .filter(|tool| tool.is_required())
            .collect()
    }
}
