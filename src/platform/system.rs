//! Production capabilities backed by the stock Windows command-line tools
//! (`powercfg`, `sc`, `reg`, `netsh`).

use async_trait::async_trait;

use crate::util::tools::{Tool, ToolPaths};

use super::command::{run_hidden, CommandOutput};
use super::error::PrimitiveError;
use super::types::{RegistryKey, RegistryValue, SchemeId, ServiceState, ServiceStatus, StartMode};
use super::{NetworkTuning, PowerSchemes, RegistryStore, ServiceManager};

/// Capabilities implemented by shelling out to system tools
#[derive(Debug, Clone, Default)]
pub struct SystemPlatform {
    tool_paths: ToolPaths,
}

impl SystemPlatform {
    pub fn new(tool_paths: ToolPaths) -> Self {
        Self { tool_paths }
    }

    async fn run(&self, tool: Tool, args: &[&str]) -> Result<CommandOutput, PrimitiveError> {
        let program = self.tool_paths.program(tool);
        run_hidden(&program, args)
            .await
            .map_err(|e| PrimitiveError::failure(tool.binary_name(), e.to_string()))
    }

    /// Run a tool and treat a non-zero exit as a primitive failure
    async fn run_checked(&self, tool: Tool, args: &[&str]) -> Result<String, PrimitiveError> {
        let output = self.run(tool, args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(PrimitiveError::failure(
                tool.binary_name(),
                output.failure_message(),
            ))
        }
    }
}

#[async_trait]
impl PowerSchemes for SystemPlatform {
    async fn active(&self) -> Result<SchemeId, PrimitiveError> {
        let stdout = self.run_checked(Tool::Powercfg, &["/getactivescheme"]).await?;
        parse_active_scheme(&stdout).ok_or_else(|| {
            PrimitiveError::failure("powercfg", "no scheme GUID in /getactivescheme output")
        })
    }

    async fn set_active(&self, scheme: &SchemeId) -> Result<(), PrimitiveError> {
        self.run_checked(Tool::Powercfg, &["/setactive", scheme.as_str()])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ServiceManager for SystemPlatform {
    async fn query(&self, name: &str) -> Result<ServiceState, PrimitiveError> {
        let state = self.run_checked(Tool::Sc, &["query", name]).await?;
        let status = parse_sc_state(&state).ok_or_else(|| {
            PrimitiveError::failure("sc", format!("no STATE line for service {name}"))
        })?;

        let config = self.run_checked(Tool::Sc, &["qc", name]).await?;
        let start_mode = parse_sc_start_type(&config).ok_or_else(|| {
            PrimitiveError::failure("sc", format!("no START_TYPE line for service {name}"))
        })?;

        Ok(ServiceState::new(status, start_mode))
    }

    async fn stop(&self, name: &str) -> Result<(), PrimitiveError> {
        self.run_checked(Tool::Sc, &["stop", name]).await.map(|_| ())
    }

    async fn start(&self, name: &str) -> Result<(), PrimitiveError> {
        self.run_checked(Tool::Sc, &["start", name]).await.map(|_| ())
    }
}

#[async_trait]
impl RegistryStore for SystemPlatform {
    async fn read(&self, key: &RegistryKey) -> Result<Option<RegistryValue>, PrimitiveError> {
        let path = key.qualified_path();
        let output = self
            .run(Tool::Reg, &["query", &path, "/v", &key.name])
            .await?;

        // reg.exe exits 1 for a missing key or value, but also for access denied
        if !output.success {
            let message = output.failure_message();
            if output.code == Some(1) && is_reg_not_found(&message) {
                return Ok(None);
            }
            return Err(PrimitiveError::failure("reg", message));
        }

        parse_reg_query(&output.stdout, &key.name)
    }

    async fn write(&self, key: &RegistryKey, value: &RegistryValue) -> Result<(), PrimitiveError> {
        let path = key.qualified_path();
        let data = value.data();
        self.run_checked(
            Tool::Reg,
            &[
                "add",
                &path,
                "/v",
                &key.name,
                "/t",
                value.type_name(),
                "/d",
                &data,
                "/f",
            ],
        )
        .await
        .map(|_| ())
    }

    async fn delete(&self, key: &RegistryKey) -> Result<(), PrimitiveError> {
        let path = key.qualified_path();
        self.run_checked(Tool::Reg, &["delete", &path, "/v", &key.name, "/f"])
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl NetworkTuning for SystemPlatform {
    async fn set_autotuning(&self, level: &str) -> Result<(), PrimitiveError> {
        let setting = format!("autotuninglevel={level}");
        self.run_checked(Tool::Netsh, &["int", "tcp", "set", "global", &setting])
            .await
            .map(|_| ())
    }
}

fn is_guid(token: &str) -> bool {
    token.len() == 36
        && token.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Extract the scheme GUID from `powercfg /getactivescheme` output
///
/// `Power Scheme GUID: 381b4222-f694-41f0-9685-ff5bb260df2e  (Balanced)`
pub fn parse_active_scheme(output: &str) -> Option<SchemeId> {
    output
        .split_whitespace()
        .find(|token| is_guid(token))
        .map(SchemeId::new)
}

/// Value after the `:` on the first line whose label matches
fn labelled_value<'a>(output: &'a str, label: &str) -> Option<&'a str> {
    output.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        (name.trim() == label).then_some(value.trim())
    })
}

/// Extract the status from `sc query` output (`STATE : 4  RUNNING`)
pub fn parse_sc_state(output: &str) -> Option<ServiceStatus> {
    let value = labelled_value(output, "STATE")?;
    value
        .split_whitespace()
        .nth(1)
        .and_then(ServiceStatus::parse)
}

/// Extract the start mode from `sc qc` output (`START_TYPE : 2   AUTO_START`)
pub fn parse_sc_start_type(output: &str) -> Option<StartMode> {
    let value = labelled_value(output, "START_TYPE")?;
    value.split_whitespace().nth(1).and_then(StartMode::parse)
}

/// Whether a failed `reg query` means the key or value does not exist
fn is_reg_not_found(message: &str) -> bool {
    message.contains("unable to find")
}

/// Extract a named value from `reg query <key> /v <name>` output
///
/// Data lines are `<name>    <type>    <data>` separated by four spaces.
/// A value stored with a type that cannot be written back unchanged is an
/// error, not an absent value.
pub fn parse_reg_query(output: &str, name: &str) -> Result<Option<RegistryValue>, PrimitiveError> {
    let found = output.lines().find_map(|line| {
        let mut fields = line.trim().split("    ").filter(|f| !f.is_empty());
        let value_name = fields.next()?;
        if !value_name.trim().eq_ignore_ascii_case(name) {
            return None;
        }
        let kind = fields.next()?.trim().to_string();
        let data = fields.collect::<Vec<_>>().join("    ");
        Some((kind, data.trim().to_string()))
    });
    let Some((kind, data)) = found else {
        return Ok(None);
    };

    let value = match kind.as_str() {
        "REG_DWORD" => {
            let hex = data.trim_start_matches("0x").trim_start_matches("0X");
            u32::from_str_radix(hex, 16)
                .map(RegistryValue::Dword)
                .map_err(|_| {
                    PrimitiveError::failure("reg", format!("malformed REG_DWORD data for {name}: {data}"))
                })?
        }
        "REG_SZ" => RegistryValue::Sz(data),
        "REG_EXPAND_SZ" => RegistryValue::ExpandSz(data),
        other => {
            return Err(PrimitiveError::failure(
                "reg",
                format!("unsupported value type {other} for {name}"),
            ))
        }
    };
    Ok(Some(value))
}
