use async_trait::async_trait;

use crate::platform::run_hidden;
use crate::util::tools::{Tool, ToolPaths};

use super::{MemoryUsage, TelemetryError, TelemetryProbe};

const CPU_COUNTER: &str = r"\Processor(_Total)\% Processor Time";
const GPU_COUNTER: &str = r"\GPU Engine(*engtype_3D)\Utilization Percentage";
const KB_PER_GB: f64 = 1024.0 * 1024.0;

/// Probe backed by Windows performance counters (`typeperf`) and WMI (`wmic`)
#[derive(Debug, Clone, Default)]
pub struct CounterProbe {
    tool_paths: ToolPaths,
}

impl CounterProbe {
    pub fn new(tool_paths: ToolPaths) -> Self {
        Self { tool_paths }
    }

    async fn run(&self, tool: Tool, args: &[&str]) -> Result<String, TelemetryError> {
        let output = run_hidden(&self.tool_paths.program(tool), args)
            .await
            .map_err(|e| TelemetryError::unavailable(tool.binary_name(), e.to_string()))?;
        if !output.success {
            return Err(TelemetryError::unavailable(
                tool.binary_name(),
                output.failure_message(),
            ));
        }
        Ok(output.stdout)
    }

    async fn counter(&self, counter: &str) -> Result<f64, TelemetryError> {
        let stdout = self.run(Tool::Typeperf, &[counter, "-sc", "1"]).await?;
        let values = parse_typeperf_csv(&stdout)
            .ok_or_else(|| TelemetryError::unavailable(counter, "no samples in typeperf output"))?;
        Ok(values.iter().sum())
    }
}

#[async_trait]
impl TelemetryProbe for CounterProbe {
    async fn cpu_percent(&self) -> Result<f64, TelemetryError> {
        Ok(self.counter(CPU_COUNTER).await?.clamp(0.0, 100.0))
    }

    async fn memory(&self) -> Result<MemoryUsage, TelemetryError> {
        let stdout = self
            .run(
                Tool::Wmic,
                &["OS", "get", "FreePhysicalMemory,TotalVisibleMemorySize", "/Value"],
            )
            .await?;
        parse_wmic_memory(&stdout)
            .ok_or_else(|| TelemetryError::unavailable("memory", "unexpected wmic output"))
    }

    /// Summed over every 3D engine instance
    async fn gpu_percent(&self) -> Result<f64, TelemetryError> {
        Ok(self.counter(GPU_COUNTER).await?.clamp(0.0, 100.0))
    }
}

/// Values of the last sample row in `typeperf` CSV output
///
/// The first column of each row is the timestamp; empty cells (instances
/// that vanished mid-sample) are ignored.
pub fn parse_typeperf_csv(output: &str) -> Option<Vec<f64>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('"') && !line.starts_with("\"(PDH-CSV"))
        .filter_map(|line| {
            let values: Vec<f64> = line
                .split(',')
                .skip(1)
                .filter_map(|cell| cell.trim().trim_matches('"').trim().parse().ok())
                .collect();
            (!values.is_empty()).then_some(values)
        })
        .last()
}

/// Parse `wmic OS get FreePhysicalMemory,TotalVisibleMemorySize /Value`
///
/// Both values are reported in KB.
pub fn parse_wmic_memory(output: &str) -> Option<MemoryUsage> {
    let mut free_kb = None;
    let mut total_kb = None;
    for line in output.lines() {
        let Some((name, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().parse::<f64>().ok();
        match name.trim() {
            "FreePhysicalMemory" => free_kb = value,
            "TotalVisibleMemorySize" => total_kb = value,
            _ => {}
        }
    }

    let (free_kb, total_kb) = (free_kb?, total_kb?);
    Some(MemoryUsage {
        used_gb: (total_kb - free_kb).max(0.0) / KB_PER_GB,
        total_gb: total_kb / KB_PER_GB,
    })
}
