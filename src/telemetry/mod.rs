//! Live system load readings for the stats display

mod counters;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use counters::{parse_typeperf_csv, parse_wmic_memory, CounterProbe};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("{counter} unavailable: {reason}")]
    Unavailable { counter: String, reason: String },
}

impl TelemetryError {
    pub fn unavailable(counter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            counter: counter.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub used_gb: f64,
    pub total_gb: f64,
}

/// Source of raw load readings
#[async_trait]
pub trait TelemetryProbe: Send + Sync {
    async fn cpu_percent(&self) -> Result<f64, TelemetryError>;

    async fn memory(&self) -> Result<MemoryUsage, TelemetryError>;

    async fn gpu_percent(&self) -> Result<f64, TelemetryError>;
}

/// One reading of every counter; unavailable counters read as zero
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySample {
    pub at: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory: MemoryUsage,
    pub gpu_percent: f64,
}

/// Sampler over a [`TelemetryProbe`]
///
/// Rate counters report 0 on their first read, so the first call to
/// [`Telemetry::sample`] reads them once, waits `settle`, and reads again.
pub struct Telemetry<P> {
    probe: P,
    settle: Duration,
    primed: AtomicBool,
}

impl<P: TelemetryProbe> Telemetry<P> {
    pub fn new(probe: P, settle: Duration) -> Self {
        Self {
            probe,
            settle,
            primed: AtomicBool::new(false),
        }
    }

    pub async fn sample(&self) -> TelemetrySample {
        if !self.primed.swap(true, Ordering::SeqCst) {
            let _ = self.probe.cpu_percent().await;
            let _ = self.probe.gpu_percent().await;
            if !self.settle.is_zero() {
                tokio::time::sleep(self.settle).await;
            }
        }

        TelemetrySample {
            at: Utc::now(),
            cpu_percent: or_zero(self.probe.cpu_percent().await),
            memory: or_zero(self.probe.memory().await),
            gpu_percent: or_zero(self.probe.gpu_percent().await),
        }
    }
}

fn or_zero<T: Default>(reading: Result<T, TelemetryError>) -> T {
    reading.unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Telemetry reading unavailable");
        T::default()
    })
}
