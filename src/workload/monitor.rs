use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::orchestrator::{BoostError, Orchestrator, TransitionReport};
use crate::status::StatusEvent;

use super::{Launcher, Workload};

/// How a workload ended, and what restoring the system afterwards did
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadExit {
    pub code: Option<i32>,
    /// Terminated through [`WorkloadHandle::kill`]
    pub killed: bool,
    pub restore: TransitionReport,
}

/// The single pending restore owed for one boosted launch
///
/// Consumed by value, so it can fire at most once.
struct RestoreObligation {
    orchestrator: Arc<Orchestrator>,
}

impl RestoreObligation {
    fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    async fn discharge(self) -> TransitionReport {
        self.orchestrator.restore().await
    }
}

/// Launches workloads inside a boost cycle
///
/// Every successful boost is paired with exactly one restore: on process
/// exit, on kill, or immediately if the process fails to start.
pub struct WorkloadMonitor {
    orchestrator: Arc<Orchestrator>,
    launcher: Arc<dyn Launcher>,
}

impl WorkloadMonitor {
    pub fn new(orchestrator: Arc<Orchestrator>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            orchestrator,
            launcher,
        }
    }

    pub async fn launch(&self, path: &Path, label: &str) -> Result<WorkloadHandle, BoostError> {
        let status = self.orchestrator.status().clone();

        // Nothing is mutated for a workload that can never start
        let exists = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !exists {
            status.emit(StatusEvent::WorkloadNotFound {
                path: path.to_path_buf(),
            });
            return Err(BoostError::NotFound(path.to_path_buf()));
        }

        status.emit(StatusEvent::WorkloadLaunching {
            label: label.to_string(),
        });
        self.orchestrator.boost().await?;
        let obligation = RestoreObligation::new(self.orchestrator.clone());

        let mut workload = match self.launcher.spawn(path) {
            Ok(workload) => workload,
            Err(source) => {
                tracing::error!(path = %path.display(), error = %source, "Failed to start workload");
                status.emit(StatusEvent::WorkloadLaunchFailed {
                    label: label.to_string(),
                    error: source.to_string(),
                });
                obligation.discharge().await;
                return Err(BoostError::Launch {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let pid = workload.id();
        status.emit(StatusEvent::WorkloadStarted {
            label: label.to_string(),
            pid,
        });

        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let observer_label = label.to_string();

        tokio::spawn(async move {
            let (code, killed) = observe(workload.as_mut(), kill_rx).await;
            tracing::info!(label = %observer_label, ?code, killed, "Workload exited");
            status.emit(StatusEvent::WorkloadExited {
                label: observer_label,
                code,
                killed,
            });

            let restore = obligation.discharge().await;
            // The handle may already be gone; the restore has still run
            let _ = exit_tx.send(WorkloadExit {
                code,
                killed,
                restore,
            });
        });

        Ok(WorkloadHandle {
            id: Uuid::new_v4(),
            label: label.to_string(),
            pid,
            kill_tx: Some(kill_tx),
            exit_rx: Some(exit_rx),
        })
    }
}

/// Wait for the workload to end on its own or for a kill request
///
/// A dropped kill sender only disables the kill branch.
async fn observe(
    workload: &mut dyn Workload,
    mut kill_rx: oneshot::Receiver<()>,
) -> (Option<i32>, bool) {
    tokio::select! {
        result = workload.wait() => (exit_code(result), false),
        Ok(()) = &mut kill_rx => {
            if let Err(e) = workload.kill().await {
                tracing::warn!(error = %e, "Failed to kill workload");
            }
            (exit_code(workload.wait().await), true)
        }
    }
}

fn exit_code(result: std::io::Result<Option<i32>>) -> Option<i32> {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Lost track of workload process");
        None
    })
}

/// Caller's view of one launched workload
///
/// Dropping the handle detaches from the workload; the restore still runs
/// when it exits.
#[derive(Debug)]
pub struct WorkloadHandle {
    id: Uuid,
    label: String,
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit_rx: Option<oneshot::Receiver<WorkloadExit>>,
}

impl WorkloadHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the observer to terminate the workload
    ///
    /// Returns false if a kill was already requested or the workload has
    /// already exited.
    pub fn kill(&mut self) -> bool {
        self.kill_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }

    /// Wait until the workload has exited and the system has been restored
    ///
    /// Cancel-safe: dropping this future and calling `wait` again keeps
    /// waiting for the same exit.
    pub async fn wait(&mut self) -> Result<WorkloadExit, BoostError> {
        let exit_rx = self
            .exit_rx
            .as_mut()
            .ok_or_else(|| BoostError::MonitorLost(self.label.clone()))?;
        let result = exit_rx.await;
        self.exit_rx = None;
        result.map_err(|_| BoostError::MonitorLost(self.label.clone()))
    }
}
