use std::path::PathBuf;

use thiserror::Error;

use super::state::TransitionState;

/// Errors surfaced to callers of the orchestrator and workload monitor
///
/// Individual primitive failures are not in here: they are reported as step
/// outcomes and status events, never returned.
#[derive(Error, Debug)]
pub enum BoostError {
    #[error("workload executable not found: {0}")]
    NotFound(PathBuf),

    #[error("a boost is already active (system is {0})")]
    AlreadyBoosted(TransitionState),

    #[error("unknown mode: {0}")]
    UnknownMode(String),

    #[error("failed to start {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workload monitor for {0} stopped before reporting an exit")]
    MonitorLost(String),
}
