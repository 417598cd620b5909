//! Human-readable status events for the presentation layer
//!
//! The orchestrator and workload monitor write to a [`StatusSender`]; whoever
//! holds the receiving end decides how to display them. Events are purely
//! informational and never drive control flow.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::orchestrator::{Transition, TransitionState};
use crate::platform::PrimitiveError;
use crate::primitive::MutationKind;

/// Something worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    TransitionStarted {
        transition: Transition,
    },
    TransitionCompleted {
        transition: Transition,
        applied: usize,
        failed: usize,
    },
    TransitionRejected {
        transition: Transition,
        state: TransitionState,
    },
    NothingToRestore,
    StepApplied {
        mutation: MutationKind,
        detail: String,
    },
    StepSkipped {
        mutation: MutationKind,
        reason: String,
    },
    StepFailed {
        mutation: MutationKind,
        error: PrimitiveError,
    },
    WorkloadNotFound {
        path: PathBuf,
    },
    WorkloadLaunching {
        label: String,
    },
    WorkloadStarted {
        label: String,
        pid: Option<u32>,
    },
    WorkloadLaunchFailed {
        label: String,
        error: String,
    },
    WorkloadExited {
        label: String,
        code: Option<i32>,
        killed: bool,
    },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::TransitionStarted { transition } => match transition {
                Transition::Boost => write!(f, "Starting boost sequence..."),
                Transition::Restore => write!(f, "Restoring system..."),
                Transition::Mode { mode } => write!(f, "Applying {mode} mode..."),
                Transition::Clean => write!(f, "Cleaning temporary files..."),
            },
            StatusEvent::TransitionCompleted {
                transition,
                failed,
                ..
            } => {
                match transition {
                    Transition::Boost => write!(f, "Boost sequence complete")?,
                    Transition::Restore => write!(f, "System restored")?,
                    Transition::Mode { mode } => write!(f, "{mode} mode applied")?,
                    Transition::Clean => write!(f, "Cleanup complete")?,
                }
                match failed {
                    0 => Ok(()),
                    1 => write!(f, " (1 step failed)"),
                    n => write!(f, " ({n} steps failed)"),
                }
            }
            StatusEvent::TransitionRejected { transition, state } => {
                write!(f, "Cannot {transition} while system is {state}")
            }
            StatusEvent::NothingToRestore => write!(f, "Nothing to restore"),
            StatusEvent::StepApplied { detail, .. } => f.write_str(detail),
            StatusEvent::StepSkipped { mutation, reason } => {
                write!(f, "Skipped {mutation}: {reason}")
            }
            StatusEvent::StepFailed { mutation, error } => {
                write!(f, "Warning: {mutation} failed: {error}")
            }
            StatusEvent::WorkloadNotFound { path } => {
                write!(f, "Game file not found: {}", path.display())
            }
            StatusEvent::WorkloadLaunching { label } => write!(f, "Launching {label}..."),
            StatusEvent::WorkloadStarted { label, .. } => {
                write!(f, "{label} started successfully")
            }
            StatusEvent::WorkloadLaunchFailed { label, error } => {
                write!(f, "Error launching {label}: {error}")
            }
            StatusEvent::WorkloadExited { label, killed, .. } => {
                if *killed {
                    write!(f, "{label} was terminated. Restoring system...")
                } else {
                    write!(f, "{label} closed. Restoring system...")
                }
            }
        }
    }
}

/// A status event stamped with the time it was emitted
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: StatusEvent,
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.event.fmt(f)
    }
}

pub type StatusReceiver = mpsc::UnboundedReceiver<StatusUpdate>;

/// Write side of the status channel
///
/// Cheap to clone. Emitting never blocks and never fails; once the receiver
/// is gone events are only logged.
#[derive(Debug, Clone, Default)]
pub struct StatusSender {
    tx: Option<mpsc::UnboundedSender<StatusUpdate>>,
}

impl StatusSender {
    /// A sender that only logs
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: StatusEvent) {
        match &event {
            StatusEvent::StepFailed { .. }
            | StatusEvent::WorkloadLaunchFailed { .. }
            | StatusEvent::WorkloadNotFound { .. }
            | StatusEvent::TransitionRejected { .. } => {
                tracing::warn!(status = %event, "Status update")
            }
            _ => tracing::info!(status = %event, "Status update"),
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(StatusUpdate {
                at: Utc::now(),
                event,
            });
        }
    }
}

/// Create a connected sender/receiver pair
pub fn channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSender { tx: Some(tx) }, rx)
}
