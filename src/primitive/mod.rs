//! Mutation primitives: one independently applicable and revertible facet
//! of system configuration each.

mod power;
mod registry;
mod scratch;
mod service;

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::platform::{PrimitiveError, RegistryKey, RegistryValue, SchemeId};

pub use power::PowerPlanPrimitive;
pub use registry::RegistryPrimitive;
pub use scratch::{PurgeReport, ScratchPurgePrimitive};
pub use service::{ServicePrimitive, WaitPolicy};

/// The vocabulary of mutations the orchestrator sequences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
    PowerPlan {
        scheme: SchemeId,
    },
    Service {
        name: String,
    },
    /// `value: None` deletes the value
    RegistryValue {
        key: RegistryKey,
        value: Option<RegistryValue>,
    },
    ScratchPurge {
        paths: Vec<PathBuf>,
    },
    NetworkAutotuning {
        level: String,
    },
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::PowerPlan { scheme } => write!(f, "power plan {}", scheme.label()),
            MutationKind::Service { name } => write!(f, "service {name}"),
            MutationKind::RegistryValue { key, .. } => write!(f, "registry value {key}"),
            MutationKind::ScratchPurge { paths } => {
                write!(f, "scratch purge ({} directories)", paths.len())
            }
            MutationKind::NetworkAutotuning { level } => {
                write!(f, "TCP autotuning level {level}")
            }
        }
    }
}

/// What happened to one primitive during a transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The mutation took effect; carries a human-readable summary
    Applied(String),
    /// Nothing needed doing; carries the reason
    Skipped(String),
    Failed(PrimitiveError),
}

/// Outcome of one primitive step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub mutation: MutationKind,
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn applied(mutation: MutationKind, detail: impl Into<String>) -> Self {
        Self {
            mutation,
            status: StepStatus::Applied(detail.into()),
        }
    }

    pub fn skipped(mutation: MutationKind, reason: impl Into<String>) -> Self {
        Self {
            mutation,
            status: StepStatus::Skipped(reason.into()),
        }
    }

    pub fn failed(mutation: MutationKind, error: PrimitiveError) -> Self {
        Self {
            mutation,
            status: StepStatus::Failed(error),
        }
    }

    /// Build from a capability result
    pub fn from_result(
        mutation: MutationKind,
        result: Result<(), PrimitiveError>,
        detail: impl Into<String>,
    ) -> Self {
        match result {
            Ok(()) => Self::applied(mutation, detail),
            Err(e) => Self::failed(mutation, e),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self.status, StepStatus::Applied(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&PrimitiveError> {
        match &self.status {
            StepStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}
