use serde::Serialize;
use thiserror::Error;

use super::types::ServiceStatus;

/// Failure of a single mutation primitive
///
/// Never fatal: the orchestrator reports it once and moves on to the next step.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveError {
    #[error("{primitive} failed: {message}")]
    PrimitiveFailure { primitive: String, message: String },

    #[error("service {service} did not reach '{target}' within {waited_ms} ms")]
    TimeoutWaitingForState {
        service: String,
        target: ServiceStatus,
        waited_ms: u64,
    },
}

impl PrimitiveError {
    pub fn failure(primitive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PrimitiveFailure {
            primitive: primitive.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimeoutWaitingForState { .. })
    }
}
