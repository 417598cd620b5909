use std::fmt;

use serde::Serialize;

use super::mode::Mode;

/// Lifecycle of one boost cycle
///
/// `Baseline -> Boosting -> Boosted -> Restoring -> Baseline`. `Restoring`
/// may also be entered straight from `Boosting` when a boost was abandoned
/// part-way through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    #[default]
    Baseline,
    Boosting,
    Boosted,
    Restoring,
}

impl TransitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionState::Baseline => "baseline",
            TransitionState::Boosting => "boosting",
            TransitionState::Boosted => "boosted",
            TransitionState::Restoring => "restoring",
        }
    }
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named operation the orchestrator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Transition {
    Boost,
    Restore,
    Mode { mode: Mode },
    Clean,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Boost => f.write_str("boost"),
            Transition::Restore => f.write_str("restore"),
            Transition::Mode { mode } => write!(f, "apply {mode} mode"),
            Transition::Clean => f.write_str("clean"),
        }
    }
}
