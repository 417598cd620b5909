use serde::Serialize;

use crate::primitive::StepOutcome;

use super::state::Transition;

/// Per-step outcomes of one transition, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub transition: Transition,
    pub steps: Vec<StepOutcome>,
}

impl TransitionReport {
    pub fn new(transition: Transition) -> Self {
        Self {
            transition,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: StepOutcome) {
        self.steps.push(outcome);
    }

    pub fn applied_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_applied()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_failed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    /// True when no step failed
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }
}
