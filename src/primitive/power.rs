use crate::orchestrator::StateSnapshot;
use crate::platform::{PowerSchemes, PrimitiveError, SchemeId};

use super::{MutationKind, StepOutcome};

/// Power scheme switching
pub struct PowerPlanPrimitive<'a> {
    power: &'a dyn PowerSchemes,
}

impl<'a> PowerPlanPrimitive<'a> {
    pub fn new(power: &'a dyn PowerSchemes) -> Self {
        Self { power }
    }

    /// Record the active scheme unless one is already captured
    pub async fn capture(&self, snapshot: &mut StateSnapshot) -> Result<(), PrimitiveError> {
        if snapshot.power_plan().is_some() {
            return Ok(());
        }
        let active = self.power.active().await?;
        snapshot.record_power_plan(active);
        Ok(())
    }

    /// Capture the current scheme, then switch to `target`
    ///
    /// A failed capture does not stop the switch; restore then falls back to
    /// the balanced scheme.
    pub async fn boost(&self, target: &SchemeId, snapshot: &mut StateSnapshot) -> StepOutcome {
        let captured = match self.capture(snapshot).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read active power scheme before boosting");
                false
            }
        };

        let mut outcome = self.apply(target).await;
        if let (false, Some(detail)) = (captured, applied_detail(&mut outcome)) {
            detail.push_str(" (previous scheme unknown)");
        }
        outcome
    }

    pub async fn apply(&self, target: &SchemeId) -> StepOutcome {
        StepOutcome::from_result(
            MutationKind::PowerPlan {
                scheme: target.clone(),
            },
            self.power.set_active(target).await,
            format!("Power plan set to {}", target.label()),
        )
    }

    /// Switch back to the captured scheme, or `fallback` when none was captured
    pub async fn revert(&self, captured: Option<&SchemeId>, fallback: &SchemeId) -> StepOutcome {
        self.apply(captured.unwrap_or(fallback)).await
    }
}

fn applied_detail(outcome: &mut StepOutcome) -> Option<&mut String> {
    match &mut outcome.status {
        super::StepStatus::Applied(detail) => Some(detail),
        _ => None,
    }
}
