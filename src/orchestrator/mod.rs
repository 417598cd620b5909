//! Boost/restore transition sequencing
//!
//! The [`Orchestrator`] owns the one [`StateSnapshot`] of the current cycle
//! and runs each transition as a fixed list of primitive steps. A failed
//! step is reported and skipped; it never aborts the steps after it.

mod error;
mod mode;
mod report;
mod snapshot;
mod state;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::platform::{Capabilities, PrimitiveError, SchemeId};
use crate::primitive::{
    MutationKind, PowerPlanPrimitive, RegistryPrimitive, ScratchPurgePrimitive, ServicePrimitive,
    StepOutcome, StepStatus,
};
use crate::status::{StatusEvent, StatusSender};

pub use error::BoostError;
pub use mode::Mode;
pub use report::TransitionReport;
pub use snapshot::StateSnapshot;
pub use state::{Transition, TransitionState};

const NETWORK_AUTOTUNING_LEVEL: &str = "normal";

#[derive(Debug, Default)]
struct Cycle {
    state: TransitionState,
    snapshot: StateSnapshot,
}

/// Sequences mutation primitives into boost, restore and mode transitions
///
/// Transitions are serialized: each one holds the cycle lock from its first
/// step to its last, so a restore fired from a workload observer can never
/// interleave with a boost or a mode change.
pub struct Orchestrator {
    capabilities: Capabilities,
    config: Config,
    status: StatusSender,
    cycle: Mutex<Cycle>,
}

impl Orchestrator {
    pub fn new(capabilities: Capabilities, config: Config, status: StatusSender) -> Self {
        Self {
            capabilities,
            config,
            status,
            cycle: Mutex::new(Cycle::default()),
        }
    }

    pub fn status(&self) -> &StatusSender {
        &self.status
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn state(&self) -> TransitionState {
        self.cycle.lock().await.state
    }

    /// Copy of the values captured so far in the current cycle
    pub async fn snapshot(&self) -> StateSnapshot {
        self.cycle.lock().await.snapshot.clone()
    }

    /// Move from `Baseline` to `Boosted`
    ///
    /// Runs scratch purge, power plan switch, service suspension and registry
    /// tuning in that order, capturing prior values before each mutation.
    /// Step failures end up in the report; the only error is a boost
    /// requested while a cycle is already in progress.
    pub async fn boost(&self) -> Result<TransitionReport, BoostError> {
        let mut guard = self.cycle.lock().await;
        let cycle = &mut *guard;

        if cycle.state != TransitionState::Baseline {
            self.status.emit(StatusEvent::TransitionRejected {
                transition: Transition::Boost,
                state: cycle.state,
            });
            return Err(BoostError::AlreadyBoosted(cycle.state));
        }

        cycle.state = TransitionState::Boosting;
        self.status.emit(StatusEvent::TransitionStarted {
            transition: Transition::Boost,
        });
        let mut report = TransitionReport::new(Transition::Boost);

        let purge = ScratchPurgePrimitive::new(&self.config.scratch_dirs);
        self.record(&mut report, purge.apply().await);

        let power = PowerPlanPrimitive::new(self.capabilities.power.as_ref());
        let outcome = power
            .boost(&self.config.power.boost_scheme, &mut cycle.snapshot)
            .await;
        self.record(&mut report, outcome);
        self.settle().await;

        let services =
            ServicePrimitive::new(self.capabilities.services.as_ref(), self.config.services.wait);
        for name in &self.config.services.managed {
            let outcome = services.suspend(name, Some(&mut cycle.snapshot)).await;
            self.record(&mut report, outcome);
        }
        self.settle().await;

        let registry = RegistryPrimitive::new(self.capabilities.registry.as_ref());
        for tweak in &self.config.registry.tweaks {
            let outcome = registry
                .boost(&tweak.key(), &tweak.boosted, &mut cycle.snapshot)
                .await;
            self.record(&mut report, outcome);
        }

        cycle.state = TransitionState::Boosted;
        self.finish(&report);
        Ok(report)
    }

    /// Undo the current cycle and return to `Baseline`
    ///
    /// Registry values are reverted first, then services that were running
    /// before the boost are started again, then the captured power scheme is
    /// reactivated (balanced if none was captured). From `Baseline` this does
    /// nothing, so a second restore never re-applies stale values.
    pub async fn restore(&self) -> TransitionReport {
        let mut guard = self.cycle.lock().await;
        let cycle = &mut *guard;
        let mut report = TransitionReport::new(Transition::Restore);

        if cycle.state == TransitionState::Baseline {
            self.status.emit(StatusEvent::NothingToRestore);
            return report;
        }

        cycle.state = TransitionState::Restoring;
        self.status.emit(StatusEvent::TransitionStarted {
            transition: Transition::Restore,
        });

        // Work from a copy so an interrupted restore can be retried
        let snapshot = cycle.snapshot.clone();

        let registry = RegistryPrimitive::new(self.capabilities.registry.as_ref());
        for (key, prior) in snapshot.registry().iter().rev() {
            let outcome = registry.revert(key, prior.as_ref()).await;
            self.record(&mut report, outcome);
        }

        let services =
            ServicePrimitive::new(self.capabilities.services.as_ref(), self.config.services.wait);
        for (name, _) in snapshot.services().iter().rev() {
            let outcome = services.resume(name).await;
            self.record(&mut report, outcome);
        }

        let power = PowerPlanPrimitive::new(self.capabilities.power.as_ref());
        let outcome = power
            .revert(snapshot.power_plan(), &self.config.power.balanced_scheme)
            .await;
        self.record(&mut report, outcome);

        cycle.snapshot.clear();
        cycle.state = TransitionState::Baseline;
        self.finish(&report);
        report
    }

    /// Apply a standing configuration without capturing anything
    ///
    /// The cycle state is left as it is; a mode applied while boosted is not
    /// undone by the next restore.
    pub async fn apply_mode(&self, mode: Mode) -> TransitionReport {
        let _guard = self.cycle.lock().await;
        let transition = Transition::Mode { mode };
        self.status
            .emit(StatusEvent::TransitionStarted { transition });
        let mut report = TransitionReport::new(transition);

        let power = PowerPlanPrimitive::new(self.capabilities.power.as_ref());
        let registry = RegistryPrimitive::new(self.capabilities.registry.as_ref());

        match mode {
            Mode::Competitive => {
                let outcome = power.apply(&self.config.power.boost_scheme).await;
                self.record(&mut report, outcome);
                self.settle().await;

                let services = ServicePrimitive::new(
                    self.capabilities.services.as_ref(),
                    self.config.services.wait,
                );
                for name in &self.config.services.managed {
                    let outcome = services.suspend(name, None).await;
                    self.record(&mut report, outcome);
                }

                for tweak in &self.config.registry.tweaks {
                    let outcome = registry.apply(&tweak.key(), &tweak.boosted).await;
                    self.record(&mut report, outcome);
                }
            }
            Mode::Graphics | Mode::Balanced => {
                let scheme = if mode == Mode::Graphics {
                    &self.config.power.high_performance_scheme
                } else {
                    &self.config.power.balanced_scheme
                };
                let outcome = power.apply(scheme).await;
                self.record(&mut report, outcome);

                for tweak in &self.config.registry.tweaks {
                    if let Some(baseline) = &tweak.baseline {
                        let outcome = registry.apply(&tweak.key(), baseline).await;
                        self.record(&mut report, outcome);
                    }
                }
            }
            Mode::Network => {
                let outcome = StepOutcome::from_result(
                    MutationKind::NetworkAutotuning {
                        level: NETWORK_AUTOTUNING_LEVEL.to_string(),
                    },
                    self.capabilities
                        .network
                        .set_autotuning(NETWORK_AUTOTUNING_LEVEL)
                        .await,
                    format!("TCP autotuning set to {NETWORK_AUTOTUNING_LEVEL}"),
                );
                self.record(&mut report, outcome);
            }
            Mode::Color => {
                let color = &self.config.registry.color;
                let outcome = registry.apply(&color.key(), &color.boosted).await;
                self.record(&mut report, outcome);
            }
        }

        self.finish(&report);
        report
    }

    /// Purge scratch files outside of a boost
    pub async fn clean(&self) -> TransitionReport {
        let _guard = self.cycle.lock().await;
        self.status.emit(StatusEvent::TransitionStarted {
            transition: Transition::Clean,
        });
        let mut report = TransitionReport::new(Transition::Clean);
        let purge = ScratchPurgePrimitive::new(&self.config.scratch_dirs);
        self.record(&mut report, purge.apply().await);
        self.finish(&report);
        report
    }

    pub async fn active_scheme(&self) -> Result<SchemeId, PrimitiveError> {
        self.capabilities.power.active().await
    }

    fn record(&self, report: &mut TransitionReport, outcome: StepOutcome) {
        let mutation = outcome.mutation.clone();
        let event = match &outcome.status {
            StepStatus::Applied(detail) => StatusEvent::StepApplied {
                mutation,
                detail: detail.clone(),
            },
            StepStatus::Skipped(reason) => StatusEvent::StepSkipped {
                mutation,
                reason: reason.clone(),
            },
            StepStatus::Failed(error) => StatusEvent::StepFailed {
                mutation,
                error: error.clone(),
            },
        };
        self.status.emit(event);
        report.push(outcome);
    }

    fn finish(&self, report: &TransitionReport) {
        tracing::info!(
            transition = %report.transition,
            applied = report.applied_count(),
            failed = report.failed_count(),
            "Transition finished"
        );
        self.status.emit(StatusEvent::TransitionCompleted {
            transition: report.transition,
            applied: report.applied_count(),
            failed: report.failed_count(),
        });
    }

    async fn settle(&self) {
        if !self.config.step_settle.is_zero() {
            tokio::time::sleep(self.config.step_settle).await;
        }
    }
}
