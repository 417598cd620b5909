use std::time::Duration;

use tokio::time::Instant;

use crate::orchestrator::StateSnapshot;
use crate::platform::{PrimitiveError, ServiceManager, ServiceStatus};

use super::{MutationKind, StepOutcome};

/// Bounded wait for a service to converge on a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Background service suspension and resumption
pub struct ServicePrimitive<'a> {
    services: &'a dyn ServiceManager,
    wait: WaitPolicy,
}

impl<'a> ServicePrimitive<'a> {
    pub fn new(services: &'a dyn ServiceManager, wait: WaitPolicy) -> Self {
        Self { services, wait }
    }

    /// Stop `name` if it is running
    ///
    /// With a snapshot, the start mode is recorded before the stop is issued.
    /// Services that are not running are left alone and never recorded.
    pub async fn suspend(&self, name: &str, snapshot: Option<&mut StateSnapshot>) -> StepOutcome {
        let mutation = MutationKind::Service {
            name: name.to_string(),
        };

        let state = match self.services.query(name).await {
            Ok(state) => state,
            Err(e) => return StepOutcome::failed(mutation, e),
        };
        if !state.is_running() {
            return StepOutcome::skipped(mutation, format!("service is {}", state.status));
        }

        if let Some(snapshot) = snapshot {
            snapshot.record_service(name, state.start_mode);
        }

        if let Err(e) = self.services.stop(name).await {
            return StepOutcome::failed(mutation, e);
        }
        match self.wait_for(name, ServiceStatus::Stopped).await {
            Ok(()) => StepOutcome::applied(mutation, format!("Stopped service: {name}")),
            Err(e) => StepOutcome::failed(mutation, e),
        }
    }

    /// Start `name` again; a service already running is skipped
    pub async fn resume(&self, name: &str) -> StepOutcome {
        let mutation = MutationKind::Service {
            name: name.to_string(),
        };

        match self.services.query(name).await {
            Ok(state) if state.is_running() => {
                return StepOutcome::skipped(mutation, "service is already running");
            }
            Ok(_) => {}
            Err(e) => return StepOutcome::failed(mutation, e),
        }

        if let Err(e) = self.services.start(name).await {
            return StepOutcome::failed(mutation, e);
        }
        match self.wait_for(name, ServiceStatus::Running).await {
            Ok(()) => StepOutcome::applied(mutation, format!("Started service: {name}")),
            Err(e) => StepOutcome::failed(mutation, e),
        }
    }

    async fn wait_for(&self, name: &str, target: ServiceStatus) -> Result<(), PrimitiveError> {
        let started = Instant::now();
        let deadline = started + self.wait.timeout;
        loop {
            if self.services.query(name).await?.status == target {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(PrimitiveError::TimeoutWaitingForState {
                    service: name.to_string(),
                    target,
                    waited_ms: now.duration_since(started).as_millis() as u64,
                });
            }
            tokio::time::sleep(self.wait.poll_interval.min(deadline - now)).await;
        }
    }
}
