//! In-memory platform for deterministic testing
//!
//! Implements every capability trait against a shared fake system state and
//! records each call in order, so tests can assert both the final state and
//! the exact sequence of mutations the orchestrator issued.
//!
//! # Example
//! ```no_run
//! use chaos::platform::mock::MockPlatform;
//! use chaos::platform::{SchemeId, ServiceStatus, StartMode};
//!
//! let platform = MockPlatform::new()
//!     .with_active_scheme(SchemeId::balanced())
//!     .with_service("SysMain", ServiceStatus::Running, StartMode::Automatic);
//! let capabilities = platform.capabilities();
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::PrimitiveError;
use super::types::{RegistryKey, RegistryValue, SchemeId, ServiceState, ServiceStatus, StartMode};
use super::{Capabilities, NetworkTuning, PowerSchemes, RegistryStore, ServiceManager};

/// A capability call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    GetActiveScheme,
    SetActiveScheme(SchemeId),
    QueryService(String),
    StopService(String),
    StartService(String),
    ReadRegistry(RegistryKey),
    WriteRegistry(RegistryKey, RegistryValue),
    DeleteRegistry(RegistryKey),
    SetAutotuning(String),
}

impl MockCall {
    /// Whether the call changes system state (as opposed to reading it)
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            MockCall::GetActiveScheme | MockCall::QueryService(_) | MockCall::ReadRegistry(_)
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    active_scheme: Option<SchemeId>,
    services: BTreeMap<String, ServiceState>,
    registry: BTreeMap<RegistryKey, RegistryValue>,
    autotuning: Option<String>,
    calls: Vec<MockCall>,
    fail_power_reads: bool,
    fail_power_writes: bool,
    fail_registry_reads: bool,
    fail_registry_writes: bool,
    stubborn_services: BTreeSet<String>,
    failing_stops: BTreeSet<String>,
}

/// Fake system shared between all capability handles it hands out
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_active_scheme(self, scheme: SchemeId) -> Self {
        self.state.lock().active_scheme = Some(scheme);
        self
    }

    pub fn with_service(self, name: &str, status: ServiceStatus, start_mode: StartMode) -> Self {
        self.state
            .lock()
            .services
            .insert(name.to_string(), ServiceState::new(status, start_mode));
        self
    }

    pub fn with_registry_value(self, key: RegistryKey, value: RegistryValue) -> Self {
        self.state.lock().registry.insert(key, value);
        self
    }

    /// `active()` fails
    pub fn failing_power_reads(self) -> Self {
        self.state.lock().fail_power_reads = true;
        self
    }

    /// `set_active()` fails
    pub fn failing_power_writes(self) -> Self {
        self.state.lock().fail_power_writes = true;
        self
    }

    /// Registry reads fail
    pub fn failing_registry_reads(self) -> Self {
        self.state.lock().fail_registry_reads = true;
        self
    }

    /// Registry writes and deletes fail
    pub fn failing_registry_writes(self) -> Self {
        self.state.lock().fail_registry_writes = true;
        self
    }

    /// Stop/start requests for `name` are accepted but never complete
    pub fn with_stubborn_service(self, name: &str) -> Self {
        self.state.lock().stubborn_services.insert(name.to_string());
        self
    }

    /// Stop requests for `name` are refused
    pub fn with_failing_stop(self, name: &str) -> Self {
        self.state.lock().failing_stops.insert(name.to_string());
        self
    }

    /// Capability bundle backed by this mock
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_platform(self.clone())
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Only the state-changing calls, in order
    pub fn mutations(&self) -> Vec<MockCall> {
        self.calls().into_iter().filter(MockCall::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn active_scheme(&self) -> Option<SchemeId> {
        self.state.lock().active_scheme.clone()
    }

    pub fn service(&self, name: &str) -> Option<ServiceState> {
        self.state.lock().services.get(name).copied()
    }

    pub fn registry_value(&self, key: &RegistryKey) -> Option<RegistryValue> {
        self.state.lock().registry.get(key).cloned()
    }

    pub fn autotuning(&self) -> Option<String> {
        self.state.lock().autotuning.clone()
    }

    fn set_service_status(
        &self,
        name: &str,
        call: MockCall,
        target: ServiceStatus,
    ) -> Result<(), PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        let stubborn = state.stubborn_services.contains(name);
        let service = state.services.get_mut(name).ok_or_else(|| {
            PrimitiveError::failure("sc", format!("service {name} does not exist"))
        })?;
        service.status = match (target, stubborn) {
            (ServiceStatus::Stopped, true) => ServiceStatus::StopPending,
            (ServiceStatus::Running, true) => ServiceStatus::StartPending,
            (target, false) => target,
            (other, true) => other,
        };
        Ok(())
    }
}

#[async_trait]
impl PowerSchemes for MockPlatform {
    async fn active(&self) -> Result<SchemeId, PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GetActiveScheme);
        if state.fail_power_reads {
            return Err(PrimitiveError::failure("powercfg", "mock read failure"));
        }
        state
            .active_scheme
            .clone()
            .ok_or_else(|| PrimitiveError::failure("powercfg", "no active scheme"))
    }

    async fn set_active(&self, scheme: &SchemeId) -> Result<(), PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::SetActiveScheme(scheme.clone()));
        if state.fail_power_writes {
            return Err(PrimitiveError::failure("powercfg", "mock write failure"));
        }
        state.active_scheme = Some(scheme.clone());
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for MockPlatform {
    async fn query(&self, name: &str) -> Result<ServiceState, PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::QueryService(name.to_string()));
        state
            .services
            .get(name)
            .copied()
            .ok_or_else(|| PrimitiveError::failure("sc", format!("service {name} does not exist")))
    }

    async fn stop(&self, name: &str) -> Result<(), PrimitiveError> {
        {
            let mut state = self.state.lock();
            if state.failing_stops.contains(name) {
                state.calls.push(MockCall::StopService(name.to_string()));
                return Err(PrimitiveError::failure("sc", "mock stop failure"));
            }
        }
        self.set_service_status(
            name,
            MockCall::StopService(name.to_string()),
            ServiceStatus::Stopped,
        )
    }

    async fn start(&self, name: &str) -> Result<(), PrimitiveError> {
        self.set_service_status(
            name,
            MockCall::StartService(name.to_string()),
            ServiceStatus::Running,
        )
    }
}

#[async_trait]
impl RegistryStore for MockPlatform {
    async fn read(&self, key: &RegistryKey) -> Result<Option<RegistryValue>, PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::ReadRegistry(key.clone()));
        if state.fail_registry_reads {
            return Err(PrimitiveError::failure("reg", "mock read failure"));
        }
        Ok(state.registry.get(key).cloned())
    }

    async fn write(&self, key: &RegistryKey, value: &RegistryValue) -> Result<(), PrimitiveError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(MockCall::WriteRegistry(key.clone(), value.clone()));
        if state.fail_registry_writes {
            return Err(PrimitiveError::failure("reg", "mock write failure"));
        }
        state.registry.insert(key.clone(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &RegistryKey) -> Result<(), PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::DeleteRegistry(key.clone()));
        if state.fail_registry_writes {
            return Err(PrimitiveError::failure("reg", "mock write failure"));
        }
        state.registry.remove(key);
        Ok(())
    }
}

#[async_trait]
impl NetworkTuning for MockPlatform {
    async fn set_autotuning(&self, level: &str) -> Result<(), PrimitiveError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::SetAutotuning(level.to_string()));
        state.autotuning = Some(level.to_string());
        Ok(())
    }
}
