use serde::Serialize;

use crate::platform::{RegistryKey, RegistryValue, SchemeId, StartMode};

/// Pre-mutation values captured during one boost cycle
///
/// Every key is written at most once per cycle (first write wins), so a
/// repeated capture can never overwrite the true original with an
/// already-boosted value. Entries keep capture order; restore walks them
/// backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    services: Vec<(String, StartMode)>,
    registry: Vec<(RegistryKey, Option<RegistryValue>)>,
    power_plan: Option<SchemeId>,
}

impl StateSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a service observed running. Returns false if already recorded.
    pub fn record_service(&mut self, name: &str, start_mode: StartMode) -> bool {
        if self.service_start_mode(name).is_some() {
            return false;
        }
        self.services.push((name.to_string(), start_mode));
        true
    }

    /// Record the prior value of a registry entry (`None` = absent).
    /// Returns false if already recorded.
    pub fn record_registry(&mut self, key: RegistryKey, prior: Option<RegistryValue>) -> bool {
        if self.has_registry(&key) {
            return false;
        }
        self.registry.push((key, prior));
        true
    }

    /// Record the scheme active before boosting. Returns false if already recorded.
    pub fn record_power_plan(&mut self, scheme: SchemeId) -> bool {
        if self.power_plan.is_some() {
            return false;
        }
        self.power_plan = Some(scheme);
        true
    }

    pub fn service_start_mode(&self, name: &str) -> Option<StartMode> {
        self.services
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, mode)| *mode)
    }

    pub fn has_registry(&self, key: &RegistryKey) -> bool {
        self.registry.iter().any(|(k, _)| k == key)
    }

    /// Prior value of a recorded registry entry; the inner `None` means it was absent
    pub fn registry_prior(&self, key: &RegistryKey) -> Option<Option<&RegistryValue>> {
        self.registry
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }

    /// Recorded services in capture order
    pub fn services(&self) -> &[(String, StartMode)] {
        &self.services
    }

    /// Recorded registry entries in capture order
    pub fn registry(&self) -> &[(RegistryKey, Option<RegistryValue>)] {
        &self.registry
    }

    pub fn power_plan(&self) -> Option<&SchemeId> {
        self.power_plan.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.registry.is_empty() && self.power_plan.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
