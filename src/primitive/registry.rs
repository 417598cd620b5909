use crate::orchestrator::StateSnapshot;
use crate::platform::{PrimitiveError, RegistryKey, RegistryStore, RegistryValue};

use super::{MutationKind, StepOutcome};

/// Registry value tuning
pub struct RegistryPrimitive<'a> {
    store: &'a dyn RegistryStore,
}

impl<'a> RegistryPrimitive<'a> {
    pub fn new(store: &'a dyn RegistryStore) -> Self {
        Self { store }
    }

    /// Record the current value of `key` unless it is already captured
    pub async fn capture(
        &self,
        key: &RegistryKey,
        snapshot: &mut StateSnapshot,
    ) -> Result<(), PrimitiveError> {
        if snapshot.has_registry(key) {
            return Ok(());
        }
        let prior = self.store.read(key).await?;
        snapshot.record_registry(key.clone(), prior);
        Ok(())
    }

    /// Capture the prior value, then write `value`
    ///
    /// If the prior value cannot be read the write is not attempted, since
    /// it could never be reverted.
    pub async fn boost(
        &self,
        key: &RegistryKey,
        value: &RegistryValue,
        snapshot: &mut StateSnapshot,
    ) -> StepOutcome {
        if let Err(e) = self.capture(key, snapshot).await {
            return StepOutcome::failed(mutation(key, Some(value)), e);
        }
        self.apply(key, value).await
    }

    pub async fn apply(&self, key: &RegistryKey, value: &RegistryValue) -> StepOutcome {
        StepOutcome::from_result(
            mutation(key, Some(value)),
            self.store.write(key, value).await,
            format!("Registry {} set to {value}", key.name),
        )
    }

    /// Put back the prior value, deleting the value if it did not exist
    pub async fn revert(&self, key: &RegistryKey, prior: Option<&RegistryValue>) -> StepOutcome {
        match prior {
            Some(value) => StepOutcome::from_result(
                mutation(key, Some(value)),
                self.store.write(key, value).await,
                format!("Registry {} restored to {value}", key.name),
            ),
            None => StepOutcome::from_result(
                mutation(key, None),
                self.store.delete(key).await,
                format!("Registry {} removed", key.name),
            ),
        }
    }
}

fn mutation(key: &RegistryKey, value: Option<&RegistryValue>) -> MutationKind {
    MutationKind::RegistryValue {
        key: key.clone(),
        value: value.cloned(),
    }
}
