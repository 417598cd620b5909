//! Capability interfaces for the system facets the launcher mutates
//!
//! The orchestrator never touches the OS directly. Every power, service,
//! registry and network change goes through one of the traits below, so the
//! same sequencing logic runs against [`SystemPlatform`] in production and
//! [`mock::MockPlatform`] in tests.

mod command;
mod error;
pub mod mock;
mod system;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub(crate) use command::run_hidden;
pub use error::PrimitiveError;
pub use system::{parse_active_scheme, parse_reg_query, parse_sc_start_type, parse_sc_state};
pub use system::SystemPlatform;
pub use types::{
    Hive, RegistryKey, RegistryValue, SchemeId, ServiceState, ServiceStatus, StartMode,
};

/// Power scheme control
#[async_trait]
pub trait PowerSchemes: Send + Sync {
    /// Currently active scheme
    async fn active(&self) -> Result<SchemeId, PrimitiveError>;

    /// Activate the given scheme
    async fn set_active(&self, scheme: &SchemeId) -> Result<(), PrimitiveError>;
}

/// Background service control
///
/// `stop` and `start` only issue the request; callers poll `query` to wait
/// for the status to converge.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn query(&self, name: &str) -> Result<ServiceState, PrimitiveError>;

    async fn stop(&self, name: &str) -> Result<(), PrimitiveError>;

    async fn start(&self, name: &str) -> Result<(), PrimitiveError>;
}

/// Scoped key/value store (the Windows registry)
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read a value. `Ok(None)` means the value does not exist.
    async fn read(&self, key: &RegistryKey) -> Result<Option<RegistryValue>, PrimitiveError>;

    async fn write(&self, key: &RegistryKey, value: &RegistryValue) -> Result<(), PrimitiveError>;

    async fn delete(&self, key: &RegistryKey) -> Result<(), PrimitiveError>;
}

/// TCP stack tuning
#[async_trait]
pub trait NetworkTuning: Send + Sync {
    async fn set_autotuning(&self, level: &str) -> Result<(), PrimitiveError>;
}

/// Bundle of capability handles the orchestrator is built from
#[derive(Clone)]
pub struct Capabilities {
    pub power: Arc<dyn PowerSchemes>,
    pub services: Arc<dyn ServiceManager>,
    pub registry: Arc<dyn RegistryStore>,
    pub network: Arc<dyn NetworkTuning>,
}

impl Capabilities {
    /// Build a bundle where one value provides every capability
    pub fn from_platform<P>(platform: P) -> Self
    where
        P: PowerSchemes + ServiceManager + RegistryStore + NetworkTuning + 'static,
    {
        let platform = Arc::new(platform);
        Self {
            power: platform.clone(),
            services: platform.clone(),
            registry: platform.clone(),
            network: platform,
        }
    }
}
