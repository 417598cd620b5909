pub mod config;
pub mod orchestrator;
pub mod platform;
pub mod primitive;
pub mod status;
pub mod telemetry;
pub mod util;
pub mod workload;

pub use config::Config;
pub use orchestrator::{
    BoostError, Mode, Orchestrator, StateSnapshot, Transition, TransitionReport, TransitionState,
};
pub use platform::{Capabilities, SystemPlatform};
pub use status::{StatusEvent, StatusSender, StatusUpdate};
pub use workload::{ProcessLauncher, WorkloadExit, WorkloadHandle, WorkloadMonitor};
