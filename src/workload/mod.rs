//! Launching the workload and tying its lifetime to the boost cycle

mod launcher;
pub mod mock;
mod monitor;

use std::io;
use std::path::Path;

use async_trait::async_trait;

pub use launcher::ProcessLauncher;
pub use monitor::{WorkloadExit, WorkloadHandle, WorkloadMonitor};

/// A running external process
#[async_trait]
pub trait Workload: Send {
    /// OS process id, if the process has not been reaped yet
    fn id(&self) -> Option<u32>;

    /// Wait for the process to exit. `Ok(None)` means it exited without a
    /// code (terminated by a signal).
    async fn wait(&mut self) -> io::Result<Option<i32>>;

    /// Forcefully terminate the process
    async fn kill(&mut self) -> io::Result<()>;
}

/// Starts workloads
pub trait Launcher: Send + Sync {
    fn spawn(&self, path: &Path) -> io::Result<Box<dyn Workload>>;
}
