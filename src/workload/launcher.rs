use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use super::{Launcher, Workload};

/// Launches workloads as child processes
///
/// The working directory is the executable's own directory, which most games
/// expect for locating their data files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for ProcessLauncher {
    fn spawn(&self, path: &Path) -> io::Result<Box<dyn Workload>> {
        let mut cmd = Command::new(path);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn()?;
        tracing::info!(path = %path.display(), pid = ?child.id(), "Workload process spawned");
        Ok(Box::new(ProcessWorkload { child }))
    }
}

struct ProcessWorkload {
    child: Child,
}

#[async_trait]
impl Workload for ProcessWorkload {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.child.kill().await
    }
}
