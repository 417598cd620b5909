//! Mock launcher for deterministic testing
//!
//! Spawned workloads never touch the OS. They run until the test ends them
//! with [`MockLauncher::exit_last`], or exit straight away when the launcher
//! is built with [`MockLauncher::exiting_immediately`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::{Launcher, Workload};

#[derive(Debug, Default)]
struct LauncherState {
    fail_spawn: bool,
    exit_immediately: Option<Option<i32>>,
    spawned: Vec<PathBuf>,
    running: Vec<oneshot::Sender<Option<i32>>>,
    kills: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    state: Arc<Mutex<LauncherState>>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every spawn fails as if the executable could not be started
    pub fn failing() -> Self {
        let launcher = Self::new();
        launcher.state.lock().fail_spawn = true;
        launcher
    }

    /// Spawned workloads exit with `code` as soon as they are waited on
    pub fn exiting_immediately(code: Option<i32>) -> Self {
        let launcher = Self::new();
        launcher.state.lock().exit_immediately = Some(code);
        launcher
    }

    /// Paths passed to `spawn`, including failed attempts
    pub fn spawned(&self) -> Vec<PathBuf> {
        self.state.lock().spawned.clone()
    }

    /// End the most recently spawned workload that is still running
    pub fn exit_last(&self, code: Option<i32>) -> bool {
        let tx = self.state.lock().running.pop();
        tx.map(|tx| tx.send(code).is_ok()).unwrap_or(false)
    }

    pub fn kill_count(&self) -> usize {
        self.state.lock().kills
    }
}

impl Launcher for MockLauncher {
    fn spawn(&self, path: &Path) -> io::Result<Box<dyn Workload>> {
        let mut state = self.state.lock();
        state.spawned.push(path.to_path_buf());
        if state.fail_spawn {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "mock spawn failure",
            ));
        }

        let (tx, rx) = oneshot::channel();
        match state.exit_immediately {
            Some(code) => {
                let _ = tx.send(code);
            }
            None => state.running.push(tx),
        }

        let pid = 1000 + state.spawned.len() as u32;
        Ok(Box::new(MockWorkload {
            pid,
            exit_rx: Some(rx),
            launcher: self.state.clone(),
        }))
    }
}

struct MockWorkload {
    pid: u32,
    exit_rx: Option<oneshot::Receiver<Option<i32>>>,
    launcher: Arc<Mutex<LauncherState>>,
}

#[async_trait]
impl Workload for MockWorkload {
    fn id(&self) -> Option<u32> {
        self.exit_rx.as_ref().map(|_| self.pid)
    }

    async fn wait(&mut self) -> io::Result<Option<i32>> {
        let Some(rx) = self.exit_rx.as_mut() else {
            return Ok(None);
        };
        let code = rx.await.unwrap_or(None);
        self.exit_rx = None;
        Ok(code)
    }

    async fn kill(&mut self) -> io::Result<()> {
        self.launcher.lock().kills += 1;
        self.exit_rx = None;
        Ok(())
    }
}
