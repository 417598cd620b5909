use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{MutationKind, StepOutcome};

/// Counts from one purge run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub removed: usize,
    pub skipped: usize,
}

/// Best-effort deletion of scratch files
///
/// Only files directly inside each directory are removed. Missing
/// directories and files held open by other processes are skipped.
pub struct ScratchPurgePrimitive<'a> {
    dirs: &'a [PathBuf],
}

impl<'a> ScratchPurgePrimitive<'a> {
    pub fn new(dirs: &'a [PathBuf]) -> Self {
        Self { dirs }
    }

    pub async fn apply(&self) -> StepOutcome {
        let mutation = MutationKind::ScratchPurge {
            paths: self.dirs.to_vec(),
        };
        if self.dirs.is_empty() {
            return StepOutcome::skipped(mutation, "no scratch directories configured");
        }

        let mut report = PurgeReport::default();
        for dir in self.dirs {
            purge_dir(dir, &mut report).await;
        }

        tracing::info!(
            removed = report.removed,
            skipped = report.skipped,
            "Scratch purge finished"
        );
        StepOutcome::applied(
            mutation,
            format!(
                "Cleaned {} temporary files ({} in use)",
                report.removed, report.skipped
            ),
        )
    }
}

async fn purge_dir(dir: &Path, report: &mut PurgeReport) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "Skipping scratch directory");
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Stopped reading scratch directory");
                break;
            }
        };

        match entry.file_type().await {
            Ok(kind) if kind.is_file() => {}
            _ => continue,
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => report.removed += 1,
            Err(e) => {
                tracing::trace!(path = %entry.path().display(), error = %e, "File in use, skipping");
                report.skipped += 1;
            }
        }
    }
}
