//! Integration tests for launching a workload inside a boost cycle
//!
//! Every successful boost must be matched by exactly one restore, whether
//! the workload exits, is killed, or never starts.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::common::fixtures::{
    desktop_platform, game_dvr_key, responsiveness_key, throttling_key, FakeGame, Rig,
    RUNNING_SERVICES,
};
use chaos::platform::{RegistryValue, SchemeId, ServiceStatus};
use chaos::workload::mock::MockLauncher;
use chaos::{BoostError, StatusEvent, Transition, TransitionState, WorkloadMonitor};

fn monitor(rig: &Rig, launcher: &MockLauncher) -> WorkloadMonitor {
    WorkloadMonitor::new(rig.orchestrator.clone(), Arc::new(launcher.clone()))
}

fn restore_count(events: &[StatusEvent]) -> usize {
    events
        .iter()
        .filter(|e| {
            matches!(
                e,
                StatusEvent::TransitionCompleted {
                    transition: Transition::Restore,
                    ..
                }
            )
        })
        .count()
}

#[tokio::test]
async fn test_launch_boosts_then_restores_on_exit() {
    let mut rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::new();
    let game = FakeGame::new();

    let mut handle = monitor(&rig, &launcher)
        .launch(game.path(), "Test Game")
        .await
        .unwrap();

    assert_eq!(handle.label(), "Test Game");
    assert!(handle.pid().is_some());
    assert_eq!(rig.orchestrator.state().await, TransitionState::Boosted);
    assert_eq!(
        rig.platform.service("SysMain").unwrap().status,
        ServiceStatus::Stopped
    );

    assert!(launcher.exit_last(Some(0)));
    let exit = handle.wait().await.unwrap();

    assert_eq!(exit.code, Some(0));
    assert!(!exit.killed);
    assert!(exit.restore.is_clean());
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    for name in RUNNING_SERVICES {
        assert_eq!(
            rig.platform.service(name).unwrap().status,
            ServiceStatus::Running
        );
    }
    assert_eq!(
        rig.platform.registry_value(&responsiveness_key()),
        Some(RegistryValue::Dword(20))
    );
    assert_eq!(
        rig.platform.registry_value(&throttling_key()),
        Some(RegistryValue::Dword(10))
    );
    assert_eq!(rig.platform.registry_value(&game_dvr_key()), None);
    assert!(rig.orchestrator.snapshot().await.is_empty());

    let events = rig.drain_events();
    assert_eq!(
        events.first(),
        Some(&StatusEvent::WorkloadLaunching {
            label: "Test Game".to_string()
        })
    );
    let started = events
        .iter()
        .position(|e| matches!(e, StatusEvent::WorkloadStarted { .. }))
        .unwrap();
    let exited = events
        .iter()
        .position(|e| matches!(e, StatusEvent::WorkloadExited { .. }))
        .unwrap();
    assert!(started < exited);
    assert_eq!(restore_count(&events), 1);
}

#[tokio::test]
async fn test_missing_executable_mutates_nothing() {
    let mut rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::new();
    let missing = Path::new("/definitely/not/a/game.exe");

    let err = monitor(&rig, &launcher)
        .launch(missing, "Ghost")
        .await
        .unwrap_err();

    assert!(matches!(err, BoostError::NotFound(ref p) if p == missing));
    assert!(rig.platform.calls().is_empty());
    assert!(launcher.spawned().is_empty());
    assert_eq!(
        rig.drain_events(),
        vec![StatusEvent::WorkloadNotFound {
            path: missing.to_path_buf()
        }]
    );
}

#[tokio::test]
async fn test_directory_is_not_a_workload() {
    let rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::new();
    let dir = tempfile::TempDir::new().unwrap();

    let err = monitor(&rig, &launcher)
        .launch(dir.path(), "Folder")
        .await
        .unwrap_err();

    assert!(matches!(err, BoostError::NotFound(_)));
    assert!(rig.platform.calls().is_empty());
}

#[tokio::test]
async fn test_spawn_failure_restores_immediately() {
    let mut rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::failing();
    let game = FakeGame::new();

    let err = monitor(&rig, &launcher)
        .launch(game.path(), "Broken Game")
        .await
        .unwrap_err();

    assert!(matches!(err, BoostError::Launch { .. }));
    assert_eq!(launcher.spawned(), vec![game.path.clone()]);
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    assert_eq!(
        rig.platform.service("WSearch").unwrap().status,
        ServiceStatus::Running
    );

    let events = rig.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, StatusEvent::WorkloadLaunchFailed { .. })));
    assert_eq!(restore_count(&events), 1);
}

#[tokio::test]
async fn test_kill_routes_through_the_single_restore() {
    let mut rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::new();
    let game = FakeGame::new();

    let mut handle = monitor(&rig, &launcher)
        .launch(game.path(), "Test Game")
        .await
        .unwrap();
    assert!(handle.kill());

    let exit = handle.wait().await.unwrap();

    assert!(exit.killed);
    assert_eq!(launcher.kill_count(), 1);
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
    assert_eq!(restore_count(&rig.drain_events()), 1);

    // Exiting after the kill has nothing left to trigger
    assert!(!launcher.exit_last(Some(0)));
}

#[tokio::test]
async fn test_dropped_handle_still_restores() {
    let rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::new();
    let game = FakeGame::new();

    let handle = monitor(&rig, &launcher)
        .launch(game.path(), "Test Game")
        .await
        .unwrap();
    drop(handle);

    assert!(launcher.exit_last(Some(0)));

    let restored = tokio::time::timeout(Duration::from_secs(2), async {
        while rig.orchestrator.state().await != TransitionState::Baseline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(restored.is_ok());
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
}

#[tokio::test]
async fn test_immediate_exit_reports_code() {
    let rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::exiting_immediately(Some(3));
    let game = FakeGame::new();

    let mut handle = monitor(&rig, &launcher)
        .launch(game.path(), "Crashy Game")
        .await
        .unwrap();
    let exit = handle.wait().await.unwrap();

    assert_eq!(exit.code, Some(3));
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
}

#[tokio::test]
async fn test_launch_while_boosted_is_rejected_before_spawning() {
    let rig = Rig::new(desktop_platform());
    let launcher = MockLauncher::new();
    let game = FakeGame::new();
    let monitor = monitor(&rig, &launcher);

    let mut first = monitor.launch(game.path(), "First").await.unwrap();
    let err = monitor.launch(game.path(), "Second").await.unwrap_err();

    assert!(matches!(
        err,
        BoostError::AlreadyBoosted(TransitionState::Boosted)
    ));
    assert_eq!(launcher.spawned().len(), 1);

    launcher.exit_last(None);
    first.wait().await.unwrap();
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
}
