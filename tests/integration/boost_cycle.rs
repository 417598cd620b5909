//! Integration tests for the boost/restore cycle
//!
//! Covers ordering, capture-before-mutate, best-effort step handling and
//! restore idempotence against the in-memory platform.

use std::time::Duration;

use super::common::fixtures::{
    desktop_platform, game_dvr_key, responsiveness_key, test_config, throttling_key, Rig,
    DISABLED_SERVICE, RUNNING_SERVICES,
};
use chaos::platform::mock::MockCall;
use chaos::platform::{RegistryValue, SchemeId, ServiceStatus};
use chaos::primitive::WaitPolicy;
use chaos::util::Interrupt;
use chaos::{BoostError, StatusEvent, Transition, TransitionState};
use tempfile::TempDir;

#[tokio::test]
async fn test_full_cycle_returns_system_to_baseline() {
    let rig = Rig::new(desktop_platform());

    let report = rig.orchestrator.boost().await.unwrap();
    assert!(report.is_clean(), "boost failures: {:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(rig.orchestrator.state().await, TransitionState::Boosted);
    assert_eq!(
        rig.platform.active_scheme(),
        Some(SchemeId::high_performance())
    );
    for name in RUNNING_SERVICES {
        assert_eq!(
            rig.platform.service(name).unwrap().status,
            ServiceStatus::Stopped
        );
    }
    assert_eq!(
        rig.platform.registry_value(&throttling_key()),
        Some(RegistryValue::Dword(u32::MAX))
    );

    let report = rig.orchestrator.restore().await;
    assert!(report.is_clean());
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
}

#[tokio::test]
async fn test_second_restore_is_a_noop() {
    let mut rig = Rig::new(desktop_platform());
    rig.orchestrator.boost().await.unwrap();
    rig.orchestrator.restore().await;
    rig.platform.clear_calls();
    rig.drain_events();

    let report = rig.orchestrator.restore().await;

    assert!(report.steps.is_empty());
    assert!(rig.platform.mutations().is_empty());
    assert_eq!(rig.drain_events(), vec![StatusEvent::NothingToRestore]);
}

#[tokio::test]
async fn test_every_mutation_is_preceded_by_its_capture() {
    let rig = Rig::new(desktop_platform());
    rig.orchestrator.boost().await.unwrap();

    let calls = rig.platform.calls();
    for (i, call) in calls.iter().enumerate() {
        let earlier = &calls[..i];
        match call {
            MockCall::SetActiveScheme(_) => {
                assert!(earlier.contains(&MockCall::GetActiveScheme));
            }
            MockCall::StopService(name) => {
                assert!(earlier.contains(&MockCall::QueryService(name.clone())));
            }
            MockCall::WriteRegistry(key, _) => {
                assert!(earlier.contains(&MockCall::ReadRegistry(key.clone())));
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_boost_runs_steps_in_fixed_order() {
    let rig = Rig::new(desktop_platform());
    rig.orchestrator.boost().await.unwrap();

    let mutations = rig.platform.mutations();
    let power = mutations
        .iter()
        .position(|c| matches!(c, MockCall::SetActiveScheme(_)))
        .unwrap();
    let first_stop = mutations
        .iter()
        .position(|c| matches!(c, MockCall::StopService(_)))
        .unwrap();
    let last_stop = mutations
        .iter()
        .rposition(|c| matches!(c, MockCall::StopService(_)))
        .unwrap();
    let first_write = mutations
        .iter()
        .position(|c| matches!(c, MockCall::WriteRegistry(..)))
        .unwrap();

    assert!(power < first_stop);
    assert!(last_stop < first_write);
}

#[tokio::test]
async fn test_restore_only_starts_services_that_were_running() {
    let rig = Rig::new(desktop_platform());
    rig.orchestrator.boost().await.unwrap();

    let snapshot = rig.orchestrator.snapshot().await;
    let recorded: Vec<&str> = snapshot.services().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(recorded, RUNNING_SERVICES.to_vec());

    rig.orchestrator.restore().await;

    assert!(!rig
        .platform
        .calls()
        .contains(&MockCall::StartService(DISABLED_SERVICE.to_string())));
    assert_eq!(
        rig.platform.service(DISABLED_SERVICE).unwrap().status,
        ServiceStatus::Stopped
    );
    assert_eq!(
        rig.platform.service("SysMain").unwrap().status,
        ServiceStatus::Running
    );
}

#[tokio::test]
async fn test_failed_registry_writes_do_not_stop_other_steps() {
    let mut rig = Rig::new(desktop_platform().failing_registry_writes());

    let report = rig.orchestrator.boost().await.unwrap();

    assert_eq!(report.failed_count(), 3);
    assert_eq!(rig.orchestrator.state().await, TransitionState::Boosted);
    assert_eq!(
        rig.platform.active_scheme(),
        Some(SchemeId::high_performance())
    );
    assert_eq!(
        rig.platform.service("WSearch").unwrap().status,
        ServiceStatus::Stopped
    );

    let failures = rig
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, StatusEvent::StepFailed { .. }))
        .count();
    assert_eq!(failures, 3);

    let report = rig.orchestrator.restore().await;
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    assert_eq!(
        rig.platform.service("WSearch").unwrap().status,
        ServiceStatus::Running
    );
    assert!(report.failed_count() > 0);
}

#[tokio::test]
async fn test_unreadable_registry_value_is_not_written() {
    let rig = Rig::new(desktop_platform().failing_registry_reads());

    let report = rig.orchestrator.boost().await.unwrap();

    assert_eq!(report.failed_count(), 3);
    assert!(!rig
        .platform
        .calls()
        .iter()
        .any(|c| matches!(c, MockCall::WriteRegistry(..))));
    assert_eq!(
        rig.platform.registry_value(&responsiveness_key()),
        Some(RegistryValue::Dword(20))
    );
}

#[tokio::test]
async fn test_second_boost_is_rejected() {
    let mut rig = Rig::new(desktop_platform());
    rig.orchestrator.boost().await.unwrap();
    rig.platform.clear_calls();
    rig.drain_events();

    let err = rig.orchestrator.boost().await.unwrap_err();

    assert!(matches!(
        err,
        BoostError::AlreadyBoosted(TransitionState::Boosted)
    ));
    assert!(rig.platform.calls().is_empty());
    assert_eq!(
        rig.drain_events(),
        vec![StatusEvent::TransitionRejected {
            transition: Transition::Boost,
            state: TransitionState::Boosted,
        }]
    );
}

#[tokio::test]
async fn test_service_that_never_stops_times_out_and_is_skipped() {
    let rig = Rig::new(desktop_platform().with_stubborn_service("SysMain"));

    let report = rig.orchestrator.boost().await.unwrap();

    let timed_out: Vec<_> = report
        .failures()
        .filter(|s| s.error().is_some_and(|e| e.is_timeout()))
        .collect();
    assert_eq!(timed_out.len(), 1);
    assert_eq!(
        rig.platform.service("DiagTrack").unwrap().status,
        ServiceStatus::Stopped
    );
    assert_eq!(
        rig.platform.registry_value(&responsiveness_key()),
        Some(RegistryValue::Dword(0))
    );
}

#[tokio::test]
async fn test_failed_stop_is_reported_once() {
    let rig = Rig::new(desktop_platform().with_failing_stop("WSearch"));

    let report = rig.orchestrator.boost().await.unwrap();

    assert_eq!(report.failed_count(), 1);
    let stops = rig
        .platform
        .calls()
        .into_iter()
        .filter(|c| *c == MockCall::StopService("WSearch".to_string()))
        .count();
    assert_eq!(stops, 1);
}

#[tokio::test]
async fn test_restore_completes_an_interrupted_boost() {
    let config = test_config().with_service_wait(WaitPolicy {
        timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(5),
    });
    let rig = Rig::with_config(desktop_platform().with_stubborn_service("SysMain"), config);

    // Abandon the boost while it waits on SysMain
    let abandoned = tokio::time::timeout(Duration::from_millis(50), rig.orchestrator.boost()).await;
    assert!(abandoned.is_err());
    assert_eq!(rig.orchestrator.state().await, TransitionState::Boosting);

    rig.orchestrator.restore().await;

    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    assert_eq!(
        rig.platform.service("DiagTrack").unwrap().status,
        ServiceStatus::Running
    );
    assert!(rig.orchestrator.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_boost_purges_scratch_directories_first() {
    let scratch = TempDir::new().unwrap();
    std::fs::write(scratch.path().join("a.tmp"), b"a").unwrap();
    std::fs::write(scratch.path().join("b.tmp"), b"b").unwrap();
    std::fs::create_dir(scratch.path().join("nested")).unwrap();

    let config = test_config().with_scratch_dirs(vec![scratch.path().to_path_buf()]);
    let mut rig = Rig::with_config(desktop_platform(), config);

    rig.orchestrator.boost().await.unwrap();

    assert!(!scratch.path().join("a.tmp").exists());
    assert!(!scratch.path().join("b.tmp").exists());
    assert!(scratch.path().join("nested").exists());

    let events = rig.drain_events();
    assert!(matches!(
        events.get(1),
        Some(StatusEvent::StepApplied { detail, .. }) if detail == "Cleaned 2 temporary files (0 in use)"
    ));
}

#[tokio::test]
async fn test_interrupt_during_boost_restores_after_it_completes() {
    let rig = Rig::with_config(
        desktop_platform(),
        test_config().with_step_settle(Duration::from_millis(30)),
    );
    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let mut interrupt = Interrupt::from_signal(async {
        let _ = signal_rx.await;
    });

    let boosting = {
        let orchestrator = rig.orchestrator.clone();
        tokio::spawn(async move { orchestrator.boost().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    signal_tx.send(()).unwrap();

    // The boost is never cut short by the interrupt
    let report = boosting.await.unwrap().unwrap();
    assert!(report.is_clean());
    assert_eq!(rig.orchestrator.state().await, TransitionState::Boosted);
    assert!(interrupt.is_requested());

    tokio::time::timeout(Duration::from_secs(1), interrupt.requested())
        .await
        .unwrap();
    let report = rig.orchestrator.restore().await;

    assert!(report.is_clean());
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    assert!(rig.orchestrator.snapshot().await.is_empty());
}
