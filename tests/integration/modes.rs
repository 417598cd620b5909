//! Integration tests for standing modes
//!
//! Modes apply directly and never create a restore obligation.

use super::common::fixtures::{
    color_key, desktop_platform, game_dvr_key, responsiveness_key, throttling_key, Rig,
    RUNNING_SERVICES,
};
use chaos::platform::mock::MockCall;
use chaos::platform::{RegistryValue, SchemeId, ServiceStatus};
use chaos::{BoostError, Mode, StatusEvent, TransitionState};

#[tokio::test]
async fn test_balanced_without_boost_leaves_services_alone() {
    let rig = Rig::new(desktop_platform());

    let report = rig.orchestrator.apply_mode(Mode::Balanced).await;

    assert!(report.is_clean());
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    assert!(!rig.platform.calls().iter().any(|c| matches!(
        c,
        MockCall::QueryService(_) | MockCall::StopService(_) | MockCall::StartService(_)
    )));
    assert_eq!(
        rig.platform.registry_value(&responsiveness_key()),
        Some(RegistryValue::Dword(10))
    );
    assert_eq!(rig.platform.registry_value(&game_dvr_key()), None);
    assert_eq!(rig.orchestrator.state().await, TransitionState::Baseline);
}

#[tokio::test]
async fn test_competitive_mode_captures_nothing() {
    let mut rig = Rig::new(desktop_platform());

    let report = rig.orchestrator.apply_mode(Mode::Competitive).await;
    assert!(report.is_clean());
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
    assert!(rig.orchestrator.snapshot().await.is_empty());
    assert!(!rig
        .platform
        .calls()
        .iter()
        .any(|c| matches!(c, MockCall::GetActiveScheme | MockCall::ReadRegistry(_))));

    // No restore obligation was created
    rig.platform.clear_calls();
    rig.drain_events();
    rig.orchestrator.restore().await;
    assert!(rig.platform.mutations().is_empty());
    assert_eq!(rig.drain_events(), vec![StatusEvent::NothingToRestore]);
}

#[tokio::test]
async fn test_graphics_mode_uses_high_performance_with_stock_latency() {
    let rig = Rig::new(desktop_platform());

    rig.orchestrator.apply_mode(Mode::Graphics).await;

    assert_eq!(
        rig.platform.active_scheme(),
        Some(SchemeId::high_performance())
    );
    assert_eq!(
        rig.platform.registry_value(&throttling_key()),
        Some(RegistryValue::Dword(10))
    );
    assert_eq!(
        rig.platform.service("SysMain").unwrap().status,
        ServiceStatus::Running
    );
}

#[tokio::test]
async fn test_network_mode_sets_normal_autotuning() {
    let rig = Rig::new(desktop_platform());

    let report = rig.orchestrator.apply_mode(Mode::Network).await;

    assert_eq!(report.applied_count(), 1);
    assert_eq!(rig.platform.autotuning().as_deref(), Some("normal"));
    assert_eq!(
        rig.platform.mutations(),
        vec![MockCall::SetAutotuning("normal".to_string())]
    );
}

#[tokio::test]
async fn test_color_mode_disables_hardware_gamma() {
    let rig = Rig::new(desktop_platform());

    rig.orchestrator.apply_mode(Mode::Color).await;

    assert_eq!(
        rig.platform.registry_value(&color_key()),
        Some(RegistryValue::Dword(1))
    );
}

#[tokio::test]
async fn test_mode_while_boosted_keeps_cycle_intact() {
    let rig = Rig::new(desktop_platform());
    rig.orchestrator.boost().await.unwrap();
    let before = rig.orchestrator.snapshot().await;

    rig.orchestrator.apply_mode(Mode::Color).await;

    assert_eq!(rig.orchestrator.state().await, TransitionState::Boosted);
    assert_eq!(rig.orchestrator.snapshot().await, before);

    rig.orchestrator.restore().await;
    assert_eq!(rig.platform.active_scheme(), Some(SchemeId::balanced()));
    assert_eq!(
        rig.platform.registry_value(&color_key()),
        Some(RegistryValue::Dword(1))
    );
}

#[test]
fn test_unknown_mode_name() {
    let err = "turbo".parse::<Mode>().unwrap_err();
    assert!(matches!(err, BoostError::UnknownMode(_)));
    assert_eq!(err.to_string(), "unknown mode: turbo");
}
