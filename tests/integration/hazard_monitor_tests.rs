//! Integration tests for the per-tick hazard monitor.

use std::sync::Arc;

use afk_sentinel::agent::hazard_monitor::HazardMonitor;
use afk_sentinel::models::control::NavigationGoal;
use afk_sentinel::models::hazard::{HazardClassification, HazardReason};
use afk_sentinel::models::position::Position;
use afk_sentinel::session::SessionHandle;
use afk_sentinel::AgentConfig;

use super::test_helpers::{spawned_context, RecordingSession};

const HOME: Position = Position::new(10.0, 64.0, 10.0);

fn monitor_at(position: Position, below: Option<&str>) -> (HazardMonitor, Arc<RecordingSession>) {
    let session = RecordingSession::at(position);
    if let Some(name) = below {
        session.set_block(position.below(), name);
    }
    let ctx = spawned_context(AgentConfig::default(), HOME);
    (HazardMonitor::new(ctx, session.clone()), session)
}

#[tokio::test]
async fn lava_below_overrides_pending_wander_goal() {
    let agent_at = Position::new(13.4, 64.0, 8.2);
    let (monitor, session) = monitor_at(agent_at, Some("lava"));
    let wander = NavigationGoal::near(Position::new(14.0, 64.0, 7.0));
    session.set_goal(wander).unwrap();

    let verdict = monitor.on_tick();

    assert_eq!(verdict, Some(HazardClassification::Unsafe(HazardReason::Lava)));
    assert_eq!(
        session.last_goal(),
        Some(NavigationGoal::Near {
            target: HOME,
            tolerance: 1.0,
        })
    );
}

#[tokio::test]
async fn every_unsafe_tick_reissues_the_goal() {
    let (monitor, session) = monitor_at(HOME, Some("cave_air"));

    for _ in 0..3 {
        assert_eq!(
            monitor.on_tick(),
            Some(HazardClassification::Unsafe(HazardReason::Air))
        );
    }

    assert_eq!(session.goals(), vec![NavigationGoal::near(HOME); 3]);
}

#[tokio::test]
async fn cactus_below_sends_agent_home() {
    let (monitor, session) = monitor_at(Position::new(9.5, 64.0, 9.5), Some("cactus"));

    assert_eq!(
        monitor.on_tick(),
        Some(HazardClassification::Unsafe(HazardReason::Cactus))
    );
    assert_eq!(session.last_goal(), Some(NavigationGoal::near(HOME)));
}

#[tokio::test]
async fn safe_ground_leaves_goal_alone() {
    let (monitor, session) = monitor_at(HOME, Some("grass_block"));
    let wander = NavigationGoal::near(Position::new(12.0, 64.0, 12.0));
    session.set_goal(wander).unwrap();

    assert_eq!(monitor.on_tick(), Some(HazardClassification::Safe));
    assert_eq!(session.goals(), vec![wander]);
}

#[tokio::test]
async fn unresolvable_block_is_a_noop() {
    let (monitor, session) = monitor_at(HOME, None);

    assert_eq!(monitor.on_tick(), None);
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn missing_position_is_a_noop() {
    let (monitor, session) = monitor_at(HOME, Some("lava"));
    session.set_position(None);

    assert_eq!(monitor.on_tick(), None);
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn verdict_does_not_depend_on_previous_ticks() {
    let (monitor, session) = monitor_at(HOME, Some("lava"));
    assert!(monitor.on_tick().is_some_and(|v| v.is_unsafe()));

    session.set_block(HOME.below(), "stone");
    assert_eq!(monitor.on_tick(), Some(HazardClassification::Safe));

    session.set_block(HOME.below(), "lava");
    assert!(monitor.on_tick().is_some_and(|v| v.is_unsafe()));
    assert_eq!(session.goals().len(), 2);
}
