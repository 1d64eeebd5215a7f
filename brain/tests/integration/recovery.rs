// tank_brain_core/brain/tests/integration/recovery.rs

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tank_brain_core::core::config::{BrainConfig, RecoveryConfig};
use tank_brain_core::core::constants::FIXED_DELTA_SECS;
use tank_brain_core::core::events::{BrainEvent, RecoveryLevel};
use tank_brain_core::core::types::{CombatantKey, DifficultyTier, TacticalState, Transform, Vec3};
use tank_brain_core::server::arena::Arena;
use tank_brain_core::systems::ai::avoidance::{StuckMonitor, StuckVerdict};
use tank_brain_core::systems::ai::patrol::PatrolRoute;
use tank_brain_core::world::physics::PhysicsBody;
use tank_brain_core::world::registry::Damageable;
use tank_brain_core::world::sandbox::SandboxWorld;

struct TestArenaContext {
    arena: Arena,
    enemy: CombatantKey,
}

/// One enemy at (0, 0, 100) facing -Z with a two-point route straight ahead.
fn setup_arena() -> TestArenaContext {
    let mut arena = Arena::new(BrainConfig::default(), SandboxWorld::flat(), 11).expect("arena");
    let enemy = arena
        .spawn_combatant(1, DifficultyTier::Normal, Vec3::new(0.0, 0.0, 100.0))
        .expect("spawn");
    if let Some(c) = arena.combatant_mut(enemy) {
        c.set_patrol_route(vec![Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, -60.0)]);
    }
    TestArenaContext { arena, enemy }
}

fn count_recoveries(events: &[BrainEvent], wanted: RecoveryLevel) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, BrainEvent::StuckRecovery { level, .. } if *level == wanted))
        .count()
}

#[test]
fn stuck_monitor_escalates_once_per_threshold() {
    let config = RecoveryConfig::default();
    let mut monitor = StuckMonitor::new();
    let position = Vec3::new(5.0, 1.0, 5.0);
    let mut verdicts = Vec::new();
    // Seven seconds of ticks, pushing the throttle without ever moving.
    for tick in 0..=420u64 {
        let verdict = monitor.check(tick as f64 / 60.0, position, true, &config);
        if verdict != StuckVerdict::NotDue {
            verdicts.push(verdict);
        }
    }
    assert_eq!(
        verdicts,
        vec![
            StuckVerdict::Stalled { consecutive: 1 },
            StuckVerdict::ForceUnstuck,
            StuckVerdict::Stalled { consecutive: 1 },
            StuckVerdict::HardReposition,
        ]
    );
}

#[test]
fn progress_resets_the_escalation() {
    let config = RecoveryConfig::default();
    let mut monitor = StuckMonitor::new();
    let moved = Vec3::new(4.0, 0.0, 0.0);
    let stalled = StuckVerdict::Stalled { consecutive: 1 };
    monitor.check(0.0, Vec3::ZERO, true, &config);
    assert_eq!(monitor.check(1.5, Vec3::ZERO, true, &config), stalled);
    assert_eq!(monitor.check(3.0, moved, true, &config), StuckVerdict::Moving);
    assert_eq!(monitor.check(4.5, moved, true, &config), stalled);
    assert_eq!(monitor.check(6.0, moved, false, &config), StuckVerdict::Idle);
    assert_eq!(monitor.consecutive_failures(), 0);
}

#[test]
fn pinned_combatant_is_unstuck_exactly_once() {
    let TestArenaContext { mut arena, enemy } = setup_arena();
    if let Some(c) = arena.combatant_mut(enemy) {
        c.body_mut().set_pinned(true);
    }

    let mut unstuck = 0;
    let mut repositions = 0;
    // 4.5 s: stabilisation, then stuck checks at roughly 2.0 s and 3.5 s.
    for _ in 0..270 {
        arena.tick(FIXED_DELTA_SECS);
        unstuck += count_recoveries(arena.recent_events(), RecoveryLevel::ForcedUnstuck);
        repositions += count_recoveries(arena.recent_events(), RecoveryLevel::HardReposition);
    }
    assert_eq!(unstuck, 1);
    assert_eq!(repositions, 0);
    let stats = arena.combatant(enemy).map(|c| *c.stats()).expect("combatant");
    assert_eq!(stats.unstuck_maneuvers, 1);
    assert_eq!(arena.telemetry().tally().unstuck_maneuvers, 1);
}

#[test]
fn hull_below_the_ground_gets_terrain_recovery() {
    let TestArenaContext { mut arena, enemy } = setup_arena();
    for _ in 0..5 {
        arena.tick(FIXED_DELTA_SECS);
    }
    if let Some(c) = arena.combatant_mut(enemy) {
        let yaw = c.body().transform().yaw();
        c.body_mut().set_transform(Transform::from_position_yaw(Vec3::new(0.0, -2.0, 100.0), yaw));
        c.body_mut().set_linear_velocity(Vec3::new(0.0, -3.0, 0.0));
    }
    arena.tick(FIXED_DELTA_SECS);
    assert!(arena
        .recent_events()
        .iter()
        .any(|e| matches!(
            e,
            BrainEvent::TerrainRecovery { combatant, .. } if *combatant == enemy
        )));
    let velocity = arena.combatant(enemy).map(|c| c.body().linear_velocity()).expect("combatant");
    assert!(velocity.y >= 0.0);
}

#[test]
fn dead_combatant_never_executes_a_state() {
    let TestArenaContext { mut arena, enemy } = setup_arena();
    let player = arena.spawn_player(2, Vec3::new(0.0, 0.0, 60.0));
    for _ in 0..40 {
        arena.tick(FIXED_DELTA_SECS);
    }
    let c = arena.combatant_mut(enemy).expect("combatant");
    assert_ne!(c.get_state(), TacticalState::Idle);
    let lethal = c.max_health() * 2.0;
    c.take_damage(lethal);
    assert_eq!(c.health(), 0.0);
    assert!(!c.is_alive());
    assert_eq!(c.intent().throttle, 0.0);
    assert!(!c.intent().fire);

    let report = arena.tick(FIXED_DELTA_SECS);
    assert_eq!(report.active, 0);
    assert_eq!(report.disposed, 1);
    assert!(arena.combatant(enemy).is_none());
    assert!(arena.registry().resolve_live(enemy).is_none());
    assert!(arena.registry().resolve_live(player).is_some());
}

#[test]
fn patrol_route_wraps_and_regenerates() {
    let mut rng = SmallRng::seed_from_u64(5);
    let mut route = PatrolRoute::new(Vec3::ZERO, 50.0, 4, &mut rng);
    assert_eq!(route.len(), 4);
    for _ in 0..4 {
        route.advance();
    }
    assert_eq!(route.index(), 0);
    assert_eq!(route.laps(), 1);

    route.clear();
    assert!(route.is_empty());
    route.current(&mut rng);
    assert_eq!(route.len(), 4);
}

#[test]
fn explicit_route_keeps_a_usable_regeneration_radius() {
    let TestArenaContext { arena, enemy } = setup_arena();
    let config = arena.config().clone();
    let route = arena.combatant(enemy).map(|c| c.patrol().clone()).expect("combatant");
    assert_eq!(route.len(), 2);
    assert!(route.radius() >= config.tactics.patrol_radius);

    let mut route = route;
    let anchor = Vec3::new(0.0, 0.0, 100.0);
    let mut rng = SmallRng::seed_from_u64(9);
    route.regenerate(&mut rng);
    for waypoint in route.waypoints() {
        assert!(waypoint.distance(anchor) > config.tactics.waypoint_radius);
    }
}
