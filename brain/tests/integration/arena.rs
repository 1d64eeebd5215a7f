// tank_brain_core/brain/tests/integration/arena.rs

use tank_brain_core::core::config::{BrainConfig, SettingsPatch};
use tank_brain_core::core::constants::FIXED_DELTA_SECS;
use tank_brain_core::core::error::BrainError;
use tank_brain_core::core::events::BrainEvent;
use tank_brain_core::core::types::{DifficultyTier, TacticalState, Transform, Vec3};
use tank_brain_core::server::arena::Arena;
use tank_brain_core::server::game_loop::GameLoop;
use tank_brain_core::world::map_generator::MapGenerator;
use tank_brain_core::world::obstacle_index::Obstacle;
use tank_brain_core::world::registry::Damageable;
use tank_brain_core::world::sandbox::SandboxWorld;

fn flat_arena(seed: u64) -> Arena {
    Arena::new(BrainConfig::default(), SandboxWorld::flat(), seed).expect("arena")
}

#[test]
fn retreating_combatant_walls_off_and_despawn_removes_the_wall() {
    let mut arena = flat_arena(21);
    let enemy = arena.spawn_combatant(1, DifficultyTier::Normal, Vec3::ZERO).expect("spawn");
    arena.spawn_player(2, Vec3::new(0.0, 0.0, 40.0));
    {
        let c = arena.combatant_mut(enemy).expect("combatant");
        let damage = c.max_health() * 0.95;
        c.take_damage(damage);
        assert!(c.is_alive());
    }

    let mut deployed = false;
    for _ in 0..60 {
        arena.tick(FIXED_DELTA_SECS);
        if arena.registry().walls().count() == 1 {
            deployed = true;
            break;
        }
    }
    assert!(deployed, "no wall deployed");
    assert_eq!(arena.combatant(enemy).map(|c| c.get_state()), Some(TacticalState::Retreat));
    assert_eq!(arena.telemetry().tally().walls_deployed, 1);

    assert!(arena.despawn(enemy));
    assert_eq!(arena.registry().walls().count(), 0);
    assert!(arena.registry().get(enemy).is_none());
    assert!(arena
        .recent_events()
        .iter()
        .any(|e| matches!(
            e,
            BrainEvent::WallDestroyed { owner, expired: false, .. } if *owner == enemy
        )));
    assert!(!arena.despawn(enemy));
}

#[test]
fn faulted_combatant_does_not_stop_the_others() {
    let mut arena = flat_arena(8);
    let healthy = arena
        .spawn_combatant(1, DifficultyTier::Easy, Vec3::new(-50.0, 0.0, 0.0))
        .expect("spawn");
    let broken = arena
        .spawn_combatant(1, DifficultyTier::Easy, Vec3::new(50.0, 0.0, 0.0))
        .expect("spawn");
    let stabilize = arena.config().recovery.spawn_stabilize_ticks;
    for _ in 0..stabilize + 2 {
        arena.tick(FIXED_DELTA_SECS);
    }

    let last_good = arena.registry().get(broken).map(|s| s.position).expect("snapshot");
    if let Some(c) = arena.combatant_mut(broken) {
        let poisoned = Transform::from_position_yaw(Vec3::new(f32::NAN, 1.0, 0.0), 0.0);
        c.body_mut().set_transform(poisoned);
    }
    for _ in 0..10 {
        let report = arena.tick(FIXED_DELTA_SECS);
        assert_eq!(report.errors, 1);
        assert_eq!(report.active, 1);
    }
    assert!(arena.combatant(healthy).map(|c| c.is_alive()).unwrap_or(false));
    let kept = arena.registry().get(broken).map(|s| s.position).expect("snapshot");
    assert!(kept.is_finite());
    assert_eq!(kept, last_good);
}

#[test]
fn settings_patch_is_clamped_and_validated() {
    let mut arena = flat_arena(2);
    arena.spawn_combatant(1, DifficultyTier::Hard, Vec3::ZERO).expect("spawn");

    let patch = SettingsPatch {
        weapon_range: Some(10_000.0),
        hover_height: Some(0.01),
        ..Default::default()
    };
    let adjusted = arena.apply_patch(&patch).expect("patch");
    assert!(adjusted.contains(&"weapon_range"));
    assert!(adjusted.contains(&"hover_height"));
    let config = arena.config();
    assert!(config.tactics.weapon_range <= config.difficulty.easy.detection_range);
    assert!(config.tactics.optimal_range <= config.tactics.weapon_range);
    assert_eq!(config.locomotion.hover_height, 0.3);

    let before = arena.config().clone();
    let bad = SettingsPatch {
        turn_speed: Some(2.0),
        ally_radius: Some(f32::NAN),
        ..Default::default()
    };
    assert!(matches!(arena.apply_patch(&bad), Err(BrainError::Config(_))));
    assert_eq!(arena.config().locomotion.turn_speed, before.locomotion.turn_speed);
    assert_eq!(arena.config().group.ally_radius, before.group.ally_radius);
}

#[test]
fn skirmish_keeps_combat_bookkeeping_consistent() {
    let seed = 4;
    let mut arena =
        Arena::new(BrainConfig::default(), SandboxWorld::generated(seed), seed).expect("arena");
    let tiers = [DifficultyTier::Easy, DifficultyTier::Normal, DifficultyTier::Hard];
    for (i, (position, team)) in MapGenerator::team_spawn_points().into_iter().enumerate() {
        arena.spawn_combatant(team, tiers[i % tiers.len()], position).expect("spawn");
    }

    let mut game_loop = GameLoop::new(arena.config().tick_rate);
    let summary = game_loop.run_for(&mut arena, 900);
    assert_eq!(summary.errors, 0);
    assert!(summary.frames > 0);
    assert!(summary.hits <= summary.shots);

    for (key, c) in arena.combatants() {
        let stats = c.stats();
        assert!(stats.shots_hit <= stats.shots_fired);
        assert!(c.health() > 0.0 && c.health() <= c.max_health());
        assert!(c.is_alive());
        assert!(c.position().is_finite());
        let snapshot = arena.registry().resolve_live(key).expect("live snapshot");
        assert_eq!(snapshot.health, c.health());
    }
    assert_eq!(arena.registry().len(), arena.combatant_count());
    let tally = arena.telemetry().tally();
    assert!(tally.hits <= tally.shots_fired);
    assert_eq!(tally.kills, summary.kills);
}

#[test]
fn blocked_line_of_fire_never_shoots() {
    let block = Obstacle::solid(1, Vec3::new(-8.0, 0.0, 2.8), Vec3::new(8.0, 10.0, 5.0));
    let world = SandboxWorld::new(&[block], 0.0, 1.0);
    let mut arena = Arena::new(BrainConfig::default(), world, 17).expect("arena");
    let enemy = arena.spawn_combatant(1, DifficultyTier::Hard, Vec3::ZERO).expect("spawn");
    let player = arena.spawn_player(2, Vec3::new(0.0, 0.0, 40.0));
    if let Some(c) = arena.combatant_mut(enemy) {
        c.body_mut().set_pinned(true);
        c.set_target(Some(player));
    }

    for _ in 0..360 {
        let report = arena.tick(FIXED_DELTA_SECS);
        assert_eq!(report.shots, 0);
    }
    let c = arena.combatant(enemy).expect("combatant");
    assert_eq!(c.stats().shots_fired, 0);
    assert_eq!(c.projectile_count(), 0);
    assert_eq!(arena.registry().get(player).map(|s| s.health), Some(100.0));
}

#[test]
fn gate_raised_mid_fight_stops_fire() {
    let gate = Obstacle::gate(4, Vec3::new(-20.0, 0.0, 20.0), Vec3::new(20.0, 10.0, 21.0), 0.0);
    let world = SandboxWorld::new(&[gate], 0.0, 1.0);
    let mut arena = Arena::new(BrainConfig::default(), world, 23).expect("arena");
    let enemy = arena.spawn_combatant(1, DifficultyTier::Hard, Vec3::ZERO).expect("spawn");
    let player = arena.spawn_player(2, Vec3::new(0.0, 0.0, 40.0));
    if let Some(c) = arena.combatant_mut(enemy) {
        c.body_mut().set_pinned(true);
        c.set_target(Some(player));
    }
    for _ in 0..240 {
        arena.tick(FIXED_DELTA_SECS);
    }

    assert!(arena.world().set_gate_height(4, 10.0));
    let fired_before = arena.combatant(enemy).map(|c| c.stats().shots_fired).expect("combatant");
    for _ in 0..360 {
        let report = arena.tick(FIXED_DELTA_SECS);
        assert_eq!(report.shots, 0, "fired through a raised gate at tick {}", report.tick);
    }
    assert_eq!(arena.combatant(enemy).map(|c| c.stats().shots_fired), Some(fired_before));
}
