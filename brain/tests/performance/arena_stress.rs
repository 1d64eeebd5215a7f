// tank_brain_core/brain/tests/performance/arena_stress.rs

use metrics::histogram;
use proptest::prelude::*;
use std::f32::consts::PI;
use std::time::Instant;
use tank_brain_core::core::config::BrainConfig;
use tank_brain_core::core::math::{angle_diff, wrap_angle};
use tank_brain_core::core::types::{DifficultyTier, Vec3};
use tank_brain_core::server::arena::Arena;
use tank_brain_core::world::registry::Damageable;
use tank_brain_core::world::sandbox::SandboxWorld;

fn setup_crowded_arena(seed: u64, per_team: usize) -> Arena {
    let mut arena =
        Arena::new(BrainConfig::default(), SandboxWorld::generated(seed), seed).expect("arena");
    let tiers = [DifficultyTier::Easy, DifficultyTier::Normal, DifficultyTier::Hard];
    for i in 0..per_team {
        let z = -120.0 + 240.0 * i as f32 / per_team.max(1) as f32;
        arena.spawn_combatant(1, tiers[i % 3], Vec3::new(-150.0, 0.0, z)).expect("spawn");
        arena.spawn_combatant(2, tiers[(i + 1) % 3], Vec3::new(150.0, 0.0, z)).expect("spawn");
    }
    arena
}

#[test]
fn stress_test_arena_tick() {
    let mut arena = setup_crowded_arena(13, 8);
    let delta_time = arena.config().fixed_delta();
    let mut worst_ms: f64 = 0.0;
    for _ in 0..1200 {
        let start = Instant::now();
        let report = arena.tick(delta_time);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        histogram!("arena_tick_duration_ms").record(elapsed_ms);
        worst_ms = worst_ms.max(elapsed_ms);
        assert_eq!(report.errors, 0, "tick {}", report.tick);
    }

    for (_, c) in arena.combatants() {
        assert!(c.is_alive());
        assert!(c.position().is_finite());
        let angle = c.turret_angle();
        assert!(angle > -PI && angle <= PI);
    }
    println!("worst tick {:.3}ms over {} combatants", worst_ms, arena.combatant_count());
}

#[test]
fn sustained_skirmish_never_leaks_registry_entries() {
    let mut arena = setup_crowded_arena(29, 4);
    let delta_time = arena.config().fixed_delta();
    let mut disposed = 0;
    for _ in 0..3600 {
        disposed += arena.tick(delta_time).disposed;
        if arena.combatant_count() == 0 {
            break;
        }
    }
    assert_eq!(arena.combatant_count() + disposed, 8);
    assert_eq!(arena.registry().len(), arena.combatant_count());
}

proptest! {
    #[test]
    fn wrapped_angles_stay_in_half_open_range(angle in -1000.0f32..1000.0) {
        let wrapped = wrap_angle(angle);
        prop_assert!(wrapped > -PI && wrapped <= PI);
        prop_assert!((wrapped.sin() - angle.sin()).abs() < 1e-2);
    }

    #[test]
    fn angle_diff_is_the_short_way_round(a in -10.0f32..10.0, b in -10.0f32..10.0) {
        let d = angle_diff(a, b);
        prop_assert!(d.abs() <= PI + 1e-5);
        prop_assert!((wrap_angle(b + d) - wrap_angle(a)).sin().abs() < 1e-3);
    }
}
