// tank_brain_core/brain/tests/integration/tactics.rs

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tank_brain_core::core::config::{BrainConfig, TacticsConfig};
use tank_brain_core::core::constants::FIXED_DELTA_SECS;
use tank_brain_core::core::types::{CombatantKey, DifficultyTier, TacticalState, Vec3};
use tank_brain_core::server::arena::Arena;
use tank_brain_core::systems::ai::decision::{
    DecisionContext, DecisionEngine, TacticalQueries, TargetInfo,
};
use tank_brain_core::world::sandbox::SandboxWorld;

const DETECTION_RANGE: f32 = 250.0;

struct NoSearch;

impl TacticalQueries for NoSearch {
    fn find_cover(&mut self, _self_pos: Vec3, _target_pos: Vec3) -> Option<Vec3> {
        None
    }

    fn find_ambush_position(&mut self, _self_pos: Vec3, _target_pos: Vec3) -> Option<Vec3> {
        None
    }
}

fn context(distance: f32, health_fraction: f32, target_health: f32) -> DecisionContext {
    DecisionContext {
        tick: 0,
        position: Vec3::ZERO,
        health_fraction,
        target: Some(TargetInfo {
            key: CombatantKey::default(),
            position: Vec3::new(0.0, 0.0, distance),
            distance,
            health_fraction: target_health,
            visible: true,
        }),
        detection_range: DETECTION_RANGE,
        optimal_range: 60.0,
        has_capture_point: false,
        nearest_ally: None,
        allies_engaging: 0,
        engaging_allies_center: None,
    }
}

#[test]
fn detected_target_beyond_weapon_range_is_chased() {
    let mut engine = DecisionEngine::new(TacticsConfig::default());
    for seed in 0..50 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let decision = engine.decide(&context(200.0, 1.0, 1.0), &mut NoSearch, &mut rng);
        assert_eq!(decision.state, TacticalState::Chase, "seed {}", seed);
    }
}

#[test]
fn critical_health_retreats_at_any_distance() {
    let mut engine = DecisionEngine::new(TacticsConfig::default());
    for seed in 0..20 {
        let mut rng = SmallRng::seed_from_u64(seed);
        for distance in [5.0, 44.0, 60.0, 119.0, 200.0, 249.0] {
            let mut ctx = context(distance, 0.05, 0.1);
            ctx.nearest_ally = Some(Vec3::new(10.0, 0.0, 0.0));
            ctx.allies_engaging = 3;
            let decision = engine.decide(&ctx, &mut NoSearch, &mut rng);
            assert_eq!(decision.state, TacticalState::Retreat, "distance {}", distance);
        }
    }
}

#[test]
fn two_engaging_allies_push_toward_flanking() {
    let config = TacticsConfig::default();
    let mut engine = DecisionEngine::new(config.clone());
    let mut ctx = context(100.0, 1.0, 0.8);
    ctx.allies_engaging = 2;
    ctx.nearest_ally = Some(Vec3::new(20.0, 0.0, 30.0));
    ctx.engaging_allies_center = Some(Vec3::new(20.0, 0.0, 60.0));

    let target = ctx.target.expect("target");
    let p = engine.flank_probability(&ctx, &target);
    assert!(p >= config.base_flank_chance + config.ally_flank_bonus);

    let mut rng = SmallRng::seed_from_u64(2024);
    let trials = 2000;
    let flanks = (0..trials)
        .filter(|_| engine.decide(&ctx, &mut NoSearch, &mut rng).state == TacticalState::Flank)
        .count();
    assert!(flanks as f32 / trials as f32 > 0.6, "flanked {} of {}", flanks, trials);
}

#[test]
fn engagement_states_respect_range_bands() {
    let config = TacticsConfig::default();
    let mut engine = DecisionEngine::new(config.clone());
    let mut rng = SmallRng::seed_from_u64(77);
    for _ in 0..5000 {
        let distance = rng.gen_range(0.0..320.0);
        let mut ctx = context(distance, rng.gen_range(0.0..=1.0), rng.gen_range(0.0..=1.0));
        ctx.allies_engaging = rng.gen_range(0..4);
        if rng.gen_bool(0.5) {
            ctx.nearest_ally = Some(Vec3::new(15.0, 0.0, 0.0));
        }
        match engine.decide(&ctx, &mut NoSearch, &mut rng).state {
            TacticalState::Attack | TacticalState::Flank => {
                assert!(distance <= config.weapon_range)
            }
            TacticalState::Chase => {
                assert!(distance > config.weapon_range && distance <= DETECTION_RANGE)
            }
            TacticalState::Patrol if distance > DETECTION_RANGE => {}
            state => assert!(distance <= DETECTION_RANGE, "{:?} at {}", state, distance),
        }
    }
}

#[test]
fn spawned_combatant_chases_a_distant_player() {
    let mut arena = Arena::new(BrainConfig::default(), SandboxWorld::flat(), 3).expect("arena");
    let enemy = arena.spawn_combatant(1, DifficultyTier::Normal, Vec3::ZERO).expect("spawn");
    let player = arena.spawn_player(2, Vec3::new(0.0, 0.0, 200.0));

    let stabilize = arena.config().recovery.spawn_stabilize_ticks;
    for _ in 0..stabilize - 1 {
        arena.tick(FIXED_DELTA_SECS);
    }
    assert_eq!(arena.combatant(enemy).map(|c| c.get_state()), Some(TacticalState::Idle));

    arena.tick(FIXED_DELTA_SECS);
    let combatant = arena.combatant(enemy).expect("combatant");
    assert_eq!(combatant.target(), Some(player));
    assert_eq!(combatant.get_state(), TacticalState::Chase);
    assert!(combatant.intent().throttle > 0.0);
    assert!(!combatant.intent().fire);
}

#[test]
fn turret_angle_stays_normalised_while_engaging() {
    let mut arena = Arena::new(BrainConfig::default(), SandboxWorld::flat(), 9).expect("arena");
    let enemy = arena.spawn_combatant(1, DifficultyTier::Hard, Vec3::ZERO).expect("spawn");
    let player = arena.spawn_player(2, Vec3::new(-60.0, 0.0, -20.0));
    for i in 0..240 {
        let t = i as f32 * FIXED_DELTA_SECS;
        let position = Vec3::new(-60.0 + 20.0 * t.cos(), 0.0, -20.0 + 20.0 * t.sin());
        arena.update_player(player, position, Vec3::ZERO).expect("player");
        arena.tick(FIXED_DELTA_SECS);
        if let Some(c) = arena.combatant(enemy) {
            let angle = c.turret_angle();
            assert!(angle > -std::f32::consts::PI && angle <= std::f32::consts::PI);
        }
    }
}

/// Query double that always offers the same spots.
struct FixedSpots {
    cover: Option<Vec3>,
    ambush: Option<Vec3>,
}

impl TacticalQueries for FixedSpots {
    fn find_cover(&mut self, _self_pos: Vec3, _target_pos: Vec3) -> Option<Vec3> {
        self.cover
    }

    fn find_ambush_position(&mut self, _self_pos: Vec3, _target_pos: Vec3) -> Option<Vec3> {
        self.ambush
    }
}

fn state_share(
    engine: &mut DecisionEngine,
    ctx: &DecisionContext,
    queries: &mut dyn TacticalQueries,
    wanted: TacticalState,
    seed: u64,
) -> f32 {
    let mut rng = SmallRng::seed_from_u64(seed);
    let trials = 2000;
    let hits = (0..trials)
        .filter(|_| engine.decide(ctx, queries, &mut rng).state == wanted)
        .count();
    hits as f32 / trials as f32
}

#[test]
fn healthy_mid_range_combatant_sometimes_sets_an_ambush() {
    let config = TacticsConfig::default();
    let mut engine = DecisionEngine::new(config.clone());
    let spot = Vec3::new(12.0, 0.0, 4.0);
    let mut spots = FixedSpots { cover: None, ambush: Some(spot) };
    let ctx = context(50.0, 1.0, 1.0);

    let mut rng = SmallRng::seed_from_u64(31);
    let ambush = (0..200)
        .map(|_| engine.decide(&ctx, &mut spots, &mut rng))
        .find(|d| d.state == TacticalState::Ambush)
        .expect("an ambush within 200 decisions");
    assert_eq!(ambush.position, Some(spot));

    let share = state_share(&mut engine, &ctx, &mut spots, TacticalState::Ambush, 32);
    let expected = config.ambush_chance as f32;
    assert!(
        (share - expected).abs() < 0.06,
        "ambushed {:.3}, expected about {:.2}",
        share,
        expected
    );

    // No spot found, worn down, or outside the band: never an ambush.
    assert_eq!(state_share(&mut engine, &ctx, &mut NoSearch, TacticalState::Ambush, 33), 0.0);
    let hurt = context(50.0, 0.5, 0.5);
    assert_eq!(state_share(&mut engine, &hurt, &mut spots, TacticalState::Ambush, 34), 0.0);
    let far = context(100.0, 1.0, 1.0);
    assert_eq!(state_share(&mut engine, &far, &mut spots, TacticalState::Ambush, 35), 0.0);
}

#[test]
fn worn_down_combatant_with_an_ally_baits_toward_it() {
    let config = TacticsConfig::default();
    let mut engine = DecisionEngine::new(config.clone());
    let ally = Vec3::new(-25.0, 0.0, -10.0);
    let mut ctx = context(100.0, 0.4, 0.5);
    ctx.nearest_ally = Some(ally);

    let mut rng = SmallRng::seed_from_u64(41);
    let bait = (0..200)
        .map(|_| engine.decide(&ctx, &mut NoSearch, &mut rng))
        .find(|d| d.state == TacticalState::Bait)
        .expect("a bait within 200 decisions");
    assert_eq!(bait.position, Some(ally));

    let share = state_share(&mut engine, &ctx, &mut NoSearch, TacticalState::Bait, 42);
    let expected = config.bait_chance as f32;
    assert!((share - expected).abs() < 0.06, "baited {:.3}, expected about {:.2}", share, expected);

    ctx.nearest_ally = None;
    assert_eq!(state_share(&mut engine, &ctx, &mut NoSearch, TacticalState::Bait, 43), 0.0);
    let healthy = DecisionContext { nearest_ally: Some(ally), ..context(100.0, 0.9, 0.5) };
    assert_eq!(state_share(&mut engine, &healthy, &mut NoSearch, TacticalState::Bait, 44), 0.0);
}

#[test]
fn low_health_up_close_without_cover_evades_sideways() {
    let config = TacticsConfig::default();
    let mut engine = DecisionEngine::new(config.clone());
    let ctx = context(20.0, 0.2, 0.3);

    let mut rng = SmallRng::seed_from_u64(51);
    for _ in 0..200 {
        let decision = engine.decide(&ctx, &mut NoSearch, &mut rng);
        match decision.state {
            TacticalState::Evade => {
                let escape = decision.position.expect("escape point");
                // Target is on +Z: the escape leans away from it and mostly sideways.
                assert!(escape.z < 0.0, "escape {:?}", escape);
                assert!(escape.x.abs() > escape.z.abs(), "escape {:?}", escape);
            }
            TacticalState::Attack | TacticalState::Flank => {}
            other => panic!("unexpected {:?} at low health up close", other),
        }
    }

    let share = state_share(&mut engine, &ctx, &mut NoSearch, TacticalState::Evade, 52);
    let expected = config.evade_chance as f32;
    assert!((share - expected).abs() < 0.06, "evaded {:.3}, expected about {:.2}", share, expected);

    // Out of close range the same health fights on.
    let distant = context(config.close_range + 20.0, 0.2, 0.3);
    assert_eq!(state_share(&mut engine, &distant, &mut NoSearch, TacticalState::Evade, 53), 0.0);
}

#[test]
fn low_health_up_close_prefers_cover_when_found() {
    let mut engine = DecisionEngine::new(TacticsConfig::default());
    let cover = Vec3::new(-8.0, 0.0, -6.0);
    let mut spots = FixedSpots { cover: Some(cover), ambush: None };
    let mut rng = SmallRng::seed_from_u64(61);
    let decision = engine.decide(&context(20.0, 0.2, 0.3), &mut spots, &mut rng);
    assert_eq!(decision.state, TacticalState::Retreat);
    assert_eq!(decision.position, Some(cover));
}
