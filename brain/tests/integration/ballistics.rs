// tank_brain_core/brain/tests/integration/ballistics.rs

use tank_brain_core::concurrent::event_queue::PriorityEventQueue;
use tank_brain_core::core::config::BrainConfig;
use tank_brain_core::core::constants::FIXED_DELTA_SECS;
use tank_brain_core::core::events::BrainEvent;
use tank_brain_core::core::types::{CombatantKey, DifficultyTier, Vec3};
use tank_brain_core::entities::wall::WallVolume;
use tank_brain_core::systems::ai::targeting::{lead_point, muzzle_clear};
use tank_brain_core::systems::physics::ballistics::{ProjectileManager, ProjectileStepSummary};
use tank_brain_core::world::obstacle_index::Obstacle;
use tank_brain_core::world::registry::{Clock, CombatantRegistry, WorldView};
use tank_brain_core::world::sandbox::SandboxWorld;

struct Range {
    registry: CombatantRegistry,
    world: SandboxWorld,
    events: PriorityEventQueue,
    shooter: CombatantKey,
    wall_owner: CombatantKey,
}

impl Range {
    fn new(obstacles: &[Obstacle]) -> Self {
        let mut registry = CombatantRegistry::new();
        let shooter = registry.register(1, false, Vec3::new(0.0, 0.0, -2.0), 100.0);
        let wall_owner = registry.register(2, false, Vec3::new(150.0, 0.0, 150.0), 100.0);
        Range {
            registry,
            world: SandboxWorld::new(obstacles, 0.0, 1.0),
            events: PriorityEventQueue::new(),
            shooter,
            wall_owner,
        }
    }

    /// Wall across the +Z lane, 20 units out, spanning x in [-3, 3].
    fn raise_wall(&mut self) {
        if let Some(snapshot) = self.registry.get_mut(self.wall_owner) {
            snapshot.wall = Some(WallVolume {
                wall_id: 99,
                owner: self.wall_owner,
                center: Vec3::new(0.0, 1.0, 20.0),
                yaw: 0.0,
                half_extents: Vec3::new(3.0, 2.0, 0.4),
                health: 60.0,
            });
        }
        self.world.sync_from(&self.registry);
    }

    fn fly(
        &self,
        manager: &mut ProjectileManager,
        steps: usize,
    ) -> (ProjectileStepSummary, Vec<BrainEvent>) {
        let view = WorldView {
            registry: &self.registry,
            spatial: &self.world,
            terrain: &self.world,
            pathfinder: None,
            events: &self.events,
            clock: Clock::default(),
        };
        let mut total = ProjectileStepSummary::default();
        for _ in 0..steps {
            let s = manager.step(FIXED_DELTA_SECS, 1, &view);
            total.hits += s.hits;
            total.wall_impacts += s.wall_impacts;
            total.ricochets += s.ricochets;
            total.expired += s.expired;
        }
        (total, self.events.drain())
    }
}

#[test]
fn shot_into_a_wall_reports_the_owner() {
    let mut range = Range::new(&[]);
    range.raise_wall();
    let mut manager = ProjectileManager::new(BrainConfig::default().weapon);
    let origin = Vec3::new(0.0, 1.0, 0.0);
    let id = manager.spawn(range.shooter, Some(range.wall_owner), origin, Vec3::Z, Vec3::ZERO);

    let (summary, events) = range.fly(&mut manager, 30);
    assert_eq!(summary.wall_impacts, 1);
    assert!(manager.is_empty());
    let impact = events.iter().find_map(|e| match e {
        BrainEvent::WallImpact { owner, wall_id, projectile_id, position, .. } => {
            Some((*owner, *wall_id, *projectile_id, *position))
        }
        _ => None,
    });
    let (owner, wall_id, projectile_id, position) = impact.expect("wall impact");
    assert_eq!(owner, range.wall_owner);
    assert_eq!(wall_id, 99);
    assert_eq!(projectile_id, id);
    assert!((position.z - 19.6).abs() < 0.1, "impact at {:?}", position);
}

#[test]
fn shot_beside_a_wall_flies_past() {
    let mut range = Range::new(&[]);
    range.raise_wall();
    let mut manager = ProjectileManager::new(BrainConfig::default().weapon);
    manager.spawn(range.shooter, None, Vec3::new(4.0, 1.5, 0.0), Vec3::Z, Vec3::ZERO);

    let (summary, events) = range.fly(&mut manager, 30);
    assert_eq!(summary.wall_impacts, 0);
    assert!(!events.iter().any(|e| matches!(e, BrainEvent::WallImpact { .. })));
}

#[test]
fn own_wall_never_stops_own_rounds() {
    let mut range = Range::new(&[]);
    range.raise_wall();
    let mut manager = ProjectileManager::new(BrainConfig::default().weapon);
    manager.spawn(range.wall_owner, None, Vec3::new(0.0, 1.0, 0.0), Vec3::Z, Vec3::ZERO);

    let (summary, _) = range.fly(&mut manager, 30);
    assert_eq!(summary.wall_impacts, 0);
}

#[test]
fn obstacle_detonates_the_round() {
    let block = Obstacle::solid(7, Vec3::new(-5.0, 0.0, 30.0), Vec3::new(5.0, 6.0, 34.0));
    let range = Range::new(&[block]);
    let mut manager = ProjectileManager::new(BrainConfig::default().weapon);
    let id = manager.spawn(range.shooter, None, Vec3::new(0.0, 2.0, 0.0), Vec3::Z, Vec3::ZERO);

    let (summary, events) = range.fly(&mut manager, 40);
    assert_eq!(summary.expired, 1);
    assert!(events.iter().any(|e| matches!(e, BrainEvent::Explosion { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(
            e,
            BrainEvent::ProjectileExpired { projectile_id, .. } if *projectile_id == id
        )));
}

#[test]
fn hostile_in_the_lane_is_hit() {
    let mut range = Range::new(&[]);
    let target = range.registry.register(2, true, Vec3::new(0.0, 0.0, 25.0), 100.0);
    range.world.sync_from(&range.registry);
    let mut manager = ProjectileManager::new(BrainConfig::default().weapon);
    manager.spawn(range.shooter, Some(target), Vec3::new(0.0, 1.0, 0.0), Vec3::Z, Vec3::ZERO);

    let (summary, events) = range.fly(&mut manager, 30);
    assert_eq!(summary.hits, 1);
    assert!(events
        .iter()
        .any(|e| matches!(
            e,
            BrainEvent::ProjectileHit { target: t, damage, .. } if *t == target && *damage > 0.0
        )));
}

#[test]
fn blocked_muzzle_holds_fire() {
    let block = Obstacle::solid(3, Vec3::new(-2.0, 0.0, 2.0), Vec3::new(2.0, 4.0, 4.0));
    let blocked = SandboxWorld::new(&[block], 0.0, 1.0);
    let open = SandboxWorld::flat();
    let me = CombatantKey::default();
    let ahead = Vec3::new(0.0, 0.0, 30.0);

    assert!(!muzzle_clear(&blocked, me, None, Vec3::ZERO, ahead));
    assert!(muzzle_clear(&open, me, None, Vec3::ZERO, ahead));
    // Aiming away from the block is clear.
    assert!(muzzle_clear(&blocked, me, None, Vec3::ZERO, -ahead));
}

#[test]
fn distant_blocker_on_the_line_of_fire_holds_fire() {
    let block = Obstacle::solid(4, Vec3::new(-3.0, 0.0, 20.0), Vec3::new(3.0, 6.0, 22.0));
    let world = SandboxWorld::new(&[block], 0.0, 1.0);
    let me = CombatantKey::default();

    assert!(!muzzle_clear(&world, me, None, Vec3::ZERO, Vec3::new(0.0, 0.0, 40.0)));
    // Short of the blocker, or off to the side of it, the line is open.
    assert!(muzzle_clear(&world, me, None, Vec3::ZERO, Vec3::new(0.0, 0.0, 15.0)));
    assert!(muzzle_clear(&world, me, None, Vec3::ZERO, Vec3::new(30.0, 0.0, 40.0)));
}

#[test]
fn raised_gate_blocks_and_lowered_gate_does_not() {
    let gate = Obstacle::gate(5, Vec3::new(-10.0, 0.0, 30.0), Vec3::new(10.0, 8.0, 31.0), 0.0);
    let world = SandboxWorld::new(&[gate], 0.0, 1.0);
    let me = CombatantKey::default();
    let target = Vec3::new(0.0, 0.0, 60.0);

    assert!(muzzle_clear(&world, me, None, Vec3::ZERO, target));
    assert!(world.set_gate_height(5, 8.0));
    assert!(!muzzle_clear(&world, me, None, Vec3::ZERO, target));
}

#[test]
fn combatants_on_the_line_block_everyone_but_the_target() {
    let mut range = Range::new(&[]);
    let target = range.registry.register(2, true, Vec3::new(0.0, 0.0, 40.0), 100.0);
    range.world.sync_from(&range.registry);
    let target_position = Vec3::new(0.0, 0.0, 40.0);
    assert!(muzzle_clear(&range.world, range.shooter, Some(target), Vec3::ZERO, target_position));

    let bystander = range.registry.register(1, false, Vec3::new(0.0, 0.0, 20.0), 100.0);
    range.world.sync_from(&range.registry);
    assert!(!muzzle_clear(&range.world, range.shooter, Some(target), Vec3::ZERO, target_position));
    // Aiming at the bystander itself is fine.
    let bystander_position = Vec3::new(0.0, 0.0, 20.0);
    let shooter = range.shooter;
    assert!(muzzle_clear(&range.world, shooter, Some(bystander), Vec3::ZERO, bystander_position));
}

#[test]
fn own_wall_does_not_block_the_line_of_fire() {
    let mut range = Range::new(&[]);
    range.raise_wall();
    let target = Vec3::new(0.0, 0.0, 40.0);
    assert!(!muzzle_clear(&range.world, range.shooter, None, Vec3::ZERO, target));
    assert!(muzzle_clear(&range.world, range.wall_owner, None, Vec3::ZERO, target));
}

#[test]
fn stationary_target_needs_no_lead() {
    let config = BrainConfig::default();
    let speed = config.weapon.projectile_speed;
    let target = Vec3::new(30.0, 0.0, 40.0);
    for tier in [DifficultyTier::Easy, DifficultyTier::Normal, DifficultyTier::Hard] {
        let profile = config.difficulty.profile(tier);
        let aim = lead_point(Vec3::ZERO, target, Vec3::ZERO, Vec3::ZERO, speed, profile);
        assert!(aim.distance(target) < 1e-4);
    }

    let profile = config.difficulty.profile(DifficultyTier::Hard);
    let velocity = Vec3::new(10.0, 0.0, 0.0);
    let moving = lead_point(Vec3::ZERO, target, velocity, Vec3::ZERO, speed, profile);
    assert!(moving.x > target.x);
}
