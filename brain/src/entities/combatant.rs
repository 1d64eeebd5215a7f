// tank_brain_core/brain/src/entities/combatant.rs
// One enemy hover tank: identity, health, owned hull and every per-combatant subsystem. The
// per-tick brain lives in `systems::ai::brain`.

use crate::core::config::BrainConfig;
use crate::core::events::BrainEvent;
use crate::core::types::{
    CombatantKey, DifficultyTier, EntityId, FlankSide, TacticalIntent, TacticalState, TeamId, Vec3,
};
use crate::entities::wall::{ProtectiveWall, WallVolume};
use crate::systems::ai::adaptation::{AdaptiveIntelligence, DifficultyState, PlayerStyleClassifier};
use crate::systems::ai::avoidance::{ObstacleAvoidance, StuckMonitor};
use crate::systems::ai::decision::DecisionEngine;
use crate::systems::ai::group::GroupTracker;
use crate::systems::ai::patrol::PatrolRoute;
use crate::systems::ai::targeting::{TargetTracker, TurretController, WeaponState};
use crate::systems::physics::ballistics::ProjectileManager;
use crate::systems::physics::locomotion::LocomotionController;
use crate::systems::scheduler::Scheduler;
use crate::systems::sensors::SensorCache;
use crate::world::physics::PhysicsBody;
use crate::world::registry::{CombatantSnapshot, DamageOutcome, Damageable, HasStableId};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

/// Deferred one-shot work for a single combatant, keyed on the simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrainTask {
    SpawnStabilized,
    ReloadComplete,
    WallExpired { wall_id: EntityId },
    /// Ambush/bait hold ran out. Ignored unless `epoch` still matches the current state.
    PositionTimeout { epoch: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CombatStats {
    pub shots_fired: u64,
    pub shots_hit: u64,
    pub dodges: u64,
    pub damage_taken: f32,
    pub decisions: u64,
    pub state_changes: u64,
    pub unstuck_maneuvers: u64,
    pub repositions: u64,
    pub terrain_recoveries: u64,
    pub walls_deployed: u64,
}

impl CombatStats {
    pub fn accuracy(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.shots_hit as f32 / self.shots_fired as f32
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpawnParams {
    pub key: CombatantKey,
    pub stable_id: u64,
    pub team: TeamId,
    pub tier: DifficultyTier,
    pub now_tick: u64,
    pub seed: u64,
}

pub struct Combatant<B: PhysicsBody> {
    pub(crate) key: CombatantKey,
    pub(crate) stable_id: u64,
    pub(crate) team: TeamId,
    pub(crate) config: BrainConfig,
    pub(crate) body: B,

    pub(crate) health: f32,
    pub(crate) max_health: f32,
    pub(crate) alive: bool,
    pub(crate) disposed: bool,
    pub(crate) stabilizing: bool,

    pub(crate) state: TacticalState,
    pub(crate) state_entered_tick: u64,
    pub(crate) state_epoch: u64,
    pub(crate) force_decision: bool,
    pub(crate) next_decision_tick: u64,
    pub(crate) flank_side: FlankSide,
    /// The single state-owned destination: cover, ambush spot, bait point or escape point.
    pub(crate) tactical_position: Option<Vec3>,
    pub(crate) flank_point: Option<Vec3>,
    pub(crate) orbit_sign: f32,
    pub(crate) capture_point: Option<Vec3>,
    pub(crate) intent: TacticalIntent,

    pub(crate) target: Option<CombatantKey>,
    pub(crate) tracker: TargetTracker,

    pub(crate) patrol: PatrolRoute,
    pub(crate) sensors: SensorCache,
    pub(crate) locomotion: LocomotionController,
    pub(crate) turret: TurretController,
    pub(crate) weapon: WeaponState,
    pub(crate) projectiles: ProjectileManager,
    pub(crate) avoidance: ObstacleAvoidance,
    pub(crate) stuck: StuckMonitor,
    pub(crate) group: GroupTracker,
    pub(crate) decision: DecisionEngine,
    pub(crate) difficulty: DifficultyState,
    pub(crate) adaptive: AdaptiveIntelligence,
    pub(crate) style: PlayerStyleClassifier,
    pub(crate) scheduler: Scheduler<BrainTask>,

    pub(crate) wall: Option<ProtectiveWall>,
    pub(crate) next_wall_tick: u64,

    pub(crate) last_ground: f32,
    pub(crate) last_update_secs: f64,
    pub(crate) movement_sample: (u64, Vec3),
    pub(crate) stats: CombatStats,
    pub(crate) rng: SmallRng,
}

impl<B: PhysicsBody> Combatant<B> {
    pub fn new(params: SpawnParams, body: B, config: &BrainConfig) -> Self {
        let difficulty = DifficultyState::new(params.tier, config.adaptation.difficulty_scale);
        let profile = difficulty.profile(&config.difficulty).clone();
        let max_health = difficulty.max_health(&config.difficulty);
        let transform = body.transform();
        let position = transform.position;
        let mut rng = SmallRng::seed_from_u64(params.seed ^ params.stable_id.rotate_left(17));
        let tactics = &config.tactics;
        let patrol =
            PatrolRoute::new(position, tactics.patrol_radius, tactics.patrol_waypoints, &mut rng);

        let mut scheduler = Scheduler::new();
        let stabilized_at = params.now_tick + config.recovery.spawn_stabilize_ticks;
        scheduler.schedule_at(stabilized_at, BrainTask::SpawnStabilized);

        info!(
            "[Combatant {}]: Spawned on team {} at ({:.1}, {:.1}) as {:?}, health {:.0}",
            params.stable_id, params.team, position.x, position.z, params.tier, max_health
        );

        Combatant {
            key: params.key,
            stable_id: params.stable_id,
            team: params.team,
            config: config.clone(),
            body,
            health: max_health,
            max_health,
            alive: true,
            disposed: false,
            stabilizing: true,
            state: TacticalState::Idle,
            state_entered_tick: params.now_tick,
            state_epoch: 0,
            force_decision: false,
            next_decision_tick: 0,
            flank_side: FlankSide::Right,
            tactical_position: None,
            flank_point: None,
            orbit_sign: 1.0,
            capture_point: None,
            intent: TacticalIntent::idle(transform.yaw()),
            target: None,
            tracker: TargetTracker::new(),
            patrol,
            sensors: SensorCache::new(config.sensors.clone()),
            locomotion: LocomotionController::new(config.locomotion.clone(), profile.max_speed),
            turret: TurretController::new(
                transform.yaw(),
                crate::core::constants::TURRET_TURN_RATE_RAD,
            ),
            weapon: WeaponState::new(),
            projectiles: ProjectileManager::new(config.weapon.clone()),
            avoidance: ObstacleAvoidance::new(),
            stuck: StuckMonitor::new(),
            group: GroupTracker::new(config.group.clone()),
            decision: DecisionEngine::new(config.tactics.clone()),
            difficulty,
            adaptive: AdaptiveIntelligence::new(&config.adaptation),
            style: PlayerStyleClassifier::new(&config.adaptation),
            scheduler,
            wall: None,
            next_wall_tick: 0,
            last_ground: position.y - config.locomotion.hover_height,
            last_update_secs: 0.0,
            movement_sample: (params.now_tick, position),
            stats: CombatStats::default(),
            rng,
        }
    }

    pub fn key(&self) -> CombatantKey {
        self.key
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn position(&self) -> Vec3 {
        self.body.transform().position
    }

    pub fn get_state(&self) -> TacticalState {
        self.state
    }

    pub fn target(&self) -> Option<CombatantKey> {
        self.target
    }

    pub fn intent(&self) -> TacticalIntent {
        self.intent
    }

    pub fn turret_angle(&self) -> f32 {
        self.turret.angle()
    }

    pub fn tactical_position(&self) -> Option<Vec3> {
        self.tactical_position
    }

    pub fn flank_side(&self) -> FlankSide {
        self.flank_side
    }

    pub fn is_stabilizing(&self) -> bool {
        self.stabilizing
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn stats(&self) -> &CombatStats {
        &self.stats
    }

    pub fn patrol(&self) -> &PatrolRoute {
        &self.patrol
    }

    pub fn wall(&self) -> Option<&ProtectiveWall> {
        self.wall.as_ref()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    pub fn difficulty(&self) -> &DifficultyState {
        &self.difficulty
    }

    pub fn adaptive_multiplier(&self) -> f32 {
        self.adaptive.multiplier()
    }

    pub fn style_classifier(&self) -> &PlayerStyleClassifier {
        &self.style
    }

    pub fn weapon(&self) -> &WeaponState {
        &self.weapon
    }

    pub fn sensors(&self) -> &SensorCache {
        &self.sensors
    }

    /// Points the combatant at a new target handle. Takes effect on the next decision.
    pub fn set_target(&mut self, target: Option<CombatantKey>) {
        if target == self.target {
            return;
        }
        debug!("[Combatant {}]: Target set to {:?}", self.stable_id, target);
        self.target = target;
        self.tracker.reset();
        self.force_decision = true;
    }

    pub fn set_capture_point(&mut self, point: Option<Vec3>) {
        self.capture_point = point;
        self.force_decision = true;
    }

    pub fn capture_point(&self) -> Option<Vec3> {
        self.capture_point
    }

    /// Replaces the patrol route with explicit waypoints.
    pub fn set_patrol_route(&mut self, waypoints: Vec<Vec3>) {
        let radius = self.config.tactics.patrol_radius;
        self.patrol = PatrolRoute::from_waypoints(self.position(), waypoints, radius);
    }

    /// Moves the continuous difficulty scale, keeping the current health fraction so the
    /// change never causes a jump in relative health.
    pub fn set_difficulty_scale(&mut self, scale: f32) {
        let fraction = self.health_fraction();
        self.difficulty.set_scale(scale);
        self.max_health = self.difficulty.max_health(&self.config.difficulty);
        if self.alive {
            self.health = (self.max_health * fraction).max(f32::MIN_POSITIVE);
        }
    }

    pub fn set_difficulty_tier(&mut self, tier: DifficultyTier) {
        let fraction = self.health_fraction();
        self.difficulty.tier = tier;
        self.max_health = self.difficulty.max_health(&self.config.difficulty);
        if self.alive {
            self.health = (self.max_health * fraction).max(f32::MIN_POSITIVE);
        }
        self.locomotion.set_max_speed(self.difficulty.profile(&self.config.difficulty).max_speed);
    }

    /// Pushes a (validated) config into the live subsystems.
    pub fn apply_settings(&mut self, config: &BrainConfig) {
        self.config = config.clone();
        self.decision.set_config(config.tactics.clone());
        self.locomotion.set_config(config.locomotion.clone());
        self.group.set_ally_radius(config.group.ally_radius);
        self.set_difficulty_scale(config.adaptation.difficulty_scale);
    }

    /// Shot outcome reported back by the combat-resolution host.
    pub fn record_shot_result(&mut self, hit: bool) {
        if hit {
            self.stats.shots_hit += 1;
        }
    }

    pub fn record_dodge(&mut self) {
        self.stats.dodges += 1;
        debug!("[Combatant {}]: Dodged a round ({} total)", self.stable_id, self.stats.dodges);
    }

    /// Damages our wall. Returns the destruction event if this broke it.
    pub fn damage_wall(&mut self, wall_id: EntityId, amount: f32) -> Option<BrainEvent> {
        let wall = self.wall.as_mut().filter(|w| w.id() == wall_id)?;
        if !wall.apply_damage(amount) {
            return None;
        }
        let position = wall.volume.center;
        self.wall = None;
        self.scheduler.cancel_where(
            |task| matches!(task, BrainTask::WallExpired { wall_id: id } if *id == wall_id),
        );
        debug!("[Combatant {}]: Wall {} destroyed", self.stable_id, wall_id);
        Some(BrainEvent::WallDestroyed { owner: self.key, wall_id, position, expired: false })
    }

    /// Tears the combatant down: projectiles, timers and wall go with it. Returns the wall
    /// that was removed, if any.
    pub fn dispose(&mut self) -> Option<WallVolume> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        self.alive = false;
        self.projectiles.clear();
        self.scheduler.clear();
        self.locomotion.reset();
        self.target = None;
        info!(
            "[Combatant {}]: Disposed after {} shots ({} hits)",
            self.stable_id, self.stats.shots_fired, self.stats.shots_hit
        );
        self.wall.take().map(|w| w.volume)
    }

    /// Read-only view published to the registry after every update.
    pub fn snapshot(&self) -> CombatantSnapshot {
        let transform = self.body.transform();
        CombatantSnapshot {
            stable_id: self.stable_id,
            team: self.team,
            is_player: false,
            position: transform.position,
            velocity: self.body.linear_velocity(),
            yaw: transform.yaw(),
            health: self.health,
            max_health: self.max_health,
            alive: self.alive,
            state: self.state,
            target: self.target,
            wall: self.wall.as_ref().map(|w| w.volume.clone()),
        }
    }
}

impl<B: PhysicsBody> HasStableId for Combatant<B> {
    fn stable_id(&self) -> u64 {
        self.stable_id
    }
}

impl<B: PhysicsBody> Damageable for Combatant<B> {
    fn health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive || self.disposed || !amount.is_finite() || amount <= 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0.0);
        self.stats.damage_taken += amount;
        self.style.record_damage(self.last_update_secs, amount);
        if self.health <= 0.0 {
            self.alive = false;
            self.intent = TacticalIntent::idle(self.turret.angle());
            self.locomotion.reset();
            info!("[Combatant {}]: Destroyed", self.stable_id);
            DamageOutcome::Killed
        } else {
            debug!(
                "[Combatant {}]: Took {:.1} damage, {:.1} left",
                self.stable_id, amount, self.health
            );
            DamageOutcome::Damaged { remaining: self.health }
        }
    }
}
