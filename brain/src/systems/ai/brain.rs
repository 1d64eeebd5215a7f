// tank_brain_core/brain/src/systems/ai/brain.rs
// Per-tick driver for a combatant: timers, target revalidation, throttled decisions, state
// execution, aiming and firing, recovery checks. `update_physics` is the force sub-tick.

use crate::core::constants::*;
use crate::core::error::{BrainError, BrainResult};
use crate::core::events::{BrainEvent, RecoveryLevel};
use crate::core::math::{flat_distance, yaw_between, yaw_to_direction};
use crate::core::types::{CombatantKey, FlankSide, TacticalIntent, TacticalState, Vec3};
use crate::concurrent::event_queue::PriorityEventQueue;
use crate::entities::combatant::{BrainTask, Combatant};
use crate::entities::wall::ProtectiveWall;
use crate::systems::ai::avoidance::{
    apply_forced_unstuck, apply_hard_reposition, apply_terrain_recovery, terrain_penetration,
    StuckVerdict,
};
use crate::systems::ai::behaviors::{execute_state, local_flank_point, AimInfo, BehaviorInput};
use crate::systems::ai::decision::{
    directional_ambush_search, Decision, DecisionContext, TacticalQueries, TargetInfo,
};
use crate::systems::ai::targeting::{
    aim_spread, fire_direction, lead_point, muzzle_clear, muzzle_origin, WeaponState,
};
use crate::systems::physics::locomotion::LocomotionReport;
use crate::world::pathfinding::Pathfinder;
use crate::world::physics::PhysicsBody;
use crate::world::query::SpatialQuery;
use crate::world::registry::{Damageable, WorldView};
use rand::Rng;
use tracing::{debug, trace, warn};

const MOVEMENT_SAMPLE_TICKS: u64 = 60;
const ATTEMPTING_MOVEMENT_THROTTLE: f32 = 0.1;

/// What an `update` call ended up doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Dead, or the hull was torn down underneath us.
    Inactive,
    Stabilizing,
    Active { state: TacticalState, decided: bool, fired: bool },
}

/// Search adapter handed to the decision engine.
struct WorldQueries<'w> {
    spatial: &'w dyn SpatialQuery,
    pathfinder: Option<&'w dyn Pathfinder>,
    cover_radius: f32,
    eye_height: f32,
    ambush_band: (f32, f32),
}

impl TacticalQueries for WorldQueries<'_> {
    fn find_cover(&mut self, self_pos: Vec3, target_pos: Vec3) -> Option<Vec3> {
        self.pathfinder?.find_cover(self_pos, target_pos, self.cover_radius)
    }

    fn find_ambush_position(&mut self, self_pos: Vec3, target_pos: Vec3) -> Option<Vec3> {
        directional_ambush_search(
            self.spatial,
            self_pos,
            target_pos,
            self.cover_radius,
            self.eye_height,
            self.ambush_band,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Engagement {
    info: TargetInfo,
    aim_point: Vec3,
}

impl<B: PhysicsBody> Combatant<B> {
    /// Decision and aim tick. Never blocks; a dead combatant does nothing.
    pub fn update(&mut self, world: &WorldView<'_>, dt: f32) -> BrainResult<TickOutcome> {
        if self.disposed {
            return Err(BrainError::Disposed(self.stable_id));
        }
        if !self.alive || self.body.is_disposed() {
            return Ok(TickOutcome::Inactive);
        }
        let tick = world.clock.tick;
        self.last_update_secs = world.clock.time_secs;
        self.run_scheduled(tick, world.events);

        let transform = self.body.transform();
        let position = transform.position;
        if !position.is_finite() {
            return Err(BrainError::NumericInstability(format!(
                "combatant {} has non-finite position {:?}",
                self.stable_id, position
            )));
        }
        let hull_yaw = transform.yaw();
        self.last_ground = self.sensors.ground_height(tick, position, world.terrain, world.spatial);

        if self.stabilizing {
            self.intent = TacticalIntent::idle(hull_yaw);
            self.locomotion.set_targets(0.0, 0.0);
            return Ok(TickOutcome::Stabilizing);
        }
        if self.state == TacticalState::Idle {
            self.enter_state(Decision::to(TacticalState::Patrol), tick, world);
        }

        self.group.refresh_if_due(tick, self.key, world.registry);
        let engagement = self.revalidate_target(world, position, dt);

        let mut decided = false;
        if self.force_decision || tick >= self.next_decision_tick {
            decided = self.evaluate(world, tick, position, engagement.map(|e| e.info));
        }

        let waypoint = if self.state == TacticalState::Patrol {
            self.patrol.update(position, self.config.tactics.waypoint_radius, &mut self.rng)
        } else {
            self.patrol.current(&mut self.rng)
        };
        if self.state == TacticalState::Flank && self.flank_point.is_none() {
            if let Some(e) = engagement {
                self.flank_point = Some(self.resolve_flank_point(world, position, e.info.position));
            }
        }

        let input = BehaviorInput {
            position,
            hull_yaw,
            target: engagement.map(|e| AimInfo {
                position: e.info.position,
                aim_point: e.aim_point,
                distance: e.info.distance,
                visible: e.info.visible,
            }),
            waypoint,
            tactical_position: self.tactical_position,
            flank_point: self.flank_point,
            capture_point: self.capture_point,
            capture_radius: self.config.tactics.capture_radius,
            arrive_radius: self.config.tactics.waypoint_radius,
            weapon_range: self.config.tactics.weapon_range,
            optimal_range: self.optimal_range(),
            orbit_sign: self.orbit_sign,
        };
        let mut intent = execute_state(self.state, &input);
        if intent.throttle > 0.0 || self.avoidance.is_reversing() {
            let fan = self.sensors.obstacle_fan(tick, self.key, position, hull_yaw, world.spatial);
            intent = self.avoidance.apply(intent, &fan, &self.config.recovery);
        }
        self.intent = intent;
        self.locomotion.set_targets(intent.throttle, intent.steer);
        self.turret.update(intent.turret_target_angle, dt);

        let fired = match engagement {
            Some(e) if intent.fire => self.try_fire(world, tick, position, e),
            _ => false,
        };

        self.maybe_deploy_wall(world, tick, position, engagement.map(|e| e.info.position));
        self.projectiles.step(dt, self.team, world);
        self.check_stuck(world, position);
        self.sample_movement(world.events, tick, position);
        self.adaptive.update(dt, self.state.is_engaging());

        Ok(TickOutcome::Active { state: self.state, decided, fired })
    }

    /// Force-application sub-tick. Runs every frame, including while stabilising.
    pub fn update_physics(
        &mut self,
        events: &PriorityEventQueue,
        dt: f32,
    ) -> BrainResult<LocomotionReport> {
        if self.disposed {
            return Err(BrainError::Disposed(self.stable_id));
        }
        if !self.alive {
            return Ok(LocomotionReport { skipped: true, ..Default::default() });
        }
        let report = self.locomotion.apply(&mut self.body, self.last_ground, dt);
        if report.sanitized {
            warn!("[Combatant {}]: Non-finite velocity zeroed", self.stable_id);
        }
        if report.skipped {
            return Ok(report);
        }

        let y = self.body.transform().position.y;
        if let Some(depth) = terrain_penetration(y, self.last_ground, &self.config.recovery) {
            apply_terrain_recovery(&mut self.body, &self.config.recovery);
            self.stats.terrain_recoveries += 1;
            warn!(
                "[Combatant {}]: {:.2} below ground, applying recovery force",
                self.stable_id, depth
            );
            events.emit(BrainEvent::TerrainRecovery { combatant: self.key, depth });
        }
        Ok(report)
    }

    fn run_scheduled(&mut self, tick: u64, events: &PriorityEventQueue) {
        for task in self.scheduler.drain_due(tick) {
            match task {
                BrainTask::SpawnStabilized => {
                    self.stabilizing = false;
                    self.stuck.reset(self.last_update_secs, self.position());
                    debug!("[Combatant {}]: Stabilised, brain online", self.stable_id);
                }
                BrainTask::ReloadComplete => self.weapon.complete_reload(),
                BrainTask::WallExpired { wall_id } => {
                    if self.wall.as_ref().map_or(false, |w| w.id() == wall_id) {
                        if let Some(wall) = self.wall.take() {
                            debug!("[Combatant {}]: Wall {} expired", self.stable_id, wall_id);
                            events.emit(BrainEvent::WallDestroyed {
                                owner: self.key,
                                wall_id,
                                position: wall.volume.center,
                                expired: true,
                            });
                        }
                    }
                }
                BrainTask::PositionTimeout { epoch } => {
                    if epoch == self.state_epoch {
                        trace!(
                            "[Combatant {}]: {} hold timed out",
                            self.stable_id,
                            self.state.as_str()
                        );
                        self.tactical_position = None;
                        self.force_decision = true;
                    }
                }
            }
        }
    }

    fn detection_range(&self) -> f32 {
        let profile = self.difficulty.profile(&self.config.difficulty);
        (profile.detection_range * self.style.bias().detection_range_scale)
            .max(self.config.tactics.weapon_range)
    }

    fn optimal_range(&self) -> f32 {
        (self.config.tactics.optimal_range * self.style.bias().preferred_range_scale)
            .min(self.config.tactics.weapon_range)
    }

    /// Drops a target whose handle no longer resolves to a live combatant, picks up the
    /// nearest hostile when idle-handed, and refreshes the motion estimate.
    fn revalidate_target(
        &mut self,
        world: &WorldView<'_>,
        position: Vec3,
        dt: f32,
    ) -> Option<Engagement> {
        if let Some(key) = self.target {
            if world.registry.resolve_live(key).is_none() {
                debug!("[Combatant {}]: Target {:?} gone, dropping it", self.stable_id, key);
                self.target = None;
                self.tracker.reset();
                self.force_decision = true;
            }
        }
        if self.target.is_none() {
            let nearest = world.registry.nearest_hostile(self.key, self.detection_range());
            if let Some((key, _)) = nearest {
                debug!("[Combatant {}]: Acquired target {:?}", self.stable_id, key);
                self.target = Some(key);
                self.force_decision = true;
            }
        }
        let key: CombatantKey = self.target?;
        let snapshot = world.registry.resolve_live(key)?;
        self.tracker.observe(key, snapshot.position, dt);
        let visible = self.sensors.line_of_sight(
            world.clock.tick,
            self.key,
            position,
            key,
            snapshot.position,
            world.spatial,
        );
        let profile = self.difficulty.profile(&self.config.difficulty);
        let aim_point = lead_point(
            muzzle_origin(position, self.turret.angle()),
            snapshot.position,
            self.tracker.velocity(),
            self.tracker.acceleration(),
            self.config.weapon.projectile_speed,
            profile,
        );
        Some(Engagement {
            info: TargetInfo {
                key,
                position: snapshot.position,
                distance: flat_distance(position, snapshot.position),
                health_fraction: snapshot.health_fraction(),
                visible,
            },
            aim_point,
        })
    }

    /// Runs the transition function unless a minimum dwell is still holding. Returns whether
    /// a decision was taken.
    fn evaluate(
        &mut self,
        world: &WorldView<'_>,
        tick: u64,
        position: Vec3,
        target: Option<TargetInfo>,
    ) -> bool {
        let health_fraction = self.health_fraction();
        let interval = self
            .decision
            .decision_interval(target.map(|t| t.distance), self.difficulty.cadence_factor());
        self.next_decision_tick = tick + interval;

        let dwell_held = self.state.has_min_dwell()
            && tick.saturating_sub(self.state_entered_tick) < self.config.tactics.min_dwell_ticks
            && health_fraction >= CRITICAL_HEALTH_FRACTION
            && !self.force_decision;
        if dwell_held {
            return false;
        }
        self.force_decision = false;
        self.style.reclassify(world.clock.time_secs);

        let ctx = DecisionContext {
            tick,
            position,
            health_fraction,
            target,
            detection_range: self.detection_range(),
            optimal_range: self.optimal_range(),
            has_capture_point: self.capture_point.is_some(),
            nearest_ally: self.group.nearest_ally().map(|a| a.position),
            allies_engaging: target.map_or(0, |t| self.group.allies_engaging(t.key)),
            engaging_allies_center: target
                .and_then(|t| self.group.engaging_average_position(t.key)),
        };
        let t = &self.config.tactics;
        let mut queries = WorldQueries {
            spatial: world.spatial,
            pathfinder: world.pathfinder,
            cover_radius: t.cover_search_radius,
            eye_height: self.sensors.eye_height(),
            ambush_band: (t.ambush_min_range, t.ambush_max_range),
        };
        let decision = self.decision.decide(&ctx, &mut queries, &mut self.rng);
        self.stats.decisions += 1;

        if decision.state == self.state {
            self.refresh_current_state(decision, world, position, target);
        } else {
            self.enter_state(decision, tick, world);
            if let (TacticalState::Flank, Some(t)) = (self.state, target) {
                self.flank_point = Some(self.resolve_flank_point(world, position, t.position));
            }
        }
        true
    }

    /// Same state chosen again: keep it, but let fresh data update its destination.
    fn refresh_current_state(
        &mut self,
        decision: Decision,
        world: &WorldView<'_>,
        position: Vec3,
        target: Option<TargetInfo>,
    ) {
        match self.state {
            TacticalState::Retreat => {
                if decision.position.is_some() {
                    self.tactical_position = decision.position;
                }
            }
            TacticalState::Flank => {
                if let Some(side) = decision.flank_side {
                    self.flank_side = side;
                }
                if let Some(t) = target {
                    self.flank_point = Some(self.resolve_flank_point(world, position, t.position));
                }
            }
            TacticalState::Evade => {
                if self.tactical_position.is_none() {
                    self.tactical_position = decision.position;
                }
            }
            _ => {}
        }
    }

    /// Switches state. State-owned data is cleared and the epoch bumped so any pending
    /// timeout from the previous state becomes a no-op.
    pub(crate) fn enter_state(&mut self, decision: Decision, tick: u64, world: &WorldView<'_>) {
        let from = self.state;
        let to = decision.state;
        self.state = to;
        self.state_entered_tick = tick;
        self.state_epoch += 1;
        self.tactical_position = decision.position;
        self.flank_point = None;
        if let Some(side) = decision.flank_side {
            self.flank_side = side;
        }
        let hold_secs = match to {
            TacticalState::Ambush => Some(self.config.tactics.ambush_duration_secs),
            TacticalState::Bait => Some(self.config.tactics.bait_duration_secs),
            _ => None,
        };
        if let Some(secs) = hold_secs {
            let epoch = self.state_epoch;
            let due = tick + self.config.secs_to_ticks(secs).max(1);
            self.scheduler.schedule_at(due, BrainTask::PositionTimeout { epoch });
        }
        if to == TacticalState::Attack {
            self.orbit_sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        }
        self.stats.state_changes += 1;
        match decision.position {
            Some(p) => debug!(
                "[Combatant {}]: {} -> {} via ({:.1}, {:.1})",
                self.stable_id,
                from.as_str(),
                to.as_str(),
                p.x,
                p.z
            ),
            None => debug!("[Combatant {}]: {} -> {}", self.stable_id, from.as_str(), to.as_str()),
        }
        world.events.emit(BrainEvent::StateChanged {
            combatant: self.key,
            stable_id: self.stable_id,
            from,
            to,
        });
    }

    fn resolve_flank_point(&self, world: &WorldView<'_>, position: Vec3, target_pos: Vec3) -> Vec3 {
        let side: FlankSide = self.flank_side;
        let distance = self.config.tactics.flank_distance;
        world
            .pathfinder
            .and_then(|p| p.find_flank_position(position, target_pos, side))
            .unwrap_or_else(|| local_flank_point(position, target_pos, side, distance))
    }

    /// Fires when aimed, loaded and the muzzle is clear. Returns whether a round left.
    fn try_fire(
        &mut self,
        world: &WorldView<'_>,
        tick: u64,
        position: Vec3,
        engagement: Engagement,
    ) -> bool {
        let target_angle = self.intent.turret_target_angle;
        if !self.turret.is_aimed(target_angle) || !self.weapon.can_fire() {
            return false;
        }
        let profile = self.difficulty.profile(&self.config.difficulty).clone();
        let origin = muzzle_origin(position, self.turret.angle());
        let spread = aim_spread(
            &profile,
            engagement.info.distance,
            self.config.tactics.weapon_range,
            self.difficulty.scale(),
            self.adaptive.multiplier(),
        );
        let speed = self.config.weapon.projectile_speed;
        let direction = fire_direction(origin, engagement.aim_point, speed, spread, &mut self.rng);
        let target = Some(engagement.info.key);
        if !muzzle_clear(world.spatial, self.key, target, position, engagement.aim_point) {
            trace!("[Combatant {}]: Holding fire, line of fire obstructed", self.stable_id);
            return false;
        }

        let inherited = self.body.linear_velocity();
        let projectile_id = self.projectiles.spawn(self.key, target, origin, direction, inherited);
        let transform = self.body.transform();
        let mass = self.body.mass();
        self.body.apply_impulse(-direction * self.config.weapon.recoil_impulse, origin);
        self.body.apply_torque(-transform.flat_right() * self.config.weapon.recoil_torque * mass);

        self.weapon.record_shot();
        self.stats.shots_fired += 1;
        let min_cooldown = self.config.weapon.min_cooldown_secs;
        let cooldown = WeaponState::cooldown_secs(&profile, self.difficulty.scale(), min_cooldown);
        let reload_due = tick + self.config.secs_to_ticks(cooldown).max(1);
        self.scheduler.schedule_at(reload_due, BrainTask::ReloadComplete);

        world.events.emit(BrainEvent::ShotFired {
            shooter: self.key,
            target,
            projectile_id,
            origin,
            direction,
        });
        world.events.emit(BrainEvent::MuzzleFlash { position: origin, direction });
        trace!(
            "[Combatant {}]: Fired at {:?}, reload {:.2}s",
            self.stable_id,
            engagement.info.key,
            cooldown
        );
        true
    }

    /// Drops a wall between us and the target while retreating hurt.
    fn maybe_deploy_wall(
        &mut self,
        world: &WorldView<'_>,
        tick: u64,
        position: Vec3,
        target_pos: Option<Vec3>,
    ) {
        let t = &self.config.tactics;
        let Some(target_pos) = target_pos else {
            return;
        };
        if self.state != TacticalState::Retreat
            || self.wall.is_some()
            || tick < self.next_wall_tick
            || self.health_fraction() >= t.wall_deploy_health
        {
            return;
        }
        let bearing = yaw_between(position, target_pos);
        let center =
            position + yaw_to_direction(bearing) * WALL_STANDOFF + Vec3::Y * WALL_HALF_EXTENTS[1];
        let lifetime = self.config.secs_to_ticks(t.wall_lifetime_secs).max(1);
        let wall = ProtectiveWall::new(self.key, center, bearing, tick, lifetime);
        let wall_id = wall.id();
        self.scheduler.schedule_at(wall.expires_at_tick, BrainTask::WallExpired { wall_id });
        self.next_wall_tick = tick + self.config.secs_to_ticks(t.wall_cooldown_secs);
        self.wall = Some(wall);
        self.stats.walls_deployed += 1;
        debug!(
            "[Combatant {}]: Deployed wall {} at ({:.1}, {:.1})",
            self.stable_id, wall_id, center.x, center.z
        );
        world.events.emit(BrainEvent::WallDeployed { owner: self.key, wall_id, position: center });
    }

    fn check_stuck(&mut self, world: &WorldView<'_>, position: Vec3) {
        let attempting = self.locomotion.throttle_target().abs() > ATTEMPTING_MOVEMENT_THROTTLE;
        let recovery = &self.config.recovery;
        let verdict = self.stuck.check(world.clock.time_secs, position, attempting, recovery);
        match verdict {
            StuckVerdict::ForceUnstuck => {
                let side =
                    apply_forced_unstuck(&mut self.body, &self.config.recovery, &mut self.rng);
                self.avoidance.start_reverse(self.config.recovery.reverse_bias_ticks, side);
                self.avoidance.flip_side();
                self.patrol.replace_current(&mut self.rng);
                self.sensors.invalidate();
                self.stats.unstuck_maneuvers += 1;
                warn!(
                    "[Combatant {}]: Stuck at ({:.1}, {:.1}), forcing unstuck",
                    self.stable_id, position.x, position.z
                );
                world.events.emit(BrainEvent::StuckRecovery {
                    combatant: self.key,
                    level: RecoveryLevel::ForcedUnstuck,
                    position,
                });
            }
            StuckVerdict::HardReposition => {
                let hover = self.locomotion.hover_height();
                let recovery = &self.config.recovery;
                apply_hard_reposition(&mut self.body, self.last_ground, hover, recovery);
                self.patrol.regenerate(&mut self.rng);
                self.sensors.invalidate();
                self.stats.repositions += 1;
                warn!("[Combatant {}]: Still stuck, hard reposition", self.stable_id);
                world.events.emit(BrainEvent::StuckRecovery {
                    combatant: self.key,
                    level: RecoveryLevel::HardReposition,
                    position,
                });
            }
            StuckVerdict::Stalled { consecutive } => {
                trace!("[Combatant {}]: No progress ({} checks)", self.stable_id, consecutive);
            }
            StuckVerdict::NotDue | StuckVerdict::Idle | StuckVerdict::Moving => {}
        }
    }

    fn sample_movement(&mut self, events: &PriorityEventQueue, tick: u64, position: Vec3) {
        let (since, from) = self.movement_sample;
        let elapsed = tick.saturating_sub(since);
        if elapsed < MOVEMENT_SAMPLE_TICKS {
            return;
        }
        let distance = flat_distance(position, from);
        let speed = distance / (elapsed as f32 * self.config.fixed_delta());
        self.movement_sample = (tick, position);
        events.emit(BrainEvent::Movement { combatant: self.key, distance, speed });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BrainConfig;
    use crate::core::types::{DifficultyTier, Transform};
    use crate::entities::combatant::SpawnParams;
    use crate::world::registry::{Clock, CombatantRegistry};
    use crate::world::sandbox::{SandboxBody, SandboxWorld};

    fn spawn(
        registry: &mut CombatantRegistry,
        config: &BrainConfig,
        at: Vec3,
    ) -> Combatant<SandboxBody> {
        let key = registry.register(1, false, at, 100.0);
        let stable_id = registry.get(key).map(|s| s.stable_id).unwrap_or_default();
        let body = SandboxBody::new(Transform::from_position_yaw(at, 0.0), DEFAULT_BODY_MASS);
        let params = SpawnParams {
            key,
            stable_id,
            team: 1,
            tier: DifficultyTier::Normal,
            now_tick: 0,
            seed: 11,
        };
        Combatant::new(params, body, config)
    }

    #[test]
    fn stabilises_then_resolves_idle_to_patrol() {
        let config = BrainConfig::default();
        let mut registry = CombatantRegistry::new();
        let world = SandboxWorld::flat();
        let events = PriorityEventQueue::new();
        let mut c = spawn(&mut registry, &config, Vec3::new(0.0, 1.2, 0.0));

        let view = |tick: u64| WorldView {
            registry: &registry,
            spatial: &world,
            terrain: &world,
            pathfinder: Some(&world),
            events: &events,
            clock: Clock { tick, time_secs: tick as f64 / 60.0 },
        };
        assert_eq!(c.update(&view(1), FIXED_DELTA_SECS).ok(), Some(TickOutcome::Stabilizing));
        assert_eq!(c.get_state(), TacticalState::Idle);

        let outcome = c.update(&view(config.recovery.spawn_stabilize_ticks), FIXED_DELTA_SECS).ok();
        assert!(matches!(outcome, Some(TickOutcome::Active { state: TacticalState::Patrol, .. })));
        assert!(events
            .drain()
            .iter()
            .any(|e| matches!(e, BrainEvent::StateChanged { to: TacticalState::Patrol, .. })));
    }

    #[test]
    fn stale_position_timeout_is_ignored() {
        let config = BrainConfig::default();
        let mut registry = CombatantRegistry::new();
        let world = SandboxWorld::flat();
        let events = PriorityEventQueue::new();
        let mut c = spawn(&mut registry, &config, Vec3::new(0.0, 1.2, 0.0));
        let view = WorldView {
            registry: &registry,
            spatial: &world,
            terrain: &world,
            pathfinder: None,
            events: &events,
            clock: Clock::default(),
        };
        let spot = Vec3::new(10.0, 0.0, 10.0);
        c.enter_state(Decision::at(TacticalState::Bait, spot), 0, &view);
        c.enter_state(Decision::at(TacticalState::Ambush, spot), 1, &view);
        c.force_decision = false;
        // The bait timeout fires first but carries an old epoch.
        let bait_due = config.secs_to_ticks(config.tactics.bait_duration_secs);
        let ambush_due = 1 + config.secs_to_ticks(config.tactics.ambush_duration_secs);
        assert!(bait_due < ambush_due);
        c.run_scheduled(bait_due, &events);
        assert_eq!(c.tactical_position(), Some(spot));
        assert!(!c.force_decision);
        c.run_scheduled(ambush_due, &events);
        assert_eq!(c.tactical_position(), None);
        assert!(c.force_decision);
    }

    #[test]
    fn disposed_combatant_refuses_updates() {
        let config = BrainConfig::default();
        let mut registry = CombatantRegistry::new();
        let world = SandboxWorld::flat();
        let events = PriorityEventQueue::new();
        let mut c = spawn(&mut registry, &config, Vec3::new(0.0, 1.2, 0.0));
        c.dispose();
        let view = WorldView {
            registry: &registry,
            spatial: &world,
            terrain: &world,
            pathfinder: None,
            events: &events,
            clock: Clock::default(),
        };
        assert!(matches!(c.update(&view, FIXED_DELTA_SECS), Err(BrainError::Disposed(_))));
    }
}
