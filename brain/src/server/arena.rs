// tank_brain_core/brain/src/server/arena.rs
// Headless host for a set of combatants: owns the registry, the sandbox collaborators and the
// shared event queue, runs the per-tick loop and resolves combat outcomes that the brains
// only announce.

use crate::concurrent::event_queue::PriorityEventQueue;
use crate::core::config::{BrainConfig, SettingsPatch};
use crate::core::constants::DEFAULT_BODY_MASS;
use crate::core::error::{BrainError, BrainResult};
use crate::core::events::BrainEvent;
use crate::core::types::{CombatantKey, DifficultyTier, TacticalState, TeamId, Transform, Vec3};
use crate::entities::combatant::{Combatant, SpawnParams};
use crate::operational::monitoring::metrics::TelemetryRecorder;
use crate::systems::ai::brain::TickOutcome;
use crate::world::query::Terrain;
use crate::world::registry::{Clock, CombatantRegistry, DamageOutcome, Damageable, WorldView};
use crate::world::sandbox::{SandboxBody, SandboxWorld};
use serde::Serialize;
use slotmap::SecondaryMap;
use tracing::{debug, error, info, warn};

const PLAYER_MAX_HEALTH: f32 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArenaTickReport {
    pub tick: u64,
    pub active: usize,
    pub stabilizing: usize,
    pub decisions: usize,
    pub shots: usize,
    pub hits: usize,
    pub kills: usize,
    pub disposed: usize,
    pub errors: usize,
    pub events: usize,
}

pub struct Arena {
    config: BrainConfig,
    registry: CombatantRegistry,
    world: SandboxWorld,
    events: PriorityEventQueue,
    combatants: SecondaryMap<CombatantKey, Combatant<SandboxBody>>,
    clock: Clock,
    telemetry: TelemetryRecorder,
    recent_events: Vec<BrainEvent>,
    seed: u64,
    spawn_count: u64,
}

impl Arena {
    pub fn new(config: BrainConfig, world: SandboxWorld, seed: u64) -> BrainResult<Self> {
        config.validate()?;
        info!("Arena created (tick rate {} Hz, seed {})", config.tick_rate, seed);
        Ok(Arena {
            config,
            registry: CombatantRegistry::new(),
            world,
            events: PriorityEventQueue::new(),
            combatants: SecondaryMap::new(),
            clock: Clock::default(),
            telemetry: TelemetryRecorder::new(),
            recent_events: Vec::new(),
            seed,
            spawn_count: 0,
        })
    }

    /// Spawns an enemy combatant hovering above `position` and returns its handle.
    pub fn spawn_combatant(
        &mut self,
        team: TeamId,
        tier: DifficultyTier,
        position: Vec3,
    ) -> BrainResult<CombatantKey> {
        let ground = self.world.ground_height_at(position.x, position.z).unwrap_or(0.0);
        let at = Vec3::new(position.x, ground + self.config.locomotion.hover_height, position.z);
        let max_health = self.config.difficulty.profile(tier).max_health;
        let key = self.registry.register(team, false, at, max_health);
        let stable_id = self
            .registry
            .get(key)
            .map(|s| s.stable_id)
            .ok_or_else(|| BrainError::Internal(format!("freshly registered {:?} missing", key)))?;

        // Face the middle of the arena.
        let yaw = (-at.x).atan2(-at.z);
        let body = SandboxBody::new(Transform::from_position_yaw(at, yaw), DEFAULT_BODY_MASS);
        self.spawn_count += 1;
        let params = SpawnParams {
            key,
            stable_id,
            team,
            tier,
            now_tick: self.clock.tick,
            seed: self.seed.wrapping_add(self.spawn_count.wrapping_mul(0x9E37_79B9)),
        };
        let combatant = Combatant::new(params, body, &self.config);
        self.registry.publish(key, combatant.snapshot())?;
        self.combatants.insert(key, combatant);
        Ok(key)
    }

    /// Registers an externally driven combatant (a human player). Its snapshot is moved by
    /// `update_player` and damaged directly in the registry.
    pub fn spawn_player(&mut self, team: TeamId, position: Vec3) -> CombatantKey {
        let key = self.registry.register(team, true, position, PLAYER_MAX_HEALTH);
        info!("Player joined team {} at ({:.1}, {:.1})", team, position.x, position.z);
        key
    }

    pub fn update_player(
        &mut self,
        key: CombatantKey,
        position: Vec3,
        velocity: Vec3,
    ) -> BrainResult<()> {
        let snapshot = self
            .registry
            .get_mut(key)
            .filter(|s| s.is_player)
            .ok_or_else(|| BrainError::NotFound(format!("player {:?}", key)))?;
        snapshot.position = position;
        snapshot.velocity = velocity;
        if velocity.x != 0.0 || velocity.z != 0.0 {
            snapshot.yaw = velocity.x.atan2(velocity.z);
        }
        Ok(())
    }

    /// Validates and applies a partial settings update to the arena and every live brain.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) -> BrainResult<Vec<&'static str>> {
        let adjusted = self.config.apply_patch(patch)?;
        for combatant in self.combatants.values_mut() {
            combatant.apply_settings(&self.config);
        }
        info!(
            "Settings patch applied to {} combatants ({} fields clamped)",
            self.combatants.len(),
            adjusted.len()
        );
        Ok(adjusted)
    }

    /// One simulation frame: brains, physics sub-tick, combat resolution, disposal.
    pub fn tick(&mut self, dt: f32) -> ArenaTickReport {
        self.clock.advance(dt);
        let mut report = ArenaTickReport { tick: self.clock.tick, ..Default::default() };
        self.world.sync_from(&self.registry);
        self.recent_events.clear();

        let keys: Vec<CombatantKey> = self.combatants.keys().collect();
        let mut faulted = Vec::new();
        for &key in &keys {
            let Some(combatant) = self.combatants.get_mut(key) else {
                continue;
            };
            let view = WorldView {
                registry: &self.registry,
                spatial: &self.world,
                terrain: &self.world,
                pathfinder: Some(&self.world),
                events: &self.events,
                clock: self.clock,
            };
            match combatant.update(&view, dt) {
                Ok(TickOutcome::Active { decided, fired, .. }) => {
                    report.active += 1;
                    report.decisions += decided as usize;
                    report.shots += fired as usize;
                }
                Ok(TickOutcome::Stabilizing) => report.stabilizing += 1,
                Ok(TickOutcome::Inactive) => {}
                Err(e) => {
                    report.errors += 1;
                    if e.is_recoverable() {
                        warn!("Combatant {:?} tick failed: {}", key, e);
                    } else {
                        error!("Combatant {:?} tick failed: {}", key, e);
                    }
                    faulted.push(key);
                    continue;
                }
            }
            if let Err(e) = self.registry.publish(key, combatant.snapshot()) {
                warn!("Snapshot publish failed: {}", e);
            }
        }

        // A faulted combatant keeps its last published snapshot and gets no forces.
        for &key in keys.iter().filter(|k| !faulted.contains(k)) {
            let Some(combatant) = self.combatants.get_mut(key) else {
                continue;
            };
            if let Err(e) = combatant.update_physics(&self.events, dt) {
                report.errors += 1;
                warn!("Combatant {:?} physics sub-tick failed: {}", key, e);
                continue;
            }
            combatant.body_mut().integrate(dt);
            self.world.resolve_body_collisions(combatant.body_mut());
            if let Err(e) = self.registry.publish(key, combatant.snapshot()) {
                warn!("Snapshot publish failed: {}", e);
            }
        }

        self.route_events(&mut report);
        report.disposed = self.dispose_dead();
        self.telemetry.update_alive_count(self.combatants.len());
        report
    }

    fn route_events(&mut self, report: &mut ArenaTickReport) {
        let mut pending = self.events.drain();
        while !pending.is_empty() {
            let mut follow_ups = Vec::new();
            for event in pending {
                match &event {
                    BrainEvent::ProjectileHit { shooter, target, damage, position, .. } => {
                        report.hits += 1;
                        if let Some(c) = self.combatants.get_mut(*shooter) {
                            c.record_shot_result(true);
                        }
                        let outcome = self.apply_damage(*target, *shooter, *damage);
                        if let DamageOutcome::Killed = outcome {
                            report.kills += 1;
                            follow_ups.push(BrainEvent::CombatantKilled {
                                combatant: *target,
                                killer: Some(*shooter),
                                position: *position,
                            });
                        }
                    }
                    BrainEvent::WallImpact { shooter, owner, wall_id, damage, .. } => {
                        if let Some(c) = self.combatants.get_mut(*shooter) {
                            c.record_shot_result(false);
                        }
                        if let Some(wall_owner) = self.combatants.get_mut(*owner) {
                            if let Some(destroyed) = wall_owner.damage_wall(*wall_id, *damage) {
                                follow_ups.push(destroyed);
                            }
                            if let Err(e) = self.registry.publish(*owner, wall_owner.snapshot()) {
                                warn!("Snapshot publish failed: {}", e);
                            }
                        }
                    }
                    BrainEvent::ProjectileExpired { shooter, target, .. } => {
                        if let Some(c) = self.combatants.get_mut(*shooter) {
                            c.record_shot_result(false);
                        }
                        let evading =
                            (*target).and_then(|t| self.combatants.get_mut(t).map(|c| (t, c)));
                        if let Some((t, c)) = evading {
                            if c.is_alive() && c.get_state() == TacticalState::Evade {
                                c.record_dodge();
                                follow_ups.push(BrainEvent::Dodge { combatant: t });
                            }
                        }
                    }
                    _ => {}
                }
                self.telemetry.record_event(&event);
                self.recent_events.push(event);
                report.events += 1;
            }
            pending = follow_ups;
        }
    }

    fn apply_damage(
        &mut self,
        target: CombatantKey,
        shooter: CombatantKey,
        amount: f32,
    ) -> DamageOutcome {
        let shooter_live = self.registry.resolve_live(shooter).is_some();
        if let Some(c) = self.combatants.get_mut(target) {
            let outcome = c.take_damage(amount);
            if c.is_alive() && c.target().is_none() && shooter_live {
                c.set_target(Some(shooter));
            }
            if let Err(e) = self.registry.publish(target, c.snapshot()) {
                warn!("Snapshot publish failed: {}", e);
            }
            return outcome;
        }
        match self.registry.get_mut(target) {
            Some(snapshot) => {
                let outcome = snapshot.take_damage(amount);
                if outcome == DamageOutcome::Killed {
                    info!("Player {} destroyed", snapshot.stable_id);
                }
                outcome
            }
            None => DamageOutcome::Ignored,
        }
    }

    /// Removes dead combatants together with their walls. Returns how many went.
    fn dispose_dead(&mut self) -> usize {
        let dead: Vec<CombatantKey> =
            self.combatants.iter().filter(|(_, c)| !c.is_alive()).map(|(key, _)| key).collect();
        for &key in &dead {
            self.despawn(key);
        }
        dead.len()
    }

    /// Disposes a combatant and drops it from the registry. No-op for unknown keys.
    pub fn despawn(&mut self, key: CombatantKey) -> bool {
        let Some(mut combatant) = self.combatants.remove(key) else {
            return false;
        };
        if let Some(wall) = combatant.dispose() {
            let event = BrainEvent::WallDestroyed {
                owner: key,
                wall_id: wall.wall_id,
                position: wall.center,
                expired: false,
            };
            self.telemetry.record_event(&event);
            self.recent_events.push(event);
        }
        self.registry.remove(key);
        debug!("Combatant {:?} removed from arena", key);
        true
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn registry(&self) -> &CombatantRegistry {
        &self.registry
    }

    pub fn world(&self) -> &SandboxWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut SandboxWorld {
        &mut self.world
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Every event routed during the last tick, follow-ups included.
    pub fn recent_events(&self) -> &[BrainEvent] {
        &self.recent_events
    }

    pub fn combatant(&self, key: CombatantKey) -> Option<&Combatant<SandboxBody>> {
        self.combatants.get(key)
    }

    pub fn combatant_mut(&mut self, key: CombatantKey) -> Option<&mut Combatant<SandboxBody>> {
        self.combatants.get_mut(key)
    }

    pub fn combatants(&self) -> impl Iterator<Item = (CombatantKey, &Combatant<SandboxBody>)> {
        self.combatants.iter()
    }

    pub fn combatant_count(&self) -> usize {
        self.combatants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena::new(BrainConfig::default(), SandboxWorld::flat(), 5).expect("valid default config")
    }

    #[test]
    fn spawned_combatant_is_published() {
        let mut arena = arena();
        let at = Vec3::new(10.0, 0.0, 10.0);
        let key = arena.spawn_combatant(1, DifficultyTier::Normal, at).expect("spawn");
        let snapshot = arena.registry().get(key).expect("snapshot");
        assert!(!snapshot.is_player);
        assert!(snapshot.alive);
        assert!(snapshot.position.y > 0.0);
        assert_eq!(arena.combatant_count(), 1);
    }

    #[test]
    fn player_updates_reject_enemy_keys() {
        let mut arena = arena();
        let enemy = arena.spawn_combatant(1, DifficultyTier::Easy, Vec3::ZERO).expect("spawn");
        let player = arena.spawn_player(2, Vec3::new(50.0, 0.0, 0.0));
        assert!(arena.update_player(player, Vec3::new(55.0, 0.0, 0.0), Vec3::X).is_ok());
        let rejected = arena.update_player(enemy, Vec3::ZERO, Vec3::ZERO);
        assert!(matches!(rejected, Err(BrainError::NotFound(_))));
    }

    #[test]
    fn despawn_is_idempotent() {
        let mut arena = arena();
        let key = arena.spawn_combatant(1, DifficultyTier::Normal, Vec3::ZERO).expect("spawn");
        assert!(arena.despawn(key));
        assert!(!arena.despawn(key));
        assert!(arena.registry().get(key).is_none());
    }
}
