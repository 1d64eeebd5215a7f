// tank_brain_core/brain/src/core/events.rs
use super::types::{CombatantKey, EntityId, TacticalState, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPriority {
    High,
    Normal,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryLevel {
    ForcedUnstuck,
    HardReposition,
}

/// Fire-and-forget notifications produced by combatants. Effects, sound and telemetry
/// consumers drain these from the shared queue; the core never waits on them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BrainEvent {
    StateChanged {
        combatant: CombatantKey,
        stable_id: u64,
        from: TacticalState,
        to: TacticalState,
    },
    ShotFired {
        shooter: CombatantKey,
        target: Option<CombatantKey>,
        projectile_id: EntityId,
        origin: Vec3,
        direction: Vec3,
    },
    MuzzleFlash { position: Vec3, direction: Vec3 },
    ProjectileHit {
        shooter: CombatantKey,
        target: CombatantKey,
        projectile_id: EntityId,
        damage: f32,
        position: Vec3,
    },
    WallImpact {
        shooter: CombatantKey,
        owner: CombatantKey,
        wall_id: EntityId,
        projectile_id: EntityId,
        damage: f32,
        position: Vec3,
    },
    ProjectileRicochet { projectile_id: EntityId, position: Vec3 },
    ProjectileExpired {
        shooter: CombatantKey,
        target: Option<CombatantKey>,
        projectile_id: EntityId,
        position: Vec3,
    },
    Explosion { position: Vec3 },
    Dodge { combatant: CombatantKey },
    Movement { combatant: CombatantKey, distance: f32, speed: f32 },
    StuckRecovery { combatant: CombatantKey, level: RecoveryLevel, position: Vec3 },
    TerrainRecovery { combatant: CombatantKey, depth: f32 },
    WallDeployed { owner: CombatantKey, wall_id: EntityId, position: Vec3 },
    WallDestroyed { owner: CombatantKey, wall_id: EntityId, position: Vec3, expired: bool },
    CombatantKilled { combatant: CombatantKey, killer: Option<CombatantKey>, position: Vec3 },
}

impl BrainEvent {
    pub fn priority(&self) -> EventPriority {
        match self {
            BrainEvent::ProjectileHit { .. }
            | BrainEvent::WallImpact { .. }
            | BrainEvent::CombatantKilled { .. } => EventPriority::High,
            BrainEvent::Movement { .. }
            | BrainEvent::MuzzleFlash { .. }
            | BrainEvent::Explosion { .. } => EventPriority::Low,
            _ => EventPriority::Normal,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BrainEvent::StateChanged { .. } => "state_changed",
            BrainEvent::ShotFired { .. } => "shot_fired",
            BrainEvent::MuzzleFlash { .. } => "muzzle_flash",
            BrainEvent::ProjectileHit { .. } => "projectile_hit",
            BrainEvent::WallImpact { .. } => "wall_impact",
            BrainEvent::ProjectileRicochet { .. } => "projectile_ricochet",
            BrainEvent::ProjectileExpired { .. } => "projectile_expired",
            BrainEvent::Explosion { .. } => "explosion",
            BrainEvent::Dodge { .. } => "dodge",
            BrainEvent::Movement { .. } => "movement",
            BrainEvent::StuckRecovery { .. } => "stuck_recovery",
            BrainEvent::TerrainRecovery { .. } => "terrain_recovery",
            BrainEvent::WallDeployed { .. } => "wall_deployed",
            BrainEvent::WallDestroyed { .. } => "wall_destroyed",
            BrainEvent::CombatantKilled { .. } => "combatant_killed",
        }
    }
}
