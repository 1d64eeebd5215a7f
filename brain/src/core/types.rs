// tank_brain_core/brain/src/core/types.rs
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

pub use glam::{Quat, Vec2, Vec3};

use super::math::wrap_angle;

pub type EntityId = u64;
pub type TeamId = u8;

new_key_type! {
    /// Generational handle into the combatant registry. A stale handle (slot reused or
    /// removed) simply fails to resolve, so a target is never dereferenced after disposal.
    pub struct CombatantKey;
}

// --- Tactical States ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TacticalState {
    Idle,
    Patrol,
    Chase,
    Attack,
    Flank,
    Retreat,
    Evade,
    CapturePoi,
    Ambush,
    Bait,
}

impl Default for TacticalState {
    fn default() -> Self {
        TacticalState::Idle
    }
}

impl TacticalState {
    pub const ALL: [TacticalState; 10] = [
        TacticalState::Idle,
        TacticalState::Patrol,
        TacticalState::Chase,
        TacticalState::Attack,
        TacticalState::Flank,
        TacticalState::Retreat,
        TacticalState::Evade,
        TacticalState::CapturePoi,
        TacticalState::Ambush,
        TacticalState::Bait,
    ];

    /// States that count as actively fighting a target.
    pub fn is_engaging(self) -> bool {
        matches!(
            self,
            TacticalState::Chase
                | TacticalState::Attack
                | TacticalState::Flank
                | TacticalState::Ambush
                | TacticalState::Bait
                | TacticalState::Evade
        )
    }

    /// States that hold off re-evaluation until their minimum dwell time has passed.
    pub fn has_min_dwell(self) -> bool {
        matches!(
            self,
            TacticalState::Flank
                | TacticalState::Evade
                | TacticalState::Ambush
                | TacticalState::Bait
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TacticalState::Idle => "idle",
            TacticalState::Patrol => "patrol",
            TacticalState::Chase => "chase",
            TacticalState::Attack => "attack",
            TacticalState::Flank => "flank",
            TacticalState::Retreat => "retreat",
            TacticalState::Evade => "evade",
            TacticalState::CapturePoi => "capture_poi",
            TacticalState::Ambush => "ambush",
            TacticalState::Bait => "bait",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlankSide {
    Left,
    Right,
}

impl FlankSide {
    pub fn sign(self) -> f32 {
        match self {
            FlankSide::Left => -1.0,
            FlankSide::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            FlankSide::Left => FlankSide::Right,
            FlankSide::Right => FlankSide::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyTier {
    Easy,
    Normal,
    Hard,
}

impl Default for DifficultyTier {
    fn default() -> Self {
        DifficultyTier::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerStyle {
    Aggressive,
    Defensive,
    Balanced,
}

// --- Tactical Intent ---
/// Per-tick output of the state machine, consumed immediately by locomotion and ballistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TacticalIntent {
    pub throttle: f32,
    pub steer: f32,
    pub turret_target_angle: f32,
    pub fire: bool,
}

impl TacticalIntent {
    pub fn new(throttle: f32, steer: f32, turret_target_angle: f32, fire: bool) -> Self {
        let mut intent = TacticalIntent { throttle, steer, turret_target_angle, fire };
        intent.normalize();
        intent
    }

    pub fn idle(turret_angle: f32) -> Self {
        Self::new(0.0, 0.0, turret_angle, false)
    }

    /// Clamps throttle/steer into [-1, 1] and wraps the turret angle into (-π, π].
    pub fn normalize(&mut self) {
        self.throttle =
            if self.throttle.is_finite() { self.throttle.clamp(-1.0, 1.0) } else { 0.0 };
        self.steer = if self.steer.is_finite() { self.steer.clamp(-1.0, 1.0) } else { 0.0 };
        self.turret_target_angle = wrap_angle(self.turret_target_angle);
    }
}

// --- Basic Geometric Types ---
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Transform { position, rotation }
    }

    pub fn from_position_yaw(position: Vec3, yaw: f32) -> Self {
        Transform { position, rotation: Quat::from_rotation_y(yaw) }
    }

    /// Hull forward vector projected onto the ground plane.
    pub fn flat_forward(&self) -> Vec3 {
        let forward = self.rotation * Vec3::Z;
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        flat.try_normalize().unwrap_or(Vec3::Z)
    }

    pub fn flat_right(&self) -> Vec3 {
        let f = self.flat_forward();
        Vec3::new(f.z, 0.0, -f.x)
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn yaw(&self) -> f32 {
        let f = self.flat_forward();
        f.x.atan2(f.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform { position: Vec3::ZERO, rotation: Quat::IDENTITY }
    }
}
