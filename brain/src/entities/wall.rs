// tank_brain_core/brain/src/entities/wall.rs
use crate::core::constants::{WALL_HALF_EXTENTS, WALL_MAX_HEALTH};
use crate::core::types::{CombatantKey, EntityId, Quat, Vec3};
use uuid::Uuid;

/// Oriented box published to the registry so every projectile hit-check can see it.
#[derive(Clone, Debug, PartialEq)]
pub struct WallVolume {
    pub wall_id: EntityId,
    pub owner: CombatantKey,
    pub center: Vec3,
    pub yaw: f32,
    pub half_extents: Vec3,
    pub health: f32,
}

impl WallVolume {
    /// Local-space box test: the point is rotated into the wall's frame before comparing
    /// against the half extents.
    pub fn contains(&self, point: Vec3, margin: f32) -> bool {
        let local = Quat::from_rotation_y(-self.yaw) * (point - self.center);
        local.x.abs() <= self.half_extents.x + margin
            && local.y.abs() <= self.half_extents.y + margin
            && local.z.abs() <= self.half_extents.z + margin
    }
}

/// Temporary cover a combatant drops between itself and its target. At most one per owner.
#[derive(Clone, Debug)]
pub struct ProtectiveWall {
    pub volume: WallVolume,
    pub max_health: f32,
    pub expires_at_tick: u64,
}

impl ProtectiveWall {
    pub fn new(
        owner: CombatantKey,
        center: Vec3,
        yaw: f32,
        now_tick: u64,
        lifetime_ticks: u64,
    ) -> Self {
        let [hx, hy, hz] = WALL_HALF_EXTENTS;
        ProtectiveWall {
            volume: WallVolume {
                wall_id: Uuid::new_v4().as_u128() as u64,
                owner,
                center,
                yaw,
                half_extents: Vec3::new(hx, hy, hz),
                health: WALL_MAX_HEALTH,
            },
            max_health: WALL_MAX_HEALTH,
            expires_at_tick: now_tick + lifetime_ticks,
        }
    }

    pub fn id(&self) -> EntityId {
        self.volume.wall_id
    }

    /// Applies damage and reports whether the wall just broke.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if self.is_destroyed() || !amount.is_finite() || amount <= 0.0 {
            return false;
        }
        self.volume.health = (self.volume.health - amount).max(0.0);
        self.is_destroyed()
    }

    pub fn is_destroyed(&self) -> bool {
        self.volume.health <= 0.0
    }

    pub fn is_expired(&self, now_tick: u64) -> bool {
        now_tick >= self.expires_at_tick
    }
}
