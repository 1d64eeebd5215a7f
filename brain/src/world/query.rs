// tank_brain_core/brain/src/world/query.rs
use crate::core::types::{CombatantKey, EntityId, Vec3};

/// Identity of whatever a ray struck.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceKind {
    Terrain,
    Obstacle,
    /// Gate-type obstacle; only its part below `top_y` is solid. A lowered gate has its top
    /// at ground level.
    Gate { top_y: f32 },
    Combatant(CombatantKey),
    Projectile,
    Pickup,
    Wall { owner: CombatantKey, wall_id: EntityId },
}

#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Ray { origin, direction: direction.normalize_or_zero(), max_distance }
    }

    pub fn between(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        Ray::new(from, delta, delta.length())
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
    pub surface: SurfaceKind,
}

/// Predicate deciding whether a surface may stop a ray.
pub type RayFilter<'a> = &'a dyn Fn(&SurfaceKind) -> bool;

pub trait SpatialQuery {
    /// Nearest hit along the ray accepted by `filter`, or `None`.
    fn raycast(&self, ray: &Ray, filter: RayFilter<'_>) -> Option<RayHit>;
}

pub trait Terrain {
    fn ground_height_at(&self, x: f32, z: f32) -> Option<f32>;

    fn normal_at(&self, _x: f32, _z: f32) -> Vec3 {
        Vec3::Y
    }
}

/// Excludes self, projectiles and pickups. Used for line-of-sight and muzzle checks.
pub fn solid_excluding(self_key: CombatantKey) -> impl Fn(&SurfaceKind) -> bool {
    move |surface: &SurfaceKind| match surface {
        SurfaceKind::Combatant(key) => *key != self_key,
        SurfaceKind::Projectile | SurfaceKind::Pickup => false,
        _ => true,
    }
}

/// Decides whether a hit actually blocks at the struck height. Gates only block below their
/// current top.
pub fn hit_blocks(hit: &RayHit) -> bool {
    match hit.surface {
        SurfaceKind::Gate { top_y } => hit.point.y < top_y,
        SurfaceKind::Projectile | SurfaceKind::Pickup => false,
        _ => true,
    }
}

/// Nearest hit that actually blocks at its struck height. Non-blocking hits (a lowered gate)
/// are stepped past and the ray is re-cast from just beyond them.
pub fn first_blocking_hit(
    spatial: &dyn SpatialQuery,
    ray: &Ray,
    filter: RayFilter<'_>,
) -> Option<RayHit> {
    const MAX_PASSES: usize = 4;
    const STEP_PAST: f32 = 0.05;
    let mut travelled = 0.0;
    for _ in 0..MAX_PASSES {
        let remaining = ray.max_distance - travelled;
        if remaining <= 0.0 {
            return None;
        }
        let segment =
            Ray { origin: ray.at(travelled), direction: ray.direction, max_distance: remaining };
        let hit = spatial.raycast(&segment, filter)?;
        if hit_blocks(&hit) {
            return Some(RayHit { distance: travelled + hit.distance, ..hit });
        }
        travelled += hit.distance + STEP_PAST;
    }
    None
}
