// tank_brain_core/brain/src/systems/physics/collision.rs
// Swept-segment tests used by projectile stepping and the sandbox raycaster.

use crate::core::events::BrainEvent;
use crate::core::types::{Quat, Vec3};
use crate::entities::wall::WallVolume;
use crate::systems::physics::ballistics::Projectile;
use tracing::debug;

/// Slab test of a ray against an axis-aligned box. Returns the entry distance along the
/// (normalised) direction and the face normal, or `None` past `max_distance`.
pub fn ray_aabb(
    origin: Vec3,
    direction: Vec3,
    min: Vec3,
    max: Vec3,
    max_distance: f32,
) -> Option<(f32, Vec3)> {
    let mut t_enter = 0.0f32;
    let mut t_exit = max_distance;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (t0, t1) = ((min[axis] - o) * inv, (max[axis] - o) * inv);
        let (near, far) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        if near > t_enter {
            t_enter = near;
            let mut n = Vec3::ZERO;
            n[axis] = -d.signum();
            normal = n;
        }
        t_exit = t_exit.min(far);
        if t_enter > t_exit {
            return None;
        }
    }

    if normal == Vec3::ZERO {
        // Origin started inside the box.
        normal = -direction;
    }
    Some((t_enter, normal))
}

/// First contact of the segment `a -> b` with a sphere, as a fraction of the segment.
pub fn segment_sphere(a: Vec3, b: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let d = b - a;
    let f = a - center;
    let c = f.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let len_sq = d.length_squared();
    if len_sq < 1e-12 {
        return None;
    }
    let half_b = f.dot(d);
    let disc = half_b * half_b - len_sq * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-half_b - disc.sqrt()) / len_sq;
    (0.0..=1.0).contains(&t).then_some(t)
}

/// First contact of the segment `a -> b` with an oriented wall, as a fraction of the segment.
pub fn segment_wall(a: Vec3, b: Vec3, wall: &WallVolume) -> Option<f32> {
    let to_local = Quat::from_rotation_y(-wall.yaw);
    let la = to_local * (a - wall.center);
    let lb = to_local * (b - wall.center);
    let delta = lb - la;
    let length = delta.length();
    if length < 1e-6 {
        return wall.contains(a, 0.0).then_some(0.0);
    }
    ray_aabb(la, delta / length, -wall.half_extents, wall.half_extents, length)
        .map(|(t, _)| t / length)
}

/// Builds the event for a projectile striking someone else's wall. The owner applies the
/// damage when the host routes the event back.
pub fn handle_projectile_wall_collision(
    projectile: &Projectile,
    wall: &WallVolume,
    position: Vec3,
) -> Option<BrainEvent> {
    if wall.owner == projectile.shooter || wall.health <= 0.0 {
        return None;
    }
    debug!(
        "Wall {} hit by projectile {} for {:.1} (health {:.1})",
        wall.wall_id, projectile.id, projectile.damage, wall.health
    );
    Some(BrainEvent::WallImpact {
        shooter: projectile.shooter,
        owner: wall.owner,
        wall_id: wall.wall_id,
        projectile_id: projectile.id,
        damage: projectile.damage,
        position,
    })
}
