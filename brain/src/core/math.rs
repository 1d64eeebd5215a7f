// tank_brain_core/brain/src/core/math.rs
use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Wraps an angle into (-π, π]. Non-finite input collapses to zero.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`.
pub fn angle_diff(to: f32, from: f32) -> f32 {
    wrap_angle(to - from)
}

/// Yaw (from +Z toward +X) of the horizontal direction between two points.
pub fn yaw_between(from: Vec3, to: Vec3) -> f32 {
    let dx = to.x - from.x;
    let dz = to.z - from.z;
    if dx.abs() < f32::EPSILON && dz.abs() < f32::EPSILON {
        return 0.0;
    }
    wrap_angle(dx.atan2(dz))
}

pub fn yaw_to_direction(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

pub fn flat_distance(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    (dx * dx + dz * dz).sqrt()
}

pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Zeroes any vector carrying NaN/inf. Returns the vector and whether it was replaced.
pub fn sanitize(v: Vec3) -> (Vec3, bool) {
    if v.is_finite() {
        (v, false)
    } else {
        (Vec3::ZERO, true)
    }
}

pub fn sanitize_scalar(v: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Frame-rate independent exponential approach toward `target`.
pub fn exp_smooth(current: f32, target: f32, time_constant: f32, dt: f32) -> f32 {
    if time_constant <= f32::EPSILON {
        return target;
    }
    let alpha = 1.0 - (-dt / time_constant).exp();
    current + (target - current) * alpha
}

pub fn clamp_length(v: Vec3, max: f32) -> Vec3 {
    let len = v.length();
    if len > max && len > f32::EPSILON {
        v * (max / len)
    } else {
        v
    }
}
