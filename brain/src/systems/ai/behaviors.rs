// tank_brain_core/brain/src/systems/ai/behaviors.rs
// Per-state execution. Runs every tick regardless of decision cadence and only produces a
// `TacticalIntent`; locomotion and firing consume it afterwards.

use crate::core::math::{angle_diff, flat_distance, flatten, yaw_between};
use crate::core::types::{FlankSide, TacticalIntent, TacticalState, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

const PATROL_THROTTLE: f32 = 0.6;
const APPROACH_THROTTLE: f32 = 0.7;
const BACKOFF_THROTTLE: f32 = -0.5;
const ORBIT_THROTTLE: f32 = 0.3;
const RETREAT_DISTANCE: f32 = 40.0;
const FLANK_SWEEP_RAD: f32 = 1.2;

#[derive(Debug, Clone, Copy)]
pub struct AimInfo {
    pub position: Vec3,
    /// Lead-predicted point the turret should track.
    pub aim_point: Vec3,
    pub distance: f32,
    pub visible: bool,
}

/// Per-tick inputs for state execution.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorInput {
    pub position: Vec3,
    pub hull_yaw: f32,
    pub target: Option<AimInfo>,
    pub waypoint: Vec3,
    pub tactical_position: Option<Vec3>,
    pub flank_point: Option<Vec3>,
    pub capture_point: Option<Vec3>,
    pub capture_radius: f32,
    pub arrive_radius: f32,
    pub weapon_range: f32,
    pub optimal_range: f32,
    pub orbit_sign: f32,
}

/// Steer command that turns the hull toward `desired_yaw`, saturating at 45° of error.
pub fn steer_toward(hull_yaw: f32, desired_yaw: f32) -> f32 {
    (angle_diff(desired_yaw, hull_yaw) / FRAC_PI_4).clamp(-1.0, 1.0)
}

/// Throttle and steer for driving to `destination`; eases off when badly misaligned and
/// when arriving.
pub fn drive_to(
    position: Vec3,
    hull_yaw: f32,
    destination: Vec3,
    arrive_radius: f32,
    max_throttle: f32,
) -> (f32, f32) {
    let distance = flat_distance(position, destination);
    if distance <= arrive_radius * 0.5 {
        return (0.0, 0.0);
    }
    let desired = yaw_between(position, destination);
    let error = angle_diff(desired, hull_yaw).abs();
    let alignment = (1.0 - error / PI).max(0.15);
    let arrival = (distance / (arrive_radius * 2.0).max(0.1)).min(1.0);
    (max_throttle * alignment * arrival, steer_toward(hull_yaw, desired))
}

/// Point swung around the target toward `side`, used when no pathfinder answer exists.
pub fn local_flank_point(
    self_pos: Vec3,
    target_pos: Vec3,
    side: FlankSide,
    flank_distance: f32,
) -> Vec3 {
    let from_target = yaw_between(target_pos, self_pos);
    let yaw = from_target + side.sign() * FLANK_SWEEP_RAD;
    target_pos + Vec3::new(yaw.sin(), 0.0, yaw.cos()) * flank_distance
}

fn drive(input: &BehaviorInput, destination: Vec3, max_throttle: f32) -> (f32, f32) {
    drive_to(input.position, input.hull_yaw, destination, input.arrive_radius, max_throttle)
}

fn turret_angle(input: &BehaviorInput) -> f32 {
    match input.target {
        Some(t) => yaw_between(input.position, t.aim_point),
        None => input.hull_yaw,
    }
}

fn in_range(input: &BehaviorInput) -> bool {
    input.target.map_or(false, |t| t.visible && t.distance <= input.weapon_range)
}

pub fn execute_state(state: TacticalState, input: &BehaviorInput) -> TacticalIntent {
    let turret = turret_angle(input);
    match state {
        TacticalState::Idle => TacticalIntent::idle(turret),

        TacticalState::Patrol => {
            let (throttle, steer) = drive(input, input.waypoint, PATROL_THROTTLE);
            TacticalIntent::new(throttle, steer, turret, false)
        }

        TacticalState::Chase => match input.target {
            Some(t) => {
                let (throttle, steer) = drive(input, t.aim_point, 1.0);
                TacticalIntent::new(throttle, steer, turret, in_range(input))
            }
            None => TacticalIntent::idle(turret),
        },

        TacticalState::Attack => match input.target {
            Some(t) => {
                let bearing = yaw_between(input.position, t.position);
                let (throttle, steer) = if t.distance > input.optimal_range * 1.15 {
                    (APPROACH_THROTTLE, steer_toward(input.hull_yaw, bearing))
                } else if t.distance < input.optimal_range * 0.75 {
                    // Back away while keeping the nose on the target.
                    (BACKOFF_THROTTLE, steer_toward(input.hull_yaw, bearing))
                } else {
                    // Circle at range.
                    let orbit = bearing + FRAC_PI_2 * input.orbit_sign;
                    (ORBIT_THROTTLE, steer_toward(input.hull_yaw, orbit))
                };
                TacticalIntent::new(throttle, steer, turret, in_range(input))
            }
            None => TacticalIntent::idle(turret),
        },

        TacticalState::Flank => {
            let destination = input.flank_point.unwrap_or(input.waypoint);
            let (throttle, steer) = drive(input, destination, 1.0);
            TacticalIntent::new(throttle, steer, turret, in_range(input))
        }

        TacticalState::Retreat => {
            let destination = input.tactical_position.unwrap_or_else(|| match input.target {
                Some(t) => {
                    let away = flatten(input.position - t.position).normalize_or_zero();
                    input.position + away * RETREAT_DISTANCE
                }
                None => input.waypoint,
            });
            let (throttle, steer) = drive(input, destination, 1.0);
            TacticalIntent::new(throttle, steer, turret, in_range(input))
        }

        TacticalState::Evade => {
            let destination = input.tactical_position.unwrap_or(input.waypoint);
            let (throttle, steer) = drive(input, destination, 1.0);
            TacticalIntent::new(throttle, steer, turret, false)
        }

        TacticalState::CapturePoi => {
            let point = input.capture_point.unwrap_or(input.waypoint);
            if flat_distance(input.position, point) <= input.capture_radius {
                return TacticalIntent::idle(turret);
            }
            let (throttle, steer) =
                drive_to(input.position, input.hull_yaw, point, input.capture_radius, 0.8);
            TacticalIntent::new(throttle, steer, turret, in_range(input))
        }

        TacticalState::Ambush => {
            let spot = input.tactical_position.unwrap_or(input.position);
            let arrived = flat_distance(input.position, spot) <= input.arrive_radius;
            if arrived {
                // Hold still in cover and fire when the target shows itself.
                return TacticalIntent::new(0.0, 0.0, turret, in_range(input));
            }
            let (throttle, steer) = drive(input, spot, 0.9);
            TacticalIntent::new(throttle, steer, turret, false)
        }

        TacticalState::Bait => {
            let destination = input.tactical_position.unwrap_or(input.waypoint);
            let (throttle, steer) = drive(input, destination, 0.8);
            TacticalIntent::new(throttle, steer, turret, in_range(input))
        }
    }
}
