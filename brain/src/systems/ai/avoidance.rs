// tank_brain_core/brain/src/systems/ai/avoidance.rs
// Obstacle steering bias from the sensor fan, stuck detection with escalating recovery, and
// the terrain-penetration check. Every correction goes through forces or impulses.

use crate::core::config::RecoveryConfig;
use crate::core::constants::GRAVITY;
use crate::core::math::flat_distance;
use crate::core::types::{TacticalIntent, Transform, Vec3};
use crate::systems::sensors::FanReading;
use crate::world::physics::PhysicsBody;
use rand::Rng;
use tracing::{debug, trace};

const REVERSE_THROTTLE: f32 = -0.6;
const AVOID_STEER_GAIN: f32 = 1.5;
const BIAS_DEAD_ZONE: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct ObstacleAvoidance {
    preferred_side: f32,
    reverse_ticks_left: u32,
    reverse_steer: f32,
}

impl Default for ObstacleAvoidance {
    fn default() -> Self {
        ObstacleAvoidance { preferred_side: 1.0, reverse_ticks_left: 0, reverse_steer: 0.0 }
    }
}

impl ObstacleAvoidance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bends a forward-driving intent away from whatever the fan sees ahead.
    pub fn apply(
        &mut self,
        mut intent: TacticalIntent,
        fan: &FanReading,
        config: &RecoveryConfig,
    ) -> TacticalIntent {
        if self.reverse_ticks_left > 0 {
            self.reverse_ticks_left -= 1;
            intent.throttle = REVERSE_THROTTLE;
            intent.steer = self.reverse_steer;
            intent.normalize();
            return intent;
        }
        if intent.throttle <= 0.0 {
            return intent;
        }

        let side = if fan.clearance_bias.abs() > BIAS_DEAD_ZONE {
            fan.clearance_bias.signum()
        } else {
            self.preferred_side
        };
        if fan.closest < config.obstacle_reverse_distance {
            trace!("Obstacle at {:.1}: reversing", fan.closest);
            self.start_reverse(config.reverse_bias_ticks / 3, side);
            intent.throttle = REVERSE_THROTTLE;
            intent.steer = side;
        } else if fan.closest < config.obstacle_avoid_distance {
            let strength = 1.0 - fan.closest / config.obstacle_avoid_distance;
            intent.steer += side * strength * AVOID_STEER_GAIN;
            intent.throttle *= 1.0 - 0.5 * strength;
        }
        intent.normalize();
        intent
    }

    pub fn start_reverse(&mut self, ticks: u32, steer: f32) {
        self.reverse_ticks_left = ticks.max(1);
        self.reverse_steer = steer.clamp(-1.0, 1.0);
    }

    pub fn is_reversing(&self) -> bool {
        self.reverse_ticks_left > 0
    }

    /// Swaps the fallback side used when both sides look equally open.
    pub fn flip_side(&mut self) {
        self.preferred_side = -self.preferred_side;
    }

    pub fn preferred_side(&self) -> f32 {
        self.preferred_side
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuckVerdict {
    NotDue,
    /// No movement was requested over the interval.
    Idle,
    Moving,
    Stalled { consecutive: u32 },
    ForceUnstuck,
    HardReposition,
}

/// Wall-clock stuck detector. Fires each escalation step once per threshold crossing.
#[derive(Debug, Clone)]
pub struct StuckMonitor {
    last_check_secs: Option<f64>,
    last_position: Vec3,
    consecutive_failures: u32,
    unstuck_count: u32,
}

impl StuckMonitor {
    pub fn new() -> Self {
        StuckMonitor {
            last_check_secs: None,
            last_position: Vec3::ZERO,
            consecutive_failures: 0,
            unstuck_count: 0,
        }
    }

    pub fn reset(&mut self, now_secs: f64, position: Vec3) {
        self.last_check_secs = Some(now_secs);
        self.last_position = position;
        self.consecutive_failures = 0;
        self.unstuck_count = 0;
    }

    pub fn check(
        &mut self,
        now_secs: f64,
        position: Vec3,
        attempting_movement: bool,
        config: &RecoveryConfig,
    ) -> StuckVerdict {
        let Some(last) = self.last_check_secs else {
            self.reset(now_secs, position);
            return StuckVerdict::NotDue;
        };
        if now_secs - last < config.stuck_check_interval_secs as f64 {
            return StuckVerdict::NotDue;
        }
        let displacement = flat_distance(position, self.last_position);
        self.last_check_secs = Some(now_secs);
        self.last_position = position;

        if !attempting_movement {
            self.consecutive_failures = 0;
            return StuckVerdict::Idle;
        }
        if displacement >= config.min_movement {
            self.consecutive_failures = 0;
            self.unstuck_count = 0;
            return StuckVerdict::Moving;
        }

        self.consecutive_failures += 1;
        if self.consecutive_failures < config.stuck_checks_before_unstuck {
            return StuckVerdict::Stalled { consecutive: self.consecutive_failures };
        }
        self.consecutive_failures = 0;
        self.unstuck_count += 1;
        if self.unstuck_count >= config.unstucks_before_reposition.max(1) {
            self.unstuck_count = 0;
            StuckVerdict::HardReposition
        } else {
            StuckVerdict::ForceUnstuck
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Default for StuckMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// First escalation step: kill velocity, then shove backwards and sideways.
/// Returns the steer sign chosen for the reverse bias.
pub fn apply_forced_unstuck<B: PhysicsBody + ?Sized, R: Rng + ?Sized>(
    body: &mut B,
    config: &RecoveryConfig,
    rng: &mut R,
) -> f32 {
    let transform: Transform = body.transform();
    let mass = body.mass();
    body.set_linear_velocity(Vec3::ZERO);
    body.set_angular_velocity(Vec3::ZERO);
    let side: f32 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    let direction =
        (-transform.flat_forward() + transform.flat_right() * side * 0.5).normalize_or_zero();
    let impulse = (direction + Vec3::Y * 0.2) * config.unstuck_impulse * mass;
    body.apply_impulse(impulse, transform.position);
    debug!("Forced unstuck impulse applied, steering {}", side);
    side
}

/// Second escalation step: an upward impulse sized to carry the hull to a safe height above
/// the last known ground.
pub fn apply_hard_reposition<B: PhysicsBody + ?Sized>(
    body: &mut B,
    ground_height: f32,
    hover_height: f32,
    config: &RecoveryConfig,
) {
    let transform = body.transform();
    let mass = body.mass();
    let velocity = body.linear_velocity();
    let safe_height = ground_height + hover_height + config.reposition_clearance;
    let rise = (safe_height - transform.position.y).max(config.reposition_clearance);
    let needed_speed = (2.0 * GRAVITY * rise).sqrt();
    body.set_linear_velocity(Vec3::new(0.0, velocity.y.max(0.0), 0.0));
    body.set_angular_velocity(Vec3::ZERO);
    let impulse = (needed_speed - velocity.y.max(0.0)).max(0.0) * mass;
    body.apply_impulse(Vec3::Y * impulse, transform.position);
    debug!("Hard reposition toward height {:.1}", safe_height);
}

/// Depth below the ground if it exceeds the configured tolerance.
pub fn terrain_penetration(
    position_y: f32,
    ground_height: f32,
    config: &RecoveryConfig,
) -> Option<f32> {
    let depth = ground_height - position_y;
    (depth > config.terrain_penetration_depth).then_some(depth)
}

/// Strong upward corrective force for a hull found inside the terrain.
pub fn apply_terrain_recovery<B: PhysicsBody + ?Sized>(body: &mut B, config: &RecoveryConfig) {
    let transform = body.transform();
    let mass = body.mass();
    let velocity = body.linear_velocity();
    if velocity.y < 0.0 {
        body.set_linear_velocity(Vec3::new(velocity.x, 0.0, velocity.z));
    }
    body.apply_force(Vec3::Y * mass * GRAVITY * config.terrain_recovery_force, transform.position);
}
