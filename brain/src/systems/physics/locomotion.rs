// tank_brain_core/brain/src/systems/physics/locomotion.rs
// Turns abstract throttle/steer targets into hover, upright, drive, turn and friction
// forces on the physics body. Nothing here writes position or rotation directly.

use crate::core::config::LocomotionConfig;
use crate::core::constants::GRAVITY;
use crate::core::math::{clamp_length, exp_smooth, flatten, sanitize, sanitize_scalar};
use crate::core::types::Vec3;
use crate::world::physics::PhysicsBody;
use tracing::{trace, warn};

const THROTTLE_DEAD_ZONE: f32 = 0.05;
const STEER_DEAD_ZONE: f32 = 0.05;
const ANTI_ROLL_MIN_YAW_RATE: f32 = 0.2;
const ANTI_ROLL_MIN_SPEED_RATIO: f32 = 0.3;
const HOVER_SUPPORT_BAND: f32 = 3.0; // multiples of hover height above which the cushion gives out
const MAX_HORIZONTAL_SPEED_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocomotionReport {
    pub forward_speed: f32,
    pub altitude_error: f32,
    pub tilt: f32,
    pub emergency_upright: bool,
    pub penetration_recovery: bool,
    pub sanitized: bool,
    pub skipped: bool,
}

#[derive(Debug, Clone)]
pub struct LocomotionController {
    config: LocomotionConfig,
    max_speed: f32,
    throttle: f32,
    steer: f32,
    throttle_target: f32,
    steer_target: f32,
}

impl LocomotionController {
    pub fn new(config: LocomotionConfig, max_speed: f32) -> Self {
        LocomotionController {
            config,
            max_speed: max_speed.max(0.1),
            throttle: 0.0,
            steer: 0.0,
            throttle_target: 0.0,
            steer_target: 0.0,
        }
    }

    pub fn set_targets(&mut self, throttle: f32, steer: f32) {
        self.throttle_target = sanitize_scalar(throttle).clamp(-1.0, 1.0);
        self.steer_target = sanitize_scalar(steer).clamp(-1.0, 1.0);
    }

    pub fn set_config(&mut self, config: LocomotionConfig) {
        self.config = config;
    }

    pub fn set_max_speed(&mut self, max_speed: f32) {
        if max_speed.is_finite() && max_speed > 0.0 {
            self.max_speed = max_speed;
        }
    }

    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    pub fn hover_height(&self) -> f32 {
        self.config.hover_height
    }

    /// Smoothed throttle actually being applied.
    pub fn throttle(&self) -> f32 {
        self.throttle
    }

    pub fn steer(&self) -> f32 {
        self.steer
    }

    pub fn throttle_target(&self) -> f32 {
        self.throttle_target
    }

    pub fn reset(&mut self) {
        self.throttle = 0.0;
        self.steer = 0.0;
        self.throttle_target = 0.0;
        self.steer_target = 0.0;
    }

    /// One force-application sub-tick. Must run every frame.
    pub fn apply<B: PhysicsBody + ?Sized>(
        &mut self,
        body: &mut B,
        ground_height: f32,
        dt: f32,
    ) -> LocomotionReport {
        let mut report = LocomotionReport::default();
        if body.is_disposed() || !(dt > 0.0) {
            report.skipped = true;
            return report;
        }

        self.throttle =
            exp_smooth(self.throttle, self.throttle_target, self.config.throttle_time_constant, dt);
        self.steer = exp_smooth(self.steer, self.steer_target, self.config.steer_time_constant, dt);

        let c = &self.config;
        let transform = body.transform();
        let position = transform.position;
        if !position.is_finite() || !transform.rotation.is_finite() {
            warn!("Locomotion skipped: non-finite transform");
            report.skipped = true;
            return report;
        }
        let mass = {
            let m = sanitize_scalar(body.mass());
            if m > 0.0 { m } else { 1.0 }
        };
        let ground_height =
            if ground_height.is_finite() { ground_height } else { position.y - c.hover_height };

        let (mut velocity, bad_linear) = sanitize(body.linear_velocity());
        let (mut angular, bad_angular) = sanitize(body.angular_velocity());
        report.sanitized = bad_linear || bad_angular;

        // Fixed maxima, every tick.
        let mut linear_changed = bad_linear;
        let horizontal = flatten(velocity);
        let max_horizontal = self.max_speed * MAX_HORIZONTAL_SPEED_FACTOR;
        if horizontal.length() > max_horizontal {
            let clamped = clamp_length(horizontal, max_horizontal);
            velocity = Vec3::new(clamped.x, velocity.y, clamped.z);
            linear_changed = true;
        }
        if velocity.y > c.max_vertical_speed || velocity.y < -2.0 * c.max_vertical_speed {
            velocity.y = velocity.y.clamp(-2.0 * c.max_vertical_speed, c.max_vertical_speed);
            linear_changed = true;
        }
        if linear_changed {
            body.set_linear_velocity(velocity);
        }
        if bad_angular || angular.length() > c.max_angular_speed {
            angular = clamp_length(angular, c.max_angular_speed);
            body.set_angular_velocity(angular);
        }

        let forward = transform.flat_forward();
        let right = transform.flat_right();
        let up = transform.up();
        let forward_speed = velocity.dot(forward);
        let speed_ratio = (forward_speed.abs() / self.max_speed).clamp(0.0, 1.0);
        report.forward_speed = forward_speed;

        // Hover cushion: PD toward ground + hover height, asymmetric when rising vs settling.
        let target_y = ground_height + c.hover_height;
        let altitude_error = target_y - position.y;
        report.altitude_error = altitude_error;
        let within_cushion = position.y - ground_height < c.hover_height * HOVER_SUPPORT_BAND;
        if within_cushion {
            let gain = if altitude_error > 0.0 { c.hover_rise_gain } else { c.hover_settle_gain };
            let max_accel =
                c.max_hover_accel / (1.0 + velocity.y.abs() * c.hover_vertical_speed_falloff);
            let spring = c.hover_stiffness * gain * altitude_error;
            let hover_accel =
                (GRAVITY + spring - c.hover_damping * velocity.y).clamp(0.0, max_accel);
            let downforce = c.downforce_coefficient * self.throttle.abs() * forward_speed.abs();
            body.apply_force(Vec3::Y * mass * (hover_accel - downforce), position);
        }

        // Upright: PD on roll/pitch tilt, with an emergency boost near tip-over.
        let tilt = sanitize_scalar(up.angle_between(Vec3::Y));
        report.tilt = tilt;
        let axis = up.cross(Vec3::Y).normalize_or_zero();
        let tilt_rate = angular - Vec3::Y * angular.y;
        let mut upright = axis * (c.upright_stiffness * tilt) - tilt_rate * c.upright_damping;
        if tilt > c.tilt_safety_threshold {
            upright *= c.tilt_emergency_multiplier;
            body.apply_force(Vec3::Y * mass * GRAVITY * c.tilt_emergency_lift, position);
            report.emergency_upright = true;
            trace!("Emergency upright: tilt {:.2} rad", tilt);
        }
        body.apply_torque(upright * mass);

        // Forward drive toward throttle * max speed.
        if self.throttle.abs() >= THROTTLE_DEAD_ZONE {
            let target_speed = self.throttle * self.max_speed;
            let limit = mass * self.max_speed * c.drive_force_limit;
            let drive = (mass * c.drive_gain * (target_speed - forward_speed)).clamp(-limit, limit);
            body.apply_force(forward * drive, position);
        }

        // Turn: PD on yaw rate, turn speed inflated at low forward speed.
        let effective_turn_speed =
            c.turn_speed * (1.0 + c.low_speed_turn_boost * (1.0 - speed_ratio));
        let desired_yaw_rate = self.steer * effective_turn_speed;
        let yaw_rate = angular.y;
        let mut yaw_accel = c.turn_stiffness * (desired_yaw_rate - yaw_rate)
            - c.turn_speed_damping * speed_ratio * yaw_rate;
        if self.steer.abs() < STEER_DEAD_ZONE {
            yaw_accel -= c.turn_settle_damping * yaw_rate;
        }
        body.apply_torque(Vec3::Y * yaw_accel * mass);

        // Anti-roll while turning at speed.
        if yaw_rate.abs() > ANTI_ROLL_MIN_YAW_RATE && speed_ratio > ANTI_ROLL_MIN_SPEED_RATIO {
            let roll_rate = angular.dot(forward);
            body.apply_torque(-forward * roll_rate * c.anti_roll_strength * speed_ratio * mass);
        }

        // Friction braking with the throttle released.
        if self.throttle.abs() < THROTTLE_DEAD_ZONE {
            let lateral_speed = velocity.dot(right);
            let braking = -right * lateral_speed * c.lateral_friction
                - forward * forward_speed * c.longitudinal_friction;
            body.apply_force(braking * mass, position);
        }

        // Sunk well below the cushion: kick back up with an impulse.
        if position.y < target_y - c.penetration_recovery_depth {
            let needed = (c.penetration_recovery_speed - velocity.y).max(0.0);
            if needed > 0.0 {
                body.apply_impulse(Vec3::Y * mass * needed, position);
                report.penetration_recovery = true;
                trace!("Penetration recovery impulse: depth {:.2}", target_y - position.y);
            }
        }

        report
    }
}
