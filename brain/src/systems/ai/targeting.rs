// tank_brain_core/brain/src/systems/ai/targeting.rs
// Target motion tracking, lead prediction, turret slewing and reload gating.

use crate::core::config::DifficultyProfile;
use crate::core::constants::*;
use crate::core::math::{angle_diff, sanitize, wrap_angle, yaw_to_direction};
use crate::core::types::{CombatantKey, Vec3};
use crate::world::query::{first_blocking_hit, solid_excluding, Ray, SpatialQuery, SurfaceKind};
use rand::Rng;
use tracing::trace;

/// Weight of the newest velocity sample in the exponential filter.
const VELOCITY_SMOOTHING: f32 = 0.7;
const ACCELERATION_SMOOTHING: f32 = 0.5;
const COOLDOWN_SCALE_REDUCTION: f32 = 0.35;

#[derive(Debug, Clone, Default)]
pub struct TargetTracker {
    tracked: Option<CombatantKey>,
    last_position: Option<Vec3>,
    velocity: Vec3,
    acceleration: Vec3,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one position sample. Switching targets restarts the filter.
    pub fn observe(&mut self, key: CombatantKey, position: Vec3, dt: f32) {
        if self.tracked != Some(key) {
            *self = TargetTracker {
                tracked: Some(key),
                last_position: Some(position),
                ..Default::default()
            };
            return;
        }
        if !(dt > 0.0) || !position.is_finite() {
            return;
        }
        if let Some(last) = self.last_position {
            let (raw, _) = sanitize((position - last) / dt);
            let velocity = raw * VELOCITY_SMOOTHING + self.velocity * (1.0 - VELOCITY_SMOOTHING);
            let (raw_accel, _) = sanitize((velocity - self.velocity) / dt);
            self.acceleration = raw_accel * ACCELERATION_SMOOTHING
                + self.acceleration * (1.0 - ACCELERATION_SMOOTHING);
            self.velocity = velocity;
        }
        self.last_position = Some(position);
    }

    pub fn reset(&mut self) {
        *self = TargetTracker::default();
    }

    pub fn tracked(&self) -> Option<CombatantKey> {
        self.tracked
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }
}

/// Predicted aim point. The displacement scales with target speed, so it vanishes for a
/// stationary target.
pub fn lead_point(
    shooter: Vec3,
    target: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    projectile_speed: f32,
    profile: &DifficultyProfile,
) -> Vec3 {
    let (velocity, _) = sanitize(velocity);
    let (acceleration, _) = sanitize(acceleration);
    if projectile_speed <= 0.0 {
        return target;
    }
    let flight_time = shooter.distance(target) / projectile_speed;
    let speed_factor = (velocity.length() / LEAD_REFERENCE_SPEED).min(1.0);
    let prediction = (profile.lead_base + speed_factor * profile.lead_speed_bonus).clamp(0.0, 1.0);

    let mut displacement = velocity * flight_time * prediction;
    if profile.second_order_lead {
        let second_order = 0.5 * flight_time * flight_time * prediction * speed_factor;
        displacement += acceleration * second_order;
    }
    target + displacement
}

/// Aim error cone half-angle in radians.
pub fn aim_spread(
    profile: &DifficultyProfile,
    distance: f32,
    weapon_range: f32,
    difficulty_scale: f32,
    adaptive: f32,
) -> f32 {
    let range_penalty = 1.0 + 0.5 * (distance / weapon_range.max(1.0)).clamp(0.0, 2.0);
    let skill = (1.0 - 0.5 * difficulty_scale.clamp(0.0, 1.0)) / adaptive.max(1.0);
    profile.accuracy_spread * range_penalty * skill
}

pub fn muzzle_origin(position: Vec3, turret_yaw: f32) -> Vec3 {
    position + Vec3::Y * TURRET_HEIGHT + yaw_to_direction(turret_yaw) * MUZZLE_LENGTH
}

/// Launch direction toward `aim_point`, raised to cancel gravity drop over the flight and
/// perturbed by up to `spread` radians.
pub fn fire_direction<R: Rng + ?Sized>(
    origin: Vec3,
    aim_point: Vec3,
    projectile_speed: f32,
    spread: f32,
    rng: &mut R,
) -> Vec3 {
    let flight_time = origin.distance(aim_point) / projectile_speed.max(1.0);
    let compensated = aim_point + Vec3::Y * (0.5 * GRAVITY * flight_time * flight_time);
    let base = (compensated - origin).try_normalize().unwrap_or(Vec3::Z);
    if spread <= 0.0 {
        return base;
    }
    let yaw_error = rng.gen_range(-spread..=spread);
    let pitch_error = rng.gen_range(-spread..=spread) * 0.5;
    let right = Vec3::new(base.z, 0.0, -base.x).try_normalize().unwrap_or(Vec3::X);
    let yawed = crate::core::types::Quat::from_rotation_y(yaw_error) * base;
    (crate::core::types::Quat::from_axis_angle(right, -pitch_error) * yawed).normalize_or_zero()
}

/// The line from the turret base to the target's hit centre must be clear of obstacles,
/// raised gates, terrain, other combatants and walls we do not own. The last stretch inside
/// the target's hit radius is not checked, and a hit on the intended target is not a block.
pub fn muzzle_clear(
    spatial: &dyn SpatialQuery,
    self_key: CombatantKey,
    target: Option<CombatantKey>,
    hull_position: Vec3,
    aim_point: Vec3,
) -> bool {
    let base = hull_position + Vec3::Y * TURRET_HEIGHT;
    let end = aim_point + Vec3::Y * (TURRET_HEIGHT * 0.5);
    let offset = end - base;
    let Some(direction) = offset.try_normalize() else {
        return true;
    };
    let reach = (offset.length() - PROJECTILE_HIT_RADIUS).max(MUZZLE_LENGTH);
    let ray = Ray::new(base, direction, reach);
    let solid = solid_excluding(self_key);
    let filter = |surface: &SurfaceKind| match surface {
        SurfaceKind::Wall { owner, .. } => *owner != self_key,
        other => solid(other),
    };
    match first_blocking_hit(spatial, &ray, &filter) {
        None => true,
        Some(hit) => {
            trace!("Line of fire blocked by {:?} at {:.2}", hit.surface, hit.distance);
            matches!((hit.surface, target), (SurfaceKind::Combatant(k), Some(t)) if k == t)
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurretController {
    angle: f32,
    turn_rate: f32,
}

impl TurretController {
    pub fn new(initial_angle: f32, turn_rate: f32) -> Self {
        TurretController { angle: wrap_angle(initial_angle), turn_rate }
    }

    /// World-frame turret yaw.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Slews toward `target_angle` along the shorter arc, rate limited.
    pub fn update(&mut self, target_angle: f32, dt: f32) {
        let diff = angle_diff(target_angle, self.angle);
        let max_step = self.turn_rate * dt.max(0.0);
        self.angle = wrap_angle(self.angle + diff.clamp(-max_step, max_step));
    }

    pub fn is_aimed(&self, target_angle: f32) -> bool {
        angle_diff(target_angle, self.angle).abs() < AIM_TOLERANCE_RAD
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeaponState {
    reloading: bool,
    shots_fired: u64,
}

impl WeaponState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_fire(&self) -> bool {
        !self.reloading
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    pub fn shots_fired(&self) -> u64 {
        self.shots_fired
    }

    /// Reload time after a shot: the tier's cooldown, shortened by the difficulty scale.
    pub fn cooldown_secs(
        profile: &DifficultyProfile,
        difficulty_scale: f32,
        min_cooldown_secs: f32,
    ) -> f32 {
        let reduction = COOLDOWN_SCALE_REDUCTION * difficulty_scale.clamp(0.0, 1.0);
        let scaled = profile.fire_cooldown_secs * (1.0 - reduction);
        scaled.max(min_cooldown_secs)
    }

    /// Marks a shot and locks the weapon until `complete_reload`.
    pub fn record_shot(&mut self) {
        self.reloading = true;
        self.shots_fired += 1;
    }

    pub fn complete_reload(&mut self) {
        self.reloading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use slotmap::SlotMap;

    #[test]
    fn tracker_converges_on_constant_velocity() {
        let mut keys: SlotMap<CombatantKey, ()> = SlotMap::with_key();
        let key = keys.insert(());
        let mut tracker = TargetTracker::new();
        let dt = 1.0 / 60.0;
        for i in 0..120 {
            tracker.observe(key, Vec3::new(10.0 * i as f32 * dt, 0.0, 0.0), dt);
        }
        assert!((tracker.velocity().x - 10.0).abs() < 0.01);
        assert!(tracker.acceleration().length() < 0.1);
    }

    #[test]
    fn stationary_target_needs_no_lead() {
        let profile = DifficultyProfile::hard();
        let target = Vec3::new(0.0, 0.0, 80.0);
        let acceleration = Vec3::new(3.0, 0.0, 0.0);
        let aim = lead_point(Vec3::ZERO, target, Vec3::ZERO, acceleration, 90.0, &profile);
        assert!(aim.distance(target) < 1e-5);
    }

    #[test]
    fn hard_tier_leads_further_than_easy() {
        let target = Vec3::new(0.0, 0.0, 90.0);
        let velocity = Vec3::new(10.0, 0.0, 0.0);
        let lead = |profile: &DifficultyProfile| {
            lead_point(Vec3::ZERO, target, velocity, Vec3::ZERO, 90.0, profile)
        };
        let easy = lead(&DifficultyProfile::easy());
        let hard = lead(&DifficultyProfile::hard());
        assert!(hard.x > easy.x);
        assert!(hard.x <= 10.0 + 1e-4, "prediction factor is capped at one");
    }

    #[test]
    fn turret_takes_shorter_arc_and_respects_rate() {
        let mut turret = TurretController::new(3.0, TURRET_TURN_RATE_RAD);
        turret.update(-3.0, 0.05);
        // Shorter arc crosses π, so the angle grows past 3.0 toward π.
        assert!(turret.angle() > 3.0 || turret.angle() < -3.0);
        let mut slow = TurretController::new(0.0, 1.0);
        slow.update(1.0, 0.1);
        assert!((slow.angle() - 0.1).abs() < 1e-5);
        assert!(!slow.is_aimed(1.0));
        assert!(slow.is_aimed(0.1 + AIM_TOLERANCE_RAD * 0.5));
    }

    #[test]
    fn cooldown_shrinks_with_scale_but_not_below_minimum() {
        let profile = DifficultyProfile::normal();
        assert_eq!(WeaponState::cooldown_secs(&profile, 0.0, 0.3), profile.fire_cooldown_secs);
        assert!(WeaponState::cooldown_secs(&profile, 1.0, 0.3) < profile.fire_cooldown_secs);
        assert_eq!(WeaponState::cooldown_secs(&profile, 1.0, 5.0), 5.0);
    }

    #[test]
    fn spread_stays_inside_cone() {
        let mut rng = SmallRng::seed_from_u64(7);
        let origin = Vec3::ZERO;
        let aim = Vec3::new(0.0, 0.0, 50.0);
        let straight = fire_direction(origin, aim, 90.0, 0.0, &mut rng);
        for _ in 0..50 {
            let dir = fire_direction(origin, aim, 90.0, 0.05, &mut rng);
            assert!(dir.angle_between(straight) <= 0.08);
        }
    }
}
