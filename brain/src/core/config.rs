// tank_brain_core/brain/src/core/config.rs
// Typed configuration for the combatant brain. Every section carries explicit defaults so a
// partial YAML document (or none at all) yields a usable config.

use super::constants::*;
use super::error::{BrainError, BrainResult};
use super::types::DifficultyTier;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub hover_height: f32,
    pub hover_stiffness: f32,
    pub hover_damping: f32,
    pub hover_rise_gain: f32,
    pub hover_settle_gain: f32,
    pub max_hover_accel: f32,
    pub hover_vertical_speed_falloff: f32,
    pub downforce_coefficient: f32,
    pub upright_stiffness: f32,
    pub upright_damping: f32,
    pub tilt_safety_threshold: f32,
    pub tilt_emergency_multiplier: f32,
    pub tilt_emergency_lift: f32,
    pub drive_gain: f32,
    pub drive_force_limit: f32,
    pub turn_speed: f32,
    pub low_speed_turn_boost: f32,
    pub turn_stiffness: f32,
    pub turn_speed_damping: f32,
    pub turn_settle_damping: f32,
    pub anti_roll_strength: f32,
    pub lateral_friction: f32,
    pub longitudinal_friction: f32,
    pub throttle_time_constant: f32,
    pub steer_time_constant: f32,
    pub max_vertical_speed: f32,
    pub max_angular_speed: f32,
    pub penetration_recovery_depth: f32,
    pub penetration_recovery_speed: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        LocomotionConfig {
            hover_height: 1.2,
            hover_stiffness: 45.0,
            hover_damping: 9.0,
            hover_rise_gain: 1.0,
            hover_settle_gain: 0.55,
            max_hover_accel: 35.0,
            hover_vertical_speed_falloff: 0.15,
            downforce_coefficient: 0.08,
            upright_stiffness: 30.0,
            upright_damping: 6.0,
            tilt_safety_threshold: 0.7,
            tilt_emergency_multiplier: 3.0,
            tilt_emergency_lift: 0.6,
            drive_gain: 3.0,
            drive_force_limit: 0.9,
            turn_speed: 1.8,
            low_speed_turn_boost: 0.6,
            turn_stiffness: 8.0,
            turn_speed_damping: 1.5,
            turn_settle_damping: 6.0,
            anti_roll_strength: 4.0,
            lateral_friction: 4.0,
            longitudinal_friction: 1.5,
            throttle_time_constant: 0.25,
            steer_time_constant: 0.12,
            max_vertical_speed: 12.0,
            max_angular_speed: 6.0,
            penetration_recovery_depth: 1.5,
            penetration_recovery_speed: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub los_cache_ticks: u64,
    pub ground_cache_ticks: u64,
    pub fan_interval_ticks: u64,
    pub fan_range: f32,
    pub eye_height: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig {
            los_cache_ticks: 6,
            ground_cache_ticks: 4,
            fan_interval_ticks: 8,
            fan_range: 25.0,
            eye_height: TURRET_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TacticsConfig {
    pub weapon_range: f32,
    pub optimal_range: f32,
    pub close_range: f32,
    pub ambush_min_range: f32,
    pub ambush_max_range: f32,
    pub near_decision_distance: f32,
    pub far_decision_distance: f32,
    pub max_decision_interval_ticks: u64,
    pub cover_seek_interval_ticks: u64,
    pub cover_search_radius: f32,
    pub evade_chance: f64,
    pub disadvantage_cover_chance: f64,
    pub ambush_chance: f64,
    pub bait_chance: f64,
    pub base_flank_chance: f32,
    pub off_range_flank_bonus: f32,
    pub advantage_flank_bonus: f32,
    pub ally_flank_bonus: f32,
    pub per_extra_ally_flank_bonus: f32,
    pub finishing_flank_multiplier: f32,
    pub flank_distance: f32,
    pub evade_distance: f32,
    pub disengage_health: f32,
    pub min_dwell_ticks: u64,
    pub ambush_duration_secs: f32,
    pub bait_duration_secs: f32,
    pub waypoint_radius: f32,
    pub patrol_waypoints: usize,
    pub patrol_radius: f32,
    pub capture_radius: f32,
    pub wall_deploy_health: f32,
    pub wall_lifetime_secs: f32,
    pub wall_cooldown_secs: f32,
}

impl Default for TacticsConfig {
    fn default() -> Self {
        TacticsConfig {
            weapon_range: 120.0,
            optimal_range: 60.0,
            close_range: 45.0,
            ambush_min_range: 30.0,
            ambush_max_range: 80.0,
            near_decision_distance: 60.0,
            far_decision_distance: 300.0,
            max_decision_interval_ticks: 5,
            cover_seek_interval_ticks: 90,
            cover_search_radius: 40.0,
            evade_chance: 0.6,
            disadvantage_cover_chance: 0.25,
            ambush_chance: 0.3,
            bait_chance: 0.2,
            base_flank_chance: 0.25,
            off_range_flank_bonus: 0.15,
            advantage_flank_bonus: 0.1,
            ally_flank_bonus: 0.3,
            per_extra_ally_flank_bonus: 0.1,
            finishing_flank_multiplier: 0.2,
            flank_distance: 35.0,
            evade_distance: 30.0,
            disengage_health: 0.3,
            min_dwell_ticks: 90,
            ambush_duration_secs: 8.0,
            bait_duration_secs: 5.0,
            waypoint_radius: 6.0,
            patrol_waypoints: 6,
            patrol_radius: 60.0,
            capture_radius: 8.0,
            wall_deploy_health: 0.4,
            wall_lifetime_secs: 8.0,
            wall_cooldown_secs: 15.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub projectile_speed: f32,
    pub projectile_lifetime_secs: f32,
    pub damage: f32,
    pub hit_radius: f32,
    pub recoil_impulse: f32,
    pub recoil_torque: f32,
    pub min_cooldown_secs: f32,
    pub max_ricochets: u8,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        WeaponConfig {
            projectile_speed: PROJECTILE_SPEED,
            projectile_lifetime_secs: PROJECTILE_LIFETIME_SECS,
            damage: PROJECTILE_DAMAGE,
            hit_radius: PROJECTILE_HIT_RADIUS,
            recoil_impulse: 30.0,
            recoil_torque: 10.0,
            min_cooldown_secs: 0.3,
            max_ricochets: MAX_RICOCHETS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub stuck_check_interval_secs: f32,
    pub min_movement: f32,
    pub stuck_checks_before_unstuck: u32,
    pub unstucks_before_reposition: u32,
    pub unstuck_impulse: f32,
    pub reverse_bias_ticks: u32,
    pub reposition_clearance: f32,
    pub terrain_penetration_depth: f32,
    pub terrain_recovery_force: f32,
    pub spawn_stabilize_ticks: u64,
    pub obstacle_avoid_distance: f32,
    pub obstacle_reverse_distance: f32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            stuck_check_interval_secs: 1.5,
            min_movement: 0.75,
            stuck_checks_before_unstuck: 2,
            unstucks_before_reposition: 2,
            unstuck_impulse: 6.0,
            reverse_bias_ticks: 45,
            reposition_clearance: 2.5,
            terrain_penetration_depth: 1.0,
            terrain_recovery_force: 4.0,
            spawn_stabilize_ticks: 30,
            obstacle_avoid_distance: 14.0,
            obstacle_reverse_distance: 3.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub refresh_interval_ticks: u64,
    pub ally_radius: f32,
    pub health_weight: f32,
    pub distance_weight: f32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        GroupConfig {
            refresh_interval_ticks: 30,
            ally_radius: 80.0,
            health_weight: 0.6,
            distance_weight: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    pub difficulty_scale: f32,
    pub adaptive_growth_per_sec: f32,
    pub adaptive_cap: f32,
    pub aggressive_dps: f32,
    pub defensive_dps: f32,
    pub style_window_secs: f32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        AdaptationConfig {
            difficulty_scale: 0.0,
            adaptive_growth_per_sec: 0.004,
            adaptive_cap: 1.5,
            aggressive_dps: 8.0,
            defensive_dps: 2.5,
            style_window_secs: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub fire_cooldown_secs: f32,
    pub accuracy_spread: f32,
    pub detection_range: f32,
    pub max_speed: f32,
    pub max_health: f32,
    pub lead_base: f32,
    pub lead_speed_bonus: f32,
    pub second_order_lead: bool,
}

impl DifficultyProfile {
    pub fn easy() -> Self {
        DifficultyProfile {
            fire_cooldown_secs: 3.0,
            accuracy_spread: 0.12,
            detection_range: 180.0,
            max_speed: 10.0,
            max_health: 80.0,
            lead_base: 0.35,
            lead_speed_bonus: 0.2,
            second_order_lead: false,
        }
    }

    pub fn normal() -> Self {
        DifficultyProfile {
            fire_cooldown_secs: 2.0,
            accuracy_spread: 0.05,
            detection_range: 250.0,
            max_speed: 14.0,
            max_health: 100.0,
            lead_base: 0.6,
            lead_speed_bonus: 0.25,
            second_order_lead: false,
        }
    }

    pub fn hard() -> Self {
        DifficultyProfile {
            fire_cooldown_secs: 1.2,
            accuracy_spread: 0.004,
            detection_range: 320.0,
            max_speed: 18.0,
            max_health: 130.0,
            lead_base: 0.92,
            lead_speed_bonus: 0.06,
            second_order_lead: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTable {
    pub easy: DifficultyProfile,
    pub normal: DifficultyProfile,
    pub hard: DifficultyProfile,
}

impl Default for DifficultyTable {
    fn default() -> Self {
        DifficultyTable {
            easy: DifficultyProfile::easy(),
            normal: DifficultyProfile::normal(),
            hard: DifficultyProfile::hard(),
        }
    }
}

impl DifficultyTable {
    pub fn profile(&self, tier: DifficultyTier) -> &DifficultyProfile {
        match tier {
            DifficultyTier::Easy => &self.easy,
            DifficultyTier::Normal => &self.normal,
            DifficultyTier::Hard => &self.hard,
        }
    }

    fn all(&self) -> [&DifficultyProfile; 3] {
        [&self.easy, &self.normal, &self.hard]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub tick_rate: u64,
    pub locomotion: LocomotionConfig,
    pub sensors: SensorConfig,
    pub tactics: TacticsConfig,
    pub weapon: WeaponConfig,
    pub recovery: RecoveryConfig,
    pub group: GroupConfig,
    pub adaptation: AdaptationConfig,
    pub difficulty: DifficultyTable,
}

impl Default for BrainConfig {
    fn default() -> Self {
        BrainConfig {
            tick_rate: SIM_TICK_RATE,
            locomotion: LocomotionConfig::default(),
            sensors: SensorConfig::default(),
            tactics: TacticsConfig::default(),
            weapon: WeaponConfig::default(),
            recovery: RecoveryConfig::default(),
            group: GroupConfig::default(),
            adaptation: AdaptationConfig::default(),
            difficulty: DifficultyTable::default(),
        }
    }
}

/// Partial settings update. Absent fields are left untouched; present fields are clamped to
/// their allowed range before being written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub difficulty_scale: Option<f32>,
    pub hover_height: Option<f32>,
    pub turn_speed: Option<f32>,
    pub weapon_range: Option<f32>,
    pub optimal_range: Option<f32>,
    pub stuck_check_interval_secs: Option<f32>,
    pub ally_radius: Option<f32>,
    pub base_flank_chance: Option<f32>,
}

fn clamp_field(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
    adjusted: &mut Vec<&'static str>,
) -> BrainResult<f32> {
    if !value.is_finite() {
        return Err(BrainError::Config(format!("{} must be finite, got {}", name, value)));
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("Settings patch: {} = {} clamped to {}", name, value, clamped);
        adjusted.push(name);
    }
    Ok(clamped)
}

impl BrainConfig {
    pub fn from_yaml_str(yaml: &str) -> BrainResult<Self> {
        let config: BrainConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn fixed_delta(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn secs_to_ticks(&self, secs: f32) -> u64 {
        (secs.max(0.0) * self.tick_rate as f32).round() as u64
    }

    pub fn validate(&self) -> BrainResult<()> {
        if self.tick_rate == 0 {
            return Err(BrainError::Config("tick_rate must be positive".into()));
        }
        let t = &self.tactics;
        if !(t.weapon_range > 0.0) || !(t.optimal_range > 0.0) {
            return Err(BrainError::Config("weapon and optimal ranges must be positive".into()));
        }
        if t.optimal_range > t.weapon_range {
            return Err(BrainError::Config(format!(
                "optimal_range {} exceeds weapon_range {}",
                t.optimal_range, t.weapon_range
            )));
        }
        if t.ambush_min_range >= t.ambush_max_range {
            return Err(BrainError::Config("ambush band is empty".into()));
        }
        if t.max_decision_interval_ticks < 2 {
            return Err(BrainError::Config("max_decision_interval_ticks must be at least 2".into()));
        }
        if t.patrol_waypoints == 0 {
            return Err(BrainError::Config("patrol_waypoints must be at least 1".into()));
        }
        for profile in self.difficulty.all() {
            if profile.detection_range < t.weapon_range {
                return Err(BrainError::Config(format!(
                    "detection_range {} below weapon_range {}",
                    profile.detection_range, t.weapon_range
                )));
            }
            if !(profile.max_health > 0.0) || !(profile.max_speed > 0.0) {
                return Err(BrainError::Config("profile health and speed must be positive".into()));
            }
        }
        if self.recovery.stuck_checks_before_unstuck == 0 {
            return Err(BrainError::Config("stuck_checks_before_unstuck must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.adaptation.difficulty_scale) {
            return Err(BrainError::Config("difficulty_scale must lie in [0, 1]".into()));
        }
        Ok(())
    }

    /// Applies a partial update, clamping every present field. Returns the names of the
    /// fields that had to be clamped.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) -> BrainResult<Vec<&'static str>> {
        let mut adjusted = Vec::new();
        let mut next = self.clone();

        if let Some(v) = patch.difficulty_scale {
            next.adaptation.difficulty_scale =
                clamp_field("difficulty_scale", v, 0.0, 1.0, &mut adjusted)?;
        }
        if let Some(v) = patch.hover_height {
            next.locomotion.hover_height = clamp_field("hover_height", v, 0.3, 5.0, &mut adjusted)?;
        }
        if let Some(v) = patch.turn_speed {
            next.locomotion.turn_speed = clamp_field("turn_speed", v, 0.3, 6.0, &mut adjusted)?;
        }
        if let Some(v) = patch.weapon_range {
            let min_detection = next
                .difficulty
                .all()
                .iter()
                .map(|p| p.detection_range)
                .fold(f32::MAX, f32::min);
            let max = min_detection.max(20.0);
            next.tactics.weapon_range = clamp_field("weapon_range", v, 20.0, max, &mut adjusted)?;
            if next.tactics.optimal_range > next.tactics.weapon_range {
                next.tactics.optimal_range = next.tactics.weapon_range;
                adjusted.push("optimal_range");
            }
        }
        if let Some(v) = patch.optimal_range {
            let max = next.tactics.weapon_range;
            next.tactics.optimal_range = clamp_field("optimal_range", v, 5.0, max, &mut adjusted)?;
        }
        if let Some(v) = patch.stuck_check_interval_secs {
            next.recovery.stuck_check_interval_secs =
                clamp_field("stuck_check_interval_secs", v, 0.25, 10.0, &mut adjusted)?;
        }
        if let Some(v) = patch.ally_radius {
            next.group.ally_radius = clamp_field("ally_radius", v, 10.0, 500.0, &mut adjusted)?;
        }
        if let Some(v) = patch.base_flank_chance {
            next.tactics.base_flank_chance =
                clamp_field("base_flank_chance", v, 0.0, 1.0, &mut adjusted)?;
        }

        next.validate()?;
        *self = next;
        Ok(adjusted)
    }
}
