// tank_brain_core/brain/src/core/constants.rs
use std::time::Duration;

pub const SIM_TICK_RATE: u64 = 60;
pub const TICK_DURATION_MS: u64 = 1000 / SIM_TICK_RATE;
pub const TICK_DURATION: Duration = Duration::from_millis(TICK_DURATION_MS);
pub const FIXED_DELTA_SECS: f32 = 1.0 / SIM_TICK_RATE as f32;

pub const GRAVITY: f32 = 9.81;

// World constants (sandbox arena)
pub const WORLD_MIN_X: f32 = -400.0;
pub const WORLD_MAX_X: f32 = 400.0;
pub const WORLD_MIN_Z: f32 = -400.0;
pub const WORLD_MAX_Z: f32 = 400.0;
pub const WORLD_MIN_Y: f32 = -50.0;
pub const WORLD_MAX_Y: f32 = 200.0;
pub const OBSTACLE_INDEX_CELL_SIZE: f32 = 40.0;

// Combatant body
pub const COMBATANT_RADIUS: f32 = 2.0;
pub const TURRET_HEIGHT: f32 = 1.4;
pub const MUZZLE_LENGTH: f32 = 2.6;
pub const DEFAULT_BODY_MASS: f32 = 40.0;

// Health thresholds (fractions of max health)
pub const CRITICAL_HEALTH_FRACTION: f32 = 0.07;
pub const LOW_HEALTH_FRACTION: f32 = 0.25;

// Aim
pub const AIM_TOLERANCE_RAD: f32 = 7.0 * std::f32::consts::PI / 180.0;
pub const TURRET_TURN_RATE_RAD: f32 = 2.4;

// Obstacle fan: center plus two symmetric offset pairs
pub const FAN_RAY_OFFSETS_RAD: [f32; 5] = [0.0, -0.35, 0.35, -0.75, 0.75];

// Ambush directional search offsets from the target bearing
pub const AMBUSH_SEARCH_OFFSETS_RAD: [f32; 4] = [
    std::f32::consts::FRAC_PI_3,
    -std::f32::consts::FRAC_PI_3,
    std::f32::consts::FRAC_PI_2,
    -std::f32::consts::FRAC_PI_2,
];

// Projectiles
pub const PROJECTILE_SPEED: f32 = 90.0;
pub const PROJECTILE_LIFETIME_SECS: f32 = 3.0;
pub const PROJECTILE_HIT_RADIUS: f32 = 2.2;
pub const PROJECTILE_DAMAGE: f32 = 20.0;
pub const PROJECTILE_MASS: f32 = 1.0;
pub const MAX_RICOCHETS: u8 = 1;
pub const RICOCHET_MAX_INCIDENCE_RAD: f32 = 0.26;
pub const RICOCHET_RESTITUTION: f32 = 0.6;

// Reference target speed used to normalise lead prediction
pub const LEAD_REFERENCE_SPEED: f32 = 20.0;

// Protective wall
pub const WALL_HALF_EXTENTS: [f32; 3] = [3.0, 2.0, 0.4];
pub const WALL_MAX_HEALTH: f32 = 60.0;
pub const WALL_STANDOFF: f32 = 4.0;

// Player style classifier
pub const STYLE_WINDOW_SAMPLES: usize = 12;
