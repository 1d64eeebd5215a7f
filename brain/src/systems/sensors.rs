// tank_brain_core/brain/src/systems/sensors.rs
// Throttled raycasts. Every raycast result is held for a fixed number of ticks so a combatant
// issues a bounded number of queries per second regardless of frame rate.

use crate::core::config::SensorConfig;
use crate::core::constants::{COMBATANT_RADIUS, FAN_RAY_OFFSETS_RAD};
use crate::core::math::{flat_distance, yaw_to_direction};
use crate::core::types::{CombatantKey, Vec3};
use crate::world::query::{
    first_blocking_hit, solid_excluding, Ray, SpatialQuery, SurfaceKind, Terrain,
};
use tracing::trace;

const GROUND_CACHE_DRIFT: f32 = 2.0;
const GROUND_RAY_HEIGHT: f32 = 6.0;
const GROUND_RAY_DEPTH: f32 = 60.0;
const FAN_HEIGHT: f32 = 0.8;

#[derive(Debug, Clone, Copy)]
struct Cached<T> {
    value: T,
    valid_until: u64,
}

impl<T: Copy> Cached<T> {
    fn fresh(&self, tick: u64) -> Option<T> {
        if tick < self.valid_until {
            Some(self.value)
        } else {
            None
        }
    }
}

/// Result of the five-ray obstacle fan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanReading {
    /// Hit distance per ray, in `FAN_RAY_OFFSETS_RAD` order; `range` when clear.
    pub distances: [f32; 5],
    pub closest: f32,
    /// Positive when the positive-yaw side has more clearance.
    pub clearance_bias: f32,
    pub range: f32,
}

impl FanReading {
    pub fn clear(range: f32) -> Self {
        FanReading { distances: [range; 5], closest: range, clearance_bias: 0.0, range }
    }

    pub fn from_distances(distances: [f32; 5], range: f32) -> Self {
        let closest = distances.iter().copied().fold(range, f32::min);
        let mut positive = 0.0;
        let mut negative = 0.0;
        for (offset, distance) in FAN_RAY_OFFSETS_RAD.iter().zip(distances.iter()) {
            if *offset > 0.0 {
                positive += distance;
            } else if *offset < 0.0 {
                negative += distance;
            }
        }
        let clearance_bias = if range > 0.0 {
            ((positive - negative) / (2.0 * range)).clamp(-1.0, 1.0)
        } else {
            0.0
        };
        FanReading { distances, closest, clearance_bias, range }
    }

    pub fn is_blocked_within(&self, distance: f32) -> bool {
        self.closest < distance
    }
}

pub struct SensorCache {
    config: SensorConfig,
    los: Option<(CombatantKey, Cached<bool>)>,
    ground: Option<(Vec3, Cached<f32>)>,
    last_ground: Option<f32>,
    fan: Option<Cached<FanReading>>,
    raycasts_issued: u64,
}

impl SensorCache {
    pub fn new(config: SensorConfig) -> Self {
        SensorCache {
            config,
            los: None,
            ground: None,
            last_ground: None,
            fan: None,
            raycasts_issued: 0,
        }
    }

    pub fn eye_height(&self) -> f32 {
        self.config.eye_height
    }

    pub fn raycasts_issued(&self) -> u64 {
        self.raycasts_issued
    }

    pub fn last_ground_height(&self) -> Option<f32> {
        self.last_ground
    }

    pub fn invalidate(&mut self) {
        self.los = None;
        self.ground = None;
        self.fan = None;
    }

    /// Cached line-of-sight from our turret to the target's turret.
    pub fn line_of_sight(
        &mut self,
        tick: u64,
        self_key: CombatantKey,
        self_pos: Vec3,
        target_key: CombatantKey,
        target_pos: Vec3,
        spatial: &dyn SpatialQuery,
    ) -> bool {
        if let Some((cached_target, cached)) = &self.los {
            if *cached_target == target_key {
                if let Some(visible) = cached.fresh(tick) {
                    return visible;
                }
            }
        }

        let eye = self_pos + Vec3::Y * self.config.eye_height;
        let aim = target_pos + Vec3::Y * self.config.eye_height;
        let ray = Ray::between(eye, aim);
        let filter = solid_excluding(self_key);
        self.raycasts_issued += 1;
        let visible = match first_blocking_hit(spatial, &ray, &filter) {
            None => true,
            Some(hit) => {
                matches!(hit.surface, SurfaceKind::Combatant(key) if key == target_key)
                    || hit.distance >= ray.max_distance - COMBATANT_RADIUS
            }
        };
        let valid_until = tick + self.config.los_cache_ticks;
        self.los = Some((target_key, Cached { value: visible, valid_until }));
        trace!("LOS raycast at tick {} -> {}", tick, visible);
        visible
    }

    /// Ground height under `pos`. Falls back to a downward ray, then to the last known value.
    pub fn ground_height(
        &mut self,
        tick: u64,
        pos: Vec3,
        terrain: &dyn Terrain,
        spatial: &dyn SpatialQuery,
    ) -> f32 {
        if let Some((at, cached)) = &self.ground {
            if flat_distance(*at, pos) < GROUND_CACHE_DRIFT {
                if let Some(height) = cached.fresh(tick) {
                    return height;
                }
            }
        }

        let sampled = terrain.ground_height_at(pos.x, pos.z).filter(|h| h.is_finite()).or_else(|| {
            self.raycasts_issued += 1;
            let origin = Vec3::new(pos.x, pos.y + GROUND_RAY_HEIGHT, pos.z);
            let ray = Ray::new(origin, Vec3::NEG_Y, GROUND_RAY_HEIGHT + GROUND_RAY_DEPTH);
            let terrain_only = |surface: &SurfaceKind| matches!(surface, SurfaceKind::Terrain);
            spatial.raycast(&ray, &terrain_only).map(|hit| hit.point.y)
        });

        let height = match sampled {
            Some(height) => {
                self.last_ground = Some(height);
                height
            }
            None => {
                trace!(
                    "Ground raycast missed at ({:.1}, {:.1}); using last known height",
                    pos.x, pos.z
                );
                self.last_ground.unwrap_or(0.0)
            }
        };
        let valid_until = tick + self.config.ground_cache_ticks;
        self.ground = Some((pos, Cached { value: height, valid_until }));
        height
    }

    /// Periodic five-ray fan ahead of the hull.
    pub fn obstacle_fan(
        &mut self,
        tick: u64,
        self_key: CombatantKey,
        pos: Vec3,
        yaw: f32,
        spatial: &dyn SpatialQuery,
    ) -> FanReading {
        if let Some(reading) = self.fan.as_ref().and_then(|cached| cached.fresh(tick)) {
            return reading;
        }

        let range = self.config.fan_range;
        let origin = pos + Vec3::Y * FAN_HEIGHT;
        let filter = |surface: &SurfaceKind| match surface {
            SurfaceKind::Terrain | SurfaceKind::Projectile | SurfaceKind::Pickup => false,
            SurfaceKind::Combatant(key) => *key != self_key,
            _ => true,
        };
        let mut distances = [range; 5];
        for (slot, offset) in distances.iter_mut().zip(FAN_RAY_OFFSETS_RAD.iter()) {
            let ray = Ray::new(origin, yaw_to_direction(yaw + offset), range);
            self.raycasts_issued += 1;
            if let Some(hit) = first_blocking_hit(spatial, &ray, &filter) {
                *slot = hit.distance.min(range);
            }
        }
        let reading = FanReading::from_distances(distances, range);
        let valid_until = tick + self.config.fan_interval_ticks;
        self.fan = Some(Cached { value: reading, valid_until });
        reading
    }
}
