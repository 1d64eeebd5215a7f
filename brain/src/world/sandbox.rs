// tank_brain_core/brain/src/world/sandbox.rs
// Self-contained stand-ins for the physics engine and world queries so the brain can run
// headless: a rolling heightfield, indexed obstacles, registry-synced combatant spheres and
// protective walls, and a simple rigid body.

use crate::core::constants::*;
use crate::core::math::flatten;
use crate::core::types::{CombatantKey, FlankSide, Quat, Transform, Vec3};
use crate::entities::wall::WallVolume;
use crate::systems::physics::collision::{ray_aabb, segment_sphere, segment_wall};
use crate::world::map_generator::MapGenerator;
use crate::world::obstacle_index::{Obstacle, ObstacleIndex, ObstacleKind};
use crate::world::pathfinding::Pathfinder;
use crate::world::physics::PhysicsBody;
use crate::world::query::{Ray, RayFilter, RayHit, SpatialQuery, SurfaceKind, Terrain};
use crate::world::registry::CombatantRegistry;
use tracing::debug;

const TERRAIN_MARCH_STEP: f32 = 1.0;
const TERRAIN_REFINE_STEPS: usize = 8;
const FLOOR_BELOW_GROUND: f32 = 2.5;
const COVER_CLEARANCE: f32 = 3.0;

// --- Rigid Body ---
#[derive(Debug, Clone)]
pub struct SandboxBody {
    transform: Transform,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    mass: f32,
    force: Vec3,
    torque: Vec3,
    pinned: bool,
    disposed: bool,
}

impl SandboxBody {
    pub fn new(transform: Transform, mass: f32) -> Self {
        SandboxBody {
            transform,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: if mass > 0.0 { mass } else { DEFAULT_BODY_MASS },
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            pinned: false,
            disposed: false,
        }
    }

    /// A pinned body accepts forces but never moves, like a hull wedged against geometry.
    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Semi-implicit Euler step. Inertia uses a unit radius of gyration so torque divided by
    /// mass is angular acceleration.
    pub fn integrate(&mut self, dt: f32) {
        let force = std::mem::take(&mut self.force);
        let torque = std::mem::take(&mut self.torque);
        if self.disposed || self.pinned || !(dt > 0.0) {
            if self.pinned {
                self.linear_velocity = Vec3::ZERO;
                self.angular_velocity = Vec3::ZERO;
            }
            return;
        }
        self.linear_velocity += (force / self.mass - Vec3::Y * GRAVITY) * dt;
        self.angular_velocity += torque / self.mass * dt;
        self.transform.position += self.linear_velocity * dt;
        let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.transform.rotation = (spin * self.transform.rotation).normalize();
    }
}

impl PhysicsBody for SandboxBody {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn linear_velocity(&self) -> Vec3 {
        self.linear_velocity
    }

    fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        self.linear_velocity = velocity;
    }

    fn set_angular_velocity(&mut self, velocity: Vec3) {
        self.angular_velocity = velocity;
    }

    fn mass(&self) -> f32 {
        self.mass
    }

    fn apply_force(&mut self, force: Vec3, at: Vec3) {
        self.force += force;
        self.torque += (at - self.transform.position).cross(force);
    }

    fn apply_impulse(&mut self, impulse: Vec3, at: Vec3) {
        if self.pinned {
            return;
        }
        self.linear_velocity += impulse / self.mass;
        self.angular_velocity += (at - self.transform.position).cross(impulse) / self.mass;
    }

    fn apply_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

// --- World ---
pub struct SandboxWorld {
    obstacles: ObstacleIndex,
    terrain_amplitude: f32,
    terrain_wavelength: f32,
    combatants: Vec<(CombatantKey, Vec3)>,
    walls: Vec<WallVolume>,
}

impl SandboxWorld {
    pub fn new(obstacles: &[Obstacle], terrain_amplitude: f32, terrain_wavelength: f32) -> Self {
        let index = ObstacleIndex::new();
        index.rebuild(obstacles, 0);
        SandboxWorld {
            obstacles: index,
            terrain_amplitude,
            terrain_wavelength: terrain_wavelength.max(1.0),
            combatants: Vec::new(),
            walls: Vec::new(),
        }
    }

    /// Flat, empty ground.
    pub fn flat() -> Self {
        Self::new(&[], 0.0, 1.0)
    }

    pub fn generated(seed: u64) -> Self {
        let obstacles = MapGenerator::generate_arena(seed);
        debug!("Sandbox arena generated from seed {} with {} obstacles", seed, obstacles.len());
        Self::new(&obstacles, 1.5, 90.0)
    }

    pub fn obstacles(&self) -> &ObstacleIndex {
        &self.obstacles
    }

    pub fn set_gate_height(&self, gate_id: u64, top_y: f32) -> bool {
        self.obstacles.set_gate_height(gate_id, top_y)
    }

    /// Mirrors combatant positions and walls from the registry for ray queries.
    pub fn sync_from(&mut self, registry: &CombatantRegistry) {
        self.combatants.clear();
        self.walls.clear();
        for (key, snapshot) in registry.iter() {
            if snapshot.alive {
                self.combatants.push((key, snapshot.position));
            }
            if let Some(wall) = &snapshot.wall {
                self.walls.push(wall.clone());
            }
        }
    }

    fn height(&self, x: f32, z: f32) -> f32 {
        if self.terrain_amplitude == 0.0 {
            return 0.0;
        }
        let k = std::f32::consts::TAU / self.terrain_wavelength;
        self.terrain_amplitude * (x * k).sin() * (z * k * 0.7).cos()
    }

    fn in_bounds(x: f32, z: f32) -> bool {
        (WORLD_MIN_X..=WORLD_MAX_X).contains(&x) && (WORLD_MIN_Z..=WORLD_MAX_Z).contains(&z)
    }

    fn march_terrain(&self, ray: &Ray) -> Option<RayHit> {
        let above = |p: Vec3| p.y > self.height(p.x, p.z);
        if !above(ray.origin) {
            return Some(RayHit {
                distance: 0.0,
                point: ray.origin,
                normal: self.normal_at(ray.origin.x, ray.origin.z),
                surface: SurfaceKind::Terrain,
            });
        }
        let mut previous = 0.0;
        let mut t = TERRAIN_MARCH_STEP.min(ray.max_distance);
        while previous < ray.max_distance {
            if !above(ray.at(t)) {
                let (mut lo, mut hi) = (previous, t);
                for _ in 0..TERRAIN_REFINE_STEPS {
                    let mid = 0.5 * (lo + hi);
                    if above(ray.at(mid)) {
                        lo = mid;
                    } else {
                        hi = mid;
                    }
                }
                let point = ray.at(hi);
                return Some(RayHit {
                    distance: hi,
                    point,
                    normal: self.normal_at(point.x, point.z),
                    surface: SurfaceKind::Terrain,
                });
            }
            previous = t;
            t = (t + TERRAIN_MARCH_STEP).min(ray.max_distance);
            if previous >= ray.max_distance {
                break;
            }
        }
        None
    }

    /// Keeps a body out of solid obstacles and above the sandbox floor.
    pub fn resolve_body_collisions(&self, body: &mut SandboxBody) {
        let mut transform = body.transform();
        let mut velocity = body.linear_velocity();
        let radius = COMBATANT_RADIUS;
        let position = transform.position;

        for obstacle in self.obstacles.query_radius(position.x, position.z, radius) {
            let above = position.y - radius * 0.5 > obstacle.solid_top();
            if !obstacle.contains_flat(position, radius) || above {
                continue;
            }
            // Push out along the shallowest horizontal axis.
            let push_neg_x = position.x - (obstacle.min.x - radius);
            let push_pos_x = (obstacle.max.x + radius) - position.x;
            let push_neg_z = position.z - (obstacle.min.z - radius);
            let push_pos_z = (obstacle.max.z + radius) - position.z;
            let smallest = push_neg_x.min(push_pos_x).min(push_neg_z).min(push_pos_z);
            if smallest == push_neg_x {
                transform.position.x -= push_neg_x;
                velocity.x = velocity.x.min(0.0);
            } else if smallest == push_pos_x {
                transform.position.x += push_pos_x;
                velocity.x = velocity.x.max(0.0);
            } else if smallest == push_neg_z {
                transform.position.z -= push_neg_z;
                velocity.z = velocity.z.min(0.0);
            } else {
                transform.position.z += push_pos_z;
                velocity.z = velocity.z.max(0.0);
            }
        }

        let floor = self.height(transform.position.x, transform.position.z) - FLOOR_BELOW_GROUND;
        if transform.position.y < floor {
            transform.position.y = floor;
            velocity.y = velocity.y.max(0.0);
        }
        if transform.position != position {
            body.set_transform(transform);
            body.set_linear_velocity(velocity);
        }
    }

    fn blocked_at(&self, point: Vec3) -> bool {
        self.obstacles
            .query_radius(point.x, point.z, COMBATANT_RADIUS)
            .iter()
            .any(|o| {
                matches!(o.kind, ObstacleKind::Solid) && o.contains_flat(point, COMBATANT_RADIUS)
            })
    }
}

impl Terrain for SandboxWorld {
    fn ground_height_at(&self, x: f32, z: f32) -> Option<f32> {
        Self::in_bounds(x, z).then(|| self.height(x, z))
    }

    fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let e = 0.5;
        let dx = self.height(x + e, z) - self.height(x - e, z);
        let dz = self.height(x, z + e) - self.height(x, z - e);
        Vec3::new(-dx, 2.0 * e, -dz).normalize_or_zero()
    }
}

impl SpatialQuery for SandboxWorld {
    fn raycast(&self, ray: &Ray, filter: RayFilter<'_>) -> Option<RayHit> {
        if ray.max_distance <= 0.0 || ray.direction == Vec3::ZERO {
            return None;
        }
        let end = ray.at(ray.max_distance);
        let mut best: Option<RayHit> = None;
        let mut consider = |hit: RayHit| {
            if best.as_ref().map_or(true, |b| hit.distance < b.distance) {
                best = Some(hit);
            }
        };

        for obstacle in self.obstacles.query_line_segment(ray.origin, end) {
            let surface = obstacle.surface();
            if !filter(&surface) {
                continue;
            }
            let entry =
                ray_aabb(ray.origin, ray.direction, obstacle.min, obstacle.max, ray.max_distance);
            if let Some((distance, normal)) = entry {
                consider(RayHit { distance, point: ray.at(distance), normal, surface });
            }
        }

        for (key, position) in &self.combatants {
            let surface = SurfaceKind::Combatant(*key);
            if !filter(&surface) {
                continue;
            }
            let center = *position + Vec3::Y * (TURRET_HEIGHT * 0.5);
            if let Some(t) = segment_sphere(ray.origin, end, center, COMBATANT_RADIUS) {
                let distance = t * ray.max_distance;
                let point = ray.at(distance);
                let normal = (point - center).normalize_or_zero();
                consider(RayHit { distance, point, normal, surface });
            }
        }

        for wall in &self.walls {
            let surface = SurfaceKind::Wall { owner: wall.owner, wall_id: wall.wall_id };
            if !filter(&surface) {
                continue;
            }
            if let Some(t) = segment_wall(ray.origin, end, wall) {
                let distance = t * ray.max_distance;
                let point = ray.at(distance);
                consider(RayHit { distance, point, normal: -ray.direction, surface });
            }
        }

        if filter(&SurfaceKind::Terrain) {
            if let Some(hit) = self.march_terrain(ray) {
                consider(hit);
            }
        }

        best
    }
}

impl Pathfinder for SandboxWorld {
    fn find_flank_position(
        &self,
        self_pos: Vec3,
        target_pos: Vec3,
        side: FlankSide,
    ) -> Option<Vec3> {
        let to_self = Vec3::new(self_pos.x - target_pos.x, 0.0, self_pos.z - target_pos.z);
        let distance = to_self.length();
        if distance < 1.0 {
            return None;
        }
        let dir = to_self / distance;
        // Rotate the bearing a quarter turn toward the chosen side.
        let lateral = Vec3::new(dir.z, 0.0, -dir.x) * side.sign();
        let candidate = target_pos + (dir + lateral).normalize_or_zero() * distance.min(60.0);
        let candidate = Vec3::new(candidate.x, self.height(candidate.x, candidate.z), candidate.z);
        let usable = Self::in_bounds(candidate.x, candidate.z) && !self.blocked_at(candidate);
        usable.then_some(candidate)
    }

    fn find_cover(&self, self_pos: Vec3, target_pos: Vec3, radius: f32) -> Option<Vec3> {
        self.obstacles
            .query_radius(self_pos.x, self_pos.z, radius)
            .into_iter()
            .filter(|o| matches!(o.kind, ObstacleKind::Solid) && o.max.y >= TURRET_HEIGHT)
            .filter_map(|o| {
                let center = o.center();
                let away = flatten(center - target_pos).try_normalize()?;
                let half = o.half_extents();
                let reach = half.x.max(half.z) + COMBATANT_RADIUS + COVER_CLEARANCE;
                let spot = Vec3::new(center.x + away.x * reach, 0.0, center.z + away.z * reach);
                let spot = Vec3::new(spot.x, self.height(spot.x, spot.z), spot.z);
                (Self::in_bounds(spot.x, spot.z) && !self.blocked_at(spot)).then_some(spot)
            })
            .filter(|spot| spot.distance(self_pos) <= radius)
            .min_by(|a, b| {
                let (da, db) = (a.distance(self_pos), b.distance(self_pos));
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}
