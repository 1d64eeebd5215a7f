// tank_brain_core/brain/src/world/map_generator.rs
use crate::core::constants::*;
use crate::core::types::{TeamId, Vec3};
use crate::world::obstacle_index::Obstacle;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const BORDER_THICKNESS: f32 = 6.0;
const BORDER_HEIGHT: f32 = 8.0;
const PILLAR_HEIGHT: f32 = 7.0;
const GATE_HEIGHT: f32 = 5.0;
const SPAWN_CLEARANCE: f32 = 40.0;

pub struct MapGenerator;

impl MapGenerator {
    /// Sandbox arena: solid border, a ring of central pillars, two gated lanes and a sprinkle
    /// of seeded cover blocks away from the team spawns.
    pub fn generate_arena(seed: u64) -> Vec<Obstacle> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut obstacles = Vec::new();
        obstacles.extend(Self::create_border());
        obstacles.extend(Self::create_central_pillars());
        obstacles.extend(Self::create_gated_lanes());
        obstacles.extend(Self::create_scattered_cover(&mut rng, 14));
        obstacles
    }

    fn next_id() -> u64 {
        Uuid::new_v4().as_u128() as u64
    }

    fn create_border() -> Vec<Obstacle> {
        let t = BORDER_THICKNESS;
        let h = BORDER_HEIGHT;
        let (x0, x1, z0, z1) = (WORLD_MIN_X, WORLD_MAX_X, WORLD_MIN_Z, WORLD_MAX_Z);
        let wall = |min: Vec3, max: Vec3| Obstacle::solid(Self::next_id(), min, max);
        vec![
            wall(Vec3::new(x0, 0.0, z0), Vec3::new(x1, h, z0 + t)),
            wall(Vec3::new(x0, 0.0, z1 - t), Vec3::new(x1, h, z1)),
            wall(Vec3::new(x0, 0.0, z0), Vec3::new(x0 + t, h, z1)),
            wall(Vec3::new(x1 - t, 0.0, z0), Vec3::new(x1, h, z1)),
        ]
    }

    fn create_central_pillars() -> Vec<Obstacle> {
        let ring_radius = 60.0;
        let half = 5.0;
        (0..6)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::TAU / 6.0;
                let center = Vec3::new(angle.sin() * ring_radius, 0.0, angle.cos() * ring_radius);
                Obstacle::solid(
                    Self::next_id(),
                    center - Vec3::new(half, 0.0, half),
                    center + Vec3::new(half, PILLAR_HEIGHT, half),
                )
            })
            .collect()
    }

    fn create_gated_lanes() -> Vec<Obstacle> {
        let mut obstacles = Vec::new();
        for lane_z in [-160.0f32, 160.0] {
            // Two wall segments with a gate between them.
            obstacles.push(Obstacle::solid(
                Self::next_id(),
                Vec3::new(-120.0, 0.0, lane_z - 1.5),
                Vec3::new(-10.0, PILLAR_HEIGHT, lane_z + 1.5),
            ));
            obstacles.push(Obstacle::solid(
                Self::next_id(),
                Vec3::new(10.0, 0.0, lane_z - 1.5),
                Vec3::new(120.0, PILLAR_HEIGHT, lane_z + 1.5),
            ));
            obstacles.push(Obstacle::gate(
                Self::next_id(),
                Vec3::new(-10.0, 0.0, lane_z - 1.0),
                Vec3::new(10.0, GATE_HEIGHT, lane_z + 1.0),
                GATE_HEIGHT,
            ));
        }
        obstacles
    }

    fn create_scattered_cover(rng: &mut impl Rng, count: usize) -> Vec<Obstacle> {
        let spawns = Self::team_spawn_points();
        let margin = 40.0;
        let mut obstacles = Vec::with_capacity(count);
        for _ in 0..count {
            let x = rng.gen_range(WORLD_MIN_X + margin..WORLD_MAX_X - margin);
            let z = rng.gen_range(WORLD_MIN_Z + margin..WORLD_MAX_Z - margin);
            let center = Vec3::new(x, 0.0, z);
            if spawns.iter().any(|(spawn, _)| spawn.distance(center) < SPAWN_CLEARANCE) {
                continue;
            }
            let half_x = rng.gen_range(2.0..6.0);
            let half_z = rng.gen_range(1.0..4.0);
            let height = rng.gen_range(2.5..5.0);
            obstacles.push(Obstacle::solid(
                Self::next_id(),
                Vec3::new(x - half_x, 0.0, z - half_z),
                Vec3::new(x + half_x, height, z + half_z),
            ));
        }
        obstacles
    }

    pub fn team_spawn_points() -> Vec<(Vec3, TeamId)> {
        let west = WORLD_MIN_X + 80.0;
        let east = WORLD_MAX_X - 80.0;
        vec![
            (Vec3::new(west, 0.0, -30.0), 1),
            (Vec3::new(west, 0.0, 30.0), 1),
            (Vec3::new(west + 30.0, 0.0, 0.0), 1),
            (Vec3::new(east, 0.0, -30.0), 2),
            (Vec3::new(east, 0.0, 30.0), 2),
            (Vec3::new(east - 30.0, 0.0, 0.0), 2),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_cover_is_seeded_and_clear_of_spawns() {
        let a = MapGenerator::generate_arena(42);
        let b = MapGenerator::generate_arena(42);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.min, y.min);
            assert_eq!(x.max, y.max);
        }
        for (spawn, _) in MapGenerator::team_spawn_points() {
            assert!(a.iter().all(|o| !o.contains_flat(spawn, 0.0)));
        }
    }
}
