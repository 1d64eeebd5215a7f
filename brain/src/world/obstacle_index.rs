// tank_brain_core/brain/src/world/obstacle_index.rs
use crate::core::types::{EntityId, Vec3};
use crate::world::query::SurfaceKind;
use parking_lot::RwLock;
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObstacleKind {
    Solid,
    /// Raisable barrier; solid only below `top_y`.
    Gate { top_y: f32 },
}

/// Static axis-aligned block in the sandbox arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub min: Vec3,
    pub max: Vec3,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn solid(id: EntityId, min: Vec3, max: Vec3) -> Self {
        Obstacle { id, min: min.min(max), max: min.max(max), kind: ObstacleKind::Solid }
    }

    pub fn gate(id: EntityId, min: Vec3, max: Vec3, top_y: f32) -> Self {
        Obstacle { id, min: min.min(max), max: min.max(max), kind: ObstacleKind::Gate { top_y } }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn surface(&self) -> SurfaceKind {
        match self.kind {
            ObstacleKind::Solid => SurfaceKind::Obstacle,
            ObstacleKind::Gate { top_y } => SurfaceKind::Gate { top_y },
        }
    }

    /// Height up to which the obstacle currently blocks movement.
    pub fn solid_top(&self) -> f32 {
        match self.kind {
            ObstacleKind::Solid => self.max.y,
            ObstacleKind::Gate { top_y } => top_y.min(self.max.y),
        }
    }

    /// XZ footprint test with an extra margin on every side.
    pub fn contains_flat(&self, point: Vec3, margin: f32) -> bool {
        point.x >= self.min.x - margin
            && point.x <= self.max.x + margin
            && point.z >= self.min.z - margin
            && point.z <= self.max.z + margin
    }
}

#[derive(Clone, Debug)]
struct IndexedObstacle {
    obstacle: Obstacle,
}

impl RTreeObject for IndexedObstacle {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let (min, max) = (self.obstacle.min, self.obstacle.max);
        AABB::from_corners([min.x, min.z], [max.x, max.z])
    }
}

/// R-tree over obstacle footprints on the ground plane.
pub struct ObstacleIndex {
    rtree: Arc<RwLock<RTree<IndexedObstacle>>>,
    last_rebuild_tick: Arc<RwLock<u64>>,
}

impl ObstacleIndex {
    pub fn new() -> Self {
        ObstacleIndex {
            rtree: Arc::new(RwLock::new(RTree::new())),
            last_rebuild_tick: Arc::new(RwLock::new(0)),
        }
    }

    pub fn rebuild(&self, obstacles: &[Obstacle], tick: u64) {
        let indexed: Vec<IndexedObstacle> = obstacles
            .iter()
            .map(|obstacle| IndexedObstacle { obstacle: obstacle.clone() })
            .collect();
        let new_tree = RTree::bulk_load(indexed);

        let mut tree_guard = self.rtree.write();
        *tree_guard = new_tree;
        *self.last_rebuild_tick.write() = tick;
        debug!("Obstacle index rebuilt at tick {} with {} obstacles", tick, tree_guard.size());
    }

    pub fn query_aabb(&self, min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> Vec<Obstacle> {
        let query = AABB::from_corners([min_x, min_z], [max_x, max_z]);
        let tree_guard = self.rtree.read();
        tree_guard
            .locate_in_envelope_intersecting(&query)
            .map(|indexed| indexed.obstacle.clone())
            .collect()
    }

    pub fn query_radius(&self, x: f32, z: f32, radius: f32) -> Vec<Obstacle> {
        self.query_aabb(x - radius, z - radius, x + radius, z + radius)
    }

    /// Candidates whose footprint overlaps the segment's bounding box.
    pub fn query_line_segment(&self, from: Vec3, to: Vec3) -> Vec<Obstacle> {
        let buffer = 1.0;
        self.query_aabb(
            from.x.min(to.x) - buffer,
            from.z.min(to.z) - buffer,
            from.x.max(to.x) + buffer,
            from.z.max(to.z) + buffer,
        )
    }

    /// Raises or lowers a gate. Returns false when no gate carries `id`.
    pub fn set_gate_height(&self, id: EntityId, top_y: f32) -> bool {
        let mut obstacles = self.all();
        let mut found = false;
        for obstacle in obstacles.iter_mut().filter(|o| o.id == id) {
            if let ObstacleKind::Gate { .. } = obstacle.kind {
                obstacle.kind = ObstacleKind::Gate { top_y };
                found = true;
            }
        }
        if found {
            let tick = self.last_rebuild_tick();
            self.rebuild(&obstacles, tick);
        }
        found
    }

    pub fn all(&self) -> Vec<Obstacle> {
        self.rtree.read().iter().map(|indexed| indexed.obstacle.clone()).collect()
    }

    pub fn last_rebuild_tick(&self) -> u64 {
        *self.last_rebuild_tick.read()
    }

    pub fn size(&self) -> usize {
        self.rtree.read().size()
    }

    pub fn clear(&self) {
        *self.rtree.write() = RTree::new();
        *self.last_rebuild_tick.write() = 0;
    }
}

impl Default for ObstacleIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_finds_obstacles_by_region() {
        let index = ObstacleIndex::new();
        let obstacles = vec![
            Obstacle::solid(1, Vec3::new(0.0, 0.0, 0.0), Vec3::new(10.0, 6.0, 10.0)),
            Obstacle::gate(2, Vec3::new(20.0, 0.0, 20.0), Vec3::new(30.0, 5.0, 22.0), 5.0),
        ];
        index.rebuild(&obstacles, 1);
        assert_eq!(index.size(), 2);

        let near_first = index.query_aabb(-5.0, -5.0, 5.0, 5.0);
        assert_eq!(near_first.len(), 1);
        assert_eq!(near_first[0].id, 1);

        let near_gate = index.query_radius(25.0, 21.0, 3.0);
        assert_eq!(near_gate.len(), 1);
        assert_eq!(near_gate[0].id, 2);

        let crossed =
            index.query_line_segment(Vec3::new(-5.0, 1.0, 5.0), Vec3::new(35.0, 1.0, 21.0));
        assert_eq!(crossed.len(), 2);
    }

    #[test]
    fn lowering_a_gate_updates_its_surface() {
        let index = ObstacleIndex::new();
        index.rebuild(&[Obstacle::gate(9, Vec3::ZERO, Vec3::new(4.0, 5.0, 1.0), 5.0)], 3);
        assert!(index.set_gate_height(9, 0.0));
        assert!(!index.set_gate_height(10, 0.0));
        let gate = &index.all()[0];
        assert_eq!(gate.surface(), SurfaceKind::Gate { top_y: 0.0 });
        assert_eq!(gate.solid_top(), 0.0);
        assert_eq!(index.last_rebuild_tick(), 3);
    }
}
