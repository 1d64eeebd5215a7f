// tank_brain_core/brain/src/world/pathfinding.rs
use crate::core::types::{FlankSide, Vec3};

/// Optional navigation helper. When absent, or when it returns `None`, the brain falls back
/// to its own local heuristics.
pub trait Pathfinder {
    fn find_flank_position(&self, self_pos: Vec3, target_pos: Vec3, side: FlankSide)
        -> Option<Vec3>;
    fn find_cover(&self, self_pos: Vec3, target_pos: Vec3, radius: f32) -> Option<Vec3>;
}
