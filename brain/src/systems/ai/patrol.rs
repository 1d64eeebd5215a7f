// tank_brain_core/brain/src/systems/ai/patrol.rs
use crate::core::constants::*;
use crate::core::math::{flat_distance, yaw_to_direction};
use crate::core::types::Vec3;
use rand::Rng;
use tracing::trace;

const BOUNDS_MARGIN: f32 = 20.0;

/// Cyclic waypoint route around an anchor point. Never empty once built.
#[derive(Debug, Clone)]
pub struct PatrolRoute {
    anchor: Vec3,
    radius: f32,
    count: usize,
    waypoints: Vec<Vec3>,
    index: usize,
    laps: u32,
}

impl PatrolRoute {
    pub fn new<R: Rng + ?Sized>(anchor: Vec3, radius: f32, count: usize, rng: &mut R) -> Self {
        let mut route = PatrolRoute {
            anchor,
            radius: radius.max(1.0),
            count: count.max(1),
            waypoints: Vec::new(),
            index: 0,
            laps: 0,
        };
        route.regenerate(rng);
        route
    }

    /// Builds a route from explicit points. Falls back to the anchor when `points` is empty.
    /// Later regeneration scatters points out to the farthest explicit point, never less than
    /// `min_radius`.
    pub fn from_waypoints(anchor: Vec3, points: Vec<Vec3>, min_radius: f32) -> Self {
        let waypoints = if points.is_empty() { vec![anchor] } else { points };
        let radius = waypoints
            .iter()
            .map(|&p| flat_distance(anchor, p))
            .fold(min_radius.max(1.0), f32::max);
        PatrolRoute { anchor, radius, count: waypoints.len(), waypoints, index: 0, laps: 0 }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Scatters `count` points on a jittered ring around the anchor, clamped inside the arena.
    pub fn regenerate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let step = std::f32::consts::TAU / self.count as f32;
        let phase = rng.gen_range(0.0..std::f32::consts::TAU);
        self.waypoints = (0..self.count)
            .map(|i| {
                let angle = phase + step * i as f32 + rng.gen_range(-0.3..0.3) * step;
                let distance = self.radius * rng.gen_range(0.5..1.0);
                Self::clamp_to_arena(self.anchor + yaw_to_direction(angle) * distance)
            })
            .collect();
        self.index = 0;
        trace!(
            "Patrol route regenerated with {} waypoints around {:?}",
            self.waypoints.len(),
            self.anchor
        );
    }

    fn clamp_to_arena(point: Vec3) -> Vec3 {
        Vec3::new(
            point.x.clamp(WORLD_MIN_X + BOUNDS_MARGIN, WORLD_MAX_X - BOUNDS_MARGIN),
            point.y,
            point.z.clamp(WORLD_MIN_Z + BOUNDS_MARGIN, WORLD_MAX_Z - BOUNDS_MARGIN),
        )
    }

    /// Current waypoint; rebuilds the route first if it was emptied.
    pub fn current<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec3 {
        if self.waypoints.is_empty() {
            self.regenerate(rng);
        }
        self.waypoints[self.index % self.waypoints.len()]
    }

    /// Moves to the next waypoint, wrapping to 0 after the last.
    pub fn advance(&mut self) {
        if self.waypoints.is_empty() {
            return;
        }
        self.index += 1;
        if self.index >= self.waypoints.len() {
            self.index = 0;
            self.laps += 1;
        }
    }

    /// Advances when `position` is within `arrive_radius` of the current waypoint.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        position: Vec3,
        arrive_radius: f32,
        rng: &mut R,
    ) -> Vec3 {
        let waypoint = self.current(rng);
        if flat_distance(position, waypoint) <= arrive_radius {
            self.advance();
            return self.current(rng);
        }
        waypoint
    }

    /// Replaces the current waypoint with a fresh random point, e.g. after getting stuck.
    pub fn replace_current<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.waypoints.is_empty() {
            self.regenerate(rng);
            return;
        }
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.radius * rng.gen_range(0.4..1.0);
        let point = Self::clamp_to_arena(self.anchor + yaw_to_direction(angle) * distance);
        let idx = self.index % self.waypoints.len();
        self.waypoints[idx] = point;
    }

    pub fn set_anchor(&mut self, anchor: Vec3) {
        self.anchor = anchor;
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
        self.index = 0;
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn index_wraps_after_last_waypoint() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut route = PatrolRoute::new(Vec3::ZERO, 50.0, 4, &mut rng);
        for _ in 0..4 {
            route.advance();
        }
        assert_eq!(route.index(), 0);
        assert_eq!(route.laps(), 1);
    }

    #[test]
    fn emptied_route_is_regenerated_on_read() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut route = PatrolRoute::new(Vec3::ZERO, 50.0, 5, &mut rng);
        route.clear();
        assert!(route.is_empty());
        let _ = route.current(&mut rng);
        assert_eq!(route.len(), 5);
    }

    #[test]
    fn arriving_moves_to_next_waypoint() {
        let mut rng = SmallRng::seed_from_u64(3);
        let points = vec![Vec3::new(10.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 0.0)];
        let mut route = PatrolRoute::from_waypoints(Vec3::ZERO, points, 60.0);
        let next = route.update(Vec3::new(9.0, 0.0, 0.0), 2.0, &mut rng);
        assert_eq!(next, Vec3::new(-10.0, 0.0, 0.0));
        assert_eq!(route.index(), 1);
    }

    #[test]
    fn explicit_route_regenerates_outside_the_arrive_radius() {
        let arrive_radius = 6.0;
        let anchor = Vec3::new(0.0, 0.0, 100.0);
        let points = vec![Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 0.0, -60.0)];
        let mut route = PatrolRoute::from_waypoints(anchor, points, 60.0);
        assert!((route.radius() - 160.0).abs() < 1e-3);

        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            route.regenerate(&mut rng);
            assert_eq!(route.len(), 2);
            for &waypoint in route.waypoints() {
                let distance = flat_distance(anchor, waypoint);
                assert!(distance > arrive_radius, "seed {}: {:?}", seed, waypoint);
            }
            route.replace_current(&mut rng);
            let current = route.current(&mut rng);
            assert!(flat_distance(anchor, current) > arrive_radius, "seed {}: {:?}", seed, current);
        }
    }

    #[test]
    fn explicit_route_near_its_anchor_keeps_the_minimum_radius() {
        let route = PatrolRoute::from_waypoints(Vec3::ZERO, vec![Vec3::new(2.0, 0.0, 0.0)], 60.0);
        assert_eq!(route.radius(), 60.0);
        let fallback = PatrolRoute::from_waypoints(Vec3::ZERO, Vec::new(), 0.0);
        assert_eq!(fallback.waypoints(), &[Vec3::ZERO]);
        assert_eq!(fallback.radius(), 1.0);
    }
}
