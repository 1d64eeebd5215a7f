// tank_brain_core/brain/src/systems/ai/decision.rs
// Priority-ordered tactical transition function. Pure with respect to the world: anything
// that needs a spatial search goes through `TacticalQueries`, and all randomness comes from
// the caller's rng.

use crate::core::config::TacticsConfig;
use crate::core::constants::*;
use crate::core::math::{flat_distance, flatten, yaw_between, yaw_to_direction};
use crate::core::types::{CombatantKey, FlankSide, TacticalState, Vec3};
use crate::world::query::{first_blocking_hit, Ray, SpatialQuery, SurfaceKind};
use rand::Rng;
use tracing::trace;

const HEALTHY_FRACTION: f32 = 0.6;
const DISADVANTAGE_MARGIN: f32 = 0.2;
const OFF_RANGE_TOLERANCE: f32 = 0.25;
const AMBUSH_COVER_REACH: f32 = 0.7;
const BAIT_RETREAT_DISTANCE: f32 = 30.0;

#[derive(Debug, Clone, Copy)]
pub struct TargetInfo {
    pub key: CombatantKey,
    pub position: Vec3,
    pub distance: f32,
    pub health_fraction: f32,
    pub visible: bool,
}

/// Everything the transition function reads for one evaluation.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub tick: u64,
    pub position: Vec3,
    pub health_fraction: f32,
    pub target: Option<TargetInfo>,
    pub detection_range: f32,
    pub optimal_range: f32,
    pub has_capture_point: bool,
    pub nearest_ally: Option<Vec3>,
    pub allies_engaging: usize,
    pub engaging_allies_center: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: TacticalState,
    pub flank_side: Option<FlankSide>,
    /// Destination owned by the state: cover, ambush spot, bait point or escape point.
    pub position: Option<Vec3>,
}

impl Decision {
    pub(crate) fn to(state: TacticalState) -> Self {
        Decision { state, flank_side: None, position: None }
    }

    pub(crate) fn at(state: TacticalState, position: Vec3) -> Self {
        Decision { state, flank_side: None, position: Some(position) }
    }
}

/// World searches the decision step may request.
pub trait TacticalQueries {
    fn find_cover(&mut self, self_pos: Vec3, target_pos: Vec3) -> Option<Vec3>;
    fn find_ambush_position(&mut self, self_pos: Vec3, target_pos: Vec3) -> Option<Vec3>;
}

pub struct DecisionEngine {
    config: TacticsConfig,
    next_cover_seek_tick: u64,
}

impl DecisionEngine {
    pub fn new(config: TacticsConfig) -> Self {
        DecisionEngine { config, next_cover_seek_tick: 0 }
    }

    pub fn config(&self) -> &TacticsConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TacticsConfig) {
        self.config = config;
    }

    pub fn decide<R: Rng + ?Sized>(
        &mut self,
        ctx: &DecisionContext,
        queries: &mut dyn TacticalQueries,
        rng: &mut R,
    ) -> Decision {
        let target = match ctx.target {
            Some(t) if t.visible && t.distance <= ctx.detection_range => t,
            _ => {
                return if ctx.has_capture_point {
                    Decision::to(TacticalState::CapturePoi)
                } else {
                    Decision::to(TacticalState::Patrol)
                };
            }
        };
        let hf = ctx.health_fraction;
        let distance = target.distance;

        // 1. Critical health: retreat, toward cover if the search is available.
        if hf < CRITICAL_HEALTH_FRACTION {
            let cover = self.seek_cover(ctx, target.position, queries);
            return Decision { state: TacticalState::Retreat, flank_side: None, position: cover };
        }

        // 2. Low health up close: cover, else a probabilistic perpendicular escape.
        if hf < LOW_HEALTH_FRACTION && distance <= self.config.close_range {
            if let Some(cover) = self.seek_cover(ctx, target.position, queries) {
                return Decision::at(TacticalState::Retreat, cover);
            }
            if rng.gen_bool(self.config.evade_chance.clamp(0.0, 1.0)) {
                let escape = self.escape_point(ctx.position, target.position, rng);
                return Decision::at(TacticalState::Evade, escape);
            }
        }

        // 3. Clearly outmatched: occasionally break off to cover.
        if hf < target.health_fraction - DISADVANTAGE_MARGIN
            && rng.gen_bool(self.config.disadvantage_cover_chance.clamp(0.0, 1.0))
        {
            if let Some(cover) = self.seek_cover(ctx, target.position, queries) {
                return Decision::at(TacticalState::Retreat, cover);
            }
        }

        // 4. Healthy in the mid band: try to set an ambush from flanking cover.
        if hf >= HEALTHY_FRACTION
            && (self.config.ambush_min_range..=self.config.ambush_max_range).contains(&distance)
            && rng.gen_bool(self.config.ambush_chance.clamp(0.0, 1.0))
        {
            if let Some(spot) = queries.find_ambush_position(ctx.position, target.position) {
                return Decision::at(TacticalState::Ambush, spot);
            }
        }

        // 5. Worn down with friends nearby: bait the target toward them.
        if (LOW_HEALTH_FRACTION..HEALTHY_FRACTION).contains(&hf)
            && ctx.nearest_ally.is_some()
            && rng.gen_bool(self.config.bait_chance.clamp(0.0, 1.0))
        {
            return Decision::at(TacticalState::Bait, self.bait_point(ctx, target.position));
        }

        // 6. In range: attack or flank.
        if distance <= self.config.weapon_range {
            let p = self.flank_probability(ctx, &target);
            if rng.gen::<f32>() < p {
                let side = Self::choose_flank_side(ctx, target.position, rng);
                return Decision {
                    state: TacticalState::Flank,
                    flank_side: Some(side),
                    position: None,
                };
            }
            return Decision::to(TacticalState::Attack);
        }

        // 7. Detected but out of range: chase, unless badly hurt against a stronger target.
        if hf < self.config.disengage_health && target.health_fraction > hf + DISADVANTAGE_MARGIN {
            trace!("Disengaging: health {:.2} vs target {:.2}", hf, target.health_fraction);
            return Decision::to(TacticalState::Patrol);
        }
        Decision::to(TacticalState::Chase)
    }

    /// Weighted coin for `Flank` over `Attack`, clamped to [0.05, 0.9].
    pub fn flank_probability(&self, ctx: &DecisionContext, target: &TargetInfo) -> f32 {
        let c = &self.config;
        let mut p = c.base_flank_chance;
        if (target.distance - ctx.optimal_range).abs() > ctx.optimal_range * OFF_RANGE_TOLERANCE {
            p += c.off_range_flank_bonus;
        }
        if ctx.health_fraction > target.health_fraction {
            p += c.advantage_flank_bonus;
        }
        if ctx.allies_engaging > 0 {
            let extra_allies = (ctx.allies_engaging - 1) as f32;
            p += c.ally_flank_bonus + c.per_extra_ally_flank_bonus * extra_allies;
        }
        if target.health_fraction < LOW_HEALTH_FRACTION {
            p *= c.finishing_flank_multiplier;
        }
        p.clamp(0.05, 0.9)
    }

    /// Picks the side away from allies already engaging, to encircle rather than stack up.
    pub fn choose_flank_side<R: Rng + ?Sized>(
        ctx: &DecisionContext,
        target_pos: Vec3,
        rng: &mut R,
    ) -> FlankSide {
        if let Some(center) = ctx.engaging_allies_center {
            let forward = flatten(target_pos - ctx.position).normalize_or_zero();
            let right = Vec3::new(forward.z, 0.0, -forward.x);
            let lateral = flatten(center - ctx.position).dot(right);
            if lateral.abs() > 1e-3 {
                return if lateral > 0.0 { FlankSide::Left } else { FlankSide::Right };
            }
        }
        if rng.gen_bool(0.5) {
            FlankSide::Left
        } else {
            FlankSide::Right
        }
    }

    /// Ticks until the next evaluation: every tick up close, 2 to the configured maximum
    /// with distance, tightened by the difficulty cadence factor.
    pub fn decision_interval(&self, distance: Option<f32>, cadence_factor: f32) -> u64 {
        let c = &self.config;
        let max = c.max_decision_interval_ticks.max(2);
        let distance = match distance {
            Some(d) if d.is_finite() => d,
            _ => return max,
        };
        if distance <= c.near_decision_distance {
            return 1;
        }
        let span = (c.far_decision_distance - c.near_decision_distance).max(1.0);
        let t = ((distance - c.near_decision_distance) / span).clamp(0.0, 1.0);
        let raw = 2.0 + t * (max - 2) as f32;
        ((raw * cadence_factor.clamp(0.1, 1.0)).round() as u64).clamp(2, max)
    }

    fn seek_cover(
        &mut self,
        ctx: &DecisionContext,
        target_pos: Vec3,
        queries: &mut dyn TacticalQueries,
    ) -> Option<Vec3> {
        if ctx.tick < self.next_cover_seek_tick {
            return None;
        }
        self.next_cover_seek_tick = ctx.tick + self.config.cover_seek_interval_ticks;
        queries.find_cover(ctx.position, target_pos)
    }

    fn escape_point<R: Rng + ?Sized>(&self, position: Vec3, target_pos: Vec3, rng: &mut R) -> Vec3 {
        let away = flatten(position - target_pos).normalize_or_zero();
        let perpendicular = Vec3::new(away.z, 0.0, -away.x);
        let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let jitter = rng.gen_range(0.8..1.2);
        position + (perpendicular * side + away * 0.3) * self.config.evade_distance * jitter
    }

    fn bait_point(&self, ctx: &DecisionContext, target_pos: Vec3) -> Vec3 {
        match ctx.nearest_ally {
            Some(ally) => ally,
            None => {
                let away = flatten(ctx.position - target_pos).normalize_or_zero();
                ctx.position + away * BAIT_RETREAT_DISTANCE
            }
        }
    }
}

/// Casts rays at fixed offsets from the bearing to the target, looking for cover close
/// enough to reach. Candidates are scored by how far they keep us from the target relative to
/// how far we must travel; the best one is returned.
pub fn directional_ambush_search(
    spatial: &dyn SpatialQuery,
    self_pos: Vec3,
    target_pos: Vec3,
    search_distance: f32,
    eye_height: f32,
    ambush_band: (f32, f32),
) -> Option<Vec3> {
    let bearing = yaw_between(self_pos, target_pos);
    let origin = self_pos + Vec3::Y * eye_height;
    let reach = search_distance * AMBUSH_COVER_REACH;
    let cover_only =
        |surface: &SurfaceKind| matches!(surface, SurfaceKind::Obstacle | SurfaceKind::Gate { .. });

    AMBUSH_SEARCH_OFFSETS_RAD
        .iter()
        .filter_map(|offset| {
            let ray = Ray::new(origin, yaw_to_direction(bearing + offset), search_distance);
            let hit = first_blocking_hit(spatial, &ray, &cover_only)?;
            if hit.distance > reach {
                return None;
            }
            let standoff = (hit.distance - COMBATANT_RADIUS * 1.5).max(0.0);
            let candidate = flatten(ray.at(standoff)) + Vec3::Y * self_pos.y;
            let to_target = flat_distance(candidate, target_pos);
            if to_target < ambush_band.0 || to_target > ambush_band.1 {
                return None;
            }
            Some((candidate, to_target / (hit.distance + 1.0)))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(candidate, _)| candidate)
}
