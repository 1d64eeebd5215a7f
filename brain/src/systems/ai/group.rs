// tank_brain_core/brain/src/systems/ai/group.rs
use crate::core::config::GroupConfig;
use crate::core::types::{CombatantKey, TacticalState, Vec3};
use crate::world::registry::{CombatantRegistry, Damageable};
use smallvec::SmallVec;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct AllyEntry {
    pub key: CombatantKey,
    pub position: Vec3,
    pub health_fraction: f32,
    pub distance: f32,
    pub state: TacticalState,
    pub target: Option<CombatantKey>,
    pub score: f32,
}

/// Periodically refreshed list of nearby teammates, best-scored first.
#[derive(Debug, Clone)]
pub struct GroupTracker {
    config: GroupConfig,
    allies: SmallVec<[AllyEntry; 8]>,
    next_refresh_tick: u64,
}

impl GroupTracker {
    pub fn new(config: GroupConfig) -> Self {
        GroupTracker { config, allies: SmallVec::new(), next_refresh_tick: 0 }
    }

    pub fn set_ally_radius(&mut self, radius: f32) {
        self.config.ally_radius = radius;
    }

    /// Rebuilds the list if the refresh interval has elapsed. Returns whether it did.
    pub fn refresh_if_due(
        &mut self,
        tick: u64,
        self_key: CombatantKey,
        registry: &CombatantRegistry,
    ) -> bool {
        if tick < self.next_refresh_tick {
            return false;
        }
        self.refresh(tick, self_key, registry);
        true
    }

    pub fn refresh(&mut self, tick: u64, self_key: CombatantKey, registry: &CombatantRegistry) {
        self.next_refresh_tick = tick + self.config.refresh_interval_ticks.max(1);
        self.allies.clear();
        let Some(me) = registry.get(self_key) else {
            return;
        };
        let radius = self.config.ally_radius.max(1.0);
        for (key, other) in registry.iter() {
            if key == self_key || !other.alive || other.team != me.team {
                continue;
            }
            let distance = other.position.distance(me.position);
            if distance > radius {
                continue;
            }
            let health_fraction = other.health_fraction();
            let score = self.config.health_weight * health_fraction
                + self.config.distance_weight * (1.0 - distance / radius);
            self.allies.push(AllyEntry {
                key,
                position: other.position,
                health_fraction,
                distance,
                state: other.state,
                target: other.target,
                score,
            });
        }
        self.allies
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        trace!("Group refresh at tick {}: {} allies in range", tick, self.allies.len());
    }

    pub fn allies(&self) -> &[AllyEntry] {
        &self.allies
    }

    pub fn has_nearby_allies(&self) -> bool {
        !self.allies.is_empty()
    }

    pub fn nearest_ally(&self) -> Option<&AllyEntry> {
        self.allies
            .iter()
            .min_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn engaging(&self, target: CombatantKey) -> impl Iterator<Item = &AllyEntry> {
        self.allies.iter().filter(move |a| a.target == Some(target) && a.state.is_engaging())
    }

    pub fn allies_engaging(&self, target: CombatantKey) -> usize {
        self.engaging(target).count()
    }

    /// Mean position of allies already fighting `target`.
    pub fn engaging_average_position(&self, target: CombatantKey) -> Option<Vec3> {
        let (sum, count) = self
            .engaging(target)
            .fold((Vec3::ZERO, 0u32), |(sum, n), a| (sum + a.position, n + 1));
        (count > 0).then(|| sum / count as f32)
    }

    /// Allies in a firing state against `target`, for synchronised volleys.
    pub fn volley_partners(&self, target: CombatantKey) -> SmallVec<[CombatantKey; 8]> {
        self.allies
            .iter()
            .filter(|a| {
                a.target == Some(target)
                    && matches!(a.state, TacticalState::Attack | TacticalState::Flank)
            })
            .map(|a| a.key)
            .collect()
    }
}
