// tank_brain_core/brain/src/world/registry.rs
// Explicitly injected registry of every live combatant (enemy brains and externally driven
// players). Combatants read it for target liveness and group queries; only the host writes.

use crate::concurrent::event_queue::PriorityEventQueue;
use crate::core::error::{BrainError, BrainResult};
use crate::core::types::{CombatantKey, TacticalState, TeamId, Vec3};
use crate::entities::wall::WallVolume;
use crate::world::pathfinding::Pathfinder;
use crate::world::query::{SpatialQuery, Terrain};
use slotmap::SlotMap;
use tracing::debug;

pub trait HasStableId {
    fn stable_id(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    Ignored,
    Damaged { remaining: f32 },
    Killed,
}

pub trait Damageable {
    fn health(&self) -> f32;
    fn max_health(&self) -> f32;
    fn is_alive(&self) -> bool;
    fn take_damage(&mut self, amount: f32) -> DamageOutcome;

    fn health_fraction(&self) -> f32 {
        let max = self.max_health();
        if max > 0.0 {
            (self.health() / max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug)]
pub struct CombatantSnapshot {
    pub stable_id: u64,
    pub team: TeamId,
    pub is_player: bool,
    pub position: Vec3,
    pub velocity: Vec3,
    pub yaw: f32,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    pub state: TacticalState,
    pub target: Option<CombatantKey>,
    pub wall: Option<WallVolume>,
}

impl CombatantSnapshot {
    pub fn new(
        stable_id: u64,
        team: TeamId,
        is_player: bool,
        position: Vec3,
        max_health: f32,
    ) -> Self {
        CombatantSnapshot {
            stable_id,
            team,
            is_player,
            position,
            velocity: Vec3::ZERO,
            yaw: 0.0,
            health: max_health,
            max_health,
            alive: true,
            state: TacticalState::Idle,
            target: None,
            wall: None,
        }
    }
}

impl HasStableId for CombatantSnapshot {
    fn stable_id(&self) -> u64 {
        self.stable_id
    }
}

impl Damageable for CombatantSnapshot {
    fn health(&self) -> f32 {
        self.health
    }

    fn max_health(&self) -> f32 {
        self.max_health
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if !self.alive || !amount.is_finite() || amount <= 0.0 {
            return DamageOutcome::Ignored;
        }
        self.health = (self.health - amount).max(0.0);
        if self.health <= 0.0 {
            self.alive = false;
            self.velocity = Vec3::ZERO;
            DamageOutcome::Killed
        } else {
            DamageOutcome::Damaged { remaining: self.health }
        }
    }
}

pub struct CombatantRegistry {
    entries: SlotMap<CombatantKey, CombatantSnapshot>,
    next_stable_id: u64,
}

impl CombatantRegistry {
    pub fn new() -> Self {
        CombatantRegistry { entries: SlotMap::with_key(), next_stable_id: 1 }
    }

    pub fn register(
        &mut self,
        team: TeamId,
        is_player: bool,
        position: Vec3,
        max_health: f32,
    ) -> CombatantKey {
        let stable_id = self.next_stable_id;
        self.next_stable_id += 1;
        let snapshot = CombatantSnapshot::new(stable_id, team, is_player, position, max_health);
        let key = self.entries.insert(snapshot);
        debug!("Registered combatant {} (team {}, player: {})", stable_id, team, is_player);
        key
    }

    pub fn get(&self, key: CombatantKey) -> Option<&CombatantSnapshot> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: CombatantKey) -> Option<&mut CombatantSnapshot> {
        self.entries.get_mut(key)
    }

    /// Resolves a weak reference: the generation must match and the entry must be alive.
    pub fn resolve_live(&self, key: CombatantKey) -> Option<&CombatantSnapshot> {
        self.entries.get(key).filter(|snapshot| snapshot.alive)
    }

    pub fn contains(&self, key: CombatantKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn publish(&mut self, key: CombatantKey, snapshot: CombatantSnapshot) -> BrainResult<()> {
        match self.entries.get_mut(key) {
            Some(entry) => {
                *entry = snapshot;
                Ok(())
            }
            None => {
                Err(BrainError::StaleReference(format!("publish to unknown combatant {:?}", key)))
            }
        }
    }

    pub fn remove(&mut self, key: CombatantKey) -> Option<CombatantSnapshot> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CombatantKey, &CombatantSnapshot)> {
        self.entries.iter()
    }

    pub fn walls(&self) -> impl Iterator<Item = &WallVolume> {
        self.entries.values().filter_map(|snapshot| snapshot.wall.as_ref())
    }

    /// Closest live combatant of another team within `range`.
    pub fn nearest_hostile(&self, key: CombatantKey, range: f32) -> Option<(CombatantKey, f32)> {
        let me = self.entries.get(key)?;
        self.entries
            .iter()
            .filter(|(other_key, other)| *other_key != key && other.alive && other.team != me.team)
            .map(|(other_key, other)| (other_key, other.position.distance(me.position)))
            .filter(|(_, distance)| *distance <= range)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CombatantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulation clock shared by every combatant within a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    pub tick: u64,
    pub time_secs: f64,
}

impl Clock {
    pub fn advance(&mut self, dt: f32) {
        self.tick += 1;
        self.time_secs += dt as f64;
    }
}

/// Read-only collaborators handed to a combatant for one tick.
pub struct WorldView<'a> {
    pub registry: &'a CombatantRegistry,
    pub spatial: &'a dyn SpatialQuery,
    pub terrain: &'a dyn Terrain,
    pub pathfinder: Option<&'a dyn Pathfinder>,
    pub events: &'a PriorityEventQueue,
    pub clock: Clock,
}
