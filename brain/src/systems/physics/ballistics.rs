// tank_brain_core/brain/src/systems/physics/ballistics.rs
// Projectiles owned by one combatant. Kinematic flight under gravity with swept hit checks
// against the target, other combatants' walls, static obstacles and terrain.

use crate::core::config::WeaponConfig;
use crate::core::constants::*;
use crate::core::events::BrainEvent;
use crate::core::types::{CombatantKey, EntityId, TeamId, Vec3};
use crate::systems::physics::collision::{
    handle_projectile_wall_collision, segment_sphere, segment_wall,
};
use crate::world::query::{first_blocking_hit, Ray, SurfaceKind};
use crate::world::registry::WorldView;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    pub shooter: CombatantKey,
    pub target: Option<CombatantKey>,
    pub position: Vec3,
    pub velocity: Vec3,
    pub damage: f32,
    pub age_secs: f32,
    pub ricochets_left: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectileStepSummary {
    pub hits: u32,
    pub wall_impacts: u32,
    pub ricochets: u32,
    pub expired: u32,
}

enum Fate {
    Flying,
    Despawn,
}

pub struct ProjectileManager {
    config: WeaponConfig,
    projectiles: Vec<Projectile>,
}

impl ProjectileManager {
    pub fn new(config: WeaponConfig) -> Self {
        ProjectileManager { config, projectiles: Vec::new() }
    }

    /// Launches a round along `direction` at the configured muzzle speed.
    pub fn spawn(
        &mut self,
        shooter: CombatantKey,
        target: Option<CombatantKey>,
        origin: Vec3,
        direction: Vec3,
        inherited_velocity: Vec3,
    ) -> EntityId {
        let direction = direction.try_normalize().unwrap_or(Vec3::Z);
        let id = Uuid::new_v4().as_u128() as u64;
        self.projectiles.push(Projectile {
            id,
            shooter,
            target,
            position: origin,
            velocity: direction * self.config.projectile_speed + inherited_velocity,
            damage: self.config.damage,
            age_secs: 0.0,
            ricochets_left: self.config.max_ricochets,
        });
        trace!("Projectile {} spawned at {:?}", id, origin);
        id
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
    }

    /// Advances every projectile by `dt` and resolves impacts in priority order: combatant,
    /// wall, obstacle, terrain, then lifetime and bounds.
    pub fn step(
        &mut self,
        dt: f32,
        shooter_team: TeamId,
        world: &WorldView<'_>,
    ) -> ProjectileStepSummary {
        let mut summary = ProjectileStepSummary::default();
        let config = &self.config;
        self.projectiles.retain_mut(|projectile| {
            match Self::advance(config, projectile, dt, shooter_team, world, &mut summary) {
                Fate::Flying => true,
                Fate::Despawn => false,
            }
        });
        summary
    }

    fn advance(
        config: &WeaponConfig,
        projectile: &mut Projectile,
        dt: f32,
        shooter_team: TeamId,
        world: &WorldView<'_>,
        summary: &mut ProjectileStepSummary,
    ) -> Fate {
        let previous = projectile.position;
        projectile.velocity.y -= GRAVITY * dt;
        projectile.position += projectile.velocity * dt;
        projectile.age_secs += dt;
        let current = projectile.position;

        if !current.is_finite() || !projectile.velocity.is_finite() {
            Self::expire(projectile, previous, world, summary);
            return Fate::Despawn;
        }

        // Combatants: intended target first, then any other live hostile.
        let sweep = |position: Vec3| {
            let centre = position + Vec3::Y * (TURRET_HEIGHT * 0.5);
            segment_sphere(previous, current, centre, config.hit_radius)
        };
        let struck = projectile
            .target
            .filter(|key| *key != projectile.shooter)
            .and_then(|key| {
                let snapshot = world.registry.resolve_live(key)?;
                sweep(snapshot.position).map(|t| (key, t))
            })
            .or_else(|| {
                world
                    .registry
                    .iter()
                    .filter(|(key, s)| {
                        *key != projectile.shooter && s.alive && s.team != shooter_team
                    })
                    .filter_map(|(key, s)| sweep(s.position).map(|t| (key, t)))
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            });
        if let Some((target, t)) = struck {
            let position = previous.lerp(current, t);
            world.events.emit(BrainEvent::ProjectileHit {
                shooter: projectile.shooter,
                target,
                projectile_id: projectile.id,
                damage: projectile.damage,
                position,
            });
            summary.hits += 1;
            return Fate::Despawn;
        }

        // Other combatants' protective walls.
        let wall_hit = world
            .registry
            .walls()
            .filter(|wall| wall.owner != projectile.shooter)
            .filter_map(|wall| segment_wall(previous, current, wall).map(|t| (wall, t)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        if let Some((wall, t)) = wall_hit {
            let position = previous.lerp(current, t);
            if let Some(event) = handle_projectile_wall_collision(projectile, wall, position) {
                world.events.emit(event);
                summary.wall_impacts += 1;
                return Fate::Despawn;
            }
        }

        // Static obstacles and raised gates.
        let segment = Ray::between(previous, current);
        let solid = |surface: &SurfaceKind| {
            matches!(surface, SurfaceKind::Obstacle | SurfaceKind::Gate { .. })
        };
        if segment.max_distance > 0.0 {
            if let Some(hit) = first_blocking_hit(world.spatial, &segment, &solid) {
                world.events.emit(BrainEvent::Explosion { position: hit.point });
                Self::expire(projectile, hit.point, world, summary);
                return Fate::Despawn;
            }
        }

        // Terrain: graze and ricochet, or detonate.
        if let Some(ground) = world.terrain.ground_height_at(current.x, current.z) {
            if current.y <= ground {
                let normal = world
                    .terrain
                    .normal_at(current.x, current.z)
                    .try_normalize()
                    .unwrap_or(Vec3::Y);
                let velocity = projectile.velocity;
                let speed = velocity.length();
                let incidence = if speed > 0.0 {
                    (-velocity.dot(normal) / speed).clamp(-1.0, 1.0).asin()
                } else {
                    0.0
                };
                if incidence < RICOCHET_MAX_INCIDENCE_RAD && projectile.ricochets_left > 0 {
                    let reflected = velocity - 2.0 * velocity.dot(normal) * normal;
                    projectile.velocity = reflected * RICOCHET_RESTITUTION;
                    projectile.position = Vec3::new(current.x, ground + 0.05, current.z);
                    projectile.ricochets_left -= 1;
                    world.events.emit(BrainEvent::ProjectileRicochet {
                        projectile_id: projectile.id,
                        position: projectile.position,
                    });
                    summary.ricochets += 1;
                    return Fate::Flying;
                }
                let impact = Vec3::new(current.x, ground, current.z);
                world.events.emit(BrainEvent::Explosion { position: impact });
                Self::expire(projectile, impact, world, summary);
                return Fate::Despawn;
            }
        }

        let out_of_bounds = current.x < WORLD_MIN_X
            || current.x > WORLD_MAX_X
            || current.z < WORLD_MIN_Z
            || current.z > WORLD_MAX_Z
            || current.y < WORLD_MIN_Y
            || current.y > WORLD_MAX_Y;
        if projectile.age_secs >= config.projectile_lifetime_secs || out_of_bounds {
            Self::expire(projectile, current, world, summary);
            return Fate::Despawn;
        }
        Fate::Flying
    }

    fn expire(
        projectile: &Projectile,
        position: Vec3,
        world: &WorldView<'_>,
        summary: &mut ProjectileStepSummary,
    ) {
        world.events.emit(BrainEvent::ProjectileExpired {
            shooter: projectile.shooter,
            target: projectile.target,
            projectile_id: projectile.id,
            position,
        });
        summary.expired += 1;
    }
}
