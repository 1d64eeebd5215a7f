// tank_brain_core/brain/src/operational/monitoring/metrics.rs
use crate::core::events::{BrainEvent, RecoveryLevel};
use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use serde::Serialize;
use std::time::Instant;

/// Running totals mirrored next to the `metrics` facade so a headless run can report without
/// an installed exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EventTally {
    pub state_changes: u64,
    pub shots_fired: u64,
    pub hits: u64,
    pub wall_impacts: u64,
    pub ricochets: u64,
    pub misses: u64,
    pub dodges: u64,
    pub kills: u64,
    pub walls_deployed: u64,
    pub walls_destroyed: u64,
    pub unstuck_maneuvers: u64,
    pub repositions: u64,
    pub terrain_recoveries: u64,
    pub distance_travelled: f64,
}

pub struct TelemetryRecorder {
    start_time: Instant,
    tally: EventTally,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        describe_counter!("brain_state_changes_total", "Tactical state transitions");
        describe_counter!("brain_shots_fired_total", "Rounds fired by combatants");
        describe_counter!("brain_hits_total", "Rounds that struck a combatant");
        describe_counter!("brain_wall_impacts_total", "Rounds stopped by a protective wall");
        describe_counter!("brain_misses_total", "Rounds that expired without a hit");
        describe_counter!("brain_dodges_total", "Rounds dodged while evading");
        describe_counter!("brain_kills_total", "Combatants destroyed");
        describe_counter!("brain_stuck_recoveries_total", "Anti-stuck maneuvers by level");
        describe_counter!("brain_terrain_recoveries_total", "Terrain penetration corrections");
        describe_gauge!("brain_combatants_alive", "Live combatants in the arena");
        describe_histogram!("brain_tick_time_seconds", "Arena tick processing time in seconds");
        describe_histogram!("brain_movement_speed", "Sampled combatant ground speed");

        TelemetryRecorder { start_time: Instant::now(), tally: EventTally::default() }
    }

    pub fn record_event(&mut self, event: &BrainEvent) {
        let t = &mut self.tally;
        match event {
            BrainEvent::StateChanged { to, .. } => {
                counter!("brain_state_changes_total", "state" => to.as_str()).increment(1);
                t.state_changes += 1;
            }
            BrainEvent::ShotFired { .. } => {
                counter!("brain_shots_fired_total").increment(1);
                t.shots_fired += 1;
            }
            BrainEvent::ProjectileHit { damage, .. } => {
                counter!("brain_hits_total").increment(1);
                histogram!("brain_hit_damage").record(*damage as f64);
                t.hits += 1;
            }
            BrainEvent::WallImpact { .. } => {
                counter!("brain_wall_impacts_total").increment(1);
                t.wall_impacts += 1;
            }
            BrainEvent::ProjectileRicochet { .. } => t.ricochets += 1,
            BrainEvent::ProjectileExpired { .. } => {
                counter!("brain_misses_total").increment(1);
                t.misses += 1;
            }
            BrainEvent::Dodge { .. } => {
                counter!("brain_dodges_total").increment(1);
                t.dodges += 1;
            }
            BrainEvent::CombatantKilled { .. } => {
                counter!("brain_kills_total").increment(1);
                t.kills += 1;
            }
            BrainEvent::WallDeployed { .. } => t.walls_deployed += 1,
            BrainEvent::WallDestroyed { .. } => t.walls_destroyed += 1,
            BrainEvent::StuckRecovery { level, .. } => {
                let label = match level {
                    RecoveryLevel::ForcedUnstuck => {
                        t.unstuck_maneuvers += 1;
                        "forced_unstuck"
                    }
                    RecoveryLevel::HardReposition => {
                        t.repositions += 1;
                        "hard_reposition"
                    }
                };
                counter!("brain_stuck_recoveries_total", "level" => label).increment(1);
            }
            BrainEvent::TerrainRecovery { .. } => {
                counter!("brain_terrain_recoveries_total").increment(1);
                t.terrain_recoveries += 1;
            }
            BrainEvent::Movement { distance, speed, .. } => {
                histogram!("brain_movement_speed").record(*speed as f64);
                t.distance_travelled += *distance as f64;
            }
            BrainEvent::MuzzleFlash { .. } | BrainEvent::Explosion { .. } => {}
        }
    }

    pub fn record_tick_time(&self, duration: f64) {
        histogram!("brain_tick_time_seconds").record(duration);
    }

    pub fn update_alive_count(&self, count: usize) {
        gauge!("brain_combatants_alive").set(count as f64);
    }

    pub fn tally(&self) -> &EventTally {
        &self.tally
    }

    pub fn uptime_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

// Logging setup. `TANK_BRAIN_LOG_FORMAT=json` switches to structured output.
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let json = std::env::var("TANK_BRAIN_LOG_FORMAT")
        .map_or(false, |v| v.eq_ignore_ascii_case("json"));
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tank_brain_core=info,warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
    .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{CombatantKey, TacticalState, Vec3};

    #[test]
    fn tally_follows_events() {
        let mut recorder = TelemetryRecorder::new();
        let key = CombatantKey::default();
        recorder.record_event(&BrainEvent::StateChanged {
            combatant: key,
            stable_id: 1,
            from: TacticalState::Patrol,
            to: TacticalState::Chase,
        });
        recorder.record_event(&BrainEvent::StuckRecovery {
            combatant: key,
            level: RecoveryLevel::HardReposition,
            position: Vec3::ZERO,
        });
        recorder.record_event(&BrainEvent::Movement { combatant: key, distance: 12.5, speed: 6.0 });
        let tally = recorder.tally();
        assert_eq!(tally.state_changes, 1);
        assert_eq!(tally.repositions, 1);
        assert_eq!(tally.unstuck_maneuvers, 0);
        assert!((tally.distance_travelled - 12.5).abs() < 1e-9);
    }
}
