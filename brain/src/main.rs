// tank_brain_core/brain/src/main.rs
use anyhow::Context;
use serde::Serialize;
use tank_brain_core::core::config::BrainConfig;
use tank_brain_core::core::types::DifficultyTier;
use tank_brain_core::entities::combatant::CombatStats;
use tank_brain_core::operational::monitoring::metrics::{init_logging, EventTally};
use tank_brain_core::server::arena::Arena;
use tank_brain_core::server::game_loop::{GameLoop, LoopSummary};
use tank_brain_core::world::map_generator::MapGenerator;
use tank_brain_core::world::sandbox::SandboxWorld;
use tracing::info;

const DEFAULT_SEED: u64 = 7;
const DEFAULT_SECONDS: u64 = 60;

#[derive(Serialize)]
struct CombatantReport {
    stable_id: u64,
    team: u8,
    state: &'static str,
    health: f32,
    accuracy: f32,
    stats: CombatStats,
}

#[derive(Serialize)]
struct RunReport {
    seed: u64,
    survivors: Vec<CombatantReport>,
    loop_summary: LoopSummary,
    events: EventTally,
}

/// Usage: tank_brain_core [config.yaml] [seed] [seconds]
fn main() -> anyhow::Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {:?}", e);
    }

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => {
            let yaml =
                std::fs::read_to_string(&path).with_context(|| format!("reading config {}", path))?;
            BrainConfig::from_yaml_str(&yaml).with_context(|| format!("parsing config {}", path))?
        }
        _ => BrainConfig::default(),
    };
    let seed = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid seed {:?}", s))?,
        None => DEFAULT_SEED,
    };
    let seconds: u64 = match args.next() {
        Some(s) => s.parse().with_context(|| format!("invalid duration {:?}", s))?,
        None => DEFAULT_SECONDS,
    };

    let tick_rate = config.tick_rate;
    let mut arena =
        Arena::new(config, SandboxWorld::generated(seed), seed).context("creating arena")?;
    let tiers = [DifficultyTier::Easy, DifficultyTier::Normal, DifficultyTier::Hard];
    for (i, (position, team)) in MapGenerator::team_spawn_points().into_iter().enumerate() {
        arena
            .spawn_combatant(team, tiers[i % tiers.len()], position)
            .context("spawning combatant")?;
    }
    info!(
        "Headless arena: {} combatants, seed {}, {}s simulated",
        arena.combatant_count(),
        seed,
        seconds
    );

    let mut game_loop = GameLoop::new(tick_rate);
    let loop_summary = game_loop.run_for(&mut arena, seconds * tick_rate);

    let survivors = arena
        .combatants()
        .map(|(_, c)| {
            let snapshot = c.snapshot();
            CombatantReport {
                stable_id: snapshot.stable_id,
                team: snapshot.team,
                state: snapshot.state.as_str(),
                health: snapshot.health,
                accuracy: c.stats().accuracy(),
                stats: *c.stats(),
            }
        })
        .collect();
    let report = RunReport { seed, survivors, loop_summary, events: *arena.telemetry().tally() };
    println!("{}", serde_json::to_string_pretty(&report).context("serializing run report")?);
    Ok(())
}
