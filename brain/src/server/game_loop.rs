// tank_brain_core/brain/src/server/game_loop.rs
use super::arena::{Arena, ArenaTickReport};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const MAX_FRAME_TIME_HISTORY: usize = 100;
const STATUS_LOG_INTERVAL_FRAMES: u64 = 60;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LoopSummary {
    pub frames: u64,
    pub decisions: u64,
    pub shots: u64,
    pub hits: u64,
    pub kills: u64,
    pub disposed: u64,
    pub errors: u64,
    pub slow_frames: u64,
    pub average_frame_ms: f64,
    pub worst_frame_ms: f64,
}

/// Fixed-step driver. Runs as fast as the host allows; wall-clock time is only measured
/// against the frame budget.
pub struct GameLoop {
    frame_budget: Duration,
    frame_times: VecDeque<Duration>,
    summary: LoopSummary,
}

impl GameLoop {
    pub fn new(tick_rate: u64) -> Self {
        GameLoop {
            frame_budget: Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64),
            frame_times: VecDeque::with_capacity(MAX_FRAME_TIME_HISTORY),
            summary: LoopSummary::default(),
        }
    }

    pub fn run_for(&mut self, arena: &mut Arena, ticks: u64) -> LoopSummary {
        let dt = arena.config().fixed_delta();
        info!("Game loop started. {} frames at {:.2}ms per tick", ticks, dt * 1000.0);

        for _ in 0..ticks {
            let frame_start_time = Instant::now();
            let report = arena.tick(dt);
            let frame_time = frame_start_time.elapsed();
            self.record_frame(&report, frame_time);
            arena.telemetry().record_tick_time(frame_time.as_secs_f64());

            if report.tick % STATUS_LOG_INTERVAL_FRAMES == 0 {
                info!(
                    "Game loop running - Frame: {}, combatants: {}, shots: {}, hits: {}",
                    report.tick,
                    arena.combatant_count(),
                    self.summary.shots,
                    self.summary.hits
                );
            }
            if frame_time > self.frame_budget {
                warn!(
                    "Frame {} took {:?} (target: {:?})",
                    report.tick, frame_time, self.frame_budget
                );
            }
            if arena.combatant_count() == 0 {
                debug!("No combatants left, stopping at frame {}", report.tick);
                break;
            }
        }

        info!(
            "Game loop finished after {} frames, avg {:.3}ms, worst {:.3}ms",
            self.summary.frames, self.summary.average_frame_ms, self.summary.worst_frame_ms
        );
        self.summary
    }

    fn record_frame(&mut self, report: &ArenaTickReport, frame_time: Duration) {
        if self.frame_times.len() == MAX_FRAME_TIME_HISTORY {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);

        let s = &mut self.summary;
        s.frames += 1;
        s.decisions += report.decisions as u64;
        s.shots += report.shots as u64;
        s.hits += report.hits as u64;
        s.kills += report.kills as u64;
        s.disposed += report.disposed as u64;
        s.errors += report.errors as u64;
        if frame_time > self.frame_budget {
            s.slow_frames += 1;
        }
        let ms = frame_time.as_secs_f64() * 1000.0;
        s.worst_frame_ms = s.worst_frame_ms.max(ms);
        let total: Duration = self.frame_times.iter().sum();
        s.average_frame_ms = total.as_secs_f64() * 1000.0 / self.frame_times.len() as f64;
    }

    pub fn summary(&self) -> LoopSummary {
        self.summary
    }
}
