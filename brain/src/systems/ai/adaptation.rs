// tank_brain_core/brain/src/systems/ai/adaptation.rs
use crate::core::config::{AdaptationConfig, DifficultyProfile, DifficultyTable};
use crate::core::constants::STYLE_WINDOW_SAMPLES;
use crate::core::types::{DifficultyTier, PlayerStyle};
use std::collections::VecDeque;
use tracing::debug;

const HEALTH_SCALE_GAIN: f32 = 0.5;
const CADENCE_SCALE_REDUCTION: f32 = 0.3;

/// Discrete tier plus a bounded continuous scale layered on top of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyState {
    pub tier: DifficultyTier,
    scale: f32,
}

impl DifficultyState {
    pub fn new(tier: DifficultyTier, scale: f32) -> Self {
        DifficultyState { tier, scale: Self::clamp_scale(scale) }
    }

    fn clamp_scale(scale: f32) -> f32 {
        if scale.is_finite() {
            scale.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = Self::clamp_scale(scale);
    }

    pub fn profile<'a>(&self, table: &'a DifficultyTable) -> &'a DifficultyProfile {
        table.profile(self.tier)
    }

    pub fn max_health(&self, table: &DifficultyTable) -> f32 {
        self.profile(table).max_health * (1.0 + HEALTH_SCALE_GAIN * self.scale)
    }

    /// Multiplier on the decision interval; higher scale thinks more often.
    pub fn cadence_factor(&self) -> f32 {
        1.0 - CADENCE_SCALE_REDUCTION * self.scale
    }
}

/// Competence multiplier that creeps up with time spent fighting.
#[derive(Debug, Clone)]
pub struct AdaptiveIntelligence {
    multiplier: f32,
    growth_per_sec: f32,
    cap: f32,
    combat_secs: f32,
}

impl AdaptiveIntelligence {
    pub fn new(config: &AdaptationConfig) -> Self {
        AdaptiveIntelligence {
            multiplier: 1.0,
            growth_per_sec: config.adaptive_growth_per_sec.max(0.0),
            cap: config.adaptive_cap.max(1.0),
            combat_secs: 0.0,
        }
    }

    /// Only time spent in an engaging state counts.
    pub fn update(&mut self, dt: f32, in_combat: bool) {
        if !in_combat || !(dt > 0.0) {
            return;
        }
        self.combat_secs += dt;
        self.multiplier = (self.multiplier + self.growth_per_sec * dt).min(self.cap);
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn combat_secs(&self) -> f32 {
        self.combat_secs
    }
}

/// Adjustments derived from how the opponent has been fighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementBias {
    pub preferred_range_scale: f32,
    pub detection_range_scale: f32,
}

impl EngagementBias {
    pub const NEUTRAL: EngagementBias = EngagementBias::new(1.0, 1.0);

    const fn new(preferred_range_scale: f32, detection_range_scale: f32) -> Self {
        EngagementBias { preferred_range_scale, detection_range_scale }
    }

    pub fn for_style(style: PlayerStyle) -> Self {
        match style {
            // Hold further back from an opponent who trades hard.
            PlayerStyle::Aggressive => EngagementBias::new(1.2, 1.1),
            // Close in on a turtling opponent.
            PlayerStyle::Defensive => EngagementBias::new(0.8, 0.95),
            PlayerStyle::Balanced => Self::NEUTRAL,
        }
    }
}

/// Rolling window of recent damage received, bucketed by damage rate.
#[derive(Debug, Clone)]
pub struct PlayerStyleClassifier {
    samples: VecDeque<(f64, f32)>,
    window_secs: f64,
    aggressive_dps: f32,
    defensive_dps: f32,
    style: PlayerStyle,
}

impl PlayerStyleClassifier {
    pub fn new(config: &AdaptationConfig) -> Self {
        PlayerStyleClassifier {
            samples: VecDeque::with_capacity(STYLE_WINDOW_SAMPLES),
            window_secs: config.style_window_secs.max(0.1) as f64,
            aggressive_dps: config.aggressive_dps,
            defensive_dps: config.defensive_dps,
            style: PlayerStyle::Balanced,
        }
    }

    pub fn record_damage(&mut self, now_secs: f64, amount: f32) {
        if !amount.is_finite() || amount <= 0.0 {
            return;
        }
        if self.samples.len() == STYLE_WINDOW_SAMPLES {
            self.samples.pop_front();
        }
        self.samples.push_back((now_secs, amount));
        self.reclassify(now_secs);
    }

    /// Drops samples older than the window and re-buckets.
    pub fn reclassify(&mut self, now_secs: f64) -> PlayerStyle {
        while let Some((t, _)) = self.samples.front() {
            if now_secs - *t > self.window_secs {
                self.samples.pop_front();
            } else {
                break;
            }
        }
        let total: f32 = self.samples.iter().map(|(_, amount)| amount).sum();
        let dps = total / self.window_secs as f32;
        let style = if dps >= self.aggressive_dps {
            PlayerStyle::Aggressive
        } else if dps <= self.defensive_dps {
            PlayerStyle::Defensive
        } else {
            PlayerStyle::Balanced
        };
        if style != self.style {
            debug!("Opponent style reclassified {:?} -> {:?} ({:.1} dps)", self.style, style, dps);
            self.style = style;
        }
        style
    }

    pub fn style(&self) -> PlayerStyle {
        self.style
    }

    pub fn bias(&self) -> EngagementBias {
        EngagementBias::for_style(self.style)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}
