//! Point totals from travel and neutralizations

use serde::{Deserialize, Serialize};

use super::hazard::HazardId;
use super::scan::ScanOutcome;
use super::state::RunState;
use crate::consts::MAX_SPEED;
use crate::tuning::ScoringParams;

/// Running score for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringEngine {
    params: ScoringParams,
    score: u64,
    /// Pixels traveled not yet converted into distance points
    distance_accumulator: f32,
}

impl ScoringEngine {
    pub fn new(params: ScoringParams) -> Self {
        Self {
            params,
            score: 0,
            distance_accumulator: 0.0,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn add_points(&mut self, points: u64) -> u64 {
        self.score += points;
        self.score
    }

    /// Convert travel into points, one award per full step of pixels
    pub fn add_distance(&mut self, pixels: f32) {
        let step = self.params.pixels_per_distance_point;
        if step <= 0.0 || !pixels.is_finite() {
            return;
        }
        self.distance_accumulator += pixels.max(0.0);
        let steps = (self.distance_accumulator / step).floor();
        if steps >= 1.0 {
            self.distance_accumulator -= steps * step;
            self.score += steps as u64 * self.params.distance_points;
        }
    }

    /// Points for one neutralization
    ///
    /// `streak` counts this neutralization, so the first of a streak earns no
    /// streak bonus.
    pub fn neutralization_points(&self, base_points: u32, speed: f32, streak: u32, timing_multiplier: f32) -> u64 {
        let speed_bonus = (speed / MAX_SPEED) * self.params.speed_bonus_multiplier;
        let streak_bonus = streak.saturating_sub(1) as f32 * self.params.streak_multiplier;
        let points = base_points as f32 * (1.0 + speed_bonus + streak_bonus) * timing_multiplier;
        points.round().max(0.0) as u64
    }

    /// Credit every neutralization in a scan, in resolution order
    ///
    /// Updates the run's neutralization counters and returns the points
    /// awarded per hazard.
    pub fn apply_scan(&mut self, outcome: &ScanOutcome, run: &mut RunState) -> Vec<(HazardId, u64)> {
        let mut awards = Vec::with_capacity(outcome.neutralized.len());
        for (hazard, rating) in outcome.neutralized.iter().zip(&outcome.ratings) {
            run.record_neutralized(hazard.kind());
            let points = self.neutralization_points(
                hazard.config().base_points,
                run.speed(),
                run.current_streak,
                rating.multiplier,
            );
            self.score += points;
            awards.push((hazard.id, points));
        }
        awards
    }

    pub fn reset(&mut self) {
        self.score = 0;
        self.distance_accumulator = 0.0;
    }
}
