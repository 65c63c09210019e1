//! Scan resolution and the timing-quality model

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::detection::hazards_in_scan_range;
use super::hazard::{BlockReason, Hazard, HazardId};
use super::state::RunState;
use crate::tuning::{HazardKind, ScanParams};

/// Timing grade for a neutralization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rating {
    Perfect,
    Good,
    /// Scanned further out than ideal
    Early,
    /// Scanned closer in than ideal
    Late,
}

impl Rating {
    pub fn multiplier(&self) -> f32 {
        match self {
            Rating::Perfect => 2.0,
            Rating::Good => 1.5,
            Rating::Early | Rating::Late => 1.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rating::Perfect => "PERFECT!",
            Rating::Good => "GOOD",
            Rating::Early => "EARLY",
            Rating::Late => "LATE",
        }
    }
}

/// Grade a scan distance against the ideal distance
pub fn rate(distance: f32, optimal: f32, params: &ScanParams) -> Rating {
    let deviation = (distance - optimal).abs() / optimal;
    if deviation <= params.perfect_tolerance {
        Rating::Perfect
    } else if deviation <= params.good_tolerance {
        Rating::Good
    } else if distance > optimal {
        Rating::Early
    } else {
        Rating::Late
    }
}

/// Timing result for one neutralized hazard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingRating {
    pub hazard_id: HazardId,
    pub kind: HazardKind,
    pub distance: f32,
    pub optimal: f32,
    pub rating: Rating,
    pub multiplier: f32,
}

/// An in-range hazard that failed eligibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocked {
    pub hazard: Hazard,
    pub reason: BlockReason,
}

/// Result of one scan; snapshots taken at resolution time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub neutralized: Vec<Hazard>,
    pub blocked: Vec<Blocked>,
    pub ratings: Vec<TimingRating>,
}

impl ScanOutcome {
    /// Nothing neutralized (empty range or everything blocked)
    pub fn is_miss(&self) -> bool {
        self.neutralized.is_empty()
    }

    /// Highest-multiplier rating; the first one wins ties
    pub fn best_rating(&self) -> Option<&TimingRating> {
        self.ratings.iter().fold(None, |best: Option<&TimingRating>, r| match best {
            Some(b) if b.multiplier >= r.multiplier => Some(b),
            _ => Some(r),
        })
    }
}

/// Executes scans against the active hazard set
#[derive(Debug, Clone)]
pub struct ScanResolver {
    params: ScanParams,
}

impl ScanResolver {
    pub fn new(params: ScanParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    /// Resolve with the configured ideal-distance model
    pub fn resolve(&self, detector_pos: Vec2, hazards: &mut [Hazard], speed: f32, run: &mut RunState) -> ScanOutcome {
        let params = &self.params;
        self.resolve_with(detector_pos, hazards, speed, |s| params.optimal_distance(s), run)
    }

    /// Resolve with a caller-supplied ideal-distance function
    ///
    /// Every in-range hazard lands in exactly one of `neutralized` or
    /// `blocked`. The perfect streak in `run` advances when the best rating is
    /// perfect and resets otherwise.
    pub fn resolve_with<F>(
        &self,
        detector_pos: Vec2,
        hazards: &mut [Hazard],
        speed: f32,
        optimal_distance: F,
        run: &mut RunState,
    ) -> ScanOutcome
    where
        F: Fn(f32) -> f32,
    {
        let in_range = hazards_in_scan_range(detector_pos, hazards, self.params.scan_range);
        let optimal = optimal_distance(speed);
        let mut outcome = ScanOutcome::default();

        for index in in_range {
            let hazard = &mut hazards[index];
            if let Some(reason) = hazard.block_reason(speed) {
                outcome.blocked.push(Blocked {
                    hazard: hazard.clone(),
                    reason,
                });
                continue;
            }

            let distance = hazard.pos.distance(detector_pos);
            let rating = rate(distance, optimal, &self.params);
            if hazard.neutralize().is_some() {
                outcome.ratings.push(TimingRating {
                    hazard_id: hazard.id,
                    kind: hazard.kind(),
                    distance,
                    optimal,
                    rating,
                    multiplier: rating.multiplier(),
                });
                outcome.neutralized.push(hazard.clone());
            }
        }

        let best_is_perfect = outcome
            .best_rating()
            .is_some_and(|r| r.rating == Rating::Perfect);
        let perfects = outcome
            .ratings
            .iter()
            .filter(|r| r.rating == Rating::Perfect)
            .count() as u32;
        run.record_scan_timing(best_is_perfect, perfects);

        log::debug!(
            "Scan at speed {:.0}: {} neutralized, {} blocked",
            speed,
            outcome.neutralized.len(),
            outcome.blocked.len()
        );
        outcome
    }
}
