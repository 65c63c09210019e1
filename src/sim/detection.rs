//! Detection field: threat level and scan-range queries
//!
//! Pure functions over current hazard positions, plus a per-tick snapshot
//! used by the HUD and the autopilot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::hazard::{Hazard, HazardState};
use crate::tuning::ThreatThresholds;

/// Threat meter reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ThreatLevel {
    #[default]
    Safe,
    Warning,
    Critical,
}

/// Nearest active hazard to `vehicle_pos`, as (index, distance)
pub fn nearest_active(vehicle_pos: Vec2, hazards: &[Hazard]) -> Option<(usize, f32)> {
    hazards
        .iter()
        .enumerate()
        .filter(|(_, h)| h.is_active())
        .map(|(i, h)| (i, h.pos.distance(vehicle_pos)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Classify the nearest threat by distance, raised by the hazard's own state
pub fn nearest_threat_level(
    vehicle_pos: Vec2,
    hazards: &[Hazard],
    thresholds: &ThreatThresholds,
) -> ThreatLevel {
    let Some((index, distance)) = nearest_active(vehicle_pos, hazards) else {
        return ThreatLevel::Safe;
    };

    let by_distance = if distance > thresholds.far {
        ThreatLevel::Safe
    } else if distance <= thresholds.near {
        ThreatLevel::Critical
    } else {
        ThreatLevel::Warning
    };

    match hazards[index].state() {
        HazardState::Critical => ThreatLevel::Critical,
        HazardState::Warning if by_distance == ThreatLevel::Safe => ThreatLevel::Warning,
        _ => by_distance,
    }
}

/// Indices of active hazards strictly within `scan_range` of the detector
pub fn hazards_in_scan_range(detector_pos: Vec2, hazards: &[Hazard], scan_range: f32) -> Vec<usize> {
    hazards
        .iter()
        .enumerate()
        .filter(|(_, h)| h.is_active() && h.pos.distance(detector_pos) < scan_range)
        .map(|(i, _)| i)
        .collect()
}

/// Per-tick detection snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionField {
    pub threat: ThreatLevel,
    /// Distance to the nearest active hazard (None when the road is clear)
    pub nearest_distance: Option<f32>,
    pub in_scan_range: usize,
    thresholds: ThreatThresholds,
}

impl DetectionField {
    pub fn new(thresholds: ThreatThresholds) -> Self {
        Self {
            thresholds,
            ..Default::default()
        }
    }

    /// Recompute from the current hazard positions
    pub fn update(&mut self, vehicle_pos: Vec2, detector_pos: Vec2, hazards: &[Hazard], scan_range: f32) {
        self.nearest_distance = nearest_active(vehicle_pos, hazards).map(|(_, d)| d);
        self.threat = nearest_threat_level(vehicle_pos, hazards, &self.thresholds);
        self.in_scan_range = hazards_in_scan_range(detector_pos, hazards, scan_range).len();
    }

    /// 0 at or beyond the far threshold, 1 at or inside the near threshold
    pub fn warning_progress(&self) -> f32 {
        let Some(distance) = self.nearest_distance else {
            return 0.0;
        };
        if distance >= self.thresholds.far {
            return 0.0;
        }
        let range = self.thresholds.far - self.thresholds.near;
        if range <= 0.0 {
            return 1.0;
        }
        1.0 - ((distance - self.thresholds.near) / range).clamp(0.0, 1.0)
    }
}
