//! Data-driven game balance
//!
//! Everything here is read-only after load. `Tuning::default()` is the
//! built-in balance; `Tuning::from_json` accepts an override document and
//! validates it before use.

pub mod hazards;

pub use hazards::{HazardKind, HazardTable, HazardTypeConfig};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One step of the distance-driven difficulty table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTier {
    /// Distance (meters) at which this tier becomes active
    pub distance: f32,
    /// Spawn pressure; higher shortens the delay between spawns
    pub spawn_rate: f32,
    /// Hazard types this tier may spawn
    pub types: Vec<HazardKind>,
}

/// Relative likelihood of a hazard type being picked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeWeight {
    pub kind: HazardKind,
    pub weight: f32,
}

/// Spawn cadence parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnParams {
    /// Delay before the first hazard of a run
    pub initial_delay_ms: u64,
    pub spawn_min_ms: u64,
    pub spawn_max_ms: u64,
    /// Distance (meters) at which the difficulty factor saturates
    pub difficulty_distance: f32,
    /// How strongly a tier's spawn rate shortens the delay
    pub spawn_rate_scale: f32,
    /// Minimum travel-axis gap (pixels) between spawns in the same lane
    pub min_spacing: f32,
    /// Difficulty factor above which double spawns may occur
    pub double_spawn_threshold: f32,
    pub double_spawn_chance: f64,
    pub double_spawn_delay_ms: u64,
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            initial_delay_ms: 3000,
            spawn_min_ms: 2000,
            spawn_max_ms: 5000,
            difficulty_distance: 5000.0,
            spawn_rate_scale: 0.5,
            min_spacing: 400.0,
            double_spawn_threshold: 0.5,
            double_spawn_chance: 0.3,
            double_spawn_delay_ms: 400,
        }
    }
}

/// Scan action parameters and the timing-quality model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    /// Effective range from the detector tip
    pub scan_range: f32,
    /// Minimum time between accepted scans
    pub cooldown_ms: u64,
    pub reaction_time_s: f32,
    pub safety_margin: f32,
    pub min_distance_floor: f32,
    /// Relative deviation bands
    pub perfect_tolerance: f32,
    pub good_tolerance: f32,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            scan_range: 150.0,
            cooldown_ms: 1000,
            reaction_time_s: 0.4,
            safety_margin: 40.0,
            min_distance_floor: 60.0,
            perfect_tolerance: 0.15,
            good_tolerance: 0.30,
        }
    }
}

impl ScanParams {
    /// Ideal distance stays positive; tolerance bands are ordered
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_distance_floor > 0.0 && self.min_distance_floor.is_finite()) {
            return Err(ConfigError::InvalidScanParams("min_distance_floor must be positive"));
        }
        if !(self.reaction_time_s.is_finite() && self.reaction_time_s >= 0.0 && self.safety_margin.is_finite()) {
            return Err(ConfigError::InvalidScanParams("reaction time and safety margin must be finite"));
        }
        if !(self.scan_range > 0.0) {
            return Err(ConfigError::InvalidScanParams("scan_range must be positive"));
        }
        if !(0.0 <= self.perfect_tolerance && self.perfect_tolerance <= self.good_tolerance) {
            return Err(ConfigError::InvalidScanParams(
                "tolerances must satisfy 0 <= perfect <= good",
            ));
        }
        Ok(())
    }

    /// Ideal scan distance at `speed`: reaction distance plus a safety margin
    pub fn optimal_distance(&self, speed: f32) -> f32 {
        (self.reaction_time_s * speed + self.safety_margin).max(self.min_distance_floor)
    }
}

/// Distance thresholds for the threat meter
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatThresholds {
    pub far: f32,
    pub near: f32,
}

impl Default for ThreatThresholds {
    fn default() -> Self {
        Self {
            far: 300.0,
            near: 100.0,
        }
    }
}

/// Point weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringParams {
    /// Bonus fraction at max speed
    pub speed_bonus_multiplier: f32,
    /// Bonus fraction per consecutive neutralization after the first
    pub streak_multiplier: f32,
    /// Pixels of travel per distance point
    pub pixels_per_distance_point: f32,
    pub distance_points: u64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            speed_bonus_multiplier: 0.5,
            streak_multiplier: 0.25,
            pixels_per_distance_point: 10.0,
            distance_points: 1,
        }
    }
}

/// Run-ending thresholds; differ between endless and challenge runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunRules {
    /// Casualties at which the run ends
    pub max_casualties: u32,
    /// Bypasses ("blue falcons") at which the run ends
    pub blue_falcon_limit: u32,
}

impl Default for RunRules {
    fn default() -> Self {
        Self::endless()
    }
}

impl RunRules {
    pub fn endless() -> Self {
        Self {
            max_casualties: 1,
            blue_falcon_limit: 3,
        }
    }
}

/// Complete balance sheet for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub hazards: HazardTable,
    /// Sorted ascending by distance after validation
    pub difficulty: Vec<DifficultyTier>,
    pub type_weights: Vec<TypeWeight>,
    pub spawn: SpawnParams,
    pub scan: ScanParams,
    pub threat: ThreatThresholds,
    pub scoring: ScoringParams,
    pub rules: RunRules,
}

impl Default for Tuning {
    fn default() -> Self {
        use HazardKind::*;
        Self {
            hazards: HazardTable::default(),
            difficulty: vec![
                DifficultyTier { distance: 0.0, spawn_rate: 0.3, types: vec![Cwied] },
                DifficultyTier { distance: 1000.0, spawn_rate: 0.4, types: vec![Cwied, Ppied] },
                DifficultyTier { distance: 2500.0, spawn_rate: 0.5, types: vec![Cwied, Ppied, Rcied] },
                DifficultyTier { distance: 5000.0, spawn_rate: 0.6, types: vec![Cwied, Ppied, Rcied, Vbied] },
            ],
            type_weights: vec![
                TypeWeight { kind: Cwied, weight: 1.0 },
                TypeWeight { kind: Ppied, weight: 0.7 },
                TypeWeight { kind: Rcied, weight: 0.6 },
                TypeWeight { kind: Vbied, weight: 0.3 },
            ],
            spawn: SpawnParams::default(),
            scan: ScanParams::default(),
            threat: ThreatThresholds::default(),
            scoring: ScoringParams::default(),
            rules: RunRules::endless(),
        }
    }
}

impl Tuning {
    /// Parse and validate a tuning document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!(
            "Loaded tuning: {} hazard types, {} difficulty tiers",
            tuning.hazards.iter().count(),
            tuning.difficulty.len()
        );
        Ok(tuning)
    }

    /// Check invariants and normalize tier order
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.hazards.validate()?;
        self.scan.validate()?;
        for w in &self.type_weights {
            if !w.weight.is_finite() || w.weight < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    kind: w.kind,
                    weight: w.weight,
                });
            }
        }
        if self.difficulty.is_empty() {
            return Err(ConfigError::NoDifficultyTiers);
        }
        self.difficulty
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));
        for tier in &self.difficulty {
            if tier.types.is_empty() {
                return Err(ConfigError::EmptyTier {
                    distance: tier.distance,
                });
            }
            for kind in &tier.types {
                self.hazards.get(*kind)?;
            }
            let total: f32 = tier.types.iter().map(|&k| self.weight_of(k)).sum();
            if !(total > 0.0) {
                return Err(ConfigError::ZeroTierWeight {
                    distance: tier.distance,
                });
            }
        }
        Ok(())
    }

    /// Active tier: the largest threshold not beyond `distance`
    ///
    /// Distances before the first threshold use the first tier.
    pub fn tier_for(&self, distance: f32) -> Option<&DifficultyTier> {
        self.difficulty
            .iter()
            .rev()
            .find(|t| t.distance <= distance)
            .or_else(|| self.difficulty.first())
    }

    /// Configured weight for a type (1.0 if unlisted)
    pub fn weight_of(&self, kind: HazardKind) -> f32 {
        self.type_weights
            .iter()
            .find(|w| w.kind == kind)
            .map(|w| w.weight)
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let mut tuning = Tuning::default();
        assert!(tuning.validate().is_ok());
    }

    #[test]
    fn test_tier_for_picks_largest_threshold() {
        let tuning = Tuning::default();
        assert_eq!(tuning.tier_for(0.0).unwrap().distance, 0.0);
        assert_eq!(tuning.tier_for(999.0).unwrap().distance, 0.0);
        assert_eq!(tuning.tier_for(1000.0).unwrap().distance, 1000.0);
        assert_eq!(tuning.tier_for(4000.0).unwrap().distance, 2500.0);
        assert_eq!(tuning.tier_for(1.0e6).unwrap().distance, 5000.0);
    }

    #[test]
    fn test_optimal_distance_floor() {
        let scan = ScanParams::default();
        assert_eq!(scan.optimal_distance(0.0), 60.0);
        assert!((scan.optimal_distance(150.0) - 100.0).abs() < 1e-4);
        assert!((scan.optimal_distance(250.0) - 140.0).abs() < 1e-4);
    }

    #[test]
    fn test_from_json_partial_document_uses_defaults() {
        let json = r#"{ "rules": { "blue_falcon_limit": 5 } }"#;
        let tuning = Tuning::from_json(json).unwrap();
        assert_eq!(tuning.rules.blue_falcon_limit, 5);
        assert_eq!(tuning.rules.max_casualties, 1);
        assert_eq!(tuning.scan.scan_range, 150.0);
    }

    #[test]
    fn test_from_json_sorts_tiers() {
        let json = r#"{ "difficulty": [
            { "distance": 500.0, "spawn_rate": 0.5, "types": ["ppied"] },
            { "distance": 0.0, "spawn_rate": 0.3, "types": ["cwied"] }
        ] }"#;
        let tuning = Tuning::from_json(json).unwrap();
        assert_eq!(tuning.difficulty[0].distance, 0.0);
        assert_eq!(tuning.tier_for(600.0).unwrap().types, vec![HazardKind::Ppied]);
    }

    #[test]
    fn test_from_json_rejects_unknown_type() {
        let json = r#"{ "difficulty": [
            { "distance": 0.0, "spawn_rate": 0.3, "types": ["landmine"] }
        ] }"#;
        assert!(matches!(Tuning::from_json(json), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_json_rejects_tier_type_missing_from_table() {
        let json = r#"{
            "hazards": [{
                "kind": "cwied",
                "warning_duration_ms": 3000,
                "critical_duration_ms": 1500,
                "detection_range": 300.0,
                "critical_range": 100.0,
                "scan_difficulty": 1.0,
                "base_points": 100
            }],
            "difficulty": [{ "distance": 0.0, "spawn_rate": 0.3, "types": ["vbied"] }]
        }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::MissingHazardType(HazardKind::Vbied))
        ));
    }

    #[test]
    fn test_from_json_rejects_empty_tier() {
        let json = r#"{ "difficulty": [{ "distance": 0.0, "spawn_rate": 0.3, "types": [] }] }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::EmptyTier { .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_all_zero_weights() {
        let json = r#"{ "type_weights": [
            { "kind": "cwied", "weight": 0.0 },
            { "kind": "ppied", "weight": 0.0 },
            { "kind": "rcied", "weight": 0.0 },
            { "kind": "vbied", "weight": 0.0 }
        ] }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::ZeroTierWeight { distance }) if distance == 0.0
        ));
    }

    #[test]
    fn test_from_json_rejects_zero_weight_tier_only() {
        // Only the first tier is all cwied
        let json = r#"{ "type_weights": [{ "kind": "cwied", "weight": 0.0 }] }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::ZeroTierWeight { distance }) if distance == 0.0
        ));

        let json = r#"{ "type_weights": [{ "kind": "vbied", "weight": 0.0 }] }"#;
        assert!(Tuning::from_json(json).is_ok());
    }

    #[test]
    fn test_from_json_rejects_negative_weight() {
        let json = r#"{ "type_weights": [{ "kind": "ppied", "weight": -1.0 }] }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::InvalidWeight { kind: HazardKind::Ppied, .. })
        ));
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let mut tuning = Tuning::default();
        tuning.type_weights[0].weight = f32::INFINITY;
        assert!(matches!(tuning.validate(), Err(ConfigError::InvalidWeight { .. })));
        tuning.type_weights[0].weight = f32::NAN;
        assert!(matches!(tuning.validate(), Err(ConfigError::InvalidWeight { .. })));
    }

    #[test]
    fn test_from_json_rejects_zero_optimal_distance() {
        let json = r#"{ "scan": {
            "min_distance_floor": 0.0,
            "reaction_time_s": 0.0,
            "safety_margin": 0.0
        } }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::InvalidScanParams(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_inverted_tolerances() {
        let json = r#"{ "scan": { "perfect_tolerance": 0.4, "good_tolerance": 0.3 } }"#;
        assert!(matches!(
            Tuning::from_json(json),
            Err(ConfigError::InvalidScanParams(_))
        ));
        let json = r#"{ "scan": { "perfect_tolerance": -0.1 } }"#;
        assert!(Tuning::from_json(json).is_err());
    }

    #[test]
    fn test_weight_of_defaults_to_one() {
        let mut tuning = Tuning::default();
        tuning.type_weights.clear();
        assert_eq!(tuning.weight_of(HazardKind::Vbied), 1.0);
        assert_eq!(Tuning::default().weight_of(HazardKind::Vbied), 0.3);
    }
}
