//! Hazard type catalogue
//!
//! Per-type behavior (signal windows, speed gating, instant kill) is expressed
//! as data here and read by the state machine as predicates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Closed set of hazard variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    /// Command wire: timer-driven, detonates on its own deadline
    Cwied,
    /// Pressure plate: cannot be scanned at speed, trips when driven over fast
    Ppied,
    /// Radio controlled: only scannable while its signal is showing
    Rcied,
    /// Vehicle borne: large blast, ends the run outright
    Vbied,
}

impl HazardKind {
    pub const ALL: [HazardKind; 4] = [
        HazardKind::Cwied,
        HazardKind::Ppied,
        HazardKind::Rcied,
        HazardKind::Vbied,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::Cwied => "cwied",
            HazardKind::Ppied => "ppied",
            HazardKind::Rcied => "rcied",
            HazardKind::Vbied => "vbied",
        }
    }

    /// Stable index for per-kind counters
    pub fn index(&self) -> usize {
        match self {
            HazardKind::Cwied => 0,
            HazardKind::Ppied => 1,
            HazardKind::Rcied => 2,
            HazardKind::Vbied => 3,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            HazardKind::Cwied => "Command Wire IED",
            HazardKind::Ppied => "Pressure Plate IED",
            HazardKind::Rcied => "Radio Controlled IED",
            HazardKind::Vbied => "Vehicle Borne IED",
        }
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cwied" => Ok(HazardKind::Cwied),
            "ppied" => Ok(HazardKind::Ppied),
            "rcied" => Ok(HazardKind::Rcied),
            "vbied" => Ok(HazardKind::Vbied),
            _ => Err(ConfigError::UnknownHazardType(s.to_string())),
        }
    }
}

/// Static parameters for one hazard type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardTypeConfig {
    pub kind: HazardKind,
    /// Time in Warning before the hazard escalates on its own
    pub warning_duration_ms: u64,
    /// Time in Critical before detonation
    pub critical_duration_ms: u64,
    /// Vehicle distance that reveals the hazard (Hidden -> Warning)
    pub detection_range: f32,
    /// Vehicle distance that arms the hazard (Warning -> Critical)
    pub critical_range: f32,
    pub scan_difficulty: f32,
    pub base_points: u32,
    #[serde(default)]
    pub requires_signal: bool,
    #[serde(default)]
    pub signal_interval_ms: Option<u64>,
    #[serde(default)]
    pub signal_duration_ms: Option<u64>,
    /// Scans fail above this vehicle speed
    #[serde(default)]
    pub max_speed_to_scan: Option<f32>,
    /// Detonation ends the run regardless of casualty count
    #[serde(default)]
    pub instant_kill: bool,
}

impl HazardTypeConfig {
    /// Pressure plates are the speed-gated class
    pub fn is_pressure_plate(&self) -> bool {
        self.max_speed_to_scan.is_some()
    }

    /// Check the load-time invariants for this type
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.critical_range < self.detection_range) {
            return Err(ConfigError::InvalidRanges {
                kind: self.kind,
                detection: self.detection_range,
                critical: self.critical_range,
            });
        }
        if self.requires_signal {
            match (self.signal_interval_ms, self.signal_duration_ms) {
                (Some(interval), Some(duration)) if duration > 0 && duration < interval => {}
                _ => return Err(ConfigError::InvalidSignalTiming(self.kind)),
            }
        }
        Ok(())
    }

    pub fn cwied() -> Self {
        Self {
            kind: HazardKind::Cwied,
            warning_duration_ms: 3000,
            critical_duration_ms: 1500,
            detection_range: 300.0,
            critical_range: 100.0,
            scan_difficulty: 1.0,
            base_points: 100,
            requires_signal: false,
            signal_interval_ms: None,
            signal_duration_ms: None,
            max_speed_to_scan: None,
            instant_kill: false,
        }
    }

    pub fn ppied() -> Self {
        Self {
            kind: HazardKind::Ppied,
            warning_duration_ms: 4000,
            critical_duration_ms: 800,
            detection_range: 250.0,
            critical_range: 80.0,
            scan_difficulty: 1.2,
            base_points: 150,
            max_speed_to_scan: Some(120.0),
            ..Self::cwied()
        }
    }

    pub fn rcied() -> Self {
        Self {
            kind: HazardKind::Rcied,
            warning_duration_ms: 3500,
            critical_duration_ms: 1500,
            scan_difficulty: 1.3,
            base_points: 175,
            requires_signal: true,
            signal_interval_ms: Some(2000),
            signal_duration_ms: Some(700),
            ..Self::cwied()
        }
    }

    pub fn vbied() -> Self {
        Self {
            kind: HazardKind::Vbied,
            warning_duration_ms: 3000,
            critical_duration_ms: 2000,
            detection_range: 350.0,
            critical_range: 130.0,
            scan_difficulty: 1.5,
            base_points: 300,
            instant_kill: true,
            ..Self::cwied()
        }
    }
}

/// Read-only table of every configured hazard type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HazardTable {
    types: Vec<HazardTypeConfig>,
}

impl Default for HazardTable {
    fn default() -> Self {
        Self {
            types: vec![
                HazardTypeConfig::cwied(),
                HazardTypeConfig::ppied(),
                HazardTypeConfig::rcied(),
                HazardTypeConfig::vbied(),
            ],
        }
    }
}

impl HazardTable {
    pub fn new(types: Vec<HazardTypeConfig>) -> Self {
        Self { types }
    }

    /// Look up a type; a missing entry is a configuration defect
    pub fn get(&self, kind: HazardKind) -> Result<&HazardTypeConfig, ConfigError> {
        self.types
            .iter()
            .find(|c| c.kind == kind)
            .ok_or(ConfigError::MissingHazardType(kind))
    }

    /// Look up a type by its string id
    pub fn get_by_id(&self, id: &str) -> Result<&HazardTypeConfig, ConfigError> {
        self.get(id.parse()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HazardTypeConfig> {
        self.types.iter()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.types.iter().try_for_each(HazardTypeConfig::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types_validate() {
        assert!(HazardTable::default().validate().is_ok());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("CWIED".parse::<HazardKind>().unwrap(), HazardKind::Cwied);
        assert_eq!(" rcied ".parse::<HazardKind>().unwrap(), HazardKind::Rcied);
        assert!(matches!(
            "mortar".parse::<HazardKind>(),
            Err(ConfigError::UnknownHazardType(s)) if s == "mortar"
        ));
    }

    #[test]
    fn test_unknown_id_fails_fast() {
        let table = HazardTable::default();
        assert!(table.get_by_id("landmine").is_err());
        assert_eq!(table.get_by_id("vbied").unwrap().base_points, 300);
    }

    #[test]
    fn test_missing_type_is_an_error() {
        let table = HazardTable::new(vec![HazardTypeConfig::cwied()]);
        assert!(matches!(
            table.get(HazardKind::Vbied),
            Err(ConfigError::MissingHazardType(HazardKind::Vbied))
        ));
    }

    #[test]
    fn test_ranges_invariant() {
        let mut cfg = HazardTypeConfig::cwied();
        cfg.critical_range = cfg.detection_range;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidRanges { .. })));
    }

    #[test]
    fn test_signal_timing_required() {
        let mut cfg = HazardTypeConfig::rcied();
        cfg.signal_duration_ms = None;
        assert!(cfg.validate().is_err());

        cfg.signal_duration_ms = Some(2500);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "kind": "ppied",
            "warning_duration_ms": 4000,
            "critical_duration_ms": 800,
            "detection_range": 250.0,
            "critical_range": 80.0,
            "scan_difficulty": 1.2,
            "base_points": 150,
            "max_speed_to_scan": 120.0
        }"#;
        let cfg: HazardTypeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg, HazardTypeConfig::ppied());
        assert!(cfg.is_pressure_plate());
        assert!(!cfg.requires_signal);
    }
}
