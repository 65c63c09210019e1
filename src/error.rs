//! Error types
//!
//! The simulation itself never fails; these cover configuration defects and
//! record storage.

use thiserror::Error;

use crate::tuning::HazardKind;

/// Configuration defects detected while loading or using tuning data
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown hazard type: {0}")]
    UnknownHazardType(String),

    #[error("Hazard table has no entry for {0}")]
    MissingHazardType(HazardKind),

    #[error("{kind}: critical range {critical} must be below detection range {detection}")]
    InvalidRanges {
        kind: HazardKind,
        detection: f32,
        critical: f32,
    },

    #[error("{0}: signal-gated hazard needs 0 < signal duration < signal interval")]
    InvalidSignalTiming(HazardKind),

    #[error("Difficulty table is empty")]
    NoDifficultyTiers,

    #[error("Difficulty tier at distance {distance} allows no hazard types")]
    EmptyTier { distance: f32 },

    #[error("{kind}: spawn weight {weight} must be finite and non-negative")]
    InvalidWeight { kind: HazardKind, weight: f32 },

    #[error("Difficulty tier at distance {distance} has no positive spawn weight")]
    ZeroTierWeight { distance: f32 },

    #[error("Invalid scan parameters: {0}")]
    InvalidScanParams(&'static str),

    #[error("Unknown challenge: {0}")]
    UnknownChallenge(String),

    #[error("Malformed tuning data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures reading or writing persisted records
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },
}
