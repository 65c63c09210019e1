//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only, driven by the game's own millisecond clock
//! - Seeded RNG only
//! - Stable iteration order (hazards in spawn order)
//! - No rendering, audio or platform dependencies

pub mod detection;
pub mod hazard;
pub mod scan;
pub mod scoring;
pub mod spawn;
pub mod state;
pub mod tick;

pub use detection::{DetectionField, ThreatLevel, hazards_in_scan_range, nearest_threat_level};
pub use hazard::{BlockReason, Hazard, HazardId, HazardSignal, HazardState};
pub use scan::{Rating, ScanOutcome, ScanResolver, TimingRating};
pub use scoring::ScoringEngine;
pub use spawn::{PatternSpawner, SpawnRequest, SpawnScheduler, Spawner, weighted_choice};
pub use state::{
    GameEvent, GamePhase, GameState, RunMode, RunOutcome, RunState, RunSummary, Steer, Vehicle,
};
pub use tick::{TickInput, tick};
