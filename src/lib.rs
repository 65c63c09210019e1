//! Route Clear - A route clearance arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (hazard lifecycle, detection, scans, scoring, spawning)
//! - `tuning`: Data-driven game balance (hazard types, difficulty tiers, run rules)
//! - `challenge`: Fixed-pattern challenge runs with objectives and medals
//! - `achievements`: Lifetime stats and achievement unlocks
//! - `persistence`: Key-value record storage tolerant of missing/corrupt data

pub mod achievements;
pub mod challenge;
pub mod error;
pub mod highscores;
pub mod persistence;
pub mod sim;
pub mod tuning;

pub use error::{ConfigError, StoreError};
pub use highscores::HighScores;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (~60 Hz)
    pub const FRAME_MS: u64 = 16;

    /// Play field dimensions (portrait, pixels)
    pub const FIELD_WIDTH: f32 = 720.0;
    pub const FIELD_HEIGHT: f32 = 1280.0;
    /// Hazards enter just above the top edge
    pub const SPAWN_Y: f32 = -50.0;
    /// Hazards further than this below the bottom edge have left the field
    pub const EXIT_MARGIN: f32 = 100.0;

    /// Vehicle sits 60% down the field
    pub const VEHICLE_Y: f32 = FIELD_HEIGHT * 0.6;
    /// Detector arm tip, ahead of the vehicle along the travel axis
    pub const DETECTOR_REACH: f32 = 70.0;

    /// Lanes, as fractions of field width
    pub const LANE_POSITIONS: [f32; 3] = [0.35, 0.5, 0.65];
    pub const DEFAULT_LANE: usize = 1;
    /// Time to complete a lane change
    pub const LANE_SWITCH_MS: f32 = 200.0;

    /// Vehicle speeds (pixels per second)
    pub const MIN_SPEED: f32 = 50.0;
    pub const CRUISE_SPEED: f32 = 150.0;
    pub const MAX_SPEED: f32 = 250.0;
    pub const ACCELERATION: f32 = 100.0;
    pub const BRAKE_POWER: f32 = 150.0;

    /// Pixels to meters for the distance odometer
    pub const METERS_PER_PIXEL: f32 = 0.1;

    /// Pressure plates trip when driven over fast inside this margin past critical range
    pub const PRESSURE_PLATE_MARGIN: f32 = 50.0;

    /// Speed at or above which a neutralization counts toward "speed demon"
    pub const SPEED_DEMON_SPEED: f32 = 200.0;
}

/// X coordinate of a lane's center line
#[inline]
pub fn lane_x(lane: usize) -> f32 {
    let idx = lane.min(consts::LANE_POSITIONS.len() - 1);
    consts::FIELD_WIDTH * consts::LANE_POSITIONS[idx]
}

/// Number of lanes on the road
#[inline]
pub fn lane_count() -> usize {
    consts::LANE_POSITIONS.len()
}

/// Detector arm tip for a vehicle at `vehicle_pos`
#[inline]
pub fn detector_position(vehicle_pos: Vec2) -> Vec2 {
    Vec2::new(vehicle_pos.x, vehicle_pos.y - consts::DETECTOR_REACH)
}
