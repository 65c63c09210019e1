//! Game state and core simulation types
//!
//! `RunState` holds the per-run counters every component reads; `GameState`
//! owns the active hazards and the components that act on them.

use std::sync::Arc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::detection::DetectionField;
use super::hazard::{Hazard, HazardId, HazardSignal, HazardState};
use super::scan::{ScanOutcome, ScanResolver};
use super::scoring::ScoringEngine;
use super::spawn::Spawner;
use crate::challenge::Challenge;
use crate::consts::*;
use crate::error::ConfigError;
use crate::tuning::{HazardKind, RunRules, Tuning};
use crate::{detector_position, lane_count, lane_x};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    Paused,
    GameOver,
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Casualty limit reached
    Casualties,
    /// An instant-kill hazard detonated
    Catastrophic,
    /// Too many hazards bypassed
    BlueFalcon,
    /// Challenge pattern exhausted and the road is clear
    ChallengeComplete,
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, RunOutcome::ChallengeComplete)
    }

    pub fn message(&self) -> &'static str {
        match self {
            RunOutcome::Casualties => "IED DETONATED - CASUALTY",
            RunOutcome::Catastrophic => "VBIED DETONATED - CATASTROPHIC LOSS",
            RunOutcome::BlueFalcon => "BLUE FALCON - TOO MANY IEDS LEFT BEHIND",
            RunOutcome::ChallengeComplete => "ROUTE CLEAR",
        }
    }
}

/// Per-run counters
///
/// Speed is private so the clamp to `[MIN_SPEED, MAX_SPEED]` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Odometer in meters
    pub distance_traveled: f32,
    speed: f32,
    /// Slowest speed seen this run
    lowest_speed: f32,
    pub casualty_count: u32,
    pub neutralized_count: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub perfect_streak: u32,
    pub best_perfect_streak: u32,
    pub total_perfects: u32,
    pub blue_falcon_count: u32,
    /// Indexed by `HazardKind::index`
    pub neutralized_by_kind: [u32; 4],
    /// Neutralizations made at or above `SPEED_DEMON_SPEED`
    pub speed_demon_count: u32,
    pub catastrophic: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new(CRUISE_SPEED)
    }
}

impl RunState {
    pub fn new(start_speed: f32) -> Self {
        let speed = start_speed.clamp(MIN_SPEED, MAX_SPEED);
        Self {
            distance_traveled: 0.0,
            speed,
            lowest_speed: speed,
            casualty_count: 0,
            neutralized_count: 0,
            current_streak: 0,
            best_streak: 0,
            perfect_streak: 0,
            best_perfect_streak: 0,
            total_perfects: 0,
            blue_falcon_count: 0,
            neutralized_by_kind: [0; 4],
            speed_demon_count: 0,
            catastrophic: false,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn lowest_speed(&self) -> f32 {
        self.lowest_speed
    }

    /// Set speed, clamped to the vehicle's range
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = if speed.is_nan() {
            MIN_SPEED
        } else {
            speed.clamp(MIN_SPEED, MAX_SPEED)
        };
        self.lowest_speed = self.lowest_speed.min(self.speed);
    }

    /// Add travel in pixels to the odometer
    pub fn advance_distance(&mut self, pixels: f32) {
        self.distance_traveled += pixels.max(0.0) * METERS_PER_PIXEL;
    }

    pub fn record_neutralized(&mut self, kind: HazardKind) {
        self.neutralized_count += 1;
        self.current_streak += 1;
        self.best_streak = self.best_streak.max(self.current_streak);
        self.neutralized_by_kind[kind.index()] += 1;
        if self.speed >= SPEED_DEMON_SPEED {
            self.speed_demon_count += 1;
        }
    }

    pub fn record_detonation(&mut self, signal: HazardSignal) {
        match signal {
            HazardSignal::Detonated => self.casualty_count += 1,
            HazardSignal::Catastrophic => {
                self.casualty_count += 1;
                self.catastrophic = true;
            }
            HazardSignal::Neutralized => return,
        }
        self.current_streak = 0;
    }

    pub fn record_bypass(&mut self) {
        self.blue_falcon_count += 1;
        self.current_streak = 0;
    }

    /// Perfect-streak bookkeeping for one scan
    pub fn record_scan_timing(&mut self, best_is_perfect: bool, perfects: u32) {
        if best_is_perfect {
            self.perfect_streak += 1;
            self.best_perfect_streak = self.best_perfect_streak.max(self.perfect_streak);
        } else {
            self.perfect_streak = 0;
        }
        self.total_perfects += perfects;
    }

    pub fn neutralized_of(&self, kind: HazardKind) -> u32 {
        self.neutralized_by_kind[kind.index()]
    }

    /// Run-ending condition under `rules`, if one holds
    pub fn outcome(&self, rules: &RunRules) -> Option<RunOutcome> {
        if self.catastrophic {
            Some(RunOutcome::Catastrophic)
        } else if self.casualty_count >= rules.max_casualties.max(1) {
            Some(RunOutcome::Casualties)
        } else if self.blue_falcon_count >= rules.blue_falcon_limit.max(1) {
            Some(RunOutcome::BlueFalcon)
        } else {
            None
        }
    }
}

/// Lane change direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Steer {
    Left,
    Right,
}

/// The route clearance vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    /// Lane the vehicle is in or moving to
    pub lane: usize,
    /// Current center line x (animates between lanes)
    pub x: f32,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self {
            lane: DEFAULT_LANE,
            x: lane_x(DEFAULT_LANE),
        }
    }
}

impl Vehicle {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, VEHICLE_Y)
    }

    pub fn detector(&self) -> Vec2 {
        detector_position(self.pos())
    }

    pub fn steer(&mut self, steer: Steer) {
        self.lane = match steer {
            Steer::Left => self.lane.saturating_sub(1),
            Steer::Right => (self.lane + 1).min(lane_count() - 1),
        };
    }

    /// Slide toward the target lane; a full lane change takes `LANE_SWITCH_MS`
    pub fn update(&mut self, dt_ms: u64) {
        let target = lane_x(self.lane);
        let lane_gap = (lane_x(1) - lane_x(0)).abs();
        let step = lane_gap * dt_ms as f32 / LANE_SWITCH_MS;
        let delta = target - self.x;
        self.x = if delta.abs() <= step {
            target
        } else {
            self.x + step * delta.signum()
        };
    }
}

/// Notifications produced by a tick, consumed by UI/audio/scoring layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    HazardSpawned { id: HazardId, kind: HazardKind, lane: usize },
    HazardStateChanged { id: HazardId, kind: HazardKind, from: HazardState, to: HazardState },
    HazardNeutralized { id: HazardId, kind: HazardKind },
    HazardDetonated { id: HazardId, kind: HazardKind },
    /// Instant-kill detonation
    HazardCatastrophic { id: HazardId, kind: HazardKind },
    /// Left the field while still active ("blue falcon")
    HazardBypassed { id: HazardId, kind: HazardKind, state: HazardState },
    ScanResolved { neutralized: usize, blocked: usize },
    /// Everything in range was ineligible
    ScanBlocked { blocked: usize },
    /// Nothing in range
    ScanMissed,
    PointsAwarded { id: HazardId, points: u64 },
    RunEnded { outcome: RunOutcome },
}

/// Which kind of run is being played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Endless,
    Challenge { id: String },
}

/// End-of-run figures for debrief, high scores and stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub outcome: Option<RunOutcome>,
    pub score: u64,
    /// Meters, rounded
    pub distance: u32,
    pub neutralized: u32,
    pub casualties: u32,
    pub blue_falcons: u32,
    pub best_streak: u32,
    pub best_perfect_streak: u32,
    pub perfects: u32,
    pub vbieds_neutralized: u32,
    pub speed_demon_count: u32,
    pub lowest_speed: f32,
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Arc<Tuning>,
    pub mode: RunMode,
    pub rules: RunRules,
    pub phase: GamePhase,
    /// Accumulated simulation clock; frozen while paused
    pub clock_ms: u64,
    pub run: RunState,
    /// Speed the vehicle settles back to without input
    pub cruise_speed: f32,
    pub vehicle: Vehicle,
    /// Active hazards in spawn order
    pub hazards: Vec<Hazard>,
    pub detection: DetectionField,
    pub scoring: ScoringEngine,
    pub resolver: ScanResolver,
    pub spawner: Spawner,
    pub last_scan_ms: Option<u64>,
    /// Most recent scan result, for feedback display
    pub last_scan: Option<ScanOutcome>,
    pub outcome: Option<RunOutcome>,
    /// Events produced by the most recent tick
    pub events: Vec<GameEvent>,
    next_id: HazardId,
}

impl GameState {
    /// Endless run with weighted random spawns
    pub fn new(seed: u64, tuning: Arc<Tuning>) -> Self {
        let spawner = Spawner::scheduled(seed, &tuning.spawn);
        let rules = tuning.rules;
        log::info!("New endless run (seed {})", seed);
        Self::with_parts(seed, tuning, RunMode::Endless, rules, spawner, CRUISE_SPEED)
    }

    /// Challenge run with a fixed spawn pattern
    ///
    /// Every pattern entry must name a configured hazard type.
    pub fn challenge(seed: u64, tuning: Arc<Tuning>, challenge: &Challenge) -> Result<Self, ConfigError> {
        for entry in &challenge.pattern {
            tuning.hazards.get(entry.kind)?;
        }
        let spawner = Spawner::pattern(&challenge.pattern);
        let rules = challenge.objectives.rules();
        let cruise = challenge.start_speed.unwrap_or(CRUISE_SPEED);
        log::info!("New challenge run: {} (seed {})", challenge.name, seed);
        Ok(Self::with_parts(
            seed,
            tuning,
            RunMode::Challenge {
                id: challenge.id.clone(),
            },
            rules,
            spawner,
            cruise,
        ))
    }

    fn with_parts(
        seed: u64,
        tuning: Arc<Tuning>,
        mode: RunMode,
        rules: RunRules,
        spawner: Spawner,
        cruise_speed: f32,
    ) -> Self {
        let cruise_speed = cruise_speed.clamp(MIN_SPEED, MAX_SPEED);
        Self {
            seed,
            detection: DetectionField::new(tuning.threat),
            scoring: ScoringEngine::new(tuning.scoring.clone()),
            resolver: ScanResolver::new(tuning.scan.clone()),
            tuning,
            mode,
            rules,
            phase: GamePhase::Playing,
            clock_ms: 0,
            run: RunState::new(cruise_speed),
            cruise_speed,
            vehicle: Vehicle::default(),
            hazards: Vec::new(),
            spawner,
            last_scan_ms: None,
            last_scan: None,
            outcome: None,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate a new hazard ID
    pub fn next_hazard_id(&mut self) -> HazardId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Place a hazard of `kind` at the top of `lane`
    ///
    /// A kind missing from the hazard table is a configuration defect.
    pub fn spawn_hazard(&mut self, kind: HazardKind, lane: usize) -> Result<HazardId, ConfigError> {
        let config = *self.tuning.hazards.get(kind)?;
        let lane = lane.min(lane_count() - 1);
        let id = self.next_hazard_id();
        let pos = Vec2::new(lane_x(lane), SPAWN_Y);
        self.hazards.push(Hazard::new(id, config, lane, pos, self.clock_ms));
        self.events.push(GameEvent::HazardSpawned { id, kind, lane });
        log::debug!("Spawned {} in lane {} at {:.0}m", kind, lane, self.run.distance_traveled);
        Ok(id)
    }

    /// Whether a scan would be accepted now
    pub fn scan_ready(&self) -> bool {
        match self.last_scan_ms {
            Some(last) => self.clock_ms.saturating_sub(last) >= self.resolver.params().cooldown_ms,
            None => true,
        }
    }

    pub fn score(&self) -> u64 {
        self.scoring.score()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            mode: self.mode.clone(),
            outcome: self.outcome,
            score: self.score(),
            distance: self.run.distance_traveled.round() as u32,
            neutralized: self.run.neutralized_count,
            casualties: self.run.casualty_count,
            blue_falcons: self.run.blue_falcon_count,
            best_streak: self.run.best_streak,
            best_perfect_streak: self.run.best_perfect_streak,
            perfects: self.run.total_perfects,
            vbieds_neutralized: self.run.neutralized_of(HazardKind::Vbied),
            speed_demon_count: self.run.speed_demon_count,
            lowest_speed: self.run.lowest_speed(),
        }
    }
}
