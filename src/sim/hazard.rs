//! Hazard entity and its lifecycle state machine
//!
//! Timed escalations are deadlines evaluated on each `advance` call against
//! the caller's accumulated clock. Nothing fires on its own, so a caller that
//! stops advancing pauses the hazard, and a neutralized hazard can never
//! detonate later.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::PRESSURE_PLATE_MARGIN;
use crate::tuning::{HazardKind, HazardTypeConfig};

/// Hazard identifier, unique within a run
pub type HazardId = u32;

/// Lifecycle states; Neutralized and Detonated are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardState {
    Hidden,
    Warning,
    Critical,
    Neutralized,
    Detonated,
}

impl HazardState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HazardState::Neutralized | HazardState::Detonated)
    }

    /// Position in the forward-only progression
    pub fn rank(&self) -> u8 {
        match self {
            HazardState::Hidden => 0,
            HazardState::Warning => 1,
            HazardState::Critical => 2,
            HazardState::Neutralized | HazardState::Detonated => 3,
        }
    }
}

/// One-shot notifications produced by terminal transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardSignal {
    Neutralized,
    Detonated,
    /// Instant-kill detonation; ends the run regardless of casualties
    Catastrophic,
}

/// Why an in-range hazard could not be scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// Signal-gated hazard with no signal showing ("WAIT FOR SIGNAL")
    NoSignal,
    /// Vehicle above the type's scan speed ceiling ("TOO FAST")
    TooFast,
}

/// A spawned threat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hazard {
    pub id: HazardId,
    pub lane: usize,
    pub pos: Vec2,
    config: HazardTypeConfig,
    state: HazardState,
    state_entered_at_ms: u64,
    spawned_at_ms: u64,
    signal_visible: bool,
}

impl Hazard {
    pub fn new(id: HazardId, config: HazardTypeConfig, lane: usize, pos: Vec2, now_ms: u64) -> Self {
        let mut hazard = Self {
            id,
            lane,
            pos,
            config,
            state: HazardState::Hidden,
            state_entered_at_ms: now_ms,
            spawned_at_ms: now_ms,
            signal_visible: false,
        };
        hazard.update_signal(now_ms);
        hazard
    }

    pub fn kind(&self) -> HazardKind {
        self.config.kind
    }

    pub fn config(&self) -> &HazardTypeConfig {
        &self.config
    }

    pub fn state(&self) -> HazardState {
        self.state
    }

    pub fn state_entered_at_ms(&self) -> u64 {
        self.state_entered_at_ms
    }

    pub fn signal_visible(&self) -> bool {
        self.signal_visible
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Non-terminal hazards still threaten the vehicle
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Evaluate proximity and deadline transitions at `now_ms`
    ///
    /// A large step may cross several deadlines; each deadline-driven state is
    /// stamped with the instant its deadline fell due so later deadlines are
    /// measured from the right origin.
    pub fn advance(&mut self, now_ms: u64, distance: f32, speed: f32) -> Option<HazardSignal> {
        if self.is_terminal() {
            return None;
        }

        self.update_signal(now_ms);

        if self.state == HazardState::Hidden && distance < self.config.detection_range {
            self.enter(HazardState::Warning, now_ms);
        }

        if self.state == HazardState::Warning {
            let deadline = self.state_entered_at_ms.saturating_add(self.config.warning_duration_ms);
            if distance < self.config.critical_range || self.pressure_plate_tripped(distance, speed) {
                self.enter(HazardState::Critical, now_ms);
            } else if now_ms >= deadline {
                self.enter(HazardState::Critical, deadline);
            }
        }

        if self.state == HazardState::Critical {
            let deadline = self.state_entered_at_ms.saturating_add(self.config.critical_duration_ms);
            if now_ms >= deadline {
                return self.detonate();
            }
        }

        None
    }

    /// Disarm the hazard; signals exactly once
    pub fn neutralize(&mut self) -> Option<HazardSignal> {
        if self.is_terminal() {
            return None;
        }
        log::debug!("Hazard {} ({}) neutralized from {:?}", self.id, self.kind(), self.state);
        self.state = HazardState::Neutralized;
        Some(HazardSignal::Neutralized)
    }

    /// Set the hazard off; signals exactly once
    pub fn detonate(&mut self) -> Option<HazardSignal> {
        if self.is_terminal() {
            return None;
        }
        log::debug!("Hazard {} ({}) detonated", self.id, self.kind());
        self.state = HazardState::Detonated;
        if self.config.instant_kill {
            Some(HazardSignal::Catastrophic)
        } else {
            Some(HazardSignal::Detonated)
        }
    }

    /// Eligibility beyond range: signal window and speed ceiling
    pub fn can_be_scanned(&self, speed: f32) -> bool {
        !self.is_terminal() && self.block_reason(speed).is_none()
    }

    /// First eligibility predicate that fails, if any
    pub fn block_reason(&self, speed: f32) -> Option<BlockReason> {
        if self.config.requires_signal && !self.signal_visible {
            return Some(BlockReason::NoSignal);
        }
        match self.config.max_speed_to_scan {
            Some(limit) if speed > limit => Some(BlockReason::TooFast),
            _ => None,
        }
    }

    fn pressure_plate_tripped(&self, distance: f32, speed: f32) -> bool {
        match self.config.max_speed_to_scan {
            Some(limit) => {
                speed > limit && distance < self.config.critical_range + PRESSURE_PLATE_MARGIN
            }
            None => false,
        }
    }

    fn enter(&mut self, state: HazardState, at_ms: u64) {
        log::debug!("Hazard {} ({}) {:?} -> {:?}", self.id, self.kind(), self.state, state);
        self.state = state;
        self.state_entered_at_ms = at_ms;
    }

    /// Duty cycle: a burst of `duration` at the end of every `interval`
    fn update_signal(&mut self, now_ms: u64) {
        if !self.config.requires_signal {
            return;
        }
        self.signal_visible = match (self.config.signal_interval_ms, self.config.signal_duration_ms) {
            (Some(interval), Some(duration)) if interval > 0 => {
                let phase = now_ms.saturating_sub(self.spawned_at_ms) % interval;
                phase >= interval.saturating_sub(duration)
            }
            _ => false,
        };
    }
}
