//! Hazard spawning
//!
//! Endless runs use `SpawnScheduler`: distance-driven difficulty tiers,
//! weighted type choice, first-sighting introductions and occasional double
//! spawns. Challenge runs replay a fixed pattern with `PatternSpawner`.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::hazard::Hazard;
use crate::challenge::PatternEntry;
use crate::consts::SPAWN_Y;
use crate::lane_count;
use crate::tuning::{HazardKind, SpawnParams, Tuning};

/// Delay before retrying when every lane is too crowded
const BLOCKED_RETRY_MS: u64 = 250;

/// A hazard the game loop should place this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnRequest {
    pub kind: HazardKind,
    pub lane: usize,
}

/// Pick from `(item, weight)` pairs by cumulative band
///
/// `draw` is uniform in `[0, 1)` and is scaled to the total weight.
/// Non-positive weights never win. Returns `None` when no weight is positive.
pub fn weighted_choice<T: Copy>(options: &[(T, f32)], draw: f32) -> Option<T> {
    let total: f32 = options.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let target = draw.clamp(0.0, 1.0) * total;
    let mut cumulative = 0.0;
    let mut last = None;
    for &(item, weight) in options {
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        if target < cumulative {
            return Some(item);
        }
        last = Some(item);
    }
    // draw rounded up to the total
    last
}

/// Difficulty factor in `[0, 1]`, saturating at `difficulty_distance`
pub fn difficulty_factor(distance: f32, params: &SpawnParams) -> f32 {
    if params.difficulty_distance <= 0.0 {
        return 1.0;
    }
    (distance / params.difficulty_distance).clamp(0.0, 1.0)
}

/// Lanes whose most recent hazard has cleared `min_spacing` from the spawn line
fn open_lanes(hazards: &[Hazard], min_spacing: f32) -> Vec<usize> {
    (0..lane_count())
        .filter(|&lane| {
            hazards
                .iter()
                .filter(|h| h.is_active() && h.lane == lane)
                .all(|h| h.pos.y - SPAWN_Y >= min_spacing)
        })
        .collect()
}

/// Weighted random scheduler for endless runs
#[derive(Debug, Clone)]
pub struct SpawnScheduler {
    rng: Pcg32,
    params: SpawnParams,
    /// Time left until the next regular spawn
    timer_ms: u64,
    /// Time left until a queued second spawn, and the lane it must avoid
    pending_double: Option<(u64, usize)>,
    seen: [bool; 4],
}

impl SpawnScheduler {
    pub fn new(seed: u64, params: &SpawnParams) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            params: params.clone(),
            timer_ms: params.initial_delay_ms,
            pending_double: None,
            seen: [false; 4],
        }
    }

    pub fn time_until_next_ms(&self) -> u64 {
        self.timer_ms
    }

    /// Advance timers and return the spawns due this tick
    pub fn update(&mut self, dt_ms: u64, distance: f32, hazards: &[Hazard], tuning: &Tuning) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();

        if let Some((remaining, avoid_lane)) = self.pending_double {
            let remaining = remaining.saturating_sub(dt_ms);
            if remaining == 0 {
                self.pending_double = None;
                let lanes: Vec<usize> = open_lanes(hazards, self.params.min_spacing)
                    .into_iter()
                    .filter(|&l| l != avoid_lane)
                    .collect();
                if let Some(lane) = self.pick_lane(&lanes) {
                    if let Some(kind) = self.choose_kind(distance, tuning) {
                        requests.push(SpawnRequest { kind, lane });
                    }
                }
            } else {
                self.pending_double = Some((remaining, avoid_lane));
            }
        }

        self.timer_ms = self.timer_ms.saturating_sub(dt_ms);
        if self.timer_ms > 0 {
            return requests;
        }

        let lanes: Vec<usize> = open_lanes(hazards, self.params.min_spacing)
            .into_iter()
            .filter(|l| requests.iter().all(|r| r.lane != *l))
            .collect();
        let Some(lane) = self.pick_lane(&lanes) else {
            self.timer_ms = BLOCKED_RETRY_MS;
            return requests;
        };
        let Some(kind) = self.choose_kind(distance, tuning) else {
            self.timer_ms = BLOCKED_RETRY_MS;
            return requests;
        };
        requests.push(SpawnRequest { kind, lane });

        let spawn_rate = tuning.tier_for(distance).map_or(0.0, |t| t.spawn_rate);
        self.timer_ms = self.next_delay(distance, spawn_rate);

        let factor = difficulty_factor(distance, &self.params);
        if factor > self.params.double_spawn_threshold
            && self.pending_double.is_none()
            && self.rng.random_bool(self.params.double_spawn_chance.clamp(0.0, 1.0))
        {
            self.pending_double = Some((self.params.double_spawn_delay_ms.max(1), lane));
        }

        requests
    }

    /// Type for the next spawn
    ///
    /// The first tier type not yet seen is introduced ahead of weighting.
    fn choose_kind(&mut self, distance: f32, tuning: &Tuning) -> Option<HazardKind> {
        let tier = tuning.tier_for(distance)?;

        if let Some(&kind) = tier.types.iter().find(|k| !self.seen[k.index()]) {
            self.seen[kind.index()] = true;
            log::info!("Introducing new hazard type: {}", kind.display_name());
            return Some(kind);
        }

        let options: Vec<(HazardKind, f32)> = tier
            .types
            .iter()
            .map(|&k| (k, tuning.weight_of(k)))
            .collect();
        let draw: f32 = self.rng.random();
        weighted_choice(&options, draw)
    }

    fn pick_lane(&mut self, lanes: &[usize]) -> Option<usize> {
        match lanes.len() {
            0 => None,
            n => Some(lanes[self.rng.random_range(0..n)]),
        }
    }

    /// Delay until the next spawn
    ///
    /// The difficulty factor narrows the window and the tier's spawn rate
    /// shortens the result.
    fn next_delay(&mut self, distance: f32, spawn_rate: f32) -> u64 {
        let factor = difficulty_factor(distance, &self.params);
        let min = self.params.spawn_min_ms as f32 * (1.0 - factor * 0.3);
        let max = (self.params.spawn_max_ms as f32 * (1.0 - factor * 0.4)).max(min);
        let base = if max > min {
            self.rng.random_range(min..max)
        } else {
            min
        };
        let scale = (1.0 - spawn_rate * self.params.spawn_rate_scale).clamp(0.1, 1.0);
        (base * scale).round().max(1.0) as u64
    }
}

/// Fixed-pattern spawner for challenge runs
#[derive(Debug, Clone)]
pub struct PatternSpawner {
    pattern: Vec<PatternEntry>,
    next: usize,
}

impl PatternSpawner {
    pub fn new(pattern: &[PatternEntry]) -> Self {
        let mut pattern = pattern.to_vec();
        pattern.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Self { pattern, next: 0 }
    }

    /// Entries whose trigger distance has been reached
    pub fn update(&mut self, distance: f32) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        while let Some(entry) = self.pattern.get(self.next) {
            if entry.distance > distance {
                break;
            }
            requests.push(SpawnRequest {
                kind: entry.kind,
                lane: entry.lane.min(lane_count() - 1),
            });
            self.next += 1;
        }
        requests
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.pattern.len()
    }

    pub fn remaining(&self) -> usize {
        self.pattern.len() - self.next
    }
}

/// Spawn source for a run
#[derive(Debug, Clone)]
pub enum Spawner {
    Scheduled(SpawnScheduler),
    Pattern(PatternSpawner),
}

impl Spawner {
    pub fn scheduled(seed: u64, params: &SpawnParams) -> Self {
        Spawner::Scheduled(SpawnScheduler::new(seed, params))
    }

    pub fn pattern(pattern: &[PatternEntry]) -> Self {
        Spawner::Pattern(PatternSpawner::new(pattern))
    }

    pub fn update(&mut self, dt_ms: u64, distance: f32, hazards: &[Hazard], tuning: &Tuning) -> Vec<SpawnRequest> {
        match self {
            Spawner::Scheduled(s) => s.update(dt_ms, distance, hazards, tuning),
            Spawner::Pattern(p) => p.update(distance),
        }
    }

    /// Whether no further spawns will ever come (never true for endless runs)
    pub fn is_exhausted(&self) -> bool {
        match self {
            Spawner::Scheduled(_) => false,
            Spawner::Pattern(p) => p.is_exhausted(),
        }
    }
}
