//! Challenge mode: fixed spawn patterns with objectives and medals
//!
//! Challenges unlock in order; each one unlocks once its predecessor has
//! been completed at least once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, StoreError};
use crate::persistence::{self, KeyValueStore, keys};
use crate::sim::{RunOutcome, RunSummary};
use crate::tuning::{HazardKind, RunRules};

/// One scripted spawn, triggered by distance traveled (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub distance: f32,
    pub kind: HazardKind,
    pub lane: usize,
}

/// What a run must achieve to complete the challenge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objectives {
    pub neutralize: u32,
    pub max_blue_falcons: u32,
    pub max_casualties: u32,
    /// Speed the vehicle must never drop below
    #[serde(default)]
    pub min_speed: Option<f32>,
    #[serde(default)]
    pub min_perfects: Option<u32>,
}

impl Objectives {
    /// Run rules that end the run as soon as an allowance is exceeded
    pub fn rules(&self) -> RunRules {
        RunRules {
            max_casualties: self.max_casualties + 1,
            blue_falcon_limit: self.max_blue_falcons + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Medal {
    Bronze,
    Silver,
    Gold,
}

impl Medal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Medal::Bronze => "bronze",
            Medal::Silver => "silver",
            Medal::Gold => "gold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MedalThreshold {
    pub score: u64,
    pub perfects: u32,
}

impl MedalThreshold {
    const fn new(score: u64, perfects: u32) -> Self {
        Self { score, perfects }
    }

    fn met_by(&self, summary: &RunSummary) -> bool {
        summary.score >= self.score && summary.perfects >= self.perfects
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Medals {
    pub bronze: MedalThreshold,
    pub silver: MedalThreshold,
    pub gold: MedalThreshold,
}

/// Why a finished run did not complete its challenge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObjectiveFailure {
    /// The run ended before the pattern was cleared
    RunEnded(RunOutcome),
    TooFewNeutralized { needed: u32, got: u32 },
    TooManyBlueFalcons { allowed: u32, got: u32 },
    TooManyCasualties { allowed: u32, got: u32 },
    TooSlow { min: f32, lowest: f32 },
    TooFewPerfects { needed: u32, got: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeResult {
    pub completed: bool,
    pub medal: Option<Medal>,
    pub failures: Vec<ObjectiveFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Challenge that must be completed first (None = always unlocked)
    pub unlocks_after: Option<String>,
    pub objectives: Objectives,
    pub pattern: Vec<PatternEntry>,
    /// Forced starting (and cruise) speed
    pub start_speed: Option<f32>,
    pub medals: Medals,
}

/// Challenge ids in unlock order
pub const CHALLENGE_ORDER: [&str; 6] = [
    "basic_training",
    "speed_demon",
    "pressure_test",
    "signal_hunter",
    "perfect_run",
    "gauntlet",
];

fn pattern(entries: &[(f32, HazardKind, usize)]) -> Vec<PatternEntry> {
    entries
        .iter()
        .map(|&(distance, kind, lane)| PatternEntry {
            distance,
            kind,
            lane,
        })
        .collect()
}

fn objectives(neutralize: u32, max_blue_falcons: u32) -> Objectives {
    Objectives {
        neutralize,
        max_blue_falcons,
        max_casualties: 0,
        min_speed: None,
        min_perfects: None,
    }
}

fn medals(bronze: (u64, u32), silver: (u64, u32), gold: (u64, u32)) -> Medals {
    Medals {
        bronze: MedalThreshold::new(bronze.0, bronze.1),
        silver: MedalThreshold::new(silver.0, silver.1),
        gold: MedalThreshold::new(gold.0, gold.1),
    }
}

impl Challenge {
    /// The built-in challenges, in unlock order
    pub fn all() -> Vec<Challenge> {
        use HazardKind::*;

        let challenge = |id: &str, name: &str, description: &str, prev: Option<&str>| Challenge {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            unlocks_after: prev.map(str::to_string),
            objectives: objectives(0, 0),
            pattern: Vec::new(),
            start_speed: None,
            medals: medals((0, 0), (0, 0), (0, 0)),
        };

        vec![
            Challenge {
                objectives: objectives(10, 3),
                pattern: pattern(&[
                    (100.0, Cwied, 1),
                    (250.0, Cwied, 0),
                    (400.0, Cwied, 2),
                    (550.0, Cwied, 1),
                    (700.0, Cwied, 0),
                    (850.0, Cwied, 2),
                    (1000.0, Cwied, 1),
                    (1150.0, Cwied, 1),
                    (1300.0, Cwied, 0),
                    (1450.0, Cwied, 2),
                ]),
                medals: medals((1000, 0), (1500, 3), (2500, 7)),
                ..challenge("basic_training", "Basic Training", "Clear 10 CWIEDs to complete training", None)
            },
            Challenge {
                objectives: Objectives {
                    min_speed: Some(200.0),
                    ..objectives(8, 1)
                },
                pattern: pattern(&[
                    (150.0, Cwied, 1),
                    (350.0, Cwied, 0),
                    (550.0, Cwied, 2),
                    (750.0, Cwied, 1),
                    (950.0, Cwied, 0),
                    (1150.0, Cwied, 2),
                    (1350.0, Cwied, 1),
                    (1550.0, Cwied, 0),
                ]),
                start_speed: Some(200.0),
                medals: medals((1200, 0), (2000, 4), (3000, 6)),
                ..challenge(
                    "speed_demon",
                    "Speed Demon",
                    "Maintain 200+ speed while clearing 8 IEDs",
                    Some("basic_training"),
                )
            },
            Challenge {
                objectives: objectives(8, 2),
                pattern: pattern(&[
                    (200.0, Cwied, 1),
                    (400.0, Ppied, 0),
                    (600.0, Cwied, 2),
                    (800.0, Ppied, 1),
                    (1000.0, Ppied, 0),
                    (1200.0, Cwied, 2),
                    (1400.0, Ppied, 1),
                    (1600.0, Ppied, 2),
                ]),
                medals: medals((1000, 0), (1800, 3), (2800, 5)),
                ..challenge("pressure_test", "Pressure Test", "Master PPIEDs - slow down or die", Some("speed_demon"))
            },
            Challenge {
                objectives: objectives(8, 2),
                pattern: pattern(&[
                    (200.0, Cwied, 1),
                    (450.0, Rcied, 0),
                    (700.0, Rcied, 2),
                    (950.0, Cwied, 1),
                    (1200.0, Rcied, 0),
                    (1450.0, Rcied, 2),
                    (1700.0, Rcied, 1),
                    (1950.0, Cwied, 0),
                ]),
                medals: medals((1000, 0), (1800, 4), (3000, 6)),
                ..challenge("signal_hunter", "Signal Hunter", "Time your scans with RCIED signals", Some("pressure_test"))
            },
            Challenge {
                objectives: Objectives {
                    min_perfects: Some(6),
                    ..objectives(6, 0)
                },
                pattern: pattern(&[
                    (300.0, Cwied, 1),
                    (600.0, Cwied, 0),
                    (900.0, Cwied, 2),
                    (1200.0, Cwied, 1),
                    (1500.0, Cwied, 0),
                    (1800.0, Cwied, 2),
                ]),
                medals: medals((1000, 4), (1500, 5), (2000, 6)),
                ..challenge("perfect_run", "Perfect Run", "Get PERFECT timing on all 6 IEDs", Some("signal_hunter"))
            },
            Challenge {
                objectives: objectives(12, 1),
                pattern: pattern(&[
                    (150.0, Cwied, 1),
                    (300.0, Ppied, 0),
                    (450.0, Cwied, 2),
                    (600.0, Rcied, 1),
                    (750.0, Cwied, 0),
                    (900.0, Ppied, 2),
                    (1050.0, Rcied, 1),
                    (1200.0, Cwied, 0),
                    (1350.0, Vbied, 1),
                    (1600.0, Ppied, 2),
                    (1800.0, Rcied, 0),
                    (2000.0, Vbied, 1),
                ]),
                medals: medals((2000, 0), (3500, 6), (5000, 10)),
                ..challenge("gauntlet", "The Gauntlet", "Face all IED types in rapid succession", Some("perfect_run"))
            },
        ]
    }

    pub fn find(id: &str) -> Option<Challenge> {
        Self::all().into_iter().find(|c| c.id == id)
    }

    pub fn by_id(id: &str) -> Result<Challenge, ConfigError> {
        Self::find(id).ok_or_else(|| ConfigError::UnknownChallenge(id.to_string()))
    }

    /// Judge a finished run against the objectives and medal thresholds
    pub fn evaluate(&self, summary: &RunSummary) -> ChallengeResult {
        let o = &self.objectives;
        let mut failures = Vec::new();

        match summary.outcome {
            Some(RunOutcome::ChallengeComplete) => {}
            Some(other) => failures.push(ObjectiveFailure::RunEnded(other)),
            None => {}
        }
        if summary.neutralized < o.neutralize {
            failures.push(ObjectiveFailure::TooFewNeutralized {
                needed: o.neutralize,
                got: summary.neutralized,
            });
        }
        if summary.blue_falcons > o.max_blue_falcons {
            failures.push(ObjectiveFailure::TooManyBlueFalcons {
                allowed: o.max_blue_falcons,
                got: summary.blue_falcons,
            });
        }
        if summary.casualties > o.max_casualties {
            failures.push(ObjectiveFailure::TooManyCasualties {
                allowed: o.max_casualties,
                got: summary.casualties,
            });
        }
        if let Some(min) = o.min_speed {
            if summary.lowest_speed < min {
                failures.push(ObjectiveFailure::TooSlow {
                    min,
                    lowest: summary.lowest_speed,
                });
            }
        }
        if let Some(needed) = o.min_perfects {
            if summary.perfects < needed {
                failures.push(ObjectiveFailure::TooFewPerfects {
                    needed,
                    got: summary.perfects,
                });
            }
        }

        let completed = summary.outcome == Some(RunOutcome::ChallengeComplete) && failures.is_empty();
        let medal = if !completed {
            None
        } else if self.medals.gold.met_by(summary) {
            Some(Medal::Gold)
        } else if self.medals.silver.met_by(summary) {
            Some(Medal::Silver)
        } else if self.medals.bronze.met_by(summary) {
            Some(Medal::Bronze)
        } else {
            None
        };

        ChallengeResult {
            completed,
            medal,
            failures,
        }
    }
}

/// Persisted per-player challenge record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeProgress {
    pub completed: Vec<String>,
    /// Best medal per challenge id
    pub medals: BTreeMap<String, Medal>,
    pub best_scores: BTreeMap<String, u64>,
}

impl ChallengeProgress {
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed.iter().any(|c| c == id)
    }

    pub fn is_unlocked(&self, challenge: &Challenge) -> bool {
        match &challenge.unlocks_after {
            None => true,
            Some(prev) => self.is_completed(prev),
        }
    }

    /// Fold a run result in; returns true when the challenge is newly completed
    pub fn record(&mut self, challenge: &Challenge, result: &ChallengeResult, score: u64) -> bool {
        let best = self.best_scores.entry(challenge.id.clone()).or_insert(0);
        *best = (*best).max(score);

        if !result.completed {
            return false;
        }
        if let Some(medal) = result.medal {
            let current = self.medals.get(&challenge.id).copied();
            if current.is_none_or(|m| medal > m) {
                self.medals.insert(challenge.id.clone(), medal);
            }
        }
        if self.is_completed(&challenge.id) {
            return false;
        }
        self.completed.push(challenge.id.clone());
        log::info!("Challenge completed: {}", challenge.name);
        true
    }

    pub fn completed_count(&self) -> u32 {
        self.completed.len() as u32
    }

    pub fn gold_count(&self) -> u32 {
        self.medals.values().filter(|m| **m == Medal::Gold).count() as u32
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        persistence::load_or_default(store, keys::CHALLENGES)
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        persistence::save(store, keys::CHALLENGES, self)
    }
}
