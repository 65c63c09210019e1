//! Lifetime stats and achievements

use serde::{Deserialize, Serialize};

use crate::challenge::ChallengeProgress;
use crate::error::StoreError;
use crate::persistence::{self, KeyValueStore, keys};
use crate::sim::RunSummary;

/// Lifetime totals and bests across all runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub total_neutralized: u32,
    pub total_perfects: u32,
    /// Meters
    pub total_distance: u64,
    pub total_runs: u32,
    pub best_score: u64,
    pub best_streak: u32,
    pub best_perfect_streak: u32,
    pub vbieds_neutralized: u32,
    /// Furthest run (meters) with no blue falcons
    pub clean_run_distance: u32,
    pub speed_demon_count: u32,
    pub challenges_completed: u32,
    pub gold_medals: u32,
}

impl Stats {
    /// Merge one finished run
    pub fn record_run(&mut self, run: &RunSummary) {
        self.total_runs += 1;
        self.total_neutralized += run.neutralized;
        self.total_perfects += run.perfects;
        self.total_distance += u64::from(run.distance);
        self.vbieds_neutralized += run.vbieds_neutralized;
        self.speed_demon_count += run.speed_demon_count;
        self.best_score = self.best_score.max(run.score);
        self.best_streak = self.best_streak.max(run.best_streak);
        self.best_perfect_streak = self.best_perfect_streak.max(run.best_perfect_streak);
        if run.blue_falcons == 0 {
            self.clean_run_distance = self.clean_run_distance.max(run.distance);
        }
    }

    /// Refresh challenge-derived counters
    pub fn sync_challenges(&mut self, progress: &ChallengeProgress) {
        self.challenges_completed = progress.completed_count();
        self.gold_medals = progress.gold_count();
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        persistence::load_or_default(store, keys::STATS)
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        persistence::save(store, keys::STATS, self)
    }
}

pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Not listed until unlocked
    pub hidden: bool,
    condition: fn(&Stats) -> bool,
}

impl std::fmt::Debug for Achievement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Achievement")
            .field("id", &self.id)
            .field("hidden", &self.hidden)
            .finish()
    }
}

impl Achievement {
    const fn new(id: &'static str, name: &'static str, description: &'static str, condition: fn(&Stats) -> bool) -> Self {
        Self {
            id,
            name,
            description,
            hidden: false,
            condition,
        }
    }

    const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_met(&self, stats: &Stats) -> bool {
        (self.condition)(stats)
    }
}

pub static ACHIEVEMENTS: [Achievement; 20] = [
    Achievement::new("first_clear", "Route Clearer", "Neutralize your first IED", |s| s.total_neutralized >= 1),
    Achievement::new("first_perfect", "Precision Timing", "Get your first PERFECT scan", |s| s.total_perfects >= 1),
    Achievement::new("first_vbied", "Car Bomb Hunter", "Neutralize a VBIED", |s| s.vbieds_neutralized >= 1),
    Achievement::new("neutralize_50", "Veteran", "Neutralize 50 total IEDs", |s| s.total_neutralized >= 50),
    Achievement::new("neutralize_100", "Expert", "Neutralize 100 total IEDs", |s| s.total_neutralized >= 100),
    Achievement::new("neutralize_500", "Master", "Neutralize 500 total IEDs", |s| s.total_neutralized >= 500),
    Achievement::new("distance_1000", "Road Warrior", "Travel 1,000m total", |s| s.total_distance >= 1000),
    Achievement::new("distance_10000", "Marathon Runner", "Travel 10,000m total", |s| s.total_distance >= 10_000),
    Achievement::new("streak_5", "Consistent", "Get a 5x neutralization streak", |s| s.best_streak >= 5),
    Achievement::new("streak_10", "On Fire", "Get a 10x neutralization streak", |s| s.best_streak >= 10),
    Achievement::new("perfect_streak_3", "Triple Perfect", "Get 3 PERFECTs in a row", |s| s.best_perfect_streak >= 3),
    Achievement::new("perfect_streak_5", "Perfect Form", "Get 5 PERFECTs in a row", |s| s.best_perfect_streak >= 5),
    Achievement::new("score_10000", "High Scorer", "Score 10,000 points in one run", |s| s.best_score >= 10_000),
    Achievement::new("score_50000", "Score Master", "Score 50,000 points in one run", |s| s.best_score >= 50_000),
    Achievement::new(
        "no_blue_falcon",
        "No Man Left Behind",
        "Complete a run (500m+) with 0 Blue Falcons",
        |s| s.clean_run_distance >= 500,
    )
    .hidden(),
    Achievement::new(
        "speed_demon",
        "Speed Demon",
        "Neutralize 5 IEDs while maintaining 200+ speed",
        |s| s.speed_demon_count >= 5,
    ),
    Achievement::new("challenge_first", "Challenger", "Complete your first challenge", |s| s.challenges_completed >= 1),
    Achievement::new("challenge_all", "Champion", "Complete all challenges", |s| s.challenges_completed >= 6),
    Achievement::new("challenge_gold", "Golden", "Earn a Gold medal on any challenge", |s| s.gold_medals >= 1),
    Achievement::new("all_gold", "Perfectionist", "Earn Gold on all challenges", |s| s.gold_medals >= 6),
];

pub fn find(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Ids of unlocked achievements, in unlock order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unlocked(Vec<String>);

impl Unlocked {
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|u| u == id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unlock every achievement `stats` now satisfies; returns only the new ones
    pub fn check(&mut self, stats: &Stats) -> Vec<&'static Achievement> {
        let mut newly = Vec::new();
        for achievement in ACHIEVEMENTS.iter() {
            if !self.contains(achievement.id) && achievement.is_met(stats) {
                self.0.push(achievement.id.to_string());
                log::info!("Achievement unlocked: {}", achievement.name);
                newly.push(achievement);
            }
        }
        newly
    }

    /// Achievements a player can see: all visible ones plus unlocked hidden ones
    pub fn visible(&self) -> impl Iterator<Item = &'static Achievement> + '_ {
        ACHIEVEMENTS
            .iter()
            .filter(move |a| !a.hidden || self.contains(a.id))
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        persistence::load_or_default(store, keys::ACHIEVEMENTS)
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        persistence::save(store, keys::ACHIEVEMENTS, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::sim::{RunMode, RunOutcome};

    fn run(score: u64, distance: u32, neutralized: u32, blue_falcons: u32) -> RunSummary {
        RunSummary {
            mode: RunMode::Endless,
            outcome: Some(RunOutcome::Casualties),
            score,
            distance,
            neutralized,
            casualties: 1,
            blue_falcons,
            best_streak: neutralized,
            best_perfect_streak: 1,
            perfects: 2,
            vbieds_neutralized: 0,
            speed_demon_count: 1,
            lowest_speed: 150.0,
        }
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<&str> = ACHIEVEMENTS.iter().map(|a| a.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ACHIEVEMENTS.len());
    }

    #[test]
    fn test_record_run() {
        let mut stats = Stats::default();
        stats.record_run(&run(4000, 800, 6, 0));
        stats.record_run(&run(9000, 300, 2, 1));
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.total_neutralized, 8);
        assert_eq!(stats.total_distance, 1100);
        assert_eq!(stats.best_score, 9000);
        assert_eq!(stats.best_streak, 6);
        assert_eq!(stats.total_perfects, 4);
        assert_eq!(stats.speed_demon_count, 2);
        // Second run had a blue falcon
        assert_eq!(stats.clean_run_distance, 800);
    }

    #[test]
    fn test_check_unlocks_once() {
        let mut stats = Stats::default();
        stats.record_run(&run(4000, 1200, 6, 0));
        let mut unlocked = Unlocked::default();

        let first: Vec<&str> = unlocked.check(&stats).iter().map(|a| a.id).collect();
        assert_eq!(
            first,
            vec!["first_clear", "first_perfect", "distance_1000", "streak_5", "no_blue_falcon"]
        );
        assert!(unlocked.check(&stats).is_empty());
        assert_eq!(unlocked.len(), 5);
    }

    #[test]
    fn test_hidden_until_unlocked() {
        let mut unlocked = Unlocked::default();
        assert!(unlocked.visible().all(|a| a.id != "no_blue_falcon"));
        let stats = Stats {
            clean_run_distance: 600,
            ..Default::default()
        };
        unlocked.check(&stats);
        assert!(unlocked.visible().any(|a| a.id == "no_blue_falcon"));
        assert_eq!(unlocked.visible().count(), ACHIEVEMENTS.len());
    }

    #[test]
    fn test_challenge_counters() {
        let mut progress = ChallengeProgress::default();
        progress.completed = vec!["basic_training".into(), "speed_demon".into()];
        progress.medals.insert("basic_training".into(), crate::challenge::Medal::Gold);
        let mut stats = Stats::default();
        stats.sync_challenges(&progress);
        assert_eq!(stats.challenges_completed, 2);
        assert_eq!(stats.gold_medals, 1);

        let mut unlocked = Unlocked::default();
        let ids: Vec<&str> = unlocked.check(&stats).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["challenge_first", "challenge_gold"]);
        assert!(find("all_gold").is_some_and(|a| !a.is_met(&stats)));
    }

    #[test]
    fn test_persistence() {
        let mut store = MemoryStore::new();
        let mut stats = Stats::default();
        stats.record_run(&run(100, 50, 1, 0));
        stats.save(&mut store).unwrap();
        assert_eq!(Stats::load(&store), stats);

        let mut unlocked = Unlocked::default();
        unlocked.check(&stats);
        unlocked.save(&mut store).unwrap();
        let loaded = Unlocked::load(&store);
        assert!(loaded.contains("first_clear"));
        assert_eq!(loaded, unlocked);
    }
}
