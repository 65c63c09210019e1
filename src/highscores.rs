//! High score leaderboard
//!
//! Persisted through a `KeyValueStore`, tracks the top 5 runs.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::persistence::{self, KeyValueStore, keys};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 5;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Meters traveled
    pub distance: u32,
    pub neutralized: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: u64,
}

/// High score leaderboard, sorted descending by score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Add an entry if it qualifies
    ///
    /// Returns the rank achieved (1-indexed). Ties rank below existing
    /// entries with the same score.
    pub fn add(&mut self, entry: HighScoreEntry) -> Option<usize> {
        if !self.qualifies(entry.score) {
            return None;
        }
        let index = self
            .entries
            .iter()
            .position(|e| entry.score > e.score)
            .unwrap_or(self.entries.len());
        self.entries.insert(index, entry);
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(index + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let mut scores: Self = persistence::load_or_default(store, keys::HIGH_SCORES);
        // Hand-edited or older records may be unsorted or oversized
        scores.entries.sort_by(|a, b| b.score.cmp(&a.score));
        scores.entries.truncate(MAX_HIGH_SCORES);
        log::info!("Loaded {} high scores", scores.entries.len());
        scores
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), StoreError> {
        persistence::save(store, keys::HIGH_SCORES, self)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }

    pub fn clear<S: KeyValueStore + ?Sized>(store: &mut S) -> Result<(), StoreError> {
        store.remove(keys::HIGH_SCORES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn entry(score: u64, timestamp: u64) -> HighScoreEntry {
        HighScoreEntry {
            score,
            distance: 100,
            neutralized: 3,
            timestamp,
        }
    }

    #[test]
    fn test_ranks_and_trim() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add(entry(500, 1)), Some(1));
        assert_eq!(scores.add(entry(900, 2)), Some(1));
        assert_eq!(scores.add(entry(700, 3)), Some(2));
        assert_eq!(scores.add(entry(700, 4)), Some(3));
        assert_eq!(scores.add(entry(100, 5)), Some(5));
        assert_eq!(scores.entries.len(), 5);

        // Full board: must beat the lowest
        assert_eq!(scores.add(entry(100, 6)), None);
        assert_eq!(scores.add(entry(200, 7)), Some(5));
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.top_score(), Some(900));
        assert_eq!(scores.entries.last().map(|e| e.timestamp), Some(7));
    }

    #[test]
    fn test_zero_never_qualifies() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add(entry(0, 1)), None);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(HighScores::load(&store).is_empty());

        let mut scores = HighScores::new();
        scores.add(entry(300, 1));
        scores.add(entry(600, 2));
        scores.save(&mut store).unwrap();

        let loaded = HighScores::load(&store);
        assert_eq!(loaded.entries, scores.entries);

        HighScores::clear(&mut store).unwrap();
        assert!(HighScores::load(&store).is_empty());
    }

    #[test]
    fn test_load_normalizes_order() {
        let mut store = MemoryStore::new();
        let json = r#"{"entries":[
            {"score":1,"distance":0,"neutralized":0,"timestamp":0},
            {"score":9,"distance":0,"neutralized":0,"timestamp":0}
        ]}"#;
        store.set(keys::HIGH_SCORES, json).unwrap();
        assert_eq!(HighScores::load(&store).top_score(), Some(9));
    }
}
