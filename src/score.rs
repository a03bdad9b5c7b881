//! Player score and the high-score table.
//!
//! [`HighScoreTable`] applies the same acceptance rules as the high-score
//! service, so a client can tell whether a score would place before sending
//! it anywhere.  Transport is somebody else's problem.

use crate::impact::AsteroidBrokenDown;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_NAME_CHARS: usize = 20;
pub const MAX_SCORE: f32 = 100_000.0;
pub const TABLE_SIZE: usize = 10;

/// Running totals for the current game.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq)]
pub struct PlayerScore {
    pub material: f32,
    pub destroyed: u32,
}

/// Credit every breakdown to the player.
pub fn score_breakdown_system(
    mut broken_down: MessageReader<AsteroidBrokenDown>,
    mut score: ResMut<PlayerScore>,
) {
    for event in broken_down.read() {
        score.material += event.material_value;
        score.destroyed += 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// Name is empty or longer than [`MAX_NAME_CHARS`].
    InvalidName { chars: usize },
    /// Score is not in `(0, MAX_SCORE]`.
    InvalidScore { score: f32 },
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::InvalidName { chars } => write!(
                f,
                "name has {} characters (need 1 to {})",
                chars, MAX_NAME_CHARS
            ),
            ScoreError::InvalidScore { score } => {
                write!(f, "score {} is outside (0, {}]", score, MAX_SCORE)
            }
        }
    }
}

impl std::error::Error for ScoreError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub score: f32,
}

/// Best scores, highest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighScoreTable {
    #[serde(default)]
    pub entries: Vec<HighScoreEntry>,
}

impl HighScoreTable {
    /// Round to one decimal place, as stored.
    pub fn round_score(score: f32) -> f32 {
        (score * 10.0).round() / 10.0
    }

    fn validate(name: &str, score: f32) -> Result<f32, ScoreError> {
        let chars = name.chars().count();
        if chars == 0 || chars > MAX_NAME_CHARS {
            return Err(ScoreError::InvalidName { chars });
        }
        // Range is checked after rounding, as the service does.
        let rounded = Self::round_score(score);
        if !(rounded > 0.0 && rounded <= MAX_SCORE) {
            return Err(ScoreError::InvalidScore { score });
        }
        Ok(rounded)
    }

    /// Where a score would land, or `None` if it would not make the table.
    /// Ties go in front of the existing entries.
    pub fn rank_of(&self, score: f32) -> Option<usize> {
        let score = Self::round_score(score);
        let rank = self.entries.partition_point(|e| e.score > score);
        (rank < TABLE_SIZE).then_some(rank)
    }

    /// Insert a validated entry and return its rank, if it made the table.
    pub fn submit(&mut self, name: &str, score: f32) -> Result<Option<usize>, ScoreError> {
        let score = Self::validate(name, score)?;
        let Some(rank) = self.rank_of(score) else {
            return Ok(None);
        };
        self.entries.insert(
            rank,
            HighScoreEntry {
                name: name.to_string(),
                score,
            },
        );
        self.entries.truncate(TABLE_SIZE);
        Ok(Some(rank))
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
