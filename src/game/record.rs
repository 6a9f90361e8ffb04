//! Match Records
//!
//! Per-round results and the summary of a finished match.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tokio::time::Duration;

use crate::game::prompt::Prompt;
use crate::game::race::{Resolution, RoundEpoch, RoundVerdict};
use crate::game::state::Side;

/// Result of one resolved round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number within the match (1-based).
    pub round: u32,
    /// Round epoch.
    pub epoch: RoundEpoch,
    /// The prompt raced on.
    pub prompt: Prompt,
    /// Player's time, if the player finished.
    pub player_time: Option<Duration>,
    /// Opponent's committed time.
    pub opponent_time: Duration,
    /// Round winner.
    pub winner: Side,
    /// How the winner was decided.
    pub resolution: Resolution,
    /// Player lives after the round.
    pub player_lives: u32,
    /// Opponent lives after the round.
    pub opponent_lives: u32,
}

impl RoundRecord {
    /// Build from a verdict and the lives that followed it.
    pub fn new(
        round: u32,
        epoch: RoundEpoch,
        prompt: Prompt,
        verdict: &RoundVerdict,
        lives: (u32, u32),
    ) -> Self {
        Self {
            round,
            epoch,
            prompt,
            player_time: verdict.player_time,
            opponent_time: verdict.opponent_time,
            winner: verdict.winner,
            resolution: verdict.resolution,
            player_lives: lives.0,
            opponent_lives: lives.1,
        }
    }

    /// Whether the match ended on this round.
    pub fn ended_match(&self) -> bool {
        self.player_lives == 0 || self.opponent_lives == 0
    }
}

/// Summary of one match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Match identifier (UUID bytes).
    pub match_id: [u8; 16],
    /// Session RNG seed.
    pub seed: u64,
    /// When the match started.
    pub started_at: DateTime<Utc>,
    /// When the last round resolved.
    pub ended_at: Option<DateTime<Utc>>,
    /// Rounds in order.
    pub rounds: Vec<RoundRecord>,
    /// Match winner, once decided.
    pub winner: Option<Side>,
}

impl MatchRecord {
    /// Open a record for a new match.
    pub fn new(match_id: [u8; 16], seed: u64) -> Self {
        Self {
            match_id,
            seed,
            started_at: Utc::now(),
            ended_at: None,
            rounds: Vec::new(),
            winner: None,
        }
    }

    /// Append a round; closes the record when the round ended the match.
    pub fn push_round(&mut self, round: RoundRecord) {
        if round.ended_match() {
            let winner = if round.opponent_lives == 0 { Side::Player } else { Side::Opponent };
            self.winner = Some(winner);
            self.ended_at = Some(Utc::now());
        }
        self.rounds.push(round);
    }

    /// Rounds won by `side`.
    pub fn rounds_won(&self, side: Side) -> usize {
        self.rounds.iter().filter(|r| r.winner == side).count()
    }

    /// Fastest completed player time.
    pub fn best_player_time(&self) -> Option<Duration> {
        self.rounds.iter().filter_map(|r| r.player_time).min()
    }

    /// Match id as hex, for logs.
    pub fn id_hex(&self) -> String {
        hex::encode(self.match_id)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
