//! Duel Events
//!
//! Ordered log of what happened during a match, for transcripts and tests.

use serde::{Serialize, Deserialize};
use tokio::time::Duration;

use crate::game::prompt::Prompt;
use crate::game::race::{Resolution, RoundEpoch};
use crate::game::state::Side;

/// Event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuelEvent {
    /// A new match began with full lives.
    MatchStarted {
        /// Match identifier (UUID bytes).
        match_id: [u8; 16],
        /// Lives per side.
        starting_lives: u32,
    },

    /// Countdown for a round began.
    RoundStarted {
        /// Round number within the match (1-based).
        round: u32,
        /// Round epoch.
        epoch: RoundEpoch,
    },

    /// Prompt revealed.
    PromptRevealed {
        /// Round epoch.
        epoch: RoundEpoch,
        /// The prompt.
        prompt: Prompt,
    },

    /// Opponent drew its time.
    OpponentCommitted {
        /// Round epoch.
        epoch: RoundEpoch,
        /// Committed total time.
        committed: Duration,
    },

    /// Player completed the prompt.
    PlayerFinished {
        /// Round epoch.
        epoch: RoundEpoch,
        /// Player's time.
        elapsed: Duration,
    },

    /// Round decided and a life taken.
    RoundResolved {
        /// Round epoch.
        epoch: RoundEpoch,
        /// Round winner.
        winner: Side,
        /// How it was decided.
        resolution: Resolution,
        /// Loser's remaining lives.
        loser_lives: u32,
    },

    /// A side ran out of lives.
    MatchEnded {
        /// Match winner.
        winner: Side,
        /// Rounds played.
        rounds: u32,
    },
}
