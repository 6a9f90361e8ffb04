//! Match State Definitions
//!
//! Sides, round phases and the lives ledger that persists across rounds.

use std::fmt;
use serde::{Serialize, Deserialize};

// =============================================================================
// SIDE
// =============================================================================

/// One of the two duelists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The human participant.
    Player,
    /// The simulated opponent.
    Opponent,
}

impl Side {
    /// The other duelist.
    #[inline]
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }

    /// Lowercase name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Opponent => "opponent",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ROUND STATE
// =============================================================================

/// Phase of the round state machine.
///
/// Exactly one is active at a time. Transitions are sequential except
/// `RoundEnd -> Idle` (next round) and `GameOver -> Idle` (new match).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Between rounds or matches.
    #[default]
    Idle,
    /// Counting down to the reveal.
    Countdown,
    /// Prompt visible, input not yet accepted.
    ShowingPrompt,
    /// Both duelists racing.
    WaitingInput,
    /// First finish observed, deciding the winner.
    Comparing,
    /// Round resolved, waiting before the next one.
    RoundEnd,
    /// A side ran out of lives.
    GameOver,
}

impl RoundState {
    /// Whether `next` is a legal successor of this phase.
    pub fn can_transition_to(self, next: RoundState) -> bool {
        use RoundState::*;
        matches!(
            (self, next),
            (Idle, Countdown)
                | (Countdown, ShowingPrompt)
                | (ShowingPrompt, WaitingInput)
                | (WaitingInput, Comparing)
                | (Comparing, RoundEnd)
                | (Comparing, GameOver)
                | (RoundEnd, Idle)
                | (GameOver, Idle)
        )
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// MATCH STATE
// =============================================================================

/// Lives ledger for one match.
///
/// Both counts start at `starting_lives`, drop by exactly one per lost round
/// and never go below zero. Once either count is zero the ledger is frozen
/// until [`MatchState::reset`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    /// Lives the human has left.
    pub player_lives: u32,
    /// Lives the opponent has left.
    pub opponent_lives: u32,
    starting_lives: u32,
}

impl MatchState {
    /// Create a fresh ledger.
    pub fn new(starting_lives: u32) -> Self {
        Self {
            player_lives: starting_lives,
            opponent_lives: starting_lives,
            starting_lives,
        }
    }

    /// Restore both sides to the starting value.
    pub fn reset(&mut self) {
        self.player_lives = self.starting_lives;
        self.opponent_lives = self.starting_lives;
    }

    /// Configured starting value.
    pub fn starting_lives(&self) -> u32 {
        self.starting_lives
    }

    /// Lives for one side.
    pub fn lives(&self, side: Side) -> u32 {
        match side {
            Side::Player => self.player_lives,
            Side::Opponent => self.opponent_lives,
        }
    }

    /// Take one life from `loser`.
    ///
    /// Returns the loser's remaining lives, or `None` when the match is
    /// already over and nothing changed.
    pub fn lose_life(&mut self, loser: Side) -> Option<u32> {
        if self.is_over() {
            return None;
        }
        let lives = match loser {
            Side::Player => &mut self.player_lives,
            Side::Opponent => &mut self.opponent_lives,
        };
        *lives -= 1;
        Some(*lives)
    }

    /// Check if either side is out of lives.
    pub fn is_over(&self) -> bool {
        self.player_lives == 0 || self.opponent_lives == 0
    }

    /// Match winner, once the match is over.
    pub fn winner(&self) -> Option<Side> {
        if self.opponent_lives == 0 {
            Some(Side::Player)
        } else if self.player_lives == 0 {
            Some(Side::Opponent)
        } else {
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
