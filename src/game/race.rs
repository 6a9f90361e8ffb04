//! Race Resolution
//!
//! Reconciles the human's finish and the opponent's committed finish into a
//! single winner. Pure and synchronous; the orchestrator feeds it signals in
//! the order it observes them.

use std::fmt;
use serde::{Serialize, Deserialize};
use tokio::time::Duration;
use tracing::trace;

use crate::game::state::Side;

/// Per-round identifier used to reject signals from earlier rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundEpoch(pub u64);

impl RoundEpoch {
    /// The epoch after this one.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RoundEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Completion report from the opponent's replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpponentFinish {
    /// Round the replay belonged to.
    pub epoch: RoundEpoch,
    /// Committed total time.
    pub elapsed: Duration,
}

/// Rule for equal times.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// `player_time <= opponent_time` wins for the player.
    #[default]
    FavorPlayer,
    /// `player_time < opponent_time` is required for the player.
    FavorOpponent,
}

/// How the winner was decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Only the player had finished.
    PlayerFirst,
    /// Only the opponent had finished.
    OpponentFirst,
    /// Both finished in the same scheduling tick; times compared.
    SameTick,
}

/// Outcome of one round's race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundVerdict {
    /// Round winner.
    pub winner: Side,
    /// How it was decided.
    pub resolution: Resolution,
    /// Player's time, if the player finished.
    pub player_time: Option<Duration>,
    /// Opponent's committed time.
    pub opponent_time: Duration,
}

impl RoundVerdict {
    /// Round loser.
    pub fn loser(&self) -> Side {
        self.winner.other()
    }

    /// The winner's time.
    pub fn winning_time(&self) -> Duration {
        match self.winner {
            Side::Player => self.player_time.unwrap_or(self.opponent_time),
            Side::Opponent => self.opponent_time,
        }
    }
}

/// Fresh per-round race record.
///
/// Each side's finish is accepted at most once; opponent signals from
/// another epoch are dropped.
#[derive(Clone, Debug)]
pub struct RoundRace {
    epoch: RoundEpoch,
    player_time: Option<Duration>,
    opponent_time: Duration,
    opponent_finished: bool,
}

impl RoundRace {
    /// Open a race with the opponent's committed time known up front.
    pub fn new(epoch: RoundEpoch, opponent_committed: Duration) -> Self {
        Self {
            epoch,
            player_time: None,
            opponent_time: opponent_committed,
            opponent_finished: false,
        }
    }

    /// Round this race belongs to.
    pub fn epoch(&self) -> RoundEpoch {
        self.epoch
    }

    /// Whether the player's finish has been recorded.
    pub fn player_finished(&self) -> bool {
        self.player_time.is_some()
    }

    /// Whether the opponent's finish has been recorded.
    pub fn opponent_finished(&self) -> bool {
        self.opponent_finished
    }

    /// Whether either side has finished.
    pub fn any_finished(&self) -> bool {
        self.player_finished() || self.opponent_finished
    }

    /// Record the player's finish. Returns false if already recorded.
    pub fn record_player(&mut self, elapsed: Duration) -> bool {
        if self.player_time.is_some() {
            trace!(epoch = %self.epoch, "duplicate player finish ignored");
            return false;
        }
        self.player_time = Some(elapsed);
        true
    }

    /// Record the opponent's finish. Returns false for stale epochs and
    /// duplicates.
    pub fn record_opponent(&mut self, signal: OpponentFinish) -> bool {
        if signal.epoch != self.epoch {
            trace!(expected = %self.epoch, got = %signal.epoch, "stale opponent finish ignored");
            return false;
        }
        if self.opponent_finished {
            trace!(epoch = %self.epoch, "duplicate opponent finish ignored");
            return false;
        }
        self.opponent_finished = true;
        true
    }

    /// Decide the round, or `None` while nobody has finished.
    pub fn resolve(&self, tie_break: TieBreak) -> Option<RoundVerdict> {
        let (winner, resolution) = match (self.player_time, self.opponent_finished) {
            (None, false) => return None,
            (Some(_), false) => (Side::Player, Resolution::PlayerFirst),
            (None, true) => (Side::Opponent, Resolution::OpponentFirst),
            (Some(pt), true) => {
                let player_wins = match tie_break {
                    TieBreak::FavorPlayer => pt <= self.opponent_time,
                    TieBreak::FavorOpponent => pt < self.opponent_time,
                };
                let winner = if player_wins { Side::Player } else { Side::Opponent };
                (winner, Resolution::SameTick)
            }
        };

        Some(RoundVerdict {
            winner,
            resolution,
            player_time: self.player_time,
            opponent_time: self.opponent_time,
        })
    }
}
