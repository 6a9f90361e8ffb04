//! Keystroke Capture and Validation
//!
//! Consumes the human's raw character events, checks them against the
//! prompt and reports completion once per round.

use serde::{Serialize, Deserialize};
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::game::prompt::{uppercase, Prompt};
use crate::game::state::Side;
use crate::presentation::Presentation;

/// ASCII backspace as delivered by line-oriented input sources.
pub const BACKSPACE: char = '\u{8}';

// =============================================================================
// INPUT TYPES
// =============================================================================

/// A single raw keystroke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keystroke {
    /// A typed character.
    Char(char),
    /// Erase the last character.
    Backspace,
}

impl From<char> for Keystroke {
    fn from(c: char) -> Self {
        if c == BACKSPACE || c == '\u{7f}' {
            Keystroke::Backspace
        } else {
            Keystroke::Char(c)
        }
    }
}

/// How a wrong character is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Only the expected character is appended; anything else is rejected
    /// and the buffer is left unchanged.
    #[default]
    StrictCorrectOnly,
    /// Every character is appended; if the buffer stops being a prefix of
    /// the prompt it is cleared.
    PrefixReset,
}

/// Result of feeding one keystroke to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Tracker is not listening; the event was dropped.
    NotListening,
    /// Not alphanumeric, or nothing to erase, or buffer already full.
    Ignored,
    /// Character accepted.
    Appended,
    /// Last character removed.
    Erased,
    /// Wrong character under [`MatchPolicy::StrictCorrectOnly`].
    Rejected {
        /// Character the prompt wanted.
        expected: char,
        /// Character that was typed (uppercased).
        got: char,
    },
    /// Wrong character under [`MatchPolicy::PrefixReset`]; buffer cleared.
    Reset,
    /// Prompt completed. Reported once per round.
    Finished(Duration),
    /// Prompt was already completed; nothing changed.
    AlreadyFinished,
}

// =============================================================================
// PLAYER PROGRESS
// =============================================================================

/// Per-round record of the human's typing. Built fresh by
/// [`InputTracker::start_listening`].
#[derive(Clone, Debug)]
pub struct PlayerProgress {
    /// Uppercased target.
    pub target: Prompt,
    /// Characters accepted so far.
    pub buffer: Vec<char>,
    /// When the race started.
    pub started_at: Instant,
    /// Elapsed time at completion.
    pub finished_after: Option<Duration>,
}

impl PlayerProgress {
    fn new(target: Prompt, started_at: Instant) -> Self {
        Self {
            buffer: Vec::with_capacity(target.len()),
            target,
            started_at,
            finished_after: None,
        }
    }

    /// Current buffer as text.
    pub fn typed(&self) -> String {
        self.buffer.iter().collect()
    }

    fn is_complete(&self) -> bool {
        self.buffer.len() == self.target.len()
    }
}

// =============================================================================
// INPUT TRACKER
// =============================================================================

/// Validates the human's keystrokes for the current round.
pub struct InputTracker {
    policy: MatchPolicy,
    listening: bool,
    progress: Option<PlayerProgress>,
    presentation: Presentation,
}

impl InputTracker {
    /// Create an idle tracker.
    pub fn new(policy: MatchPolicy, presentation: Presentation) -> Self {
        Self {
            policy,
            listening: false,
            progress: None,
            presentation,
        }
    }

    /// Configured policy.
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Whether keystrokes are currently accepted.
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// This round's progress, if a round has started.
    pub fn progress(&self) -> Option<&PlayerProgress> {
        self.progress.as_ref()
    }

    /// Begin a round: reset progress and start accepting keystrokes.
    pub fn start_listening(&mut self, prompt: &Prompt, started_at: Instant) {
        self.progress = Some(PlayerProgress::new(prompt.to_uppercase(), started_at));
        self.listening = true;
        self.presentation.show_live_input(Side::Player, "");
        debug!(%prompt, "input tracker listening");
    }

    /// Stop accepting keystrokes. Idempotent.
    pub fn stop_listening(&mut self) {
        if self.listening {
            self.listening = false;
            self.presentation.show_live_input(Side::Player, "");
            debug!("input tracker stopped");
        }
    }

    /// Feed one keystroke observed at `now`.
    ///
    /// Each call applies completely before returning, and
    /// [`KeyOutcome::Finished`] is returned at most once per round.
    pub fn handle(&mut self, key: Keystroke, now: Instant) -> KeyOutcome {
        if !self.listening {
            trace!(?key, "dropping keystroke, not listening");
            return KeyOutcome::NotListening;
        }
        let Some(progress) = self.progress.as_mut() else {
            return KeyOutcome::NotListening;
        };
        if progress.finished_after.is_some() {
            return KeyOutcome::AlreadyFinished;
        }

        let outcome = match key {
            Keystroke::Backspace => {
                if progress.buffer.pop().is_some() {
                    KeyOutcome::Erased
                } else {
                    KeyOutcome::Ignored
                }
            }
            Keystroke::Char(c) if !c.is_alphanumeric() => KeyOutcome::Ignored,
            Keystroke::Char(c) => {
                let got = uppercase(c);
                match progress.target.char_at(progress.buffer.len()) {
                    None => KeyOutcome::Ignored,
                    Some(expected) => match self.policy {
                        MatchPolicy::StrictCorrectOnly => {
                            if got == expected {
                                progress.buffer.push(got);
                                KeyOutcome::Appended
                            } else {
                                debug!(%expected, %got, "typing error");
                                KeyOutcome::Rejected { expected, got }
                            }
                        }
                        MatchPolicy::PrefixReset => {
                            progress.buffer.push(got);
                            if progress.target.starts_with(&progress.buffer) {
                                KeyOutcome::Appended
                            } else {
                                debug!(%expected, %got, "typing error, clearing input");
                                progress.buffer.clear();
                                KeyOutcome::Reset
                            }
                        }
                    },
                }
            }
        };

        if matches!(outcome, KeyOutcome::Appended | KeyOutcome::Erased | KeyOutcome::Reset) {
            self.presentation.show_live_input(Side::Player, &progress.typed());
        }

        if outcome == KeyOutcome::Appended && progress.is_complete() {
            let elapsed = now.saturating_duration_since(progress.started_at);
            progress.finished_after = Some(elapsed);
            debug!(elapsed_ms = elapsed.as_millis() as u64, "player completed prompt");
            return KeyOutcome::Finished(elapsed);
        }

        outcome
    }
}

// =============================================================================
// TESTS
// =============================================================================
