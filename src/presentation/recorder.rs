//! Recording collaborators.
//!
//! Captures every presentation call in order, for transcripts and tests.

use std::sync::Mutex;
use std::time::Duration;

use crate::game::state::Side;
use super::{
    Action, Animator, AudioCues, CountdownTick, DisplaySurface, MessageDuration, SceneDirector,
};

/// One captured collaborator call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// `clear_round`
    ClearRound,
    /// `show_countdown`
    Countdown(CountdownTick),
    /// `show_prompt`
    Prompt(String),
    /// `show_live_input`
    LiveInput(Side, String),
    /// `show_round_result`
    RoundResult(Duration, Side),
    /// `show_times`
    Times(Option<Duration>, Duration),
    /// `show_lives`
    Lives(u32, u32),
    /// `show_message`
    Message(String, MessageDuration),
    /// `AudioCues::play`
    Cue(String),
    /// `Animator::play`
    Animation(Side, Action),
    /// `change_scene`
    Scene(String),
}

/// Thread-safe call log implementing every collaborator trait.
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(call);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Drain all calls so far.
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(
            &mut *self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }

    /// Count calls matching a predicate.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|call| pred(call))
            .count()
    }

    /// Last text mirrored for `side`, if any.
    pub fn last_live_input(&self, side: Side) -> Option<String> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .rev()
            .find_map(|call| match call {
                Call::LiveInput(s, text) if *s == side => Some(text.clone()),
                _ => None,
            })
    }
}

impl DisplaySurface for Recorder {
    fn clear_round(&self) {
        self.push(Call::ClearRound);
    }

    fn show_countdown(&self, tick: CountdownTick) {
        self.push(Call::Countdown(tick));
    }

    fn show_prompt(&self, text: &str) {
        self.push(Call::Prompt(text.to_string()));
    }

    fn show_live_input(&self, side: Side, text: &str) {
        self.push(Call::LiveInput(side, text.to_string()));
    }

    fn show_round_result(&self, time: Duration, winner: Side) {
        self.push(Call::RoundResult(time, winner));
    }

    fn show_times(&self, player: Option<Duration>, opponent: Duration) {
        self.push(Call::Times(player, opponent));
    }

    fn show_lives(&self, player_lives: u32, opponent_lives: u32) {
        self.push(Call::Lives(player_lives, opponent_lives));
    }

    fn show_message(&self, text: &str, duration: MessageDuration) {
        self.push(Call::Message(text.to_string(), duration));
    }
}

impl AudioCues for Recorder {
    fn play(&self, cue: &str) {
        self.push(Call::Cue(cue.to_string()));
    }
}

impl Animator for Recorder {
    fn play(&self, actor: Side, action: Action) {
        self.push(Call::Animation(actor, action));
    }
}

impl SceneDirector for Recorder {
    fn change_scene(&self, name: &str) {
        self.push(Call::Scene(name.to_string()));
    }
}
