//! Console collaborators.
//!
//! Render every presentation call as a structured `tracing` event under the
//! `duel` target. Used by the demo binary.

use std::time::Duration;
use tracing::info;

use crate::game::state::Side;
use super::{
    Action, Animator, AudioCues, CountdownTick, DisplaySurface, MessageDuration, SceneDirector,
};

/// Text display that logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDisplay;

impl DisplaySurface for ConsoleDisplay {
    fn clear_round(&self) {}

    fn show_countdown(&self, tick: CountdownTick) {
        match tick {
            CountdownTick::Seconds(n) => info!(target: "duel", "{}...", n),
            CountdownTick::Shoot => info!(target: "duel", "Shoot!"),
        }
    }

    fn show_prompt(&self, text: &str) {
        info!(target: "duel", "Type: {}", text);
    }

    fn show_live_input(&self, side: Side, text: &str) {
        if !text.is_empty() {
            info!(target: "duel", "[{}] {}", side, text);
        }
    }

    fn show_round_result(&self, time: Duration, winner: Side) {
        info!(target: "duel", "{} fired first in {:.2}s", winner, time.as_secs_f64());
    }

    fn show_times(&self, player: Option<Duration>, opponent: Duration) {
        match player {
            Some(t) => info!(
                target: "duel",
                "Your Time: {:.2}s | Enemy Time: {:.2}s",
                t.as_secs_f64(),
                opponent.as_secs_f64()
            ),
            None => info!(
                target: "duel",
                "Your Time: -- | Enemy Time: {:.2}s",
                opponent.as_secs_f64()
            ),
        }
    }

    fn show_lives(&self, player_lives: u32, opponent_lives: u32) {
        info!(target: "duel", "Lives: {} | Enemy Lives: {}", player_lives, opponent_lives);
    }

    fn show_message(&self, text: &str, _duration: MessageDuration) {
        if !text.is_empty() {
            info!(target: "duel", "{}", text);
        }
    }
}

/// Audio sink that logs cue names.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAudio;

impl AudioCues for ConsoleAudio {
    fn play(&self, cue: &str) {
        tracing::debug!(target: "duel", cue, "sfx");
    }
}

/// Animator that logs triggers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleAnimator;

impl Animator for ConsoleAnimator {
    fn play(&self, actor: Side, action: Action) {
        tracing::debug!(target: "duel", %actor, ?action, "animation");
    }
}

/// Scene director that logs requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleScenes;

impl SceneDirector for ConsoleScenes {
    fn change_scene(&self, name: &str) {
        info!(target: "duel", scene = name, "scene change requested");
    }
}
