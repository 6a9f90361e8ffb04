//! Presentation Layer
//!
//! Narrow interfaces the engine calls into for display, audio, animation and
//! scene changes. Nothing here feeds back into the round outcome.
//!
//! Every collaborator is optional. A missing one is skipped and the state
//! machine carries on.

pub mod console;
pub mod recorder;

use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::game::state::Side;

pub use console::{ConsoleAnimator, ConsoleAudio, ConsoleDisplay, ConsoleScenes};
pub use recorder::{Recorder, Call};

/// Audio cue played on every countdown tick.
pub const CUE_COUNTDOWN: &str = "countdown";

/// Audio cue played when a duelist fires.
pub const CUE_SHOT: &str = "shot";

/// Value shown by the countdown widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownTick {
    /// Seconds remaining.
    Seconds(u32),
    /// Terminal pulse.
    Shoot,
}

/// How long a message stays on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageDuration {
    /// Hidden after the given time.
    For(Duration),
    /// Stays until replaced.
    Persistent,
}

/// Character animation actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Standing by.
    Idle,
    /// Firing.
    Shoot,
    /// Hit but still standing.
    Damaged,
    /// Out of lives.
    Death,
}

/// On-screen text surface.
pub trait DisplaySurface: Send + Sync {
    /// Hide all per-round widgets.
    fn clear_round(&self);
    /// Show a countdown value.
    fn show_countdown(&self, tick: CountdownTick);
    /// Reveal the prompt.
    fn show_prompt(&self, text: &str);
    /// Mirror a duelist's current input.
    fn show_live_input(&self, side: Side, text: &str);
    /// Show the winning time.
    fn show_round_result(&self, time: Duration, winner: Side);
    /// Show both final times. The player may not have finished.
    fn show_times(&self, player: Option<Duration>, opponent: Duration);
    /// Update the lives counters.
    fn show_lives(&self, player_lives: u32, opponent_lives: u32);
    /// Show a message line.
    fn show_message(&self, text: &str, duration: MessageDuration);
}

/// Fire-and-forget audio.
pub trait AudioCues: Send + Sync {
    /// Play a named cue.
    fn play(&self, cue: &str);
}

/// Character animation triggers.
pub trait Animator: Send + Sync {
    /// Trigger `action` on `actor`.
    fn play(&self, actor: Side, action: Action);
}

/// Scene transitions.
pub trait SceneDirector: Send + Sync {
    /// Request a scene change.
    fn change_scene(&self, name: &str);
}

/// Bundle of injected collaborators.
///
/// Cheap to clone; the opponent replay task holds its own copy.
#[derive(Clone, Default)]
pub struct Presentation {
    display: Option<Arc<dyn DisplaySurface>>,
    audio: Option<Arc<dyn AudioCues>>,
    animator: Option<Arc<dyn Animator>>,
    scenes: Option<Arc<dyn SceneDirector>>,
}

impl Presentation {
    /// A bundle with no collaborators. Every call is a no-op.
    pub fn headless() -> Self {
        Self::default()
    }

    /// Tracing-backed console collaborators for all four slots.
    pub fn console() -> Self {
        Self::headless()
            .with_display(Arc::new(ConsoleDisplay))
            .with_audio(Arc::new(ConsoleAudio))
            .with_animator(Arc::new(ConsoleAnimator))
            .with_scenes(Arc::new(ConsoleScenes))
    }

    /// Route every slot to one recorder.
    pub fn recording(recorder: Arc<Recorder>) -> Self {
        Self::headless()
            .with_display(recorder.clone())
            .with_audio(recorder.clone())
            .with_animator(recorder.clone())
            .with_scenes(recorder)
    }

    /// Set the display surface.
    pub fn with_display(mut self, display: Arc<dyn DisplaySurface>) -> Self {
        self.display = Some(display);
        self
    }

    /// Set the audio sink.
    pub fn with_audio(mut self, audio: Arc<dyn AudioCues>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Set the animator.
    pub fn with_animator(mut self, animator: Arc<dyn Animator>) -> Self {
        self.animator = Some(animator);
        self
    }

    /// Set the scene director.
    pub fn with_scenes(mut self, scenes: Arc<dyn SceneDirector>) -> Self {
        self.scenes = Some(scenes);
        self
    }

    fn display(&self) -> Option<&dyn DisplaySurface> {
        if self.display.is_none() {
            trace!("no display surface, skipping");
        }
        self.display.as_deref()
    }

    /// See [`DisplaySurface::clear_round`].
    pub fn clear_round(&self) {
        if let Some(display) = self.display() {
            display.clear_round();
        }
    }

    /// See [`DisplaySurface::show_countdown`].
    pub fn show_countdown(&self, tick: CountdownTick) {
        if let Some(display) = self.display() {
            display.show_countdown(tick);
        }
    }

    /// See [`DisplaySurface::show_prompt`].
    pub fn show_prompt(&self, text: &str) {
        if let Some(display) = self.display() {
            display.show_prompt(text);
        }
    }

    /// See [`DisplaySurface::show_live_input`].
    pub fn show_live_input(&self, side: Side, text: &str) {
        if let Some(display) = self.display() {
            display.show_live_input(side, text);
        }
    }

    /// See [`DisplaySurface::show_round_result`].
    pub fn show_round_result(&self, time: Duration, winner: Side) {
        if let Some(display) = self.display() {
            display.show_round_result(time, winner);
        }
    }

    /// See [`DisplaySurface::show_times`].
    pub fn show_times(&self, player: Option<Duration>, opponent: Duration) {
        if let Some(display) = self.display() {
            display.show_times(player, opponent);
        }
    }

    /// See [`DisplaySurface::show_lives`].
    pub fn show_lives(&self, player_lives: u32, opponent_lives: u32) {
        if let Some(display) = self.display() {
            display.show_lives(player_lives, opponent_lives);
        }
    }

    /// See [`DisplaySurface::show_message`].
    pub fn show_message(&self, text: &str, duration: MessageDuration) {
        if let Some(display) = self.display() {
            display.show_message(text, duration);
        }
    }

    /// See [`AudioCues::play`].
    pub fn play_cue(&self, cue: &str) {
        match &self.audio {
            Some(audio) => audio.play(cue),
            None => trace!(cue, "no audio sink, skipping"),
        }
    }

    /// See [`Animator::play`].
    pub fn animate(&self, actor: Side, action: Action) {
        match &self.animator {
            Some(animator) => animator.play(actor, action),
            None => trace!(%actor, ?action, "no animator, skipping"),
        }
    }

    /// See [`SceneDirector::change_scene`].
    pub fn change_scene(&self, name: &str) {
        match &self.scenes {
            Some(scenes) => scenes.change_scene(name),
            None => trace!(scene = name, "no scene director, skipping"),
        }
    }
}
