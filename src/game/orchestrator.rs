//! Round Orchestrator
//!
//! Drives a match as an explicit async state machine:
//!
//! ```text
//! Idle -> Countdown -> ShowingPrompt -> WaitingInput -> Comparing -+-> RoundEnd -> Idle
//!                                                                  +-> GameOver -> Idle
//! ```
//!
//! All suspension points (countdown ticks, settle delay, the race itself,
//! inter-round and game-over delays) keep draining the keystroke channel so
//! input that arrives while the tracker is not listening is dropped rather
//! than buffered into the next round.

use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};
use uuid::Uuid;

use crate::core::rng::{seed_from_session_id, DeterministicRng};
use crate::game::config::{ConfigError, DuelConfig};
use crate::game::events::DuelEvent;
use crate::game::input::{InputTracker, KeyOutcome, Keystroke};
use crate::game::opponent::OpponentSimulator;
use crate::game::prompt::{Prompt, PromptSource, RandomPromptSource};
use crate::game::race::{OpponentFinish, RoundEpoch, RoundRace, RoundVerdict};
use crate::game::record::{MatchRecord, RoundRecord};
use crate::game::state::{MatchState, RoundState, Side};
use crate::presentation::{
    Action, CountdownTick, MessageDuration, Presentation, CUE_COUNTDOWN, CUE_SHOT,
};

/// Message shown to the player after winning a round.
pub const MSG_ROUND_WON: &str = "You won the round";
/// Message shown to the player after losing a round.
pub const MSG_ROUND_LOST: &str = "You lost the round";
/// Final message when the opponent runs out of lives.
pub const MSG_DUEL_WON: &str = "You have won the duel";
/// Final message when the player runs out of lives.
pub const MSG_DUEL_LOST: &str = "You have lost the duel";

/// Seconds between countdown ticks.
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

// =============================================================================
// ERRORS
// =============================================================================

/// Orchestrator errors.
#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    /// Configuration rejected at construction.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// A side is out of lives; start a new match first.
    #[error("Match is over")]
    MatchOver,

    /// The prompt source produced nothing to type.
    #[error("Prompt source produced an empty prompt for round {epoch}")]
    EmptyPrompt {
        /// Round that was abandoned.
        epoch: RoundEpoch,
    },

    /// The finish channel closed mid-round.
    #[error("Round {epoch} interrupted")]
    Interrupted {
        /// Round that was abandoned.
        epoch: RoundEpoch,
    },
}

/// What woke the race loop.
enum Signal {
    Key(Option<Keystroke>),
    Opponent(Option<OpponentFinish>),
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Owns the round state machine, the lives ledger and both duelists.
pub struct RoundOrchestrator {
    config: DuelConfig,
    presentation: Presentation,
    prompts: Box<dyn PromptSource>,
    tracker: InputTracker,
    opponent: OpponentSimulator,

    keys: mpsc::Receiver<Keystroke>,
    keys_open: bool,
    finish_tx: mpsc::UnboundedSender<OpponentFinish>,
    finish_rx: mpsc::UnboundedReceiver<OpponentFinish>,

    state: RoundState,
    lives: MatchState,
    epoch: RoundEpoch,
    round: u32,
    seed: u64,
    record: MatchRecord,
    events: Vec<DuelEvent>,
}

impl RoundOrchestrator {
    /// Build an orchestrator reading the human's keystrokes from `keys`.
    ///
    /// The config is validated here. Without a configured seed one is
    /// derived from a fresh session id.
    pub fn new(
        config: DuelConfig,
        presentation: Presentation,
        keys: mpsc::Receiver<Keystroke>,
    ) -> Result<Self, DuelError> {
        config.validate()?;

        let seed = match config.seed {
            Some(seed) => seed,
            None => seed_from_session_id(Uuid::new_v4().as_bytes()),
        };
        let prompts = RandomPromptSource::new(
            config.prompt.length,
            &config.prompt.alphabet,
            DeterministicRng::for_stream(seed, "prompt"),
        );
        let tracker = InputTracker::new(config.match_policy, presentation.clone());
        let opponent = OpponentSimulator::new(
            config.opponent.clone(),
            DeterministicRng::for_stream(seed, "opponent"),
            presentation.clone(),
        );
        let (finish_tx, finish_rx) = mpsc::unbounded_channel();

        info!(
            seed,
            starting_lives = config.starting_lives,
            policy = ?tracker.policy(),
            "duel orchestrator ready"
        );

        Ok(Self {
            lives: MatchState::new(config.starting_lives),
            record: MatchRecord::new(Uuid::new_v4().into_bytes(), seed),
            config,
            presentation,
            prompts: Box::new(prompts),
            tracker,
            opponent,
            keys,
            keys_open: true,
            finish_tx,
            finish_rx,
            state: RoundState::Idle,
            epoch: RoundEpoch::default(),
            round: 0,
            seed,
            events: Vec::new(),
        })
    }

    /// Replace the prompt source.
    pub fn with_prompt_source(mut self, prompts: impl PromptSource + 'static) -> Self {
        self.prompts = Box::new(prompts);
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Active configuration.
    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    /// Current phase.
    pub fn state(&self) -> RoundState {
        self.state
    }

    /// Lives ledger.
    pub fn lives(&self) -> &MatchState {
        &self.lives
    }

    /// Epoch of the latest round.
    pub fn epoch(&self) -> RoundEpoch {
        self.epoch
    }

    /// Session seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Human input tracker.
    pub fn input_tracker(&self) -> &InputTracker {
        &self.tracker
    }

    /// Simulated opponent.
    pub fn opponent(&self) -> &OpponentSimulator {
        &self.opponent
    }

    /// Rounds resolved in the current match.
    pub fn history(&self) -> &[RoundRecord] {
        &self.record.rounds
    }

    /// Record of the current match.
    pub fn match_record(&self) -> &MatchRecord {
        &self.record
    }

    /// Drain collected events.
    pub fn take_events(&mut self) -> Vec<DuelEvent> {
        std::mem::take(&mut self.events)
    }

    // -------------------------------------------------------------------------
    // Match control
    // -------------------------------------------------------------------------

    /// Begin a new match: lives restored, both duelists idle.
    pub fn start_match(&mut self) {
        self.abort_round();
        self.lives.reset();
        self.round = 0;
        self.record = MatchRecord::new(Uuid::new_v4().into_bytes(), self.seed);

        self.presentation.clear_round();
        self.presentation.show_lives(self.lives.player_lives, self.lives.opponent_lives);
        self.presentation.animate(Side::Player, Action::Idle);
        self.presentation.animate(Side::Opponent, Action::Idle);

        info!(match_id = %self.record.id_hex(), "match started");
        self.events.push(DuelEvent::MatchStarted {
            match_id: self.record.match_id,
            starting_lives: self.lives.starting_lives(),
        });
    }

    /// Play rounds until a side runs out of lives.
    pub async fn run_match(&mut self) -> Result<MatchRecord, DuelError> {
        self.start_match();
        loop {
            let round = self.play_round().await?;
            if round.ended_match() {
                return Ok(self.record.clone());
            }
        }
    }

    /// Play matches back to back until `shutdown` fires or `max_matches`
    /// is reached.
    pub async fn run(
        &mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<Vec<MatchRecord>, DuelError> {
        let mut played = Vec::new();
        loop {
            if let Some(max) = self.config.max_matches {
                if played.len() >= max as usize {
                    info!(matches = played.len(), "match limit reached");
                    break;
                }
            }

            let outcome = tokio::select! {
                result = self.run_match() => Some(result),
                _ = shutdown.recv() => None,
            };

            match outcome {
                Some(result) => {
                    let record = result?;
                    info!(
                        match_id = %record.id_hex(),
                        winner = ?record.winner,
                        rounds = record.rounds.len(),
                        "match finished"
                    );
                    played.push(record);
                }
                None => {
                    info!("shutdown requested, stopping duel");
                    self.abort_round();
                    break;
                }
            }
        }
        Ok(played)
    }

    /// Force-stop both duelists and return to Idle. Lives are untouched.
    pub fn abort_round(&mut self) {
        self.tracker.stop_listening();
        self.opponent.stop();
        if self.state != RoundState::Idle {
            debug!(from = %self.state, "round aborted");
            self.state = RoundState::Idle;
        }
    }

    // -------------------------------------------------------------------------
    // Round
    // -------------------------------------------------------------------------

    /// Play one full round from Idle back to Idle.
    ///
    /// Returns the resolved round. If it ended the match the game-over
    /// sequence has already run; further calls fail with
    /// [`DuelError::MatchOver`] until [`start_match`](Self::start_match).
    #[instrument(skip(self))]
    pub async fn play_round(&mut self) -> Result<RoundRecord, DuelError> {
        if self.lives.is_over() || self.state == RoundState::GameOver {
            return Err(DuelError::MatchOver);
        }
        if self.state != RoundState::Idle {
            warn!(state = %self.state, "round requested outside Idle, resetting");
            self.abort_round();
        }

        self.epoch = self.epoch.next();
        self.round += 1;
        let epoch = self.epoch;
        self.events.push(DuelEvent::RoundStarted { round: self.round, epoch });

        // Countdown
        self.transition(RoundState::Countdown);
        self.presentation.clear_round();
        self.presentation.animate(Side::Player, Action::Idle);
        self.presentation.animate(Side::Opponent, Action::Idle);
        self.countdown().await;

        // Prompt reveal
        self.transition(RoundState::ShowingPrompt);
        let prompt = self.prompts.generate();
        if prompt.is_empty() {
            warn!(%epoch, "empty prompt, abandoning round");
            // Nothing started yet, straight back to Idle.
            self.state = RoundState::Idle;
            return Err(DuelError::EmptyPrompt { epoch });
        }
        self.presentation.show_prompt(&prompt.to_string());
        self.presentation.show_live_input(Side::Player, "");
        self.presentation.show_live_input(Side::Opponent, "");
        self.events.push(DuelEvent::PromptRevealed { epoch, prompt: prompt.clone() });
        self.pause(self.config.prompt_settle()).await;

        // Race
        self.transition(RoundState::WaitingInput);
        let race = self.race(epoch, &prompt).await?;

        // Resolution
        self.transition(RoundState::Comparing);
        let Some(verdict) = race.resolve(self.config.tie_break) else {
            self.abort_round();
            return Err(DuelError::Interrupted { epoch });
        };
        let record = self.apply_verdict(epoch, prompt, &verdict);

        if self.lives.is_over() {
            self.game_over().await;
        } else {
            self.transition(RoundState::RoundEnd);
            self.pause(self.config.inter_round()).await;
            self.transition(RoundState::Idle);
        }
        Ok(record)
    }

    async fn countdown(&mut self) {
        let mut remaining = self.config.countdown();
        let ticks = remaining.as_secs_f64().ceil() as u32;
        for n in (1..=ticks).rev() {
            self.presentation.show_countdown(CountdownTick::Seconds(n));
            self.presentation.play_cue(CUE_COUNTDOWN);
            let step = remaining.min(COUNTDOWN_TICK);
            self.pause(step).await;
            remaining = remaining.saturating_sub(step);
        }
        self.presentation.show_countdown(CountdownTick::Shoot);
        self.pause(self.config.shoot_hold()).await;
    }

    /// Start both duelists from one instant and wait for the first finish.
    async fn race(&mut self, epoch: RoundEpoch, prompt: &Prompt) -> Result<RoundRace, DuelError> {
        // Keys pressed before the race are not part of it.
        self.drain_keys(None);

        let started_at = Instant::now();
        self.tracker.start_listening(prompt, started_at);
        let committed = self
            .opponent
            .start_turn(epoch, prompt, started_at, self.finish_tx.clone());
        self.events.push(DuelEvent::OpponentCommitted { epoch, committed });

        let mut race = RoundRace::new(epoch, committed);
        while !race.any_finished() {
            let signal = tokio::select! {
                biased;
                key = self.keys.recv(), if self.keys_open => Signal::Key(key),
                finish = self.finish_rx.recv() => Signal::Opponent(finish),
            };

            match signal {
                Signal::Key(Some(key)) => {
                    if self.feed_key(key, &mut race) {
                        // Opponent finish delivered in the same tick
                        while let Ok(finish) = self.finish_rx.try_recv() {
                            race.record_opponent(finish);
                        }
                    }
                }
                Signal::Key(None) => {
                    debug!("keystroke source closed");
                    self.keys_open = false;
                }
                Signal::Opponent(Some(finish)) => {
                    if race.record_opponent(finish) {
                        // Keystrokes delivered in the same tick
                        self.drain_keys(Some(&mut race));
                    }
                }
                Signal::Opponent(None) => {
                    self.abort_round();
                    return Err(DuelError::Interrupted { epoch });
                }
            }
        }
        Ok(race)
    }

    /// Feed one keystroke. Returns true if it completed the prompt.
    fn feed_key(&mut self, key: Keystroke, race: &mut RoundRace) -> bool {
        match self.tracker.handle(key, Instant::now()) {
            KeyOutcome::Finished(elapsed) => {
                race.record_player(elapsed);
                self.events.push(DuelEvent::PlayerFinished { epoch: race.epoch(), elapsed });
                true
            }
            _ => false,
        }
    }

    /// Feed every keystroke already queued.
    fn drain_keys(&mut self, mut race: Option<&mut RoundRace>) {
        loop {
            match self.keys.try_recv() {
                Ok(key) => match race.as_deref_mut() {
                    Some(race) => {
                        self.feed_key(key, race);
                    }
                    None => {
                        self.tracker.handle(key, Instant::now());
                    }
                },
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.keys_open = false;
                    break;
                }
            }
        }
    }

    /// Stop both duelists, take a life and fire the outcome hooks.
    fn apply_verdict(
        &mut self,
        epoch: RoundEpoch,
        prompt: Prompt,
        verdict: &RoundVerdict,
    ) -> RoundRecord {
        self.tracker.stop_listening();
        self.opponent.stop();

        let winner = verdict.winner;
        let loser = verdict.loser();
        let remaining = self
            .lives
            .lose_life(loser)
            .unwrap_or_else(|| self.lives.lives(loser));

        self.presentation.show_times(verdict.player_time, verdict.opponent_time);
        self.presentation.show_round_result(verdict.winning_time(), winner);
        self.presentation.show_lives(self.lives.player_lives, self.lives.opponent_lives);

        self.presentation.animate(winner, Action::Shoot);
        self.presentation.play_cue(CUE_SHOT);
        let hit = if remaining == 0 { Action::Death } else { Action::Damaged };
        self.presentation.animate(loser, hit);

        if !self.lives.is_over() {
            let text = match winner {
                Side::Player => MSG_ROUND_WON,
                Side::Opponent => MSG_ROUND_LOST,
            };
            self.presentation
                .show_message(text, MessageDuration::For(self.config.inter_round()));
        }

        info!(
            %epoch,
            %winner,
            resolution = ?verdict.resolution,
            player_ms = verdict.player_time.map(|t| t.as_millis() as u64),
            opponent_ms = verdict.opponent_time.as_millis() as u64,
            player_lives = self.lives.player_lives,
            opponent_lives = self.lives.opponent_lives,
            "round resolved"
        );
        self.events.push(DuelEvent::RoundResolved {
            epoch,
            winner,
            resolution: verdict.resolution,
            loser_lives: remaining,
        });

        let record = RoundRecord::new(
            self.round,
            epoch,
            prompt,
            verdict,
            (self.lives.player_lives, self.lives.opponent_lives),
        );
        self.record.push_round(record.clone());
        record
    }

    async fn game_over(&mut self) {
        self.transition(RoundState::GameOver);
        self.tracker.stop_listening();
        self.opponent.stop();

        let winner = self.lives.winner().unwrap_or(Side::Opponent);
        let text = match winner {
            Side::Player => MSG_DUEL_WON,
            Side::Opponent => MSG_DUEL_LOST,
        };
        self.presentation.show_message(text, MessageDuration::Persistent);
        info!(%winner, rounds = self.round, match_id = %self.record.id_hex(), "duel over");
        self.events.push(DuelEvent::MatchEnded { winner, rounds: self.round });

        self.pause(self.config.game_over()).await;
        self.presentation.change_scene(&self.config.restart_scene);
        self.transition(RoundState::Idle);
    }

    /// Wait out `duration` while discarding input that does not belong to
    /// any race.
    async fn pause(&mut self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let deadline = sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                key = self.keys.recv(), if self.keys_open => match key {
                    Some(key) => {
                        self.tracker.handle(key, Instant::now());
                    }
                    None => self.keys_open = false,
                },
                Some(stale) = self.finish_rx.recv() => {
                    trace!(epoch = %stale.epoch, "discarding opponent finish outside a race");
                }
            }
        }
    }

    fn transition(&mut self, next: RoundState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "round state");
        self.state = next;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::game::opponent::OpponentConfig;
    use crate::game::prompt::ScriptedPromptSource;
    use crate::game::race::{Resolution, TieBreak};
    use crate::presentation::{Call, Recorder};

    /// No delays around the race, fixed opponent time.
    fn quick_config(opponent_secs: f64) -> DuelConfig {
        DuelConfig {
            countdown_secs: 0.0,
            shoot_hold_secs: 0.0,
            prompt_settle_secs: 0.0,
            inter_round_secs: 0.0,
            game_over_secs: 0.0,
            seed: Some(7),
            opponent: OpponentConfig {
                min_reaction_secs: opponent_secs,
                max_reaction_secs: opponent_secs,
                replay_jitter: 0.1,
            },
            ..Default::default()
        }
    }

    fn orchestrator(
        config: DuelConfig,
    ) -> (RoundOrchestrator, mpsc::Sender<Keystroke>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::new());
        let (key_tx, key_rx) = mpsc::channel(64);
        let orch = RoundOrchestrator::new(config, Presentation::recording(recorder.clone()), key_rx)
            .unwrap()
            .with_prompt_source(ScriptedPromptSource::new(["ABC"]));
        (orch, key_tx, recorder)
    }

    /// Send each key at its offset from now.
    fn type_at(tx: mpsc::Sender<Keystroke>, script: Vec<(u64, char)>) {
        let start = Instant::now();
        tokio::spawn(async move {
            for (ms, c) in script {
                tokio::time::sleep_until(start + Duration::from_millis(ms)).await;
                if tx.send(c.into()).await.is_err() {
                    return;
                }
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_player_wins_round() {
        let (mut orch, keys, recorder) = orchestrator(quick_config(0.8));
        type_at(keys, vec![(300, 'a'), (500, 'b'), (700, 'c')]);

        let record = orch.play_round().await.unwrap();

        assert_eq!(record.winner, Side::Player);
        assert_eq!(record.resolution, Resolution::PlayerFirst);
        let player_time = record.player_time.unwrap();
        assert!(player_time >= Duration::from_millis(700));
        assert!(player_time < Duration::from_millis(800));
        assert_eq!(record.opponent_time, Duration::from_millis(800));
        assert_eq!(orch.lives().player_lives, 3);
        assert_eq!(orch.lives().opponent_lives, 2);
        assert_eq!(orch.state(), RoundState::Idle);

        let calls = recorder.calls();
        assert!(calls.contains(&Call::RoundResult(player_time, Side::Player)));
        assert!(calls.contains(&Call::Times(Some(player_time), Duration::from_millis(800))));
        assert!(calls.contains(&Call::Lives(3, 2)));
        assert!(calls.contains(&Call::Message(
            MSG_ROUND_WON.to_string(),
            MessageDuration::For(Duration::ZERO)
        )));
        assert!(calls.contains(&Call::Animation(Side::Player, Action::Shoot)));
        assert!(calls.contains(&Call::Animation(Side::Opponent, Action::Damaged)));

        // Interrupted replay never reports and its display is cleared
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(recorder.last_live_input(Side::Opponent).as_deref(), Some(""));
        assert!(orch.finish_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opponent_wins_round() {
        let (mut orch, keys, recorder) = orchestrator(quick_config(0.5));
        type_at(keys, vec![(300, 'A'), (450, 'B'), (900, 'C')]);

        let record = orch.play_round().await.unwrap();

        assert_eq!(record.winner, Side::Opponent);
        assert_eq!(record.resolution, Resolution::OpponentFirst);
        assert_eq!(record.player_time, None);
        assert_eq!(orch.lives().player_lives, 2);
        assert_eq!(orch.lives().opponent_lives, 3);
        assert!(!orch.input_tracker().is_listening());
        assert_eq!(orch.input_tracker().progress().unwrap().typed(), "AB");
        assert!(recorder.calls().contains(&Call::Animation(Side::Player, Action::Damaged)));

        // Late keystroke goes nowhere
        tokio::time::sleep(Duration::from_secs(1)).await;
        orch.drain_keys(None);
        assert_eq!(orch.input_tracker().progress().unwrap().typed(), "AB");
        assert!(orch.input_tracker().progress().unwrap().finished_after.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_and_restart() {
        let mut config = quick_config(0.2);
        config.game_over_secs = 5.0;
        let (mut orch, _keys, recorder) = orchestrator(config);
        let start = Instant::now();

        for round in 1..=3u32 {
            let record = orch.play_round().await.unwrap();
            assert_eq!(record.winner, Side::Opponent);
            assert_eq!(record.player_lives, 3 - round);
        }

        assert!(start.elapsed() >= Duration::from_millis(5600));
        assert_eq!(orch.state(), RoundState::Idle);
        assert_eq!(orch.lives().winner(), Some(Side::Opponent));
        assert_eq!(orch.match_record().winner, Some(Side::Opponent));
        assert!(!orch.input_tracker().is_listening());
        assert!(orch.opponent().commitment().is_none());

        let calls = recorder.calls();
        let final_message = calls
            .iter()
            .position(|c| {
                *c == Call::Message(MSG_DUEL_LOST.to_string(), MessageDuration::Persistent)
            })
            .unwrap();
        let scene = calls
            .iter()
            .position(|c| *c == Call::Scene("Duel".to_string()))
            .unwrap();
        assert!(final_message < scene);
        assert_eq!(recorder.count(|c| matches!(c, Call::Scene(_))), 1);
        assert!(calls.contains(&Call::Animation(Side::Player, Action::Death)));

        // Gated until a new match
        assert!(matches!(orch.play_round().await, Err(DuelError::MatchOver)));
        assert!(matches!(orch.play_round().await, Err(DuelError::MatchOver)));
        assert_eq!(orch.lives().player_lives, 0);

        orch.start_match();
        assert_eq!(orch.lives().player_lives, 3);
        assert_eq!(orch.lives().opponent_lives, 3);
        assert!(orch.history().is_empty());
        assert!(orch.play_round().await.is_ok());
        assert_eq!(recorder.count(|c| matches!(c, Call::Scene(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_then_shoot() {
        let mut config = quick_config(0.2);
        config.countdown_secs = 3.0;
        config.shoot_hold_secs = 0.5;
        config.prompt_settle_secs = 0.5;
        let (mut orch, _keys, recorder) = orchestrator(config);
        let start = Instant::now();

        orch.play_round().await.unwrap();

        let ticks: Vec<_> = recorder
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Countdown(tick) => Some(tick),
                _ => None,
            })
            .collect();
        assert_eq!(
            ticks,
            vec![
                CountdownTick::Seconds(3),
                CountdownTick::Seconds(2),
                CountdownTick::Seconds(1),
                CountdownTick::Shoot,
            ]
        );
        assert_eq!(recorder.count(|c| *c == Call::Cue(CUE_COUNTDOWN.to_string())), 3);
        assert!(start.elapsed() >= Duration::from_millis(4200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_instant_finish_favors_player() {
        let (mut orch, keys, _recorder) = orchestrator(quick_config(0.8));
        type_at(keys, vec![(200, 'A'), (400, 'B'), (800, 'C')]);

        let record = orch.play_round().await.unwrap();

        assert_eq!(record.winner, Side::Player);
        assert_eq!(record.resolution, Resolution::SameTick);
        assert_eq!(record.player_time, Some(record.opponent_time));
        assert_eq!(record.opponent_time, Duration::from_millis(800));
        assert_eq!(orch.lives().opponent_lives, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_instant_finish_favors_opponent_when_configured() {
        let mut config = quick_config(0.8);
        config.tie_break = TieBreak::FavorOpponent;
        let (mut orch, keys, _recorder) = orchestrator(config);
        type_at(keys, vec![(800, 'A'), (800, 'B'), (800, 'C')]);

        let record = orch.play_round().await.unwrap();

        assert_eq!(record.winner, Side::Opponent);
        assert_eq!(record.resolution, Resolution::SameTick);
        assert_eq!(record.player_time, Some(Duration::from_millis(800)));
        assert_eq!(orch.lives().player_lives, 2);
    }

    #[test]
    fn test_oversized_reaction_time_rejected_before_play() {
        let (_key_tx, key_rx) = mpsc::channel(8);
        let mut config = quick_config(1e20);
        config.opponent.replay_jitter = 0.0;
        assert!(matches!(
            RoundOrchestrator::new(config, Presentation::headless(), key_rx),
            Err(DuelError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_before_race_are_dropped() {
        let mut config = quick_config(0.8);
        config.countdown_secs = 1.0;
        let (mut orch, keys, _recorder) = orchestrator(config);

        // Whole prompt typed during the countdown
        type_at(keys.clone(), vec![(100, 'A'), (200, 'B'), (300, 'C')]);
        let record = orch.play_round().await.unwrap();

        assert_eq!(record.winner, Side::Opponent);
        assert_eq!(record.player_time, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_opponent_finish_ignored() {
        let (mut orch, keys, _recorder) = orchestrator(quick_config(0.8));
        orch.finish_tx
            .send(OpponentFinish { epoch: RoundEpoch(99), elapsed: Duration::ZERO })
            .unwrap();
        type_at(keys, vec![(200, 'A'), (400, 'B'), (600, 'C')]);

        let record = orch.play_round().await.unwrap();
        assert_eq!(record.winner, Side::Player);
        assert_eq!(orch.lives().opponent_lives, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_prompt_is_rejected() {
        let (key_tx, key_rx) = mpsc::channel(8);
        let mut orch = RoundOrchestrator::new(quick_config(0.5), Presentation::headless(), key_rx)
            .unwrap()
            .with_prompt_source(ScriptedPromptSource::new(Vec::<String>::new()));

        assert!(matches!(orch.play_round().await, Err(DuelError::EmptyPrompt { .. })));
        assert_eq!(orch.state(), RoundState::Idle);
        assert_eq!(orch.lives().player_lives, 3);
        assert_eq!(orch.lives().opponent_lives, 3);
        assert!(!orch.input_tracker().is_listening());
        drop(key_tx);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (_key_tx, key_rx) = mpsc::channel(8);
        let config = DuelConfig { starting_lives: 0, ..Default::default() };
        assert!(matches!(
            RoundOrchestrator::new(config, Presentation::headless(), key_rx),
            Err(DuelError::Config(ConfigError::Invalid { field: "starting_lives", .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_headless_round() {
        let (key_tx, key_rx) = mpsc::channel(8);
        let mut orch = RoundOrchestrator::new(quick_config(0.4), Presentation::headless(), key_rx)
            .unwrap();
        drop(key_tx);

        let record = orch.play_round().await.unwrap();
        assert_eq!(record.winner, Side::Opponent);
        assert_eq!(record.prompt.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_in_order() {
        let (mut orch, keys, _recorder) = orchestrator(quick_config(0.8));
        orch.start_match();
        type_at(keys, vec![(100, 'A'), (200, 'B'), (300, 'C')]);
        orch.play_round().await.unwrap();

        let kinds: Vec<&'static str> = orch
            .take_events()
            .iter()
            .map(|e| match e {
                DuelEvent::MatchStarted { .. } => "match_started",
                DuelEvent::RoundStarted { .. } => "round_started",
                DuelEvent::PromptRevealed { .. } => "prompt_revealed",
                DuelEvent::OpponentCommitted { .. } => "opponent_committed",
                DuelEvent::PlayerFinished { .. } => "player_finished",
                DuelEvent::RoundResolved { .. } => "round_resolved",
                DuelEvent::MatchEnded { .. } => "match_ended",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "match_started",
                "round_started",
                "prompt_revealed",
                "opponent_committed",
                "player_finished",
                "round_resolved",
            ]
        );
        assert!(orch.take_events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_match_limit() {
        let mut config = quick_config(0.1);
        config.starting_lives = 1;
        config.max_matches = Some(2);
        let (mut orch, _keys, recorder) = orchestrator(config);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let records = orch.run(shutdown_rx).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.winner == Some(Side::Opponent)));
        assert_ne!(records[0].match_id, records[1].match_id);
        assert_eq!(recorder.count(|c| matches!(c, Call::Scene(_))), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_honors_shutdown() {
        let mut config = quick_config(1.0);
        config.countdown_secs = 3.0;
        let (mut orch, _keys, _recorder) = orchestrator(config);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3200)).await;
            let _ = shutdown_tx.send(());
        });

        let records = orch.run(shutdown_rx).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(orch.state(), RoundState::Idle);
        assert!(!orch.input_tracker().is_listening());
        assert!(orch.opponent().commitment().is_none());
    }
}
