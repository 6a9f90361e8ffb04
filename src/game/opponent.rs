//! Simulated Opponent
//!
//! The opponent's result is decided before anything is shown: `start_turn`
//! draws a total completion time and returns it at once. A spawned replay
//! then "types" the prompt so that the last character lands exactly at that
//! time, and reports the finish on the orchestrator's channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, trace};

use crate::core::rng::DeterministicRng;
use crate::game::config::MAX_DELAY_SECS;
use crate::game::prompt::Prompt;
use crate::game::race::{OpponentFinish, RoundEpoch};
use crate::game::state::Side;
use crate::presentation::Presentation;

/// Opponent difficulty and pacing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpponentConfig {
    /// Fastest total completion time (seconds).
    pub min_reaction_secs: f64,
    /// Slowest total completion time (seconds).
    pub max_reaction_secs: f64,
    /// Per-step jitter of the replay as a fraction of the even step
    /// (0.1 = up to ±10%). Never changes the committed total.
    pub replay_jitter: f64,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            min_reaction_secs: 0.3,
            max_reaction_secs: 1.5,
            replay_jitter: 0.1,
        }
    }
}

/// The opponent's result for one round. Fixed once drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpponentCommitment {
    /// Round the commitment belongs to.
    pub epoch: RoundEpoch,
    /// Total completion time.
    pub committed: Duration,
}

/// Cumulative offsets from the start of the replay at which each character
/// appears.
///
/// Steps are `total / steps` apart, each scaled by a factor drawn from
/// `[1 - jitter, 1 + jitter]`. The last offset is always `total`, which
/// absorbs whatever the jittered steps drifted by.
pub fn pacing_schedule(
    total: Duration,
    steps: usize,
    jitter: f64,
    rng: &mut DeterministicRng,
) -> Vec<Duration> {
    if steps == 0 {
        return Vec::new();
    }
    let base = total.as_secs_f64() / steps as f64;
    let jitter = jitter.clamp(0.0, 1.0);

    let mut offsets = Vec::with_capacity(steps);
    let mut elapsed = 0.0f64;
    for _ in 0..steps - 1 {
        let factor = 1.0 + rng.next_f64_range(-jitter, jitter);
        elapsed += base * factor;
        let offset = Duration::try_from_secs_f64(elapsed).map_or(total, |d| d.min(total));
        offsets.push(offset);
    }
    // Corrective final wait
    offsets.push(total);
    offsets
}

struct ActiveTurn {
    commitment: OpponentCommitment,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Simulated duelist.
pub struct OpponentSimulator {
    config: OpponentConfig,
    rng: DeterministicRng,
    presentation: Presentation,
    turn: Option<ActiveTurn>,
}

impl OpponentSimulator {
    /// Create an idle simulator.
    pub fn new(config: OpponentConfig, rng: DeterministicRng, presentation: Presentation) -> Self {
        Self {
            config,
            rng,
            presentation,
            turn: None,
        }
    }

    /// Draw a total completion time from the configured range.
    fn draw_reaction_time(&mut self) -> Duration {
        let secs = self
            .rng
            .next_f64_range(self.config.min_reaction_secs, self.config.max_reaction_secs);
        // Unvalidated configs still get a usable time
        Duration::try_from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS)).unwrap_or(Duration::ZERO)
    }

    /// Commit this round's time and start the replay.
    ///
    /// The returned value is final for the round. `report` receives exactly
    /// one [`OpponentFinish`] at `started_at + committed`, unless
    /// [`stop`](Self::stop) is called first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_turn(
        &mut self,
        epoch: RoundEpoch,
        prompt: &Prompt,
        started_at: Instant,
        report: mpsc::UnboundedSender<OpponentFinish>,
    ) -> Duration {
        // A previous turn is never left running.
        self.stop();

        let committed = self.draw_reaction_time();
        let schedule = pacing_schedule(
            committed,
            prompt.len(),
            self.config.replay_jitter,
            &mut self.rng,
        );
        debug!(%epoch, committed_ms = committed.as_millis() as u64, %prompt, "opponent committed");

        let cancelled = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let replay = Replay {
            epoch,
            committed,
            chars: prompt.chars().to_vec(),
            schedule,
            started_at,
            cancelled: cancelled.clone(),
            finished: finished.clone(),
            report,
            presentation: self.presentation.clone(),
        };
        let handle = tokio::spawn(replay.run());

        self.turn = Some(ActiveTurn {
            commitment: OpponentCommitment { epoch, committed },
            cancelled,
            finished,
            handle,
        });
        committed
    }

    /// Commitment of the current turn, if any.
    pub fn commitment(&self) -> Option<OpponentCommitment> {
        self.turn.as_ref().map(|t| t.commitment)
    }

    /// Whether the current turn's replay has reported its finish.
    pub fn is_finished(&self) -> bool {
        self.turn
            .as_ref()
            .map(|t| t.finished.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Cancel the in-flight replay.
    ///
    /// After this returns the replay reports nothing further. A replay that
    /// already finished keeps its display; an interrupted one is cleared.
    /// Returns true if a replay was interrupted. Idempotent.
    pub fn stop(&mut self) -> bool {
        let Some(turn) = self.turn.take() else {
            return false;
        };
        turn.cancelled.store(true, Ordering::Release);
        turn.handle.abort();

        if turn.finished.load(Ordering::Acquire) {
            trace!(epoch = %turn.commitment.epoch, "opponent turn retired");
            false
        } else {
            self.presentation.show_live_input(Side::Opponent, "");
            debug!(epoch = %turn.commitment.epoch, "opponent replay cancelled");
            true
        }
    }
}

impl Drop for OpponentSimulator {
    fn drop(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.cancelled.store(true, Ordering::Release);
            turn.handle.abort();
        }
    }
}

/// State moved into the replay task.
struct Replay {
    epoch: RoundEpoch,
    committed: Duration,
    chars: Vec<char>,
    schedule: Vec<Duration>,
    started_at: Instant,
    cancelled: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    report: mpsc::UnboundedSender<OpponentFinish>,
    presentation: Presentation,
}

impl Replay {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    async fn run(self) {
        self.presentation.show_live_input(Side::Opponent, "");

        let mut typed = String::with_capacity(self.chars.len());
        for (c, offset) in self.chars.iter().zip(&self.schedule) {
            sleep_until(self.started_at + *offset).await;
            if self.is_cancelled() {
                return;
            }
            typed.push(*c);
            self.presentation.show_live_input(Side::Opponent, &typed);
        }

        // Empty prompt still consumes the committed time.
        sleep_until(self.started_at + self.committed).await;
        if self.is_cancelled() {
            return;
        }

        self.finished.store(true, Ordering::Release);
        trace!(epoch = %self.epoch, "opponent replay complete");
        let _ = self.report.send(OpponentFinish {
            epoch: self.epoch,
            elapsed: self.committed,
        });
    }
}
