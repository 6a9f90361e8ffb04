//! Quickdraw Duel
//!
//! Plays duels on the console. By default a scripted typist stands in for
//! the human; `--stdin` reads real keystrokes line by line instead.
//!
//! ```text
//! quickdraw-duel [CONFIG.json] [--stdin]
//! ```

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use quickdraw::{
    DeterministicRng, DuelConfig, Keystroke, Presentation, RoundOrchestrator, Side, VERSION,
    presentation::{ConsoleDisplay, CountdownTick, DisplaySurface, MessageDuration},
};

/// Keystrokes buffered between the input source and the orchestrator.
const KEY_BUFFER: usize = 256;

struct Args {
    config_path: Option<String>,
    stdin: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut args = Args { config_path: None, stdin: false };
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--stdin" => args.stdin = true,
                flag if flag.starts_with("--") => anyhow::bail!("unknown flag {}", flag),
                path => {
                    if args.config_path.replace(path.to_string()).is_some() {
                        anyhow::bail!("more than one config path given");
                    }
                }
            }
        }
        Ok(args)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let default_level = if cfg!(feature = "debug-tracing") { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Quickdraw Duel v{}", VERSION);

    let args = Args::parse()?;
    let mut config = match &args.config_path {
        Some(path) => DuelConfig::load(path).with_context(|| format!("loading {}", path))?,
        None => DuelConfig::default(),
    };
    if !args.stdin && config.max_matches.is_none() {
        config.max_matches = Some(1);
    }

    let (key_tx, key_rx) = mpsc::channel(KEY_BUFFER);
    let presentation = if args.stdin {
        spawn_stdin_reader(key_tx);
        Presentation::console()
    } else {
        let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();
        let seed = config.seed.unwrap_or(0x5eed);
        tokio::spawn(scripted_typist(
            prompt_rx,
            key_tx,
            config.prompt_settle(),
            DeterministicRng::for_stream(seed, "typist"),
        ));
        Presentation::console().with_display(Arc::new(PromptTap {
            inner: ConsoleDisplay,
            prompts: prompt_tx,
        }))
    };

    let mut orchestrator = RoundOrchestrator::new(config, presentation, key_rx)
        .context("Failed to build duel")?;
    info!(seed = orchestrator.seed(), "Session seed");

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            let _ = shutdown_tx.send(());
        }
    });

    let records = orchestrator.run(shutdown_rx).await?;
    for record in &records {
        info!(
            match_id = %record.id_hex(),
            rounds = record.rounds.len(),
            won = record.rounds_won(Side::Player),
            best_ms = record.best_player_time().map(|t| t.as_millis() as u64),
            "=== Match Results ==="
        );
        println!("{}", record.to_json()?);
    }
    Ok(())
}

/// Forward each line of stdin as keystrokes. Newlines are dropped.
///
/// Runs on a plain thread so a pending read never holds up runtime shutdown.
fn spawn_stdin_reader(keys: mpsc::Sender<Keystroke>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            for c in line.chars() {
                if keys.blocking_send(c.into()).is_err() {
                    return;
                }
            }
        }
        debug!("stdin closed");
    });
}

/// Display wrapper that also hands each revealed prompt to the typist.
struct PromptTap {
    inner: ConsoleDisplay,
    prompts: mpsc::UnboundedSender<String>,
}

impl DisplaySurface for PromptTap {
    fn clear_round(&self) {
        self.inner.clear_round();
    }

    fn show_countdown(&self, tick: CountdownTick) {
        self.inner.show_countdown(tick);
    }

    fn show_prompt(&self, text: &str) {
        self.inner.show_prompt(text);
        let _ = self.prompts.send(text.to_string());
    }

    fn show_live_input(&self, side: Side, text: &str) {
        self.inner.show_live_input(side, text);
    }

    fn show_round_result(&self, time: Duration, winner: Side) {
        self.inner.show_round_result(time, winner);
    }

    fn show_times(&self, player: Option<Duration>, opponent: Duration) {
        self.inner.show_times(player, opponent);
    }

    fn show_lives(&self, player_lives: u32, opponent_lives: u32) {
        self.inner.show_lives(player_lives, opponent_lives);
    }

    fn show_message(&self, text: &str, duration: MessageDuration) {
        self.inner.show_message(text, duration);
    }
}

/// Types each prompt after the settle delay at a human-ish pace.
async fn scripted_typist(
    mut prompts: mpsc::UnboundedReceiver<String>,
    keys: mpsc::Sender<Keystroke>,
    settle: Duration,
    mut rng: DeterministicRng,
) {
    while let Some(prompt) = prompts.recv().await {
        tokio::time::sleep(settle).await;
        for c in prompt.chars() {
            let step = Duration::from_secs_f64(rng.next_f64_range(0.12, 0.5));
            tokio::time::sleep(step).await;
            if keys.send(Keystroke::Char(c)).await.is_err() {
                warn!("orchestrator gone, typist stopping");
                return;
            }
        }
    }
}
