//! # Quickdraw Duel
//!
//! Round orchestration engine for a two-party reaction duel: a human types a
//! short prompt against a simulated opponent whose time is fixed before the
//! round starts. First to finish wins the round; the loser drops a life.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      QUICKDRAW DUEL                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  └── rng.rs        - Xorshift128+ PRNG, seed derivation      │
//! │                                                              │
//! │  game/             - Round logic                             │
//! │  ├── state.rs      - Sides, phases, lives ledger             │
//! │  ├── prompt.rs     - Prompt generation                       │
//! │  ├── input.rs      - Keystroke validation                    │
//! │  ├── opponent.rs   - Simulated opponent replay               │
//! │  ├── race.rs       - First-finish resolution                 │
//! │  ├── orchestrator.rs - Round state machine                   │
//! │  ├── config.rs     - JSON configuration                      │
//! │  └── events.rs, record.rs - Match transcript                 │
//! │                                                              │
//! │  presentation/     - Injected collaborators                  │
//! │  ├── console.rs    - Tracing-backed console output           │
//! │  └── recorder.rs   - Call capture                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timing
//!
//! Every wait is a tokio timer, so tests run on paused virtual time and a
//! seeded session replays the same prompts and opponent times.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod presentation;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use game::config::{ConfigError, DuelConfig};
pub use game::input::{Keystroke, MatchPolicy};
pub use game::orchestrator::{DuelError, RoundOrchestrator};
pub use game::race::TieBreak;
pub use game::record::{MatchRecord, RoundRecord};
pub use game::state::{MatchState, RoundState, Side};
pub use presentation::Presentation;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default lives per side
pub const DEFAULT_STARTING_LIVES: u32 = 3;
