//! Duel Logic Module
//!
//! Everything that decides a round. Presentation is reached only through
//! the injected [`Presentation`](crate::presentation::Presentation) bundle.
//!
//! ## Module Structure
//!
//! - `state`: Sides, round phases and the lives ledger
//! - `prompt`: Prompt value and prompt sources
//! - `input`: Keystroke validation for the human
//! - `opponent`: Simulated duelist with a pre-committed time
//! - `race`: First-finish resolution and tie-break
//! - `orchestrator`: Round state machine
//! - `config`: JSON configuration
//! - `events`, `record`: Match transcript

pub mod config;
pub mod events;
pub mod input;
pub mod opponent;
pub mod orchestrator;
pub mod prompt;
pub mod race;
pub mod record;
pub mod state;

// Re-export key types
pub use config::{ConfigError, DuelConfig, PromptConfig};
pub use events::DuelEvent;
pub use input::{InputTracker, KeyOutcome, Keystroke, MatchPolicy};
pub use opponent::{OpponentConfig, OpponentSimulator};
pub use orchestrator::{DuelError, RoundOrchestrator};
pub use prompt::{Prompt, PromptSource, RandomPromptSource, ScriptedPromptSource};
pub use race::{Resolution, RoundEpoch, RoundVerdict, TieBreak};
pub use record::{MatchRecord, RoundRecord};
pub use state::{MatchState, RoundState, Side};
