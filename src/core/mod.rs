//! Core primitives.
//!
//! Seeded randomness shared by the prompt source and the opponent simulator.

pub mod rng;

// Re-export core types
pub use rng::{DeterministicRng, derive_seed, seed_from_session_id};
