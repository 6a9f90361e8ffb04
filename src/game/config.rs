//! Duel Configuration
//!
//! Every knob of a match, loadable from JSON. Missing fields take their
//! defaults, so `{}` is a valid config.

use std::path::Path;
use serde::{Serialize, Deserialize};
use tokio::time::Duration;

use crate::game::input::MatchPolicy;
use crate::game::opponent::OpponentConfig;
use crate::game::prompt::{DEFAULT_ALPHABET, DEFAULT_PROMPT_LENGTH};
use crate::game::race::TieBreak;

/// Prompt shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Characters per prompt.
    pub length: usize,
    /// Characters prompts are drawn from.
    pub alphabet: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_PROMPT_LENGTH,
            alphabet: DEFAULT_ALPHABET.to_string(),
        }
    }
}

/// Configuration for a duel session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    /// Lives each side starts a match with.
    pub starting_lives: u32,
    /// Countdown before the prompt (seconds, ticks once per second).
    pub countdown_secs: f64,
    /// How long "Shoot!" stays up before the prompt (seconds).
    pub shoot_hold_secs: f64,
    /// Delay between revealing the prompt and accepting input (seconds).
    pub prompt_settle_secs: f64,
    /// Pause after a round before the next countdown (seconds).
    pub inter_round_secs: f64,
    /// How long the final outcome stays up before the scene change (seconds).
    pub game_over_secs: f64,
    /// Scene requested when a match ends.
    pub restart_scene: String,
    /// Prompt shape.
    pub prompt: PromptConfig,
    /// Opponent difficulty.
    pub opponent: OpponentConfig,
    /// Keystroke validation policy.
    pub match_policy: MatchPolicy,
    /// Rule for equal finish times.
    pub tie_break: TieBreak,
    /// Fixed RNG seed; random per session when unset.
    pub seed: Option<u64>,
    /// Stop after this many matches; unbounded when unset.
    pub max_matches: Option<u32>,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            starting_lives: crate::DEFAULT_STARTING_LIVES,
            countdown_secs: 3.0,
            shoot_hold_secs: 0.5,
            prompt_settle_secs: 0.5,
            inter_round_secs: 2.0,
            game_over_secs: 5.0,
            restart_scene: "Duel".to_string(),
            prompt: PromptConfig::default(),
            opponent: OpponentConfig::default(),
            match_policy: MatchPolicy::default(),
            tie_break: TieBreak::default(),
            seed: None,
            max_matches: None,
        }
    }
}

impl DuelConfig {
    /// Parse from JSON without validating.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field for a usable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.starting_lives == 0 {
            return Err(ConfigError::Invalid {
                field: "starting_lives",
                reason: "must be at least 1".into(),
            });
        }
        if self.prompt.length == 0 {
            return Err(ConfigError::Invalid {
                field: "prompt.length",
                reason: "must be at least 1".into(),
            });
        }
        if self.prompt.alphabet.is_empty() {
            return Err(ConfigError::Invalid {
                field: "prompt.alphabet",
                reason: "must not be empty".into(),
            });
        }
        if let Some(c) = self.prompt.alphabet.chars().find(|c| !c.is_alphanumeric()) {
            return Err(ConfigError::Invalid {
                field: "prompt.alphabet",
                reason: format!("{:?} cannot be typed", c),
            });
        }

        for (field, secs) in [
            ("countdown_secs", self.countdown_secs),
            ("shoot_hold_secs", self.shoot_hold_secs),
            ("prompt_settle_secs", self.prompt_settle_secs),
            ("inter_round_secs", self.inter_round_secs),
            ("game_over_secs", self.game_over_secs),
            ("opponent.min_reaction_secs", self.opponent.min_reaction_secs),
            ("opponent.max_reaction_secs", self.opponent.max_reaction_secs),
        ] {
            check_secs(field, secs)?;
        }

        if self.opponent.min_reaction_secs > self.opponent.max_reaction_secs {
            return Err(ConfigError::Invalid {
                field: "opponent.min_reaction_secs",
                reason: "must not exceed opponent.max_reaction_secs".into(),
            });
        }
        if !(0.0..1.0).contains(&self.opponent.replay_jitter) {
            return Err(ConfigError::Invalid {
                field: "opponent.replay_jitter",
                reason: "must be in [0, 1)".into(),
            });
        }
        Ok(())
    }

    /// Countdown length.
    pub fn countdown(&self) -> Duration {
        secs(self.countdown_secs)
    }

    /// Hold after the "Shoot!" pulse.
    pub fn shoot_hold(&self) -> Duration {
        secs(self.shoot_hold_secs)
    }

    /// Settle delay after the prompt reveal.
    pub fn prompt_settle(&self) -> Duration {
        secs(self.prompt_settle_secs)
    }

    /// Pause between rounds.
    pub fn inter_round(&self) -> Duration {
        secs(self.inter_round_secs)
    }

    /// Pause before the scene change at game over.
    pub fn game_over(&self) -> Duration {
        secs(self.game_over_secs)
    }
}

/// Upper bound for any configured delay or reaction time (one hour).
pub const MAX_DELAY_SECS: f64 = 3600.0;

fn check_secs(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{} is not a non-negative number of seconds", value),
        });
    }
    if value > MAX_DELAY_SECS {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{} exceeds the {} s limit", value, MAX_DELAY_SECS),
        });
    }
    Ok(())
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config text is not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field has an unusable value.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DuelConfig::default();
        assert_eq!(config.starting_lives, 3);
        assert_eq!(config.countdown(), Duration::from_secs(3));
        assert_eq!(config.prompt_settle(), Duration::from_millis(500));
        assert_eq!(config.inter_round(), Duration::from_secs(2));
        assert_eq!(config.prompt.length, 3);
        assert_eq!(config.match_policy, MatchPolicy::StrictCorrectOnly);
        assert_eq!(config.tie_break, TieBreak::FavorPlayer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = DuelConfig::from_json_str(
            r#"{
                "starting_lives": 5,
                "match_policy": "prefix_reset",
                "prompt": { "alphabet": "ABC" },
                "opponent": { "max_reaction_secs": 0.9 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.starting_lives, 5);
        assert_eq!(config.match_policy, MatchPolicy::PrefixReset);
        assert_eq!(config.prompt.length, 3);
        assert_eq!(config.prompt.alphabet, "ABC");
        assert_eq!(config.opponent.min_reaction_secs, 0.3);
        assert_eq!(config.opponent.max_reaction_secs, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_length_prompt() {
        let config = DuelConfig {
            prompt: PromptConfig { length: 0, ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "prompt.length", .. })
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = DuelConfig { starting_lives: 0, ..Default::default() };
        assert!(config.validate().is_err());

        config = DuelConfig::default();
        config.prompt.alphabet = "AB C".into();
        assert!(config.validate().is_err());

        config = DuelConfig::default();
        config.opponent.min_reaction_secs = 2.0;
        assert!(config.validate().is_err());

        config = DuelConfig::default();
        config.countdown_secs = f64::NAN;
        assert!(config.validate().is_err());

        config = DuelConfig::default();
        config.opponent.replay_jitter = 1.0;
        assert!(config.validate().is_err());

        config = DuelConfig::default();
        config.countdown_secs = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unbounded_times() {
        let mut config = DuelConfig::default();
        config.opponent.min_reaction_secs = 1e20;
        config.opponent.max_reaction_secs = 1e20;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "opponent.min_reaction_secs", .. })
        ));

        config = DuelConfig::default();
        config.opponent.max_reaction_secs = MAX_DELAY_SECS + 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "opponent.max_reaction_secs", .. })
        ));

        config = DuelConfig::default();
        config.game_over_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        config = DuelConfig::default();
        config.inter_round_secs = MAX_DELAY_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DuelConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            DuelConfig::from_json_str(r#"{ "match_policy": "lenient" }"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            DuelConfig::load("/nonexistent/quickdraw.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
