//! Prompt Generation
//!
//! A prompt is the character sequence both duelists race to reproduce.

use std::fmt;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::rng::DeterministicRng;

/// Default prompt length.
pub const DEFAULT_PROMPT_LENGTH: usize = 3;

/// Default alphabet: uppercase letters and digits.
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Immutable target sequence for one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Prompt {
    chars: Vec<char>,
}

impl Prompt {
    /// Build a prompt from text. Characters are kept as given.
    pub fn new(text: &str) -> Self {
        Self { chars: text.chars().collect() }
    }

    /// Number of characters.
    #[inline]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// True for the zero-length prompt.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Character at `index`.
    #[inline]
    pub fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// All characters in order.
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Uppercased copy, used as the input tracker's target.
    pub fn to_uppercase(&self) -> Prompt {
        Self { chars: self.chars.iter().map(|c| uppercase(*c)).collect() }
    }

    /// Whether `typed` is a prefix of this prompt.
    pub fn starts_with(&self, typed: &[char]) -> bool {
        self.chars.starts_with(typed)
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self::new(&text)
    }
}

impl From<Prompt> for String {
    fn from(prompt: Prompt) -> Self {
        prompt.to_string()
    }
}

/// Single-character uppercase mapping.
///
/// Characters whose uppercase form expands to several code points map to
/// the first of them.
#[inline]
pub fn uppercase(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

/// Source of prompts, queried once per round.
pub trait PromptSource: Send {
    /// Produce the next prompt.
    fn generate(&mut self) -> Prompt;
}

/// Uniform random prompts over a fixed alphabet.
#[derive(Clone, Debug)]
pub struct RandomPromptSource {
    length: usize,
    alphabet: Vec<char>,
    rng: DeterministicRng,
}

impl RandomPromptSource {
    /// Create a source. Duplicate alphabet characters are kept and weigh
    /// the draw accordingly.
    pub fn new(length: usize, alphabet: &str, rng: DeterministicRng) -> Self {
        Self {
            length,
            alphabet: alphabet.chars().collect(),
            rng,
        }
    }
}

impl PromptSource for RandomPromptSource {
    fn generate(&mut self) -> Prompt {
        let mut chars = Vec::with_capacity(self.length);
        for _ in 0..self.length {
            if let Some(c) = self.rng.choose(&self.alphabet) {
                chars.push(*c);
            }
        }
        let prompt = Prompt { chars };
        debug!(%prompt, "generated prompt");
        prompt
    }
}

/// Replays a fixed list of prompts, cycling when exhausted.
#[derive(Clone, Debug)]
pub struct ScriptedPromptSource {
    prompts: Vec<Prompt>,
    next: usize,
}

impl ScriptedPromptSource {
    /// Create from prompt texts.
    pub fn new<I, S>(prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prompts: prompts.into_iter().map(|p| Prompt::new(p.as_ref())).collect(),
            next: 0,
        }
    }
}

impl PromptSource for ScriptedPromptSource {
    fn generate(&mut self) -> Prompt {
        if self.prompts.is_empty() {
            return Prompt::new("");
        }
        let prompt = self.prompts[self.next % self.prompts.len()].clone();
        self.next += 1;
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_prompt_shape() {
        let mut source = RandomPromptSource::new(
            DEFAULT_PROMPT_LENGTH,
            DEFAULT_ALPHABET,
            DeterministicRng::new(1),
        );
        for _ in 0..200 {
            let prompt = source.generate();
            assert_eq!(prompt.len(), 3);
            assert!(prompt.chars().iter().all(|c| DEFAULT_ALPHABET.contains(*c)));
        }
    }

    #[test]
    fn test_seeded_sources_agree() {
        let mut a = RandomPromptSource::new(5, "ABC", DeterministicRng::new(77));
        let mut b = RandomPromptSource::new(5, "ABC", DeterministicRng::new(77));
        for _ in 0..20 {
            assert_eq!(a.generate(), b.generate());
        }
    }

    #[test]
    fn test_prompt_helpers() {
        let prompt = Prompt::new("a1b");
        assert_eq!(prompt.to_uppercase().to_string(), "A1B");
        assert_eq!(prompt.char_at(1), Some('1'));
        assert_eq!(prompt.char_at(3), None);
        assert!(prompt.starts_with(&['a', '1']));
        assert!(!prompt.starts_with(&['a', 'b']));
    }

    #[test]
    fn test_scripted_cycles() {
        let mut source = ScriptedPromptSource::new(["ABC", "XYZ"]);
        assert_eq!(source.generate().to_string(), "ABC");
        assert_eq!(source.generate().to_string(), "XYZ");
        assert_eq!(source.generate().to_string(), "ABC");

        let mut empty = ScriptedPromptSource::new(Vec::<String>::new());
        assert!(empty.generate().is_empty());
    }

    #[test]
    fn test_prompt_serializes_as_string() {
        let prompt = Prompt::new("Q7Z");
        let json = serde_json::to_string(&prompt).unwrap();
        assert_eq!(json, "\"Q7Z\"");
        let back: Prompt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prompt);
    }

    proptest! {
        #[test]
        fn prop_prompt_uses_alphabet(
            seed in any::<u64>(),
            length in 1usize..12,
            alphabet in "[A-Z0-9]{1,36}",
        ) {
            let mut source =
                RandomPromptSource::new(length, &alphabet, DeterministicRng::new(seed));
            let prompt = source.generate();
            prop_assert_eq!(prompt.len(), length);
            prop_assert!(prompt.chars().iter().all(|c| alphabet.contains(*c)));
        }
    }
}
