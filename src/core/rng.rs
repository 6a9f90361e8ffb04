//! Seeded Randomness
//!
//! Prompts and opponent reaction times come from separate named streams of
//! one session seed, so a seeded session deals the same duel no matter how
//! the human types.

use sha2::{Sha256, Digest};

/// Xorshift128+ generator, seeded through SplitMix64.
///
/// ```
/// use quickdraw::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::for_stream(7, "prompt");
/// let mut b = DeterministicRng::for_stream(7, "prompt");
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    s0: u64,
    s1: u64,
}

impl DeterministicRng {
    /// Seed a generator directly.
    pub fn new(seed: u64) -> Self {
        let mut mix = seed;
        let s0 = splitmix64(&mut mix);
        let s1 = splitmix64(&mut mix);
        // Xorshift is stuck at zero forever
        if s0 | s1 == 0 {
            return Self { s0: 1, s1: 1 };
        }
        Self { s0, s1 }
    }

    /// Generator for one named stream of a session.
    pub fn for_stream(session_seed: u64, stream: &str) -> Self {
        Self::new(derive_seed(session_seed, stream))
    }

    /// Next raw value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let (a, mut b) = (self.s0, self.s1);
        let out = a.wrapping_add(b);
        b ^= a;
        self.s0 = a.rotate_left(24) ^ b ^ (b << 16);
        self.s1 = b.rotate_left(37);
        out
    }

    /// Index in `0..len`; 0 when `len` is 0.
    #[inline]
    fn below(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_u64() % len as u64) as usize
    }

    /// Uniform in `[0, 1)`, from the top 53 bits.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (1u64 << 53) as f64;
        (self.next_u64() >> 11) as f64 * SCALE
    }

    /// Uniform in `[min, max)`. Returns `min` for an empty or inverted range.
    #[inline]
    pub fn next_f64_range(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        min + (max - min) * self.next_f64()
    }

    /// Pick one element, or `None` from an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        let i = self.below(items.len());
        items.get(i)
    }
}

#[inline]
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

fn digest_u64(domain: &[u8], parts: &[&[u8]]) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Seed for the named `stream` of a session.
pub fn derive_seed(session_seed: u64, stream: &str) -> u64 {
    digest_u64(b"QUICKDRAW_SEED_V1", &[&session_seed.to_le_bytes(), stream.as_bytes()])
}

/// Session seed for an unseeded session, from its UUID bytes.
pub fn seed_from_session_id(session_id: &[u8; 16]) -> u64 {
    digest_u64(b"QUICKDRAW_SESSION_V1", &[session_id])
}
