//! Deterministic pseudo-random source for the `noise` filter.
//!
//! A MINSTD linear congruential generator: tiny, portable, and fully
//! reproducible from a seed, so a seeded noise pass yields the same
//! pixels no matter how it is sliced.

/// MINSTD multiplier.
const MULTIPLIER: u64 = 48_271;

/// MINSTD modulus (2^31 - 1).
const MODULUS: u64 = 2_147_483_647;

/// A seed taken from the wall clock, for runs that did not ask for one.
#[must_use]
pub fn seed_from_time() -> u64 {
    web_time::SystemTime::now()
        .duration_since(web_time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs().rotate_left(32) ^ u64::from(d.subsec_nanos()))
}

/// Seeded MINSTD generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoiseRng {
    state: u64,
}

impl NoiseRng {
    /// Create a generator from `seed`.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        // A zero state would stay zero forever.
        let state = seed % MODULUS;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Next raw value in `1..MODULUS`.
    pub const fn next_u32(&mut self) -> u32 {
        self.state = (self.state * MULTIPLIER) % MODULUS;
        #[allow(clippy::cast_possible_truncation)]
        let value = self.state as u32;
        value
    }

    /// Uniform value in `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / MODULUS as f64
    }
}
