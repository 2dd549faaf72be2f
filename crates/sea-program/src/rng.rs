//! Deterministic pseudo-random rolls
//!
//! Combat and target placement both roll from this generator so that any
//! observer can replay an action stream and land on identical state.

/// Xorshift generator (Marsaglia's 13/7/17 variant)
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Seed the generator. A zero seed would lock the sequence at zero,
    /// so it is remapped to a fixed non-zero word.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x93c4_67e3_7db0_c7a4 } else { seed };
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Roll in `0..modulus`; a zero modulus rolls zero without advancing
    pub fn roll(&mut self, modulus: u64) -> u64 {
        if modulus == 0 {
            return 0;
        }
        self.next_u64() % modulus
    }

    /// Current state word, stored back into records between actions
    pub fn state(&self) -> u64 {
        self.state
    }
}
