//! Time-advance modes, the tick counter, and the lockstep state hash.
//!
//! Tick and delta mode run the same step. Delta mode only decides how many
//! steps a given `advance()` call is worth.

use std::hash::Hasher;

use crate::fixed::Ticks;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum SimulationStrategy {
    /// Every `advance()` runs exactly one step.
    #[default]
    Tick,

    /// `advance(dt)` banks `dt` and runs one step per `fixed_timestep`
    /// banked. Leftover time carries into the next call.
    Delta { fixed_timestep: Ticks },
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Completed steps.
    pub tick: Ticks,
    /// Banked delta-mode time.
    pub accumulator: Ticks,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What one `advance()` or `run_steps()` call did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AdvanceResult {
    pub steps_run: u64,
    pub events_delivered: usize,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// 64-bit FNV-1a over little-endian bytes. Two engines fed the same inputs
/// produce the same sequence of hashes on any platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0100_0000_01b3;

impl StateHash {
    pub fn new() -> Self {
        Self(OFFSET_BASIS)
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StateHash {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &b| (h ^ u64::from(b)).wrapping_mul(PRIME));
    }

    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_of(words: &[u32]) -> u64 {
        let mut h = StateHash::new();
        for &w in words {
            h.write_u32(w);
        }
        h.finish()
    }

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(StateHash::new().finish(), OFFSET_BASIS);
    }

    #[test]
    fn known_fnv1a_vector() {
        let mut h = StateHash::new();
        h.write(b"a");
        assert_eq!(h.finish(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn same_words_same_hash() {
        assert_eq!(hash_of(&[3, 1, 4]), hash_of(&[3, 1, 4]));
    }

    #[test]
    fn word_order_changes_hash() {
        assert_ne!(hash_of(&[1, 2]), hash_of(&[2, 1]));
    }
}
