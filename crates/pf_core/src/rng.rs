// crates/pf_core/src/rng.rs
//
// Deterministic, integer-only RNG for drawing observation samples in backtests.
// Predictions themselves never consume randomness; ties are broken by input order.
//
// • Seeding: the 64-bit seed goes little-endian into the first 8 bytes of the
//   ChaCha20 seed; the remaining 24 bytes are zero.
// • Unbiased ranges via rejection sampling; no floating point.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Seeded sampler (ChaCha20).
#[derive(Debug, Clone)]
pub struct SampleRng {
    rng: ChaCha20Rng,
}

impl SampleRng {
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self { rng: ChaCha20Rng::from_seed(seed32) }
    }


    /// Unbiased integer in [0, n); `None` if `n == 0`.
    ///
    /// `threshold = 2^64 mod n`; accept `x >= threshold`, then `x % n` is uniform.
    #[inline]
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let x = self.rng.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// `k` distinct positions out of `0..n`, in draw order (`k` is clamped to `n`).
    ///
    /// Partial Fisher–Yates: only the first `k` slots are settled.
    pub fn sample_positions(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            if let Some(off) = self.gen_range((n - i) as u64) {
                pool.swap(i, i + off as usize);
            }
        }
        pool.truncate(k);
        pool
    }
}
