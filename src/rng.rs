// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Key-derived, format-pinned pseudo-random generator (C2).
//!
//! The wire format is married to one specific RNG: NumPy's legacy
//! `RandomState`, which is a classic MT19937 Mersenne Twister seeded via
//! `init_genrand` (the seed here is always a plain 32-bit integer, so the
//! array-seeding path numpy uses for larger/array seeds never triggers).
//! Every prior-embedded image in the field depends on this exact sequence,
//! so the generator below is a direct port of `init_genrand` /
//! `genrand_uint32`, plus the masked-rejection bounded sampler
//! (`rk_interval`) that both `shuffle` and `randint` reduce to for ranges
//! that fit in 32 bits.

use sha2::{Digest, Sha256};

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Derive the 32-bit seed for a given key and image size: the first 4
/// bytes (big-endian) of `SHA-256("{key}_{w}_{h}")`.
pub fn derive_seed(key: &str, width: u32, height: u32) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(format!("{key}_{width}_{height}").as_bytes());
    let digest = hasher.finalize();
    u32::from_be_bytes(digest[0..4].try_into().unwrap())
}

/// A from-scratch MT19937 matching NumPy's legacy `RandomState`.
pub struct LegacyMt19937 {
    state: [u32; N],
    index: usize,
}

impl LegacyMt19937 {
    pub fn new(seed: u32) -> Self {
        let mut state = [0u32; N];
        state[0] = seed;
        for i in 1..N {
            state[i] = (1812433253u32.wrapping_mul(state[i - 1] ^ (state[i - 1] >> 30)))
                .wrapping_add(i as u32);
        }
        LegacyMt19937 { state, index: N }
    }

    fn regenerate(&mut self) {
        for kk in 0..N {
            let y = (self.state[kk] & UPPER_MASK) | (self.state[(kk + 1) % N] & LOWER_MASK);
            let mag = if y & 1 != 0 { MATRIX_A } else { 0 };
            self.state[kk] = self.state[(kk + M) % N] ^ (y >> 1) ^ mag;
        }
        self.index = 0;
    }

    /// Raw tempered 32-bit output, equivalent to `genrand_uint32`.
    pub fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.regenerate();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^= y >> 18;
        y
    }

    /// Uniform integer in `[0, max_inclusive]` via masked rejection
    /// sampling (NumPy's `rk_interval`).
    pub fn bounded(&mut self, max_inclusive: u32) -> u32 {
        if max_inclusive == 0 {
            return 0;
        }
        let mut mask = max_inclusive;
        mask |= mask >> 1;
        mask |= mask >> 2;
        mask |= mask >> 4;
        mask |= mask >> 8;
        mask |= mask >> 16;

        loop {
            let value = self.next_u32() & mask;
            if value <= max_inclusive {
                return value;
            }
        }
    }

    /// NumPy `RandomState.randint(0, high)`: uniform in `[0, high)`.
    pub fn randint_below(&mut self, high: u32) -> u32 {
        self.bounded(high - 1)
    }

    /// In-place Fisher-Yates shuffle matching NumPy's legacy `shuffle`:
    /// for `i` from `n-1` down to `1`, swap `x[i]` with `x[j]` where `j`
    /// is uniform over `[0, i]`.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.bounded(i as u32) as usize;
            items.swap(i, j);
        }
    }
}
