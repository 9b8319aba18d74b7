// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Glue between the block selector (C3) and the key-derived RNG (C2):
//! reconstructing the exact, order-locked sequence of embedding targets
//! that both the embedder and the extractor must agree on.

use crate::block_selector::{select_block_pool, MIN_BLOCKS};
use crate::rng::{derive_seed, LegacyMt19937};
use crate::transform::Plane;

/// Rebuilds `B_embed`: seed the RNG from `(key, width, height)`, shuffle
/// the coordinate-anchored buffer pool in place, and take the first
/// `MIN_BLOCKS` coordinates (or fewer, on subbands too small to fill the
/// pool). Returns the coordinates alongside the RNG, already advanced
/// past the shuffle call, so the caller can continue drawing the
/// per-block mid-frequency position with the identical call sequence
/// used at embed time.
pub fn rebuild_targets(
    hl: &Plane,
    key: &str,
    width: u32,
    height: u32,
) -> (Vec<(usize, usize)>, LegacyMt19937) {
    let mut pool = select_block_pool(hl);
    let seed = derive_seed(key, width, height);
    let mut rng = LegacyMt19937::new(seed);
    rng.shuffle(&mut pool);

    pool.truncate(MIN_BLOCKS);
    (pool, rng)
}
