// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Quantization Index Modulation (C5): encode one bit by snapping a
//! coefficient to an even or odd multiple of the step `delta`.

/// The seven mid-frequency (row, col) positions a block's embedding
/// coefficient is drawn from, in the RNG-indexed order fixed by the wire
/// format.
pub const MID_FREQUENCY_POSITIONS: [(usize, usize); 7] =
    [(2, 1), (1, 2), (2, 2), (3, 1), (1, 3), (3, 2), (2, 3)];

/// Modulate `coeff` so that `round(result / delta) % 2 == bit as i64 % 2`.
pub fn modulate(coeff: f32, bit: bool, delta: f32) -> f32 {
    let mut q = (coeff / delta).round() as i64;
    let parity = q.rem_euclid(2) != 0;
    if parity != bit {
        q += if bit { 1 } else { -1 };
    }
    q as f32 * delta
}

/// Recover the bit QIM encoded into `coeff`.
pub fn demodulate(coeff: f32, delta: f32) -> bool {
    let q = (coeff / delta).round() as i64;
    q.rem_euclid(2) != 0
}
