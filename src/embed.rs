// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Composes C1-C5 into the embedder (C6).

use crate::payload::Payload;
use crate::qim;
use crate::selection::rebuild_targets;
use crate::transform::{
    bgr_to_ycrcb, get_block, haar_dwt2, haar_idwt2, pad_to_block_multiple, set_block,
    ycrcb_to_bgr, BLOCK_SIZE, Dct8,
};

pub const DEFAULT_QIM_STEP: f32 = 40.0;

/// A decoded BGR raster, the in-memory unit [`embed`] and [`crate::extract::extract`]
/// operate on.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row-major, 3 bytes (B, G, R) per pixel.
    pub bgr: Vec<u8>,
}

/// Embed `payload` into `image`, returning a new watermarked raster.
///
/// This rebuilds `B_embed` via the key-derived RNG (C2) and the block
/// selector (C3), then for each target block in order: forward-DCT the
/// block, pick a mid-frequency coefficient position via the RNG, QIM
/// modulate it with the next payload bit (wrapping every 256 bits), and
/// inverse-DCT back. Effective redundancy is `|B_embed| / 256`.
pub fn embed(image: &RasterImage, payload: &Payload, key: &str, delta: f32) -> RasterImage {
    let w = image.width as usize;
    let h = image.height as usize;

    let (y, cr, cb) = bgr_to_ycrcb(w, h, &image.bgr);
    let (ll, lh, hl, hh) = haar_dwt2(&y);

    let (targets, mut rng) = rebuild_targets(&hl, key, image.width, image.height);
    log::debug!(
        "embed: {}x{} image, {} target blocks ({:.1}x redundancy)",
        image.width,
        image.height,
        targets.len(),
        targets.len() as f32 / (crate::payload::PAYLOAD_LEN * 8) as f32
    );

    let bits = payload.to_bits();
    let dct = Dct8::new();

    let (hl_h, hl_w) = (hl.height, hl.width);
    let mut hl_padded = pad_to_block_multiple(&hl);

    for (i, &(row, col)) in targets.iter().enumerate() {
        let bit = bits[i % bits.len()];
        let r0 = row * BLOCK_SIZE;
        let c0 = col * BLOCK_SIZE;

        let block = get_block(&hl_padded, r0, c0);
        let mut freq = dct.forward(&block);

        let pos_idx = rng.randint_below(qim::MID_FREQUENCY_POSITIONS.len() as u32) as usize;
        let (pr, pc) = qim::MID_FREQUENCY_POSITIONS[pos_idx];
        freq[pr][pc] = qim::modulate(freq[pr][pc], bit, delta);

        let spatial = dct.inverse(&freq);
        set_block(&mut hl_padded, r0, c0, &spatial);
    }

    let hl_watermarked = crate::transform::crop(&hl_padded, hl_h, hl_w);
    let y_watermarked = haar_idwt2(&ll, &lh, &hl_watermarked, &hh, h, w);
    let bgr = ycrcb_to_bgr(&y_watermarked, &cr, &cb);

    RasterImage {
        width: image.width,
        height: image.height,
        bgr,
    }
}
