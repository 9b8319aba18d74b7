// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Inverse composition of C1-C5 with redundancy voting and multi-scale
//! retry (C7).

use crate::embed::RasterImage;
use crate::image_io::resize_bgr;
use crate::payload::Payload;
use crate::qim;
use crate::selection::rebuild_targets;
use crate::transform::{bgr_to_ycrcb, get_block, haar_dwt2, pad_to_block_multiple, BLOCK_SIZE, Dct8};

/// Longer-edge targets retried, in order, when native-scale extraction
/// fails or is low-confidence.
const SCALE_LADDER: [u32; 5] = [512, 768, 1024, 1280, 2048];
const TARGET_REDUNDANCY: f32 = 5.0;

/// Extract a payload from `image` at its native resolution only. Returns
/// `(None, confidence)` on any integrity failure or insufficient data --
/// this never panics on malformed or absent watermarks.
fn extract_at_scale(image: &RasterImage, key: &str, delta: f32) -> (Option<Payload>, f32) {
    let w = image.width as usize;
    let h = image.height as usize;

    let (y, _cr, _cb) = bgr_to_ycrcb(w, h, &image.bgr);
    let (_ll, _lh, hl, _hh) = haar_dwt2(&y);

    let (targets, mut rng) = rebuild_targets(&hl, key, image.width, image.height);
    let hl_padded = pad_to_block_multiple(&hl);
    let dct = Dct8::new();

    let payload_bits = crate::payload::PAYLOAD_LEN * 8;
    let mut extracted_bits = Vec::with_capacity(targets.len());

    for &(row, col) in &targets {
        let r0 = row * BLOCK_SIZE;
        let c0 = col * BLOCK_SIZE;
        let block = get_block(&hl_padded, r0, c0);
        let freq = dct.forward(&block);

        let pos_idx = rng.randint_below(qim::MID_FREQUENCY_POSITIONS.len() as u32) as usize;
        let (pr, pc) = qim::MID_FREQUENCY_POSITIONS[pos_idx];
        extracted_bits.push(qim::demodulate(freq[pr][pc], delta));
    }

    let copies = extracted_bits.len() / payload_bits;
    if copies == 0 {
        return (None, 0.0);
    }
    extracted_bits.truncate(copies * payload_bits);

    let mut voted = vec![false; payload_bits];
    for (i, slot) in voted.iter_mut().enumerate() {
        let votes_true: usize = (0..copies)
            .filter(|&k| extracted_bits[k * payload_bits + i])
            .count();
        // ties round up, i.e. exactly half the copies voting true is enough
        *slot = 2 * votes_true >= copies;
    }

    let confidence = (copies as f32 / TARGET_REDUNDANCY).min(1.0);

    // copies/5 is a decode-grade confidence: it only means something once
    // the voted bits actually pass Magic+CRC. A failed decode reports 0.0
    // rather than the vote count, so callers (including the multi-scale
    // loop below) never treat a confidently-wrong scale as a floor that no
    // later, correctly-decoding scale could beat.
    match Payload::from_bits(&voted) {
        Ok(payload) => (Some(payload), confidence),
        Err(_) => (None, 0.0),
    }
}

/// Extract a payload from `image`, retrying at a ladder of resized
/// resolutions when native-scale recovery fails or lands at low
/// confidence. Never raises on ordinary extraction failure; only
/// decode/shape errors in the image adapter would.
pub fn extract(image: &RasterImage, key: &str, delta: f32) -> (Option<Payload>, f32) {
    let (mut payload, mut confidence) = extract_at_scale(image, key, delta);

    if payload.is_some() && confidence > 0.6 {
        return (payload, confidence);
    }

    log::debug!(
        "extract: native scale gave confidence {confidence:.2}, trying multi-scale recovery"
    );

    let longer_edge = image.width.max(image.height);

    for &target in &SCALE_LADDER {
        let scale = target as f32 / longer_edge as f32;
        if (scale - 1.0).abs() < 0.1 {
            continue;
        }

        let new_w = ((image.width as f32) * scale).round().max(1.0) as u32;
        let new_h = ((image.height as f32) * scale).round().max(1.0) as u32;
        let resized = resize_bgr(image, new_w, new_h);

        let (candidate, candidate_confidence) = extract_at_scale(&resized, key, delta);
        if candidate.is_some() && candidate_confidence > confidence {
            log::debug!(
                "extract: {new_w}x{new_h} improved confidence to {candidate_confidence:.2}"
            );
            payload = candidate;
            confidence = candidate_confidence;

            if confidence > 0.8 {
                break;
            }
        }
    }

    (payload, confidence)
}
