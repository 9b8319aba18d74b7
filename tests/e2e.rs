// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! End-to-end watermarking scenarios: embed/extract round-trips under
//! resizing and lossy re-encoding, and the provenance state machine
//! driven through actual PNG files on disk.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rstest::rstest;
use tempfile::tempdir;

use provmark::{
    check_watermark, create_master, decode_bytes, encode_png, extract, mint_distribution,
    read_image, resize_bgr, update_master_flags, write_image, Flags, Payload, RasterImage,
    WatermarkError,
};

const KEY: &str = "e2e-test-key";

/// A smooth, natural-ish gradient, the kind of input the embedder is
/// expected to recover cleanly at full confidence.
fn gradient_image(width: u32, height: u32) -> RasterImage {
    let w = width as usize;
    let h = height as usize;
    let mut bgr = vec![0u8; w * h * 3];
    for r in 0..h {
        for c in 0..w {
            let i = r * w + c;
            bgr[i * 3] = (c * 255 / w.max(1)) as u8;
            bgr[i * 3 + 1] = (r * 255 / h.max(1)) as u8;
            bgr[i * 3 + 2] = ((r + c) * 255 / (w + h).max(1)) as u8;
        }
    }
    RasterImage { width, height, bgr }
}

/// Mild pixel jitter on top of the gradient, standing in for the kind of
/// lossy re-encoding a JPEG pass would introduce, without depending on
/// an external JPEG tool's exact quantization tables.
fn jitter(image: &RasterImage, seed: u64, amplitude: i16) -> RasterImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = image.clone();
    for byte in out.bgr.iter_mut() {
        let delta = rng.gen_range(-amplitude..=amplitude);
        *byte = (*byte as i16 + delta).clamp(0, 255) as u8;
    }
    out
}

#[rstest]
#[case::step_20(20.0)]
#[case::step_40(40.0)]
#[case::step_60(60.0)]
fn embed_extract_round_trip_on_gradient(#[case] delta: f32) {
    let img = gradient_image(512, 512);
    let payload = Payload::new(1, 0, Flags::default()).unwrap();

    let watermarked = provmark::embed(&img, &payload, KEY, delta);
    let (extracted, confidence) = extract(&watermarked, KEY, delta);

    assert_eq!(extracted, Some(payload));
    assert!(confidence >= 0.8, "confidence was {confidence}");
}

#[test]
fn survives_upscale_via_multiscale_recovery() {
    let img = gradient_image(512, 512);
    let payload = Payload::new(7, 0, Flags::default()).unwrap();
    let watermarked = provmark::embed(&img, &payload, KEY, 40.0);

    let upscaled = resize_bgr(&watermarked, 1024, 1024);
    let (extracted, confidence) = extract(&upscaled, KEY, 40.0);

    assert_eq!(extracted, Some(payload));
    assert!(confidence >= 0.8, "confidence was {confidence}");
}

#[test]
fn survives_mild_pixel_jitter() {
    let img = gradient_image(768, 768);
    let payload = Payload::new(3, 0, Flags::default()).unwrap();
    let watermarked = provmark::embed(&img, &payload, KEY, 40.0);

    let degraded = jitter(&watermarked, 42, 4);
    let (extracted, confidence) = extract(&degraded, KEY, 40.0);

    assert_eq!(extracted, Some(payload));
    assert!(confidence >= 0.6, "confidence was {confidence}");
}

#[test]
fn fork_without_derivative_rights_is_denied() {
    let img = gradient_image(768, 768);
    let master = create_master(&img, 100, Flags::default(), KEY, 40.0).unwrap();

    let result = create_master(&master, 200, Flags::default(), KEY, 40.0);
    assert!(matches!(
        result,
        Err(WatermarkError::PermissionDenied {
            original_uid: 100,
            caller: 200
        })
    ));
}

#[test]
fn fork_with_derivative_rights_overwrites_original_uid() {
    let img = gradient_image(768, 768);
    let master = create_master(
        &img,
        100,
        Flags {
            allow_reprint: false,
            allow_derivative: true,
        },
        KEY,
        40.0,
    )
    .unwrap();

    let forked = create_master(&master, 200, Flags::default(), KEY, 40.0).unwrap();
    let report = check_watermark(&forked, KEY, 40.0);
    let payload = report.payload.unwrap();

    assert!(report.is_master());
    assert_eq!(payload.original_uid, 200);
    assert_eq!(payload.current_uid, 0);
}

#[test]
fn mint_distribution_round_trip() {
    let img = gradient_image(768, 768);
    let master = create_master(&img, 1, Flags::default(), KEY, 40.0).unwrap();

    let dist = mint_distribution(&master, 42, KEY, 40.0).unwrap();
    let payload = check_watermark(&dist, KEY, 40.0).payload.unwrap();

    assert_eq!(payload.original_uid, 1);
    assert_eq!(payload.current_uid, 42);
    assert_eq!(payload.flags, Flags::default());
}

#[test]
fn key_sensitivity_wrong_key_fails_to_recover() {
    let img = gradient_image(512, 512);
    let payload = Payload::new(9, 0, Flags::default()).unwrap();
    let watermarked = provmark::embed(&img, &payload, "right-key", 40.0);

    let (extracted, _) = extract(&watermarked, "wrong-key", 40.0);
    assert_ne!(extracted, Some(payload));
}

#[test]
fn master_flag_updates_are_idempotent_through_disk_round_trip() {
    let dir = tempdir().unwrap();
    let img = gradient_image(512, 512);
    let master = create_master(&img, 5, Flags::default(), KEY, 40.0).unwrap();

    let path = dir.path().join("master.png");
    write_image(&path, &master, &[]).unwrap();

    let decoded = read_image(&path).unwrap();
    let updated = update_master_flags(
        &decoded.raster,
        Flags {
            allow_reprint: true,
            allow_derivative: true,
        },
        KEY,
        40.0,
    )
    .unwrap();

    let report = check_watermark(&updated, KEY, 40.0);
    let payload = report.payload.unwrap();
    assert_eq!(payload.original_uid, 5);
    assert!(payload.flags.allow_reprint);
    assert!(payload.flags.allow_derivative);
}

#[test]
fn text_metadata_survives_full_sign_and_reload_cycle() {
    let dir = tempdir().unwrap();
    let img = gradient_image(256, 256);
    let metadata = vec![("chara".to_string(), "a character card".to_string())];

    let png_bytes = encode_png(&img, &metadata).unwrap();
    let source_path = dir.path().join("source.png");
    std::fs::write(&source_path, png_bytes).unwrap();

    let decoded = read_image(&source_path).unwrap();
    assert_eq!(decoded.text_metadata, metadata);

    let master = create_master(&decoded.raster, 1, Flags::default(), KEY, 40.0).unwrap();
    let out_path = dir.path().join("master.png");
    write_image(&out_path, &master, &decoded.text_metadata).unwrap();

    let reloaded = decode_bytes(&std::fs::read(&out_path).unwrap()).unwrap();
    assert_eq!(reloaded.text_metadata, metadata);

    let report = check_watermark(&reloaded.raster, KEY, 40.0);
    assert!(report.is_master());
    assert_eq!(report.payload.unwrap().original_uid, 1);
}
