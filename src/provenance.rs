// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The provenance state machine (C8): admission, minting, and permission
//! updates layered on top of the embedder/extractor.

use crate::embed::{embed, RasterImage};
use crate::errors::WatermarkError;
use crate::extract::extract;
use crate::payload::{Flags, Payload};

/// Admit `image` as a new master under `caller`'s identity:
///
/// - Unmarked images are freely admitted.
/// - The original author may always re-admit their own work.
/// - A non-owner may fork only if the existing payload allows
///   derivatives, in which case `OriginalUID` is overwritten with
///   `caller`.
/// - Otherwise the admission is refused.
pub fn create_master(
    image: &RasterImage,
    caller: u128,
    flags: Flags,
    key: &str,
    delta: f32,
) -> Result<RasterImage, WatermarkError> {
    let (existing, _confidence) = extract(image, key, delta);

    let new_payload = match existing {
        None => Payload::new(caller, 0, flags)?,
        Some(p) if p.original_uid == caller => Payload::new(caller, 0, flags)?,
        Some(p) if p.flags.allow_derivative => Payload::new(caller, 0, flags)?,
        Some(p) => {
            return Err(WatermarkError::PermissionDenied {
                original_uid: p.original_uid,
                caller,
            })
        }
    };

    log::info!(
        "create_master: caller={caller} original_uid={}",
        new_payload.original_uid
    );
    Ok(embed(image, &new_payload, key, delta))
}

/// Mint a per-recipient distribution from a master, preserving
/// `OriginalUID` and flags and never mutating the master (the caller
/// receives a new image; nothing is written in place).
pub fn mint_distribution(
    master_image: &RasterImage,
    holder_uid: u128,
    key: &str,
    delta: f32,
) -> Result<RasterImage, WatermarkError> {
    let (existing, confidence) = extract(master_image, key, delta);
    let payload = existing.ok_or(WatermarkError::Unrecoverable { confidence })?;

    if !payload.is_master() {
        return Err(WatermarkError::NotAMaster {
            current_uid: payload.current_uid,
        });
    }

    let dist_payload = Payload::new(payload.original_uid, holder_uid, payload.flags)?;
    log::info!(
        "mint_distribution: original_uid={} holder={holder_uid}",
        payload.original_uid
    );
    Ok(embed(master_image, &dist_payload, key, delta))
}

/// Re-embed a master with updated permission flags, preserving both
/// UIDs.
pub fn update_master_flags(
    master_image: &RasterImage,
    flags: Flags,
    key: &str,
    delta: f32,
) -> Result<RasterImage, WatermarkError> {
    let (existing, confidence) = extract(master_image, key, delta);
    let payload = existing.ok_or(WatermarkError::Unrecoverable { confidence })?;

    if !payload.is_master() {
        return Err(WatermarkError::NotAMaster {
            current_uid: payload.current_uid,
        });
    }

    let updated = Payload::new(payload.original_uid, 0, flags)?;
    Ok(embed(master_image, &updated, key, delta))
}

/// Read-only watermark report: extraction plus a state classification,
/// with no rendering attached (formatting it for an operator is an
/// external-collaborator concern).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkReport {
    pub width: u32,
    pub height: u32,
    pub has_watermark: bool,
    pub confidence_percent: u8,
    pub payload: Option<Payload>,
}

impl WatermarkReport {
    pub fn is_master(&self) -> bool {
        self.payload.map(|p| p.is_master()).unwrap_or(false)
    }
}

pub fn check_watermark(image: &RasterImage, key: &str, delta: f32) -> WatermarkReport {
    let (payload, confidence) = extract(image, key, delta);
    WatermarkReport {
        width: image.width,
        height: image.height,
        has_watermark: payload.is_some(),
        confidence_percent: (confidence * 100.0).round().clamp(0.0, 100.0) as u8,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::DEFAULT_QIM_STEP;

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
        RasterImage {
            width,
            height,
            bgr,
        }
    }

    const KEY: &str = "provenance-test-key";

    #[test]
    fn unmarked_image_admits_freely() {
        let img = gradient_image(768, 768);
        let master = create_master(&img, 100, Flags::default(), KEY, DEFAULT_QIM_STEP).unwrap();
        let report = check_watermark(&master, KEY, DEFAULT_QIM_STEP);
        assert!(report.is_master());
        assert_eq!(report.payload.unwrap().original_uid, 100);
    }

    #[test]
    fn non_owner_without_derivative_rights_is_denied() {
        let img = gradient_image(768, 768);
        let master = create_master(
            &img,
            100,
            Flags {
                allow_reprint: false,
                allow_derivative: false,
            },
            KEY,
            DEFAULT_QIM_STEP,
        )
        .unwrap();

        let result = create_master(&master, 200, Flags::default(), KEY, DEFAULT_QIM_STEP);
        assert!(matches!(result, Err(WatermarkError::PermissionDenied { .. })));
    }

    #[test]
    fn fork_succeeds_and_overwrites_original_uid() {
        let img = gradient_image(768, 768);
        let master = create_master(
            &img,
            100,
            Flags {
                allow_reprint: false,
                allow_derivative: true,
            },
            KEY,
            DEFAULT_QIM_STEP,
        )
        .unwrap();

        let forked = create_master(&master, 200, Flags::default(), KEY, DEFAULT_QIM_STEP).unwrap();
        let report = check_watermark(&forked, KEY, DEFAULT_QIM_STEP);
        let payload = report.payload.unwrap();
        assert_eq!(payload.original_uid, 200);
        assert_eq!(payload.current_uid, 0);
    }

    #[test]
    fn owner_can_always_readmit() {
        let img = gradient_image(768, 768);
        let master = create_master(&img, 100, Flags::default(), KEY, DEFAULT_QIM_STEP).unwrap();
        let readmitted = create_master(
            &master,
            100,
            Flags {
                allow_reprint: true,
                allow_derivative: false,
            },
            KEY,
            DEFAULT_QIM_STEP,
        )
        .unwrap();
        let payload = check_watermark(&readmitted, KEY, DEFAULT_QIM_STEP)
            .payload
            .unwrap();
        assert_eq!(payload.original_uid, 100);
        assert!(payload.flags.allow_reprint);
    }

    #[test]
    fn mint_distribution_preserves_provenance() {
        let img = gradient_image(768, 768);
        let master = create_master(
            &img,
            1,
            Flags {
                allow_reprint: false,
                allow_derivative: false,
            },
            KEY,
            DEFAULT_QIM_STEP,
        )
        .unwrap();

        let dist = mint_distribution(&master, 42, KEY, DEFAULT_QIM_STEP).unwrap();
        let payload = check_watermark(&dist, KEY, DEFAULT_QIM_STEP).payload.unwrap();
        assert_eq!(payload.original_uid, 1);
        assert_eq!(payload.current_uid, 42);
        assert!(!payload.flags.allow_derivative);

        // minting never mutates the master
        let master_payload = check_watermark(&master, KEY, DEFAULT_QIM_STEP).payload.unwrap();
        assert!(master_payload.is_master());
    }

    #[test]
    fn mint_distribution_requires_master() {
        let img = gradient_image(768, 768);
        let master = create_master(&img, 1, Flags::default(), KEY, DEFAULT_QIM_STEP).unwrap();
        let dist = mint_distribution(&master, 42, KEY, DEFAULT_QIM_STEP).unwrap();

        let result = mint_distribution(&dist, 99, KEY, DEFAULT_QIM_STEP);
        assert!(matches!(result, Err(WatermarkError::NotAMaster { .. })));
    }

    #[test]
    fn flag_updates_are_idempotent_and_preserve_original_uid() {
        let img = gradient_image(768, 768);
        let master = create_master(&img, 5, Flags::default(), KEY, DEFAULT_QIM_STEP).unwrap();

        let step1 = update_master_flags(
            &master,
            Flags {
                allow_reprint: true,
                allow_derivative: false,
            },
            KEY,
            DEFAULT_QIM_STEP,
        )
        .unwrap();
        let step2 = update_master_flags(
            &step1,
            Flags {
                allow_reprint: false,
                allow_derivative: true,
            },
            KEY,
            DEFAULT_QIM_STEP,
        )
        .unwrap();

        let payload = check_watermark(&step2, KEY, DEFAULT_QIM_STEP).payload.unwrap();
        assert_eq!(payload.original_uid, 5);
        assert!(!payload.flags.allow_reprint);
        assert!(payload.flags.allow_derivative);
    }
}
