// Licensed under the Apache License, Version 2.0. See LICENSE for details.

use std::fmt;

/// Integrity failure of a 32-byte payload frame (C1).
///
/// These never propagate past the extractor: a `PayloadError` anywhere in
/// the voted bit stream just means "no watermark here", not "something
/// went wrong".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    BadLength,
    BadMagic,
    BadCrc,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::BadLength => write!(f, "payload is not 32 bytes"),
            PayloadError::BadMagic => write!(f, "payload magic mismatch"),
            PayloadError::BadCrc => write!(f, "payload CRC-32 mismatch"),
        }
    }
}

impl std::error::Error for PayloadError {}

/// Public error surface for the codec and provenance policy.
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("no watermark could be recovered at any scale (confidence {confidence:.2})")]
    Unrecoverable { confidence: f32 },

    #[error("operation requires a master image, but current holder is {current_uid}")]
    NotAMaster { current_uid: u128 },

    #[error("caller {caller} is not the original author {original_uid} and derivative works are not allowed")]
    PermissionDenied { original_uid: u128, caller: u128 },

    #[error("identifier {0} does not fit in 96 bits")]
    UidOverflow(u128),

    #[error("source bytes could not be decoded as a raster image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
