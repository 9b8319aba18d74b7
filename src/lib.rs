// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Frequency-domain image watermarking with provenance enforcement.
//!
//! This crate embeds a small, tamper-evident [`payload::Payload`] into a
//! raster image's luminance plane (via a one-level Haar DWT, per-block
//! DCT, and QIM coefficient modulation) so that the payload survives
//! resizing and light recompression, and layers a provenance state
//! machine ([`provenance`]) on top that governs whether an incoming
//! image may be admitted as a new master, re-admitted, forked, or
//! rejected.
//!
//! The watermarked PNG is the sole ground truth: nothing in this crate
//! consults an external database or filesystem layout during recovery.

pub mod block_selector;
pub mod config;
pub mod embed;
pub mod errors;
pub mod extract;
pub mod image_io;
pub mod payload;
pub mod provenance;
pub mod qim;
pub mod rng;
pub mod selection;
pub mod transform;

pub use config::Config;
pub use embed::{embed, RasterImage, DEFAULT_QIM_STEP};
pub use errors::{PayloadError, WatermarkError};
pub use extract::extract;
pub use image_io::{decode_bytes, encode_png, read_image, resize_bgr, write_image, DecodedImage};
pub use payload::{Flags, Payload};
pub use provenance::{create_master, mint_distribution, update_master_flags, check_watermark, WatermarkReport};
