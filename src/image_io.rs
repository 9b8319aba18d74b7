// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Path-tolerant raster decode and metadata-preserving PNG encode (C9).

use std::io::Cursor;
use std::path::Path;

use image::imageops::FilterType;
use image::{ImageBuffer, Rgb};

use crate::embed::RasterImage;
use crate::errors::WatermarkError;

/// A decoded raster plus whatever ancillary textual metadata the source
/// PNG carried (empty for non-PNG sources, which have no such chunks).
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub raster: RasterImage,
    pub text_metadata: Vec<(String, String)>,
}

/// Reads the raw bytes of any filesystem path (including non-ASCII
/// paths, since the file is opened and decoded purely in memory) and
/// decodes it as a raster image.
pub fn read_image(path: impl AsRef<Path>) -> Result<DecodedImage, WatermarkError> {
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes)
}

/// Decode raw image bytes of any format the `image` crate recognizes.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedImage, WatermarkError> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut bgr = vec![0u8; rgb.as_raw().len()];
    for (px, out) in rgb.pixels().zip(bgr.chunks_exact_mut(3)) {
        out[0] = px.0[2];
        out[1] = px.0[1];
        out[2] = px.0[0];
    }

    let text_metadata = read_png_text_chunks(bytes).unwrap_or_default();

    Ok(DecodedImage {
        raster: RasterImage { width, height, bgr },
        text_metadata,
    })
}

fn read_png_text_chunks(bytes: &[u8]) -> Option<Vec<(String, String)>> {
    let decoder = png::Decoder::new(Cursor::new(bytes));
    let reader = decoder.read_info().ok()?;
    let info = reader.info();

    let mut out = Vec::new();
    for chunk in &info.uncompressed_latin1_text {
        out.push((chunk.keyword.clone(), chunk.text.clone()));
    }
    for chunk in &info.compressed_latin1_text {
        if let Ok(text) = chunk.get_text() {
            out.push((chunk.keyword.clone(), text));
        }
    }
    for chunk in &info.utf8_text {
        if let Ok(text) = chunk.get_text() {
            out.push((chunk.keyword.clone(), text));
        }
    }
    Some(out)
}

/// Encode `raster` as PNG, replaying `text_metadata` as `tEXt` chunks
/// verbatim so third-party consumers reading embedded textual metadata
/// keep working.
pub fn encode_png(
    raster: &RasterImage,
    text_metadata: &[(String, String)],
) -> Result<Vec<u8>, WatermarkError> {
    let mut rgb = vec![0u8; raster.bgr.len()];
    for (bgr_px, rgb_px) in raster.bgr.chunks_exact(3).zip(rgb.chunks_exact_mut(3)) {
        rgb_px[0] = bgr_px[2];
        rgb_px[1] = bgr_px[1];
        rgb_px[2] = bgr_px[0];
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(Cursor::new(&mut out), raster.width, raster.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        for (keyword, text) in text_metadata {
            encoder
                .add_text_chunk(keyword.clone(), text.clone())
                .map_err(|e| WatermarkError::Config(format!("failed to write PNG text chunk: {e}")))?;
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| WatermarkError::Config(format!("failed to write PNG header: {e}")))?;
        writer
            .write_image_data(&rgb)
            .map_err(|e| WatermarkError::Config(format!("failed to write PNG image data: {e}")))?;
    }

    Ok(out)
}

/// Write `raster` to `path` as PNG, preserving `text_metadata`.
pub fn write_image(
    path: impl AsRef<Path>,
    raster: &RasterImage,
    text_metadata: &[(String, String)],
) -> Result<(), WatermarkError> {
    let bytes = encode_png(raster, text_metadata)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Resize a BGR raster with a high-quality (Lanczos-class) filter;
/// preserving aspect ratio is the caller's responsibility.
pub fn resize_bgr(image: &RasterImage, new_width: u32, new_height: u32) -> RasterImage {
    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(image.width, image.height, image.bgr.clone())
            .expect("raster dimensions must match buffer length");

    let resized = image::imageops::resize(&buffer, new_width, new_height, FilterType::Lanczos3);

    RasterImage {
        width: new_width,
        height: new_height,
        bgr: resized.into_raw(),
    }
}
