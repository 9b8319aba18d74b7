// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Crate-level configuration (C10). Loaded from a TOML file, with
//! `Default`-equivalent fallbacks for fields that are genuinely
//! optional.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::embed::DEFAULT_QIM_STEP;
use crate::errors::WatermarkError;

/// `toml` represents integers as `i64`, which cannot carry the full
/// 96-bit UID range identifiers are allowed to span. Accept either a
/// plain TOML integer (the common case) or a decimal string, so operators with a
/// UID beyond `i64::MAX` can still quote it in `config.toml`.
fn deserialize_uid<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UidRepr {
        Int(i64),
        Str(String),
    }

    match UidRepr::deserialize(deserializer)? {
        UidRepr::Int(v) => Ok(v as u128),
        UidRepr::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn default_qim_step() -> f32 {
    DEFAULT_QIM_STEP
}

fn default_workers() -> usize {
    4
}

/// Options recognized by the codec and the batch CLI harness. Fields
/// belonging to a chat-bot command surface (`bot_token`,
/// `auto_cleanup`) are intentionally absent; that surface is a separate
/// collaborator and out of this crate's scope.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Secret driving the block shuffle and coefficient position (C2).
    pub watermark_key: String,

    /// Quantization step `delta` (C5).
    #[serde(default = "default_qim_step")]
    pub qim_step: f32,

    /// Default caller identity used by batch tools.
    #[serde(deserialize_with = "deserialize_uid")]
    pub owner_uuid: u128,

    #[serde(default)]
    pub allow_reprint: bool,
    #[serde(default)]
    pub allow_derivative: bool,

    /// Parallelism hint for the batch CLI; does not affect per-call
    /// codec semantics.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_master_dir")]
    pub master_dir: String,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
}

fn default_master_dir() -> String {
    "storage/masters".to_string()
}
fn default_dist_dir() -> String {
    "storage/distribution".to_string()
}
fn default_input_dir() -> String {
    "input_images".to_string()
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WatermarkError> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| WatermarkError::Config(e.to_string()))
    }
}
