// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The 32-byte framed watermark payload (C1).
//!
//! Layout (big-endian):
//!
//! ```text
//! [0..2)   magic        0x53 0x47
//! [2..14)  original_uid 12 bytes, up to 2^96 - 1
//! [14..26) current_uid  12 bytes, 0 == master
//! [26]     flags        bit0 reprint, bit1 derivative
//! [27..31) crc32        IEEE CRC-32 over bytes [2..27)
//! [31]     padding      0x00
//! ```

use crate::errors::{PayloadError, WatermarkError};

pub const PAYLOAD_LEN: usize = 32;
pub const MAGIC: [u8; 2] = [0x53, 0x47];

/// Largest value that fits in a 12-byte (96-bit) identifier field.
pub const MAX_UID: u128 = (1u128 << 96) - 1;

/// Permission bits carried alongside a master or distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub allow_reprint: bool,
    pub allow_derivative: bool,
}

impl Flags {
    fn to_byte(self) -> u8 {
        (self.allow_reprint as u8) | ((self.allow_derivative as u8) << 1)
    }

    fn from_byte(b: u8) -> Self {
        Flags {
            allow_reprint: b & 0x01 != 0,
            allow_derivative: b & 0x02 != 0,
        }
    }
}

/// A decoded/to-be-encoded watermark payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payload {
    pub original_uid: u128,
    pub current_uid: u128,
    pub flags: Flags,
}

impl Payload {
    pub fn new(
        original_uid: u128,
        current_uid: u128,
        flags: Flags,
    ) -> Result<Self, WatermarkError> {
        if original_uid > MAX_UID {
            return Err(WatermarkError::UidOverflow(original_uid));
        }
        if current_uid > MAX_UID {
            return Err(WatermarkError::UidOverflow(current_uid));
        }
        Ok(Payload {
            original_uid,
            current_uid,
            flags,
        })
    }

    /// `current_uid == 0` denotes the canonical, undistributed master.
    pub fn is_master(&self) -> bool {
        self.current_uid == 0
    }

    /// Serialize to the 32-byte wire frame, computing the CRC-32 over the
    /// 25-byte body (bytes 2..27, excluding magic and padding).
    pub fn encode(&self) -> [u8; PAYLOAD_LEN] {
        let mut buf = [0u8; PAYLOAD_LEN];
        buf[0..2].copy_from_slice(&MAGIC);
        buf[2..14].copy_from_slice(&self.original_uid.to_be_bytes()[4..16]);
        buf[14..26].copy_from_slice(&self.current_uid.to_be_bytes()[4..16]);
        buf[26] = self.flags.to_byte();

        let crc = crc32fast::hash(&buf[2..27]);
        buf[27..31].copy_from_slice(&crc.to_be_bytes());
        buf[31] = 0x00;

        buf
    }

    /// Parse and validate a 32-byte wire frame. Integrity failures are
    /// returned as `PayloadError`, never panics.
    pub fn decode(data: &[u8]) -> Result<Self, PayloadError> {
        if data.len() != PAYLOAD_LEN {
            return Err(PayloadError::BadLength);
        }
        if data[0..2] != MAGIC {
            return Err(PayloadError::BadMagic);
        }

        let body = &data[2..27];
        let stored_crc = u32::from_be_bytes(data[27..31].try_into().unwrap());
        let calculated_crc = crc32fast::hash(body);
        if calculated_crc != stored_crc {
            return Err(PayloadError::BadCrc);
        }

        let mut original_bytes = [0u8; 16];
        original_bytes[4..16].copy_from_slice(&data[2..14]);
        let mut current_bytes = [0u8; 16];
        current_bytes[4..16].copy_from_slice(&data[14..26]);

        Ok(Payload {
            original_uid: u128::from_be_bytes(original_bytes),
            current_uid: u128::from_be_bytes(current_bytes),
            flags: Flags::from_byte(data[26]),
        })
    }

    /// The 256-bit stream embedded by the embedder, MSB-first per byte.
    pub fn to_bits(&self) -> [bool; PAYLOAD_LEN * 8] {
        let bytes = self.encode();
        let mut bits = [false; PAYLOAD_LEN * 8];
        for (i, byte) in bytes.iter().enumerate() {
            for b in 0..8 {
                bits[i * 8 + b] = (byte >> (7 - b)) & 1 != 0;
            }
        }
        bits
    }

    /// Inverse of [`Payload::to_bits`], folded through [`Payload::decode`].
    pub fn from_bits(bits: &[bool]) -> Result<Self, PayloadError> {
        if bits.len() != PAYLOAD_LEN * 8 {
            return Err(PayloadError::BadLength);
        }
        let mut bytes = [0u8; PAYLOAD_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let mut v = 0u8;
            for b in 0..8 {
                v = (v << 1) | (bits[i * 8 + b] as u8);
            }
            *byte = v;
        }
        Self::decode(&bytes)
    }
}
