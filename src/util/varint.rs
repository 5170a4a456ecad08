//! LEB128-style unsigned varints for postings and length prefixes.
//!
//! Seven payload bits per byte, low group first. The high bit marks that
//! another byte follows.

use crate::error::{HalberdError, Result};

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUE: u8 = 0x80;
const PAYLOAD: u64 = 0x7F;

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Encode `value`.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    let mut rest = value;
    while rest > PAYLOAD {
        out.push((rest & PAYLOAD) as u8 | CONTINUE);
        rest >>= 7;
    }
    out.push(rest as u8);
    out
}

/// Decode a varint from the start of `bytes`, returning the value and how
/// many bytes it used.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (used, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        let payload = u64::from(byte & 0x7F);
        let shift = 7 * used as u32;
        // The tenth byte may only carry the top bit of a u64.
        if used == MAX_VARINT_LEN - 1 && payload > 1 {
            return Err(HalberdError::storage("varint overflows u64"));
        }
        value |= payload << shift;
        if byte & CONTINUE == 0 {
            return Ok((value, used + 1));
        }
    }

    if bytes.len() >= MAX_VARINT_LEN {
        Err(HalberdError::storage("varint longer than 10 bytes"))
    } else {
        Err(HalberdError::storage("truncated varint"))
    }
}
