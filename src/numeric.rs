//! Order-preserving fixed-width encoding of signed integers.
//!
//! Numeric field values are indexed as terms in the same ordered term
//! dictionary as text tokens. Flipping the sign bit maps `i64::MIN..=i64::MAX`
//! onto `0..=u64::MAX` monotonically, and the big-endian layout makes plain
//! byte comparison agree with integer comparison:
//!
//! ```
//! use halberd::numeric::{decode_i64, encode_i64};
//!
//! assert!(encode_i64(-1) < encode_i64(0));
//! assert!(encode_i64(999) < encode_i64(1000));
//! assert_eq!(decode_i64(&encode_i64(-42)).unwrap(), -42);
//! ```

use byteorder::{BigEndian, ByteOrder};

use crate::error::{HalberdError, Result};

/// Width in bytes of an encoded value.
pub const ENCODED_LEN: usize = 8;

const SIGN_BIT: u64 = 1 << 63;

/// Encode a signed integer into its sortable byte form.
pub fn encode_i64(value: i64) -> [u8; ENCODED_LEN] {
    let mut buf = [0u8; ENCODED_LEN];
    BigEndian::write_u64(&mut buf, (value as u64) ^ SIGN_BIT);
    buf
}

/// Decode bytes produced by [`encode_i64`].
pub fn decode_i64(bytes: &[u8]) -> Result<i64> {
    if bytes.len() != ENCODED_LEN {
        return Err(HalberdError::invalid_argument(format!(
            "encoded integer must be {ENCODED_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok((BigEndian::read_u64(bytes) ^ SIGN_BIT) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_extremes() {
        for value in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(decode_i64(&encode_i64(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_order_preserved() {
        let mut values = vec![10001, -5, 999, i64::MIN, 0, 10000, 1000, i64::MAX, -1000, 5000];
        let mut encoded: Vec<_> = values.iter().map(|&v| encode_i64(v)).collect();

        values.sort();
        encoded.sort();

        let decoded: Vec<i64> = encoded.iter().map(|b| decode_i64(b).unwrap()).collect();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_adjacent_values_compare_strictly() {
        for value in [-2i64, -1, 0, 1, 1000, 9999] {
            assert!(encode_i64(value) < encode_i64(value + 1));
        }
    }

    #[test]
    fn test_rejects_wrong_width() {
        assert!(decode_i64(&[0u8; 4]).is_err());
        assert!(decode_i64(&[]).is_err());
    }
}
