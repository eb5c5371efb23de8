//! Bit-width and arithmetic guard
//!
//! Every witness value carries a declared bit width. A plain verifier has no
//! field to wrap around in, so the guard is a boolean check that refuses
//! oversize values outright; nothing is ever truncated.

use thiserror::Error;

use rollup_primitives::params::COMPACT_AMOUNT_SHIFT;

/// A witness value that does not fit where it was declared to fit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("{field} = {value} exceeds declared {bits}-bit width")]
    BitWidth {
        field: &'static str,
        value: u128,
        bits: usize,
    },

    #[error("{field} has {actual} entries, expected {expected}")]
    Length {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{field} does not fit the balance width once decoded")]
    DecodedOverflow { field: &'static str },
}

/// Whether `value` fits in `bits` bits
#[inline]
pub fn fits_bits(value: u128, bits: usize) -> bool {
    bits >= 128 || value >> bits == 0
}

/// Assert a value fits its declared width
pub fn check_bit_width(
    field: &'static str,
    value: impl Into<u128>,
    bits: usize,
) -> Result<(), RangeError> {
    let value = value.into();
    if fits_bits(value, bits) {
        Ok(())
    } else {
        Err(RangeError::BitWidth { field, value, bits })
    }
}

/// Assert a witness vector (e.g. a Merkle path) has its fixed length
pub fn check_length(field: &'static str, actual: usize, expected: usize) -> Result<(), RangeError> {
    if actual == expected {
        Ok(())
    } else {
        Err(RangeError::Length {
            field,
            expected,
            actual,
        })
    }
}

/// `a >= b` over pre-validated operands
#[inline]
pub fn ge(a: u128, b: u128) -> bool {
    a >= b
}

/// `amount == compact_amount * 256`
pub fn check_compact_amount(amount: u128, compact_amount: u64) -> bool {
    (compact_amount as u128)
        .checked_mul(1u128 << COMPACT_AMOUNT_SHIFT)
        .map_or(false, |expanded| expanded == amount)
}

/// Little-endian bit decomposition of `value` into exactly `bits` bits
///
/// Returns `None` if the value does not fit.
pub fn decompose_le(value: u64, bits: usize) -> Option<Vec<bool>> {
    if !fits_bits(value as u128, bits) {
        return None;
    }
    Some((0..bits).map(|i| i < 64 && (value >> i) & 1 == 1).collect())
}

/// Recompose a little-endian bit slice
pub fn recompose_le(bits: &[bool]) -> u64 {
    bits.iter()
        .enumerate()
        .fold(0u64, |acc, (i, &bit)| if bit { acc | (1u64 << i) } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fits_bits_boundaries() {
        assert!(fits_bits(0, 0));
        assert!(!fits_bits(1, 0));
        assert!(fits_bits(255, 8));
        assert!(!fits_bits(256, 8));
        assert!(fits_bits(u128::MAX, 128));
    }

    #[test]
    fn test_check_bit_width_reports_field() {
        let err = check_bit_width("account", 1u32 << 24, 24).unwrap_err();
        assert_eq!(
            err,
            RangeError::BitWidth {
                field: "account",
                value: 1 << 24,
                bits: 24
            }
        );
        assert!(check_bit_width("account", (1u32 << 24) - 1, 24).is_ok());
    }

    #[test]
    fn test_check_length() {
        assert!(check_length("path", 24, 24).is_ok());
        assert!(matches!(
            check_length("path", 23, 24),
            Err(RangeError::Length { actual: 23, .. })
        ));
    }

    #[test]
    fn test_ge() {
        assert!(ge(5, 5));
        assert!(ge(6, 5));
        assert!(!ge(4, 5));
    }

    #[test]
    fn test_compact_amount() {
        assert!(check_compact_amount(256 * 3, 3));
        assert!(!check_compact_amount(256 * 3 + 1, 3));
        assert!(check_compact_amount(0, 0));
    }

    #[test]
    fn test_decompose_recompose() {
        for value in [0u64, 1, 255, 65535, 0xFFFFFF] {
            let bits = decompose_le(value, 24).unwrap();
            assert_eq!(bits.len(), 24);
            assert_eq!(recompose_le(&bits), value);
        }
        assert!(decompose_le(1 << 24, 24).is_none());
    }

    proptest! {
        #[test]
        fn prop_bit_width_boundary(bits in 1usize..128) {
            let limit = 1u128 << bits;
            prop_assert!(check_bit_width("value", limit - 1, bits).is_ok());
            let err = check_bit_width("value", limit, bits).unwrap_err();
            prop_assert_eq!(err, RangeError::BitWidth { field: "value", value: limit, bits });
        }

        #[test]
        fn prop_decompose_roundtrip(value in any::<u64>(), bits in 0usize..=64) {
            match decompose_le(value, bits) {
                Some(le) => {
                    prop_assert_eq!(le.len(), bits);
                    prop_assert_eq!(recompose_le(&le), value);
                }
                None => prop_assert!(!fits_bits(value as u128, bits)),
            }
        }
    }
}
