//! Packed floating amounts
//!
//! A packed value stores an exponent in its low bits and a mantissa above it,
//! both little-endian. The decoded amount is `mantissa * 10^exponent`.

use rollup_primitives::params::{
    AMOUNT_EXPONENT_BIT_WIDTH, AMOUNT_MANTISSA_BIT_WIDTH, BALANCE_BIT_WIDTH,
    FEE_EXPONENT_BIT_WIDTH, FEE_MANTISSA_BIT_WIDTH, FLOAT_EXPONENT_BASE,
};

use crate::range_check::{decompose_le, fits_bits, recompose_le, RangeError};

/// Bit layout of one packed float kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatFormat {
    pub exponent_bits: usize,
    pub mantissa_bits: usize,
}

/// Transfer and exit amounts
pub const AMOUNT_FORMAT: FloatFormat = FloatFormat {
    exponent_bits: AMOUNT_EXPONENT_BIT_WIDTH,
    mantissa_bits: AMOUNT_MANTISSA_BIT_WIDTH,
};

/// Operation fees
pub const FEE_FORMAT: FloatFormat = FloatFormat {
    exponent_bits: FEE_EXPONENT_BIT_WIDTH,
    mantissa_bits: FEE_MANTISSA_BIT_WIDTH,
};

/// `mantissa * 10^exponent`, or `None` if it does not fit in a u128
pub fn decode_packed(mantissa: u64, exponent: u32) -> Option<u128> {
    FLOAT_EXPONENT_BASE
        .checked_pow(exponent)?
        .checked_mul(mantissa as u128)
}

impl FloatFormat {
    pub const fn total_bits(&self) -> usize {
        self.exponent_bits + self.mantissa_bits
    }

    /// Decode a packed value into an amount that fits the balance width
    pub fn unpack(&self, field: &'static str, packed: u64) -> Result<u128, RangeError> {
        let bits = decompose_le(packed, self.total_bits()).ok_or(RangeError::BitWidth {
            field,
            value: packed as u128,
            bits: self.total_bits(),
        })?;
        let exponent = recompose_le(&bits[..self.exponent_bits]);
        let mantissa = recompose_le(&bits[self.exponent_bits..]);

        decode_packed(mantissa, exponent as u32)
            .filter(|amount| fits_bits(*amount, BALANCE_BIT_WIDTH))
            .ok_or(RangeError::DecodedOverflow { field })
    }

    /// Exact packing: `None` if the amount has no representation in this format
    pub fn pack(&self, amount: u128) -> Option<u64> {
        let mantissa_limit = 1u128 << self.mantissa_bits;
        let exponent_limit = 1u64 << self.exponent_bits;

        let mut mantissa = amount;
        let mut exponent = 0u64;
        while mantissa >= mantissa_limit {
            if mantissa % FLOAT_EXPONENT_BASE != 0 {
                return None;
            }
            mantissa /= FLOAT_EXPONENT_BASE;
            exponent += 1;
        }
        if exponent >= exponent_limit {
            return None;
        }
        Some(exponent | ((mantissa as u64) << self.exponent_bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_packed() {
        assert_eq!(decode_packed(1000, 0), Some(1000));
        assert_eq!(decode_packed(1, 3), Some(1000));
        assert_eq!(decode_packed(0, 31), Some(0));
        assert_eq!(decode_packed(1, 39), None);
    }

    #[test]
    fn test_unpack_layout_exponent_low() {
        // exponent 2, mantissa 7
        let packed = 2 | (7 << AMOUNT_FORMAT.exponent_bits);
        assert_eq!(AMOUNT_FORMAT.unpack("amount", packed).unwrap(), 700);
    }

    #[test]
    fn test_unpack_rejects_oversize() {
        let packed = 1u64 << AMOUNT_FORMAT.total_bits();
        assert!(matches!(
            AMOUNT_FORMAT.unpack("amount", packed),
            Err(RangeError::BitWidth { field: "amount", .. })
        ));
    }

    #[test]
    fn test_pack_small_values_use_zero_exponent() {
        assert_eq!(AMOUNT_FORMAT.pack(1000), Some(1000 << AMOUNT_FORMAT.exponent_bits));
        assert_eq!(FEE_FORMAT.pack(1), Some(1 << FEE_FORMAT.exponent_bits));
    }

    #[test]
    fn test_pack_large_values() {
        let amount = 5_000_000_000u128;
        let packed = AMOUNT_FORMAT.pack(amount).unwrap();
        assert_eq!(AMOUNT_FORMAT.unpack("amount", packed).unwrap(), amount);
    }

    #[test]
    fn test_pack_rejects_imprecise() {
        // needs more than 12 mantissa bits and is not divisible by 10
        assert_eq!(FEE_FORMAT.pack(4097), None);
    }

    proptest! {
        #[test]
        fn prop_amount_unpack_then_pack_is_exact(packed in 0u64..(1 << 24)) {
            let amount = AMOUNT_FORMAT.unpack("amount", packed).unwrap();
            let repacked = AMOUNT_FORMAT.pack(amount).unwrap();
            prop_assert_eq!(AMOUNT_FORMAT.unpack("amount", repacked).unwrap(), amount);
        }

        #[test]
        fn prop_fee_unpack_then_pack_is_exact(packed in 0u64..(1 << 16)) {
            let fee = FEE_FORMAT.unpack("fee", packed).unwrap();
            let repacked = FEE_FORMAT.pack(fee).unwrap();
            prop_assert!(repacked < 1 << FEE_FORMAT.total_bits());
            prop_assert_eq!(FEE_FORMAT.unpack("fee", repacked).unwrap(), fee);
        }

        #[test]
        fn prop_small_amounts_pack_with_zero_exponent(amount in 0u128..(1 << 19)) {
            let packed = AMOUNT_FORMAT.pack(amount).unwrap();
            prop_assert_eq!(packed & 0x1f, 0);
            prop_assert_eq!((packed >> AMOUNT_FORMAT.exponent_bits) as u128, amount);
        }
    }
}
