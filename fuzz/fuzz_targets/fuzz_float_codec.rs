//! Fuzz target for the packed-float codec
//!
//! This target ensures:
//! 1. Unpacking arbitrary bits never panics
//! 2. Packing is exact whenever it succeeds
//! 3. Packed values stay within their bit width

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rollup_constraints::{AMOUNT_FORMAT, FEE_FORMAT};

#[derive(Debug, Arbitrary)]
struct FloatInput {
    packed: u64,
    amount: u128,
}

fuzz_target!(|input: FloatInput| {
    for (field, format) in [("amount", AMOUNT_FORMAT), ("fee", FEE_FORMAT)] {
        if let Ok(decoded) = format.unpack(field, input.packed) {
            let repacked = format.pack(decoded).expect("decoded amounts are representable");
            assert_eq!(format.unpack(field, repacked).ok(), Some(decoded));
        }

        if let Some(packed) = format.pack(input.amount) {
            assert!(packed < 1u64 << format.total_bits());
            assert_eq!(format.unpack(field, packed).ok(), Some(input.amount));
        }
    }
});
