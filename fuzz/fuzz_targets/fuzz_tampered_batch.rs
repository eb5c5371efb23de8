//! Fuzz target for tampered witnesses
//!
//! Starts from a valid demo batch and applies one arbitrary mutation.
//! This target ensures:
//! 1. Verification never panics on a corrupted witness
//! 2. Any change to the pubdata transcript is rejected
//! 3. Sequential and parallel verification agree

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rollup_batch::{BatchInput, BatchVerifier, VerifierOptions};
use rollup_constraints::TxType;
use rollup_witness::Scenario;

#[derive(Debug, Arbitrary)]
enum Mutation {
    PubdataByte { byte: u8, xor: u8 },
    Balance(u128),
    Nonce(u32),
    Account(u32),
    Token(u32),
    RangeWitness { a: u128, b: u128 },
    AmountPacked(u64),
    FeePacked(u64),
    Chunk(u32),
    TxTypeCode(u8),
    SwapWith(u16),
    Drop,
}

#[derive(Debug, Arbitrary)]
struct TamperInput {
    scenario: u8,
    operation: u16,
    rhs: bool,
    mutation: Mutation,
}

fn tamper(batch: &mut BatchInput, input: &TamperInput) -> bool {
    let len = batch.operations.len();
    let index = input.operation as usize % len;
    let op = &mut batch.operations[index];
    let record = if input.rhs { &mut op.rhs } else { &mut op.lhs };

    match input.mutation {
        Mutation::PubdataByte { byte, xor } => {
            let byte = byte as usize % op.pubdata_chunk.0.len();
            op.pubdata_chunk.0[byte] ^= xor;
            return xor != 0;
        }
        Mutation::Balance(balance) => record.balance = balance,
        Mutation::Nonce(nonce) => record.account_nonce = nonce,
        Mutation::Account(account) => record.account = account,
        Mutation::Token(token) => record.token = token,
        Mutation::RangeWitness { a, b } => {
            op.a = a;
            op.b = b;
        }
        Mutation::AmountPacked(packed) => op.args.amount_packed = packed,
        Mutation::FeePacked(packed) => op.args.fee_packed = packed,
        Mutation::Chunk(chunk) => op.chunk = chunk,
        Mutation::TxTypeCode(code) => {
            if let Some(tx_type) = TxType::from_code(code) {
                op.tx_type = tx_type;
            }
        }
        Mutation::SwapWith(other) => batch.operations.swap(index, other as usize % len),
        Mutation::Drop => {
            batch.operations.remove(index);
        }
    }
    false
}

fuzz_target!(|input: TamperInput| {
    let scenario = Scenario::ALL[input.scenario as usize % Scenario::ALL.len()];
    let Ok(mut batch) = scenario.build() else {
        return;
    };
    let transcript_changed = tamper(&mut batch, &input);

    let sequential = BatchVerifier::new().verify(&batch);
    if transcript_changed {
        assert!(!sequential.valid, "pubdata tampering accepted: {:?}", input);
    }

    if let Ok(verifier) = BatchVerifier::with_options(VerifierOptions::parallel()) {
        let parallel = verifier.verify(&batch);
        assert_eq!(sequential.valid, parallel.valid);
        assert_eq!(sequential.category, parallel.category);
    }
});
