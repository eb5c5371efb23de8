//! Integration tests for rollup batch verification
//!
//! Every batch here is produced by the witness builder and must be accepted
//! by an independently constructed verifier.

use rollup_batch::{
    commitment_of, empty_hashes, BatchInput, BatchVerifier, PubdataChunk, SerializableBatch,
    SerializationError, VerifierOptions,
};
use rollup_constraints::{Side, TxType};
use rollup_primitives::params::CHUNK_BYTES;
use rollup_primitives::{Digest, Hash256, PubKey, SigningKey};
use rollup_witness::{AccountStore, BatchBuilder, OpSpec, Scenario};

// =============================================================================
// Test Helpers
// =============================================================================

fn key(seed: &str) -> SigningKey {
    SigningKey::from_seed(seed).unwrap()
}

fn pk(seed: &str) -> PubKey {
    key(seed).public_key()
}

/// Store with two populated leaves and a builder that can sign for them
fn two_account_builder() -> BatchBuilder {
    let mut store = AccountStore::new();
    store.open_account(3, pk("alice"), 0, 1_000).unwrap();
    store.open_account(12, pk("bob"), 0, 400).unwrap();
    BatchBuilder::new(store)
        .with_key(key("alice"))
        .with_key(key("bob"))
        .with_key(key("carol"))
}

fn assert_valid(batch: &BatchInput) {
    let result = BatchVerifier::new().verify(batch);
    assert!(
        result.valid,
        "batch rejected: {:?} ({:?})",
        result.error, result.category
    );
    assert_eq!(result.final_root, batch.final_root);
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn test_deposit_then_partial_exit() {
    let mut builder = two_account_builder();
    let prior = builder.root();

    builder
        .apply(OpSpec::Deposit {
            account: 5,
            token: 0,
            amount: 100,
            fee: 1,
            owner: pk("carol"),
        })
        .unwrap();
    builder
        .apply(OpSpec::PartialExit {
            account: 5,
            token: 0,
            amount: 50,
            fee: 1,
        })
        .unwrap();

    assert_eq!(builder.store().balance(5, 0), 48);
    assert_eq!(builder.store().nonce(5), 1);
    let expected_root = builder.root();

    let batch = builder.finish();
    assert_eq!(batch.prior_root, prior);
    assert_eq!(batch.final_root, expected_root);
    assert_eq!(
        batch.operations.len() as u32,
        TxType::Deposit.max_chunks() + TxType::PartialExit.max_chunks()
    );

    let transcript: Vec<u8> = batch
        .operations
        .iter()
        .flat_map(|op| op.pubdata_chunk.0)
        .collect();
    assert_eq!(transcript.len(), batch.operations.len() * CHUNK_BYTES);
    assert_eq!(batch.pubdata_commitment, Hash256::sha256(&transcript));

    let summary = BatchVerifier::new().run(&batch).unwrap();
    assert_eq!(summary.final_root, expected_root);
    assert_eq!(summary.num_operations, 2);
    assert_eq!(summary.pubdata_commitment, Hash256::sha256(&transcript));
}

#[test]
fn test_every_scenario_accepted() {
    for scenario in Scenario::ALL {
        let batch = scenario.build().unwrap();
        assert_eq!(batch.prior_root, empty_hashes().state_root());
        assert_valid(&batch);
    }
}

#[test]
fn test_noop_only_batch_keeps_root() {
    let mut builder = two_account_builder();
    let root = builder.root();
    for _ in 0..3 {
        builder.apply(OpSpec::Noop).unwrap();
    }
    let batch = builder.finish();
    assert_eq!(batch.final_root, root);
    assert!(batch.operations.iter().all(|op| op.pubdata_chunk.0 == [0u8; CHUNK_BYTES]));
    assert_valid(&batch);
}

// =============================================================================
// Individual operation types
// =============================================================================

#[test]
fn test_transfer() {
    let mut builder = two_account_builder();
    builder
        .apply(OpSpec::Transfer {
            from: 3,
            to: 12,
            token: 0,
            amount: 250,
            fee: 5,
        })
        .unwrap();
    assert_eq!(builder.store().balance(3, 0), 745);
    assert_eq!(builder.store().balance(12, 0), 650);
    assert_valid(&builder.finish());
}

#[test]
fn test_transfer_to_new_account() {
    let mut builder = two_account_builder();
    builder
        .apply(OpSpec::TransferToNew {
            from: 12,
            to: 200,
            token: 0,
            amount: 256,
            fee: 4,
            new_owner: pk("carol"),
        })
        .unwrap();
    assert_eq!(builder.store().owner(200), Some(pk("carol")));
    assert_eq!(builder.store().balance(200, 0), 256);
    assert_eq!(builder.store().balance(12, 0), 140);
    assert_valid(&builder.finish());
}

#[test]
fn test_fill_orders() {
    let mut builder = two_account_builder();
    builder
        .apply(OpSpec::FillOrders {
            taker: 12,
            maker: 3,
            token: 0,
            amount: 100,
            fee: 0,
        })
        .unwrap();
    assert_eq!(builder.store().balance(3, 0), 1_100);
    assert_valid(&builder.finish());
}

#[test]
fn test_full_exit_restores_empty_leaf() {
    let mut builder = BatchBuilder::default().with_key(key("alice"));
    builder
        .apply(OpSpec::Deposit {
            account: 9,
            token: 4,
            amount: 70,
            fee: 0,
            owner: pk("alice"),
        })
        .unwrap();
    builder
        .apply(OpSpec::FullExit {
            account: 9,
            token: 4,
        })
        .unwrap();
    let batch = builder.finish();
    assert_eq!(batch.final_root, empty_hashes().state_root());
    assert_valid(&batch);
}

#[test]
fn test_subaccount_lifecycle() {
    let mut builder = two_account_builder();
    builder
        .apply(OpSpec::CreateSubaccount {
            owner_account: 3,
            cosigner_account: 12,
            token: 0,
            amount: 600,
            fee: 10,
        })
        .unwrap();
    let sub = builder.store().subaccount(3, 0);
    assert_eq!(sub.balance, 600);
    assert_eq!(sub.creation_nonce, 0);
    assert_eq!(sub.cosigner_pubkey, pk("bob"));
    assert_eq!(builder.store().balance(3, 0), 390);

    builder
        .apply(OpSpec::CloseSubaccount {
            owner_account: 3,
            cosigner_account: 12,
            token: 0,
            fee: 10,
        })
        .unwrap();
    assert!(builder.store().subaccount(3, 0).is_empty());
    assert_eq!(builder.store().balance(3, 0), 980);
    assert_eq!(builder.store().nonce(3), 2);
    assert_valid(&builder.finish());
}

#[test]
fn test_escalation_by_cosigner() {
    let mut store = AccountStore::new();
    store.open_account(3, pk("alice"), 0, 1_000).unwrap();
    store.open_account(12, pk("bob"), 0, 400).unwrap();
    let mut builder = BatchBuilder::new(store).with_key(key("alice"));
    builder
        .apply(OpSpec::CreateSubaccount {
            owner_account: 3,
            cosigner_account: 12,
            token: 0,
            amount: 300,
            fee: 0,
        })
        .unwrap();
    let first = builder.seal();

    // only the cosigner's key is known from here on
    let mut builder = BatchBuilder::new(builder.store().clone()).with_key(key("bob"));
    builder
        .apply(OpSpec::Escalation {
            account: 3,
            token: 0,
        })
        .unwrap();
    let second = builder.finish();
    assert_eq!(second.operations[0].lhs.signer_pubkey, pk("bob"));

    assert_valid(&first);
    assert_valid(&second);
    assert_eq!(first.final_root, second.prior_root);
}

// =============================================================================
// Intersection of two-sided operations
// =============================================================================

#[test]
fn test_intersection_both_directions() {
    // partners diverge from account 7 at heights 0, 2 and 23
    for partner in [6u32, 0, 1 << 23] {
        for (from, to) in [(7, partner), (partner, 7)] {
            let mut store = AccountStore::new();
            store.open_account(7, pk("alice"), 1, 500).unwrap();
            store.open_account(partner, pk("bob"), 1, 500).unwrap();
            let mut builder = BatchBuilder::new(store)
                .with_key(key("alice"))
                .with_key(key("bob"));
            builder
                .apply(OpSpec::Transfer {
                    from,
                    to,
                    token: 1,
                    amount: 40,
                    fee: 1,
                })
                .unwrap();
            let batch = builder.finish();
            let lhs_chunk = &batch.operations[0];
            let rhs_chunk = &batch.operations[1];
            assert_eq!(TxType::Transfer.side_for_chunk(lhs_chunk.chunk), Side::Lhs);
            assert_eq!(TxType::Transfer.side_for_chunk(rhs_chunk.chunk), Side::Rhs);
            assert_ne!(lhs_chunk.account_path, rhs_chunk.account_path);
            assert_valid(&batch);
        }
    }
}

#[test]
fn test_stale_intersection_hash_rejected() {
    let mut builder = two_account_builder();
    builder
        .apply(OpSpec::Transfer {
            from: 3,
            to: 12,
            token: 0,
            amount: 1,
            fee: 0,
        })
        .unwrap();
    let mut batch = builder.finish();
    for op in &mut batch.operations {
        op.rhs.intersection_hash = Digest::default();
    }
    let result = BatchVerifier::new().verify(&batch);
    assert!(!result.valid);
}

// =============================================================================
// Chains, options and serialization
// =============================================================================

#[test]
fn test_verify_chain_of_sealed_batches() {
    let mut builder = two_account_builder();
    let mut batches = Vec::new();
    for amount in [10u128, 20, 30] {
        builder
            .apply(OpSpec::Transfer {
                from: 3,
                to: 12,
                token: 0,
                amount,
                fee: 1,
            })
            .unwrap();
        builder.apply(OpSpec::Noop).unwrap();
        batches.push(builder.seal());
    }

    for options in [VerifierOptions::sequential(), VerifierOptions::parallel()] {
        let verifier = BatchVerifier::with_options(options).unwrap();
        let summaries = verifier.verify_chain(&batches).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[2].final_root, builder.root());
    }
    assert_eq!(builder.store().balance(12, 0), 460);
}

#[test]
fn test_parallel_matches_sequential() {
    let batch = Scenario::Transfers.build().unwrap();
    let sequential = BatchVerifier::new().run(&batch).unwrap();
    let options = VerifierOptions {
        worker_threads: Some(2),
        ..VerifierOptions::parallel()
    };
    let parallel = BatchVerifier::with_options(options)
        .unwrap()
        .run(&batch)
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_json_roundtrip_verifies() {
    let batch = Scenario::Subaccounts.build().unwrap();
    let json = SerializableBatch::new(batch.clone()).to_json().unwrap();
    let parsed = SerializableBatch::from_json(&json).unwrap().into_batch();
    assert_eq!(parsed, batch);
    assert_valid(&parsed);
}

#[test]
fn test_commitment_helper_matches_builder() {
    let batch = Scenario::DepositExit.build().unwrap();
    assert_eq!(
        commitment_of(batch.operations.iter().map(|op| &op.pubdata_chunk)),
        batch.pubdata_commitment
    );
}

#[test]
fn test_commitment_fixed_vectors() {
    let empty: [PubdataChunk; 0] = [];
    assert_eq!(
        commitment_of(&empty).0.to_vec(),
        hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855").unwrap()
    );

    let chunks = [PubdataChunk([0; CHUNK_BYTES]), PubdataChunk([1; CHUNK_BYTES])];
    assert_eq!(
        commitment_of(&chunks).to_hex(),
        "25c9aef83e7b6c3fd2cb8918c725bac9c46f6ce469488731479d790b7fc2c372"
    );
}

#[test]
fn test_json_wire_format() {
    let batch = Scenario::DepositExit.build().unwrap();
    let json = SerializableBatch::new(batch.clone()).to_json().unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["version"], SerializableBatch::VERSION);
    assert_eq!(value["batch"]["prior_root"], batch.prior_root.to_hex());
    assert_eq!(
        value["batch"]["pubdata_commitment"],
        batch.pubdata_commitment.to_hex()
    );
    let first = &value["batch"]["operations"][0];
    assert_eq!(
        first["pubdata_chunk"],
        hex::encode(batch.operations[0].pubdata_chunk.0)
    );
    assert!(first["lhs"]["balance"].is_u64());

    value["version"] = serde_json::json!(2);
    let err = SerializableBatch::from_json(&value.to_string()).unwrap_err();
    assert!(matches!(err, SerializationError::UnsupportedVersion(2)));
}
