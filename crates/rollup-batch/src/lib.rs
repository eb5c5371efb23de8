//! Rollup Batch Verification
//!
//! This crate verifies that an ordered batch of rollup operations moves one
//! committed state root to another while producing the public transcript
//! (pubdata) the batch commits to.
//!
//! # Architecture
//!
//! - **Witness**: chunked operation records with two Merkle branch snapshots
//! - **State**: two-level Rescue Merkle tree and the intersection rule for
//!   two-sided operations
//! - **Pubdata**: per-operation transcript and the batch-wide SHA-256
//! - **Chunking**: the per-operation chunk state machine
//! - **Validators**: one authorization predicate and state update per
//!   operation kind, reduced by exactly-one acceptance
//! - **Verifier**: the batch driver and chain verification
//!
//! Every failure is fatal to the batch and reported with its
//! [`ErrorCategory`].
//!
//! # Usage
//!
//! ```ignore
//! use rollup_batch::{BatchVerifier, SerializableBatch};
//!
//! let batch = SerializableBatch::from_json(&json)?.into_batch();
//! let result = BatchVerifier::new().verify(&batch);
//! if !result.valid {
//!     eprintln!("rejected: {:?}", result.category);
//! }
//! ```

pub mod chunking;
pub mod error;
pub mod options;
pub mod pubdata;
pub mod serialization;
pub mod state;
pub mod validators;
pub mod verifier;
pub mod witness;

// Re-exports for convenience
pub use chunking::{ChunkInfo, ChunkSequencer, SequencerState};
pub use error::{
    ChainError, ChunkMismatch, ErrorCategory, IncompleteReason, RootStage, VerifyError,
    VerifyResult,
};
pub use options::{OptionsError, VerifierOptions};
pub use pubdata::{commitment_of, split_chunks, PubdataAccumulator, PubdataChunk, PubdataWriter};
pub use serialization::{SerializableBatch, SerializationError};
pub use state::{check_account_data, empty_hashes, AccountCommitment};

// Validator types
pub use validators::{
    pubdata_layout, signed_message, BranchUpdate, Computed, OperationValidator, ValidationContext,
    ValidatorRegistry,
};

// Verifier types
pub use verifier::{verify_batch, BatchSummary, BatchVerificationResult, BatchVerifier};

// Witness types
pub use witness::{BatchInput, BranchRecord, OpArgs, Operation, SubaccountLeaf, SubtreePath};
