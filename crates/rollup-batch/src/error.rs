//! Error types for batch verification
//!
//! Every failure is fatal to the batch. [`VerifyError::category`] maps an
//! error onto the fixed taxonomy reported to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollup_constraints::{RangeError, TxType};
use rollup_primitives::{Digest, Hash256};

/// Failure categories surfaced to the caller of a verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    RangeViolation,
    ChunkWitnessMismatch,
    RootMismatch,
    PubdataMismatch,
    InvalidOperation,
    NonceOverflow,
    IncompleteBatch,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::RangeViolation => "RangeViolation",
            ErrorCategory::ChunkWitnessMismatch => "ChunkWitnessMismatch",
            ErrorCategory::RootMismatch => "RootMismatch",
            ErrorCategory::PubdataMismatch => "PubdataMismatch",
            ErrorCategory::InvalidOperation => "InvalidOperation",
            ErrorCategory::NonceOverflow => "NonceOverflow",
            ErrorCategory::IncompleteBatch => "IncompleteBatch",
        };
        f.write_str(name)
    }
}

/// Why a chunk could not continue (or start) an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkMismatch {
    #[error("expected chunk {expected}, got {got}")]
    OutOfSequence { expected: u32, got: u32 },

    #[error("chunk {chunk} is out of range for {tx_type} ({max} chunks)")]
    OutOfRange { tx_type: TxType, chunk: u32, max: u32 },

    #[error("shared field `{0}` differs from the previous chunk")]
    FieldDiverged(&'static str),
}

/// Which Merkle check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStage {
    PreUpdate,
    PostUpdate,
}

impl std::fmt::Display for RootStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootStage::PreUpdate => write!(f, "pre-update"),
            RootStage::PostUpdate => write!(f, "post-update"),
        }
    }
}

/// Why a batch failed its closing checks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncompleteReason {
    #[error("batch contains no operations")]
    Empty,

    #[error("batch ended inside {tx_type}, expecting chunk {next_chunk}")]
    EndedMidOperation { tx_type: TxType, next_chunk: u32 },

    #[error("final root {computed} does not match expected {expected}")]
    FinalRoot { expected: Digest, computed: Digest },

    #[error("pubdata commitment {computed} does not match expected {expected}")]
    Commitment { expected: Hash256, computed: Hash256 },
}

/// Errors raised while verifying a batch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("operation {index}: {source}")]
    RangeViolation {
        index: usize,
        #[source]
        source: RangeError,
    },

    #[error("operation {index}: chunk witness mismatch: {reason}")]
    ChunkWitnessMismatch { index: usize, reason: ChunkMismatch },

    #[error("operation {index}: {stage} root mismatch (expected {expected}, computed {computed})")]
    RootMismatch {
        index: usize,
        stage: RootStage,
        expected: Digest,
        computed: Digest,
    },

    #[error("operation {index}: {tx_type} pubdata does not match its fields")]
    PubdataMismatch { index: usize, tx_type: TxType },

    #[error("operation {index}: {accepted} validators accepted {tx_type}, expected exactly one")]
    InvalidOperation {
        index: usize,
        tx_type: TxType,
        accepted: usize,
    },

    #[error("operation {index}: nonce of account {account} cannot be incremented")]
    NonceOverflow { index: usize, account: u32 },

    #[error("incomplete batch: {0}")]
    IncompleteBatch(IncompleteReason),
}

impl VerifyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VerifyError::RangeViolation { .. } => ErrorCategory::RangeViolation,
            VerifyError::ChunkWitnessMismatch { .. } => ErrorCategory::ChunkWitnessMismatch,
            VerifyError::RootMismatch { .. } => ErrorCategory::RootMismatch,
            VerifyError::PubdataMismatch { .. } => ErrorCategory::PubdataMismatch,
            VerifyError::InvalidOperation { .. } => ErrorCategory::InvalidOperation,
            VerifyError::NonceOverflow { .. } => ErrorCategory::NonceOverflow,
            VerifyError::IncompleteBatch(_) => ErrorCategory::IncompleteBatch,
        }
    }

    /// Index of the offending operation record, if the failure is local to one
    pub fn operation_index(&self) -> Option<usize> {
        match self {
            VerifyError::RangeViolation { index, .. }
            | VerifyError::ChunkWitnessMismatch { index, .. }
            | VerifyError::RootMismatch { index, .. }
            | VerifyError::PubdataMismatch { index, .. }
            | VerifyError::InvalidOperation { index, .. }
            | VerifyError::NonceOverflow { index, .. } => Some(*index),
            VerifyError::IncompleteBatch(_) => None,
        }
    }
}

/// Errors raised while verifying a chain of batches
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("batch {index}: prior root {actual} does not continue from {expected}")]
    Discontinuity {
        index: usize,
        expected: Digest,
        actual: Digest,
    },

    #[error("batch {index} rejected: {source}")]
    Batch {
        index: usize,
        #[source]
        source: VerifyError,
    },
}

/// Result type for batch verification
pub type VerifyResult<T> = Result<T, VerifyError>;
