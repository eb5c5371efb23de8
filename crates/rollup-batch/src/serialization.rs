//! Batch witness serialization
//!
//! Batches travel as versioned JSON. Digests, hashes, keys, signatures and
//! pubdata chunks are hex strings; balances stay JSON integers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::witness::BatchInput;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported batch format version {0}")]
    UnsupportedVersion(u8),
}

/// Versioned envelope around a [`BatchInput`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableBatch {
    /// Format version
    pub version: u8,

    pub batch: BatchInput,
}

impl SerializableBatch {
    /// Current format version
    pub const VERSION: u8 = 1;

    pub fn new(batch: BatchInput) -> Self {
        Self {
            version: Self::VERSION,
            batch,
        }
    }

    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and check the format version
    pub fn from_json(json: &str) -> Result<Self, SerializationError> {
        let envelope: Self = serde_json::from_str(json)?;
        if envelope.version != Self::VERSION {
            return Err(SerializationError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }

    pub fn into_batch(self) -> BatchInput {
        self.batch
    }
}

impl From<BatchInput> for SerializableBatch {
    fn from(batch: BatchInput) -> Self {
        Self::new(batch)
    }
}
