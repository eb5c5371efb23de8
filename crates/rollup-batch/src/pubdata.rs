//! Pubdata: the canonical public transcript of a batch
//!
//! The accumulator keeps the transcript of the operation in flight (reset on
//! chunk 0, appended on every continuation) and streams every raw chunk into
//! a SHA-256 state that spans the whole batch.

use sha2::{Digest as _, Sha256};

use rollup_constraints::TxType;
use rollup_primitives::params::{CHUNK_BYTES, TX_TYPE_BIT_WIDTH};
use rollup_primitives::Hash256;

/// One fixed-width slice of an operation's pubdata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PubdataChunk(pub [u8; CHUNK_BYTES]);

impl PubdataChunk {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; CHUNK_BYTES];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl serde::Serialize for PubdataChunk {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for PubdataChunk {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Split a padded operation transcript into chunks
pub fn split_chunks(pubdata: &[u8]) -> Vec<PubdataChunk> {
    pubdata
        .chunks(CHUNK_BYTES)
        .map(|slice| {
            let mut chunk = [0u8; CHUNK_BYTES];
            chunk[..slice.len()].copy_from_slice(slice);
            PubdataChunk(chunk)
        })
        .collect()
}

/// SHA-256 over a sequence of chunks, as the accumulator would report it
pub fn commitment_of<'a>(chunks: impl IntoIterator<Item = &'a PubdataChunk>) -> Hash256 {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.0);
    }
    Hash256(hasher.finalize().into())
}

/// Per-operation transcript plus the batch-wide running hash
#[derive(Debug, Clone, Default)]
pub struct PubdataAccumulator {
    pubdata: Vec<u8>,
    running: Sha256,
    chunks_absorbed: usize,
}

impl PubdataAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb the chunk at index `chunk_index` of the current operation
    pub fn absorb(&mut self, chunk_index: u32, chunk: &PubdataChunk) {
        if chunk_index == 0 {
            self.pubdata.clear();
        }
        self.pubdata.extend_from_slice(&chunk.0);
        self.running.update(chunk.0);
        self.chunks_absorbed += 1;
    }

    /// Transcript of the operation in flight
    pub fn pubdata(&self) -> &[u8] {
        &self.pubdata
    }

    pub fn chunks_absorbed(&self) -> usize {
        self.chunks_absorbed
    }

    /// Current value of the running hash
    pub fn running_hash(&self) -> Hash256 {
        Hash256(self.running.clone().finalize().into())
    }
}

/// Big-endian field writer for an operation's pubdata layout
#[derive(Debug, Clone)]
pub struct PubdataWriter {
    tx_type: TxType,
    bytes: Vec<u8>,
}

impl PubdataWriter {
    /// Starts the transcript with the type code
    pub fn new(tx_type: TxType) -> Self {
        let bytes = Vec::with_capacity(tx_type.max_chunks() as usize * CHUNK_BYTES);
        Self { tx_type, bytes }.uint(tx_type.code(), TX_TYPE_BIT_WIDTH / 8)
    }

    /// Append the low `width` bytes of `value`, big-endian
    pub fn uint(mut self, value: impl Into<u128>, width: usize) -> Self {
        let value: u128 = value.into();
        let be = value.to_be_bytes();
        self.bytes.extend_from_slice(&be[be.len() - width..]);
        self
    }

    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    /// Zero-pad to the operation's chunk count
    ///
    /// Never truncates: an over-long layout comes back whole and so can never
    /// equal a transcript of `max_chunks` chunks.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.tx_type.max_chunks() as usize * CHUNK_BYTES;
        if self.bytes.len() < len {
            self.bytes.resize(len, 0);
        }
        self.bytes
    }
}
