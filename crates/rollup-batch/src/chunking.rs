//! Chunk sequencer
//!
//! Per-operation state machine over chunk indices. A fresh operation starts
//! at chunk 0; every continuation must be the next index and repeat the
//! previous chunk's shared fields byte for byte.

use rollup_constraints::{Side, TxType};
use rollup_primitives::Digest;

use crate::error::{ChunkMismatch, IncompleteReason};
use crate::witness::{BranchRecord, OpArgs, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    ExpectingFirstChunk,
    ExpectingChunk { tx_type: TxType, next: u32 },
    Complete,
}

/// Position of an accepted chunk within its operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub chunk: u32,
    pub first_chunk: bool,
    pub last_chunk: bool,
    pub side: Side,
}

/// Shared fields of the previous chunk
#[derive(Debug, Clone)]
struct PrevWindow {
    args: OpArgs,
    lhs: BranchRecord,
    rhs: BranchRecord,
    new_root: Digest,
}

impl PrevWindow {
    fn of(op: &Operation) -> Self {
        Self {
            args: op.args.clone(),
            lhs: op.lhs.clone(),
            rhs: op.rhs.clone(),
            new_root: op.new_root,
        }
    }

    fn diverged_field(&self, op: &Operation) -> Option<&'static str> {
        if self.args != op.args {
            Some("args")
        } else if self.lhs != op.lhs {
            Some("lhs")
        } else if self.rhs != op.rhs {
            Some("rhs")
        } else if self.new_root != op.new_root {
            Some("new_root")
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkSequencer {
    state: SequencerState,
    prev: Option<PrevWindow>,
}

impl Default for ChunkSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkSequencer {
    pub fn new() -> Self {
        Self {
            state: SequencerState::ExpectingFirstChunk,
            prev: None,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Accept the next chunk or report why it cannot follow
    pub fn advance(&mut self, op: &Operation) -> Result<ChunkInfo, ChunkMismatch> {
        let max = op.tx_type.max_chunks();
        if op.chunk >= max {
            return Err(ChunkMismatch::OutOfRange {
                tx_type: op.tx_type,
                chunk: op.chunk,
                max,
            });
        }

        match self.state {
            SequencerState::ExpectingChunk { tx_type, next } => {
                if op.chunk != next {
                    return Err(ChunkMismatch::OutOfSequence {
                        expected: next,
                        got: op.chunk,
                    });
                }
                if op.tx_type != tx_type {
                    return Err(ChunkMismatch::FieldDiverged("tx_type"));
                }
                if let Some(field) = self.prev.as_ref().and_then(|p| p.diverged_field(op)) {
                    return Err(ChunkMismatch::FieldDiverged(field));
                }
            }
            SequencerState::ExpectingFirstChunk | SequencerState::Complete => {
                if op.chunk != 0 {
                    return Err(ChunkMismatch::OutOfSequence {
                        expected: 0,
                        got: op.chunk,
                    });
                }
            }
        }

        let last_chunk = op.chunk == max - 1;
        self.state = if last_chunk {
            SequencerState::Complete
        } else {
            SequencerState::ExpectingChunk {
                tx_type: op.tx_type,
                next: op.chunk + 1,
            }
        };
        self.prev = Some(PrevWindow::of(op));

        Ok(ChunkInfo {
            chunk: op.chunk,
            first_chunk: op.chunk == 0,
            last_chunk,
            side: op.tx_type.side_for_chunk(op.chunk),
        })
    }

    /// The batch must end on an operation boundary
    pub fn finish(&self) -> Result<(), IncompleteReason> {
        match self.state {
            SequencerState::Complete => Ok(()),
            SequencerState::ExpectingFirstChunk => Err(IncompleteReason::Empty),
            SequencerState::ExpectingChunk { tx_type, next } => {
                Err(IncompleteReason::EndedMidOperation {
                    tx_type,
                    next_chunk: next,
                })
            }
        }
    }
}
