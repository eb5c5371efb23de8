//! Batch verification implementation
//!
//! Per chunk: bit-width guard, chunk sequencing, pubdata absorption, branch
//! selection, pre-update root check, exactly-one validator acceptance and
//! the post-update root check. The current root only moves on an
//! operation's last chunk.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use rollup_constraints::{check_compact_amount, ge, AMOUNT_FORMAT, FEE_FORMAT};
use rollup_primitives::{Bip340Checker, Digest, Hash256, SignatureChecker};

use crate::chunking::{ChunkInfo, ChunkSequencer};
use crate::error::{ErrorCategory, IncompleteReason, RootStage, VerifyError, VerifyResult};
use crate::options::{OptionsError, VerifierOptions};
use crate::pubdata::PubdataAccumulator;
use crate::state::{check_account_data, intersection_path, AccountCommitment};
use crate::validators::{BranchUpdate, Computed, ValidationContext, ValidatorRegistry};
use crate::witness::{BatchInput, Operation};

/// Outputs of an accepted batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub final_root: Digest,
    pub pubdata_commitment: Hash256,
    /// Logical operations, each spanning one or more chunks
    pub num_operations: usize,
    pub num_chunks: usize,
}

/// Result of batch verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchVerificationResult {
    /// Whether the batch is valid
    pub valid: bool,

    /// Failure category if verification failed
    pub category: Option<ErrorCategory>,

    /// Error message if verification failed
    pub error: Option<String>,

    /// Index of the offending operation record, when the failure is local to one
    pub failed_operation: Option<usize>,

    pub prior_root: Digest,

    /// Verified root when valid, claimed root otherwise
    pub final_root: Digest,

    pub num_operations: usize,

    pub num_chunks: usize,

    pub pubdata_commitment: Hash256,

    /// Verification time in milliseconds
    pub verification_time_ms: u64,
}

impl BatchVerificationResult {
    fn accepted(batch: &BatchInput, summary: &BatchSummary, verification_time_ms: u64) -> Self {
        Self {
            valid: true,
            category: None,
            error: None,
            failed_operation: None,
            prior_root: batch.prior_root,
            final_root: summary.final_root,
            num_operations: summary.num_operations,
            num_chunks: summary.num_chunks,
            pubdata_commitment: summary.pubdata_commitment,
            verification_time_ms,
        }
    }

    fn rejected(batch: &BatchInput, err: &VerifyError, verification_time_ms: u64) -> Self {
        Self {
            valid: false,
            category: Some(err.category()),
            error: Some(err.to_string()),
            failed_operation: err.operation_index(),
            prior_root: batch.prior_root,
            final_root: batch.final_root,
            num_operations: batch.operations.iter().filter(|op| op.chunk == 0).count(),
            num_chunks: batch.operations.len(),
            pubdata_commitment: batch.pubdata_commitment,
            verification_time_ms,
        }
    }
}

/// State owned by one verification pass
struct DriverState {
    current_root: Digest,
    sequencer: ChunkSequencer,
    accumulator: PubdataAccumulator,
    operations_committed: usize,
}

impl DriverState {
    fn new(prior_root: Digest) -> Self {
        Self {
            current_root: prior_root,
            sequencer: ChunkSequencer::new(),
            accumulator: PubdataAccumulator::new(),
            operations_committed: 0,
        }
    }
}

/// Rollup batch verifier
pub struct BatchVerifier {
    options: VerifierOptions,
    registry: ValidatorRegistry,
    checker: Box<dyn SignatureChecker>,
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl std::fmt::Debug for BatchVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchVerifier")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Default for BatchVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchVerifier {
    /// Sequential verifier with the standard validators and BIP-340 signatures
    pub fn new() -> Self {
        Self {
            options: VerifierOptions::default(),
            registry: ValidatorRegistry::standard(),
            checker: Box::new(Bip340Checker),
            pool: None,
        }
    }

    /// Create a verifier with custom options
    pub fn with_options(options: VerifierOptions) -> Result<Self, OptionsError> {
        options.validate()?;
        let pool = match options.worker_threads {
            Some(threads) if options.uses_parallelism() => Some(Arc::new(
                rayon::ThreadPoolBuilder::new().num_threads(threads).build()?,
            )),
            _ => None,
        };
        Ok(Self {
            options,
            pool,
            ..Self::new()
        })
    }

    /// Replace the validator set
    pub fn with_registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the `check_sig` primitive
    pub fn with_signature_checker(mut self, checker: impl SignatureChecker + 'static) -> Self {
        self.checker = Box::new(checker);
        self
    }

    pub fn options(&self) -> &VerifierOptions {
        &self.options
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    pub(crate) fn in_pool<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    /// Verify a batch and report the outcome
    #[instrument(skip_all, fields(chunks = batch.operations.len()))]
    pub fn verify(&self, batch: &BatchInput) -> BatchVerificationResult {
        let start = Instant::now();
        let outcome = self.in_pool(|| self.run(batch));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(summary) => {
                info!(
                    operations = summary.num_operations,
                    final_root = %summary.final_root,
                    elapsed_ms,
                    "batch accepted"
                );
                BatchVerificationResult::accepted(batch, &summary, elapsed_ms)
            }
            Err(err) => {
                warn!(category = %err.category(), error = %err, "batch rejected");
                BatchVerificationResult::rejected(batch, &err, elapsed_ms)
            }
        }
    }

    /// Verify a batch, stopping at the first failing assertion
    pub fn run(&self, batch: &BatchInput) -> VerifyResult<BatchSummary> {
        let mut state = DriverState::new(batch.prior_root);

        for (index, op) in batch.operations.iter().enumerate() {
            self.execute_chunk(&mut state, index, op)?;
        }

        state
            .sequencer
            .finish()
            .map_err(VerifyError::IncompleteBatch)?;

        if state.current_root != batch.final_root {
            return Err(VerifyError::IncompleteBatch(IncompleteReason::FinalRoot {
                expected: batch.final_root,
                computed: state.current_root,
            }));
        }

        let commitment = state.accumulator.running_hash();
        if commitment != batch.pubdata_commitment {
            return Err(VerifyError::IncompleteBatch(IncompleteReason::Commitment {
                expected: batch.pubdata_commitment,
                computed: commitment,
            }));
        }

        Ok(BatchSummary {
            final_root: state.current_root,
            pubdata_commitment: commitment,
            num_operations: state.operations_committed,
            num_chunks: state.accumulator.chunks_absorbed(),
        })
    }

    fn execute_chunk(
        &self,
        state: &mut DriverState,
        index: usize,
        op: &Operation,
    ) -> VerifyResult<()> {
        op.check_bit_widths()
            .map_err(|source| VerifyError::RangeViolation { index, source })?;

        let info = state
            .sequencer
            .advance(op)
            .map_err(|reason| VerifyError::ChunkWitnessMismatch { index, reason })?;

        state.accumulator.absorb(op.chunk, &op.pubdata_chunk);

        let cur = op.branch(info.side);
        let pre = check_account_data(cur, &op.subtree_path, &op.account_path, false);
        if pre.root != state.current_root {
            return Err(VerifyError::RootMismatch {
                index,
                stage: RootStage::PreUpdate,
                expected: state.current_root,
                computed: pre.root,
            });
        }

        let update = self.apply_validators(index, op, &info, &pre, state.accumulator.pubdata())?;

        let post_root = post_update_root(op, &info, &update);
        if post_root != op.new_root {
            return Err(VerifyError::RootMismatch {
                index,
                stage: RootStage::PostUpdate,
                expected: op.new_root,
                computed: post_root,
            });
        }

        if self.options.trace_chunks {
            debug!(
                index,
                tx_type = %op.tx_type,
                chunk = op.chunk,
                side = %info.side,
                account = cur.account,
                last_chunk = info.last_chunk,
                "chunk verified"
            );
        }

        if info.last_chunk {
            state.current_root = op.new_root;
            state.operations_committed += 1;
        }
        Ok(())
    }

    /// Run the registry over one chunk and return the current branch's update
    ///
    /// `pre` is the commitment of the current branch before the update and
    /// `pubdata` the operation's transcript up to and including this chunk.
    /// The returned record always keeps the current branch's account and
    /// token index.
    pub fn apply_validators(
        &self,
        index: usize,
        op: &Operation,
        info: &ChunkInfo,
        pre: &AccountCommitment,
        pubdata: &[u8],
    ) -> VerifyResult<BranchUpdate> {
        let cur = op.branch(info.side);
        let range = |source| VerifyError::RangeViolation { index, source };

        let amount = AMOUNT_FORMAT
            .unpack("args.amount_packed", op.args.amount_packed)
            .map_err(range)?;
        let fee = FEE_FORMAT
            .unpack("args.fee_packed", op.args.fee_packed)
            .map_err(range)?;

        let computed = Computed {
            amount,
            fee,
            range_checked: ge(op.a, op.b),
            compact_amount_correct: check_compact_amount(amount, op.args.compact_amount),
            new_pubkey_hash: op.args.new_pubkey.hash(),
            signature_valid: !cur.signer_pubkey.is_empty()
                && self
                    .checker
                    .check_sig(&cur.sig_msg, &cur.signer_pubkey, &cur.signature),
            account_is_empty: pre.account_is_empty,
            subaccount_is_empty: pre.subaccount_is_empty,
            subtree_root: pre.subtree_root,
            pubdata,
            last_chunk: info.last_chunk,
        };
        let ctx = ValidationContext {
            index,
            op,
            side: info.side,
            cur,
            computed: &computed,
        };

        let mut update = self
            .registry
            .evaluate(&ctx, self.options.parallel_validators)?;
        update.record.account = cur.account;
        update.record.token = cur.token;
        Ok(update)
    }
}

/// Root implied by the current branch's update, with the other branch's
/// post-update node spliced in for two-sided operations
fn post_update_root(op: &Operation, info: &ChunkInfo, update: &BranchUpdate) -> Digest {
    let account = update.record.account;
    let path = if op.tx_type.is_two_sided() {
        intersection_path(
            &op.account_path,
            account,
            op.lhs.account,
            op.rhs.account,
            &op.lhs.intersection_hash,
            &op.rhs.intersection_hash,
            info.side,
        )
    } else {
        Cow::Borrowed(op.account_path.as_slice())
    };

    check_account_data(
        &update.record,
        &op.subtree_path,
        &path,
        update.clear_account,
    )
    .root
}

/// Verify a batch with the default verifier
pub fn verify_batch(batch: &BatchInput) -> BatchVerificationResult {
    BatchVerifier::new().verify(batch)
}
