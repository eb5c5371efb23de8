//! Batch construction from high-level operation requests
//!
//! The builder replays every operation through the verifier's own validator
//! registry, so a batch it emits through [`BatchBuilder::apply`] is accepted
//! by construction. [`BatchBuilder::apply_unchecked`] skips that replay and
//! leaves the state untouched, which is how rejected batches are produced for
//! tests.

use std::collections::HashMap;

use rollup_batch::state::divergence_height;
use rollup_batch::{
    check_account_data, commitment_of, pubdata_layout, signed_message, split_chunks,
    AccountCommitment, BatchInput, BatchVerifier, BranchRecord, BranchUpdate, ChunkInfo, OpArgs,
    Operation, PubdataChunk, SubtreePath,
};
use rollup_constraints::{fits_bits, Side, TxType, AMOUNT_FORMAT, FEE_FORMAT};
use rollup_primitives::params::{CHUNK_BYTES, COMPACT_AMOUNT_BIT_WIDTH, COMPACT_AMOUNT_SHIFT};
use rollup_primitives::{Digest, PubKey, SigningKey};
use tracing::debug;

use crate::error::{WitnessError, WitnessResult};
use crate::store::AccountStore;

/// One operation request, in token units
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpSpec {
    Noop,
    Deposit {
        account: u32,
        token: u32,
        amount: u128,
        fee: u128,
        owner: PubKey,
    },
    Transfer {
        from: u32,
        to: u32,
        token: u32,
        amount: u128,
        fee: u128,
    },
    TransferToNew {
        from: u32,
        to: u32,
        token: u32,
        amount: u128,
        fee: u128,
        new_owner: PubKey,
    },
    PartialExit {
        account: u32,
        token: u32,
        amount: u128,
        fee: u128,
    },
    FullExit {
        account: u32,
        token: u32,
    },
    Escalation {
        account: u32,
        token: u32,
    },
    CreateSubaccount {
        owner_account: u32,
        cosigner_account: u32,
        token: u32,
        amount: u128,
        fee: u128,
    },
    CloseSubaccount {
        owner_account: u32,
        cosigner_account: u32,
        token: u32,
        fee: u128,
    },
    FillOrders {
        taker: u32,
        maker: u32,
        token: u32,
        amount: u128,
        fee: u128,
    },
}

impl OpSpec {
    pub fn tx_type(&self) -> TxType {
        match self {
            OpSpec::Noop => TxType::Noop,
            OpSpec::Deposit { .. } => TxType::Deposit,
            OpSpec::Transfer { .. } => TxType::Transfer,
            OpSpec::TransferToNew { .. } => TxType::TransferToNew,
            OpSpec::PartialExit { .. } => TxType::PartialExit,
            OpSpec::FullExit { .. } => TxType::FullExit,
            OpSpec::Escalation { .. } => TxType::Escalation,
            OpSpec::CreateSubaccount { .. } => TxType::CreateSubaccount,
            OpSpec::CloseSubaccount { .. } => TxType::CloseSubaccount,
            OpSpec::FillOrders { .. } => TxType::FillOrders,
        }
    }
}

/// Operation fields resolved against the current state
#[derive(Debug, Clone)]
struct Draft {
    tx_type: TxType,
    args: OpArgs,
    lhs: BranchRecord,
    rhs: BranchRecord,
    /// `(a, b)` range witnesses for the LHS and RHS chunks
    ranges: [(u128, u128); 2],
    /// Side that carries the signature and the keys that may produce it
    signing: Option<(Side, Vec<PubKey>)>,
}

/// Pre-operation Merkle data of one branch
#[derive(Debug, Clone)]
struct BranchWitness {
    account_path: Vec<Digest>,
    subtree_path: SubtreePath,
    commitment: AccountCommitment,
}

#[derive(Debug, Clone)]
struct Snapshot {
    lhs: BranchWitness,
    rhs: BranchWitness,
}

impl Snapshot {
    fn side(&self, side: Side) -> &BranchWitness {
        match side {
            Side::Lhs => &self.lhs,
            Side::Rhs => &self.rhs,
        }
    }
}

/// Builds chunked batches against an [`AccountStore`]
pub struct BatchBuilder {
    store: AccountStore,
    prior_root: Digest,
    keys: HashMap<PubKey, SigningKey>,
    verifier: BatchVerifier,
    operations: Vec<Operation>,
    num_operations: usize,
}

impl std::fmt::Debug for BatchBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchBuilder")
            .field("prior_root", &self.prior_root)
            .field("root", &self.store.root())
            .field("keys", &self.keys.len())
            .field("num_operations", &self.num_operations)
            .field("num_chunks", &self.operations.len())
            .finish()
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new(AccountStore::new())
    }
}

impl BatchBuilder {
    /// Start a batch on top of `store`
    pub fn new(store: AccountStore) -> Self {
        Self {
            prior_root: store.root(),
            store,
            keys: HashMap::new(),
            verifier: BatchVerifier::new(),
            operations: Vec::new(),
            num_operations: 0,
        }
    }

    /// Replay operations through a custom verifier instead of the default
    pub fn with_verifier(mut self, verifier: BatchVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Register a key the builder may sign with
    pub fn with_key(mut self, key: SigningKey) -> Self {
        self.register_key(key);
        self
    }

    pub fn register_key(&mut self, key: SigningKey) {
        self.keys.insert(key.public_key(), key);
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn root(&self) -> Digest {
        self.store.root()
    }

    pub fn num_operations(&self) -> usize {
        self.num_operations
    }

    /// Validate `spec` against the current state, apply it and emit its
    /// chunks; returns the new state root
    pub fn apply(&mut self, spec: OpSpec) -> WitnessResult<Digest> {
        let mut draft = self.draft(&spec)?;
        self.sign(&mut draft, None)?;
        let tx_type = draft.tx_type;
        let snapshot = self.snapshot(&draft);
        let layout = pubdata_layout(
            tx_type,
            &draft.args,
            &draft.lhs,
            &draft.rhs,
            &snapshot.lhs.commitment.subtree_root,
        );
        let chunks = split_chunks(&layout);

        let mut updates: Vec<BranchUpdate> = Vec::with_capacity(2);
        for &side in sides(tx_type) {
            let chunk = first_chunk(tx_type, side);
            let info = ChunkInfo {
                chunk,
                first_chunk: chunk == 0,
                last_chunk: chunk + 1 == tx_type.max_chunks(),
                side,
            };
            let op = chunk_operation(&draft, &snapshot, &chunks, chunk, Digest::default());
            let end = ((chunk as usize + 1) * CHUNK_BYTES).min(layout.len());
            let update = self
                .verifier
                .apply_validators(
                    self.operations.len() + chunk as usize,
                    &op,
                    &info,
                    &snapshot.side(side).commitment,
                    &layout[..end],
                )
                .map_err(|source| WitnessError::Rejected { tx_type, source })?;
            updates.push(update);
        }

        for update in &updates {
            self.store.apply(update)?;
        }

        if tx_type.is_two_sided() {
            if let Some(height) = divergence_height(draft.lhs.account, draft.rhs.account) {
                draft.lhs.intersection_hash = self.store.account_node(height, draft.lhs.account);
                draft.rhs.intersection_hash = self.store.account_node(height, draft.rhs.account);
            }
        }

        let new_root = self.store.root();
        self.emit(&draft, &snapshot, &chunks, new_root);
        debug!(
            operation = self.num_operations - 1,
            tx_type = %tx_type,
            root = %new_root,
            "operation applied"
        );
        Ok(new_root)
    }

    /// Emit `spec` without running any validator; the state root stays put
    ///
    /// `signer` overrides the registered key lookup, so a forged signature
    /// can be attached.
    pub fn apply_unchecked(
        &mut self,
        spec: OpSpec,
        signer: Option<&SigningKey>,
    ) -> WitnessResult<()> {
        let mut draft = self.draft(&spec)?;
        self.sign(&mut draft, signer)?;
        let snapshot = self.snapshot(&draft);
        let layout = pubdata_layout(
            draft.tx_type,
            &draft.args,
            &draft.lhs,
            &draft.rhs,
            &snapshot.lhs.commitment.subtree_root,
        );
        let chunks = split_chunks(&layout);
        let root = self.store.root();
        self.emit(&draft, &snapshot, &chunks, root);
        Ok(())
    }

    /// Close the current batch and start the next one at the current root
    pub fn seal(&mut self) -> BatchInput {
        let operations = std::mem::take(&mut self.operations);
        let batch = BatchInput {
            prior_root: self.prior_root,
            final_root: self.store.root(),
            pubdata_commitment: commitment_of(operations.iter().map(|op| &op.pubdata_chunk)),
            operations,
        };
        self.prior_root = self.store.root();
        self.num_operations = 0;
        batch
    }

    pub fn finish(mut self) -> BatchInput {
        self.seal()
    }

    fn emit(&mut self, draft: &Draft, snapshot: &Snapshot, chunks: &[PubdataChunk], root: Digest) {
        for chunk in 0..draft.tx_type.max_chunks() {
            self.operations
                .push(chunk_operation(draft, snapshot, chunks, chunk, root));
        }
        self.num_operations += 1;
    }

    fn snapshot(&self, draft: &Draft) -> Snapshot {
        Snapshot {
            lhs: self.branch_witness(&draft.lhs),
            rhs: self.branch_witness(&draft.rhs),
        }
    }

    fn branch_witness(&self, record: &BranchRecord) -> BranchWitness {
        let account_path = self.store.account_path(record.account);
        let subtree_path = self.store.subtree_path(record.account, record.token);
        let commitment = check_account_data(record, &subtree_path, &account_path, false);
        BranchWitness {
            account_path,
            subtree_path,
            commitment,
        }
    }

    fn sign(&self, draft: &mut Draft, signer: Option<&SigningKey>) -> WitnessResult<()> {
        let Some((side, candidates)) = &draft.signing else {
            return Ok(());
        };
        let Some(msg) = signed_message(draft.tx_type, &draft.args, &draft.lhs, &draft.rhs) else {
            return Ok(());
        };
        let side = *side;
        let account = match side {
            Side::Lhs => draft.lhs.account,
            Side::Rhs => draft.rhs.account,
        };
        let key = match signer {
            Some(key) => key,
            None => candidates
                .iter()
                .find_map(|pk| self.keys.get(pk))
                .ok_or(WitnessError::MissingKey { account })?,
        };

        let record = match side {
            Side::Lhs => &mut draft.lhs,
            Side::Rhs => &mut draft.rhs,
        };
        record.sig_msg = msg;
        record.signer_pubkey = key.public_key();
        record.signature = key.sign(&msg);
        Ok(())
    }

    fn draft(&self, spec: &OpSpec) -> WitnessResult<Draft> {
        let tx_type = spec.tx_type();
        let overflow = || WitnessError::Overflow(tx_type);
        let mut draft = Draft {
            tx_type,
            args: OpArgs::default(),
            lhs: BranchRecord::default(),
            rhs: BranchRecord::default(),
            ranges: [(0, 0); 2],
            signing: None,
        };

        match *spec {
            OpSpec::Noop => {
                draft.lhs = self.store.branch(0, 0)?;
            }
            OpSpec::Deposit {
                account,
                token,
                amount,
                fee,
                owner,
            } => {
                draft.lhs = self.store.branch(account, token)?;
                draft.args = packed_args(amount, fee)?;
                draft.args.new_pubkey = owner;
                draft.ranges[0] = (amount, fee);
            }
            OpSpec::Transfer {
                from: lhs,
                to: rhs,
                token,
                amount,
                fee,
            }
            | OpSpec::FillOrders {
                taker: lhs,
                maker: rhs,
                token,
                amount,
                fee,
            } => {
                self.load_pair(&mut draft, lhs, rhs, token)?;
                draft.args = packed_args(amount, fee)?;
                let total = amount.checked_add(fee).ok_or_else(overflow)?;
                let credited = draft.rhs.balance.checked_add(amount).ok_or_else(overflow)?;
                draft.ranges = [(draft.lhs.balance, total), (credited, draft.rhs.balance)];
                draft.signing = Some((Side::Lhs, vec![draft.lhs.owner_pubkey]));
            }
            OpSpec::TransferToNew {
                from,
                to,
                token,
                amount,
                fee,
                new_owner,
            } => {
                self.load_pair(&mut draft, from, to, token)?;
                draft.args = packed_args(amount, fee)?;
                draft.args.compact_amount = compact_amount(amount)?;
                draft.args.new_pubkey = new_owner;
                let total = amount.checked_add(fee).ok_or_else(overflow)?;
                draft.ranges[0] = (draft.lhs.balance, total);
                draft.signing = Some((Side::Lhs, vec![draft.lhs.owner_pubkey]));
            }
            OpSpec::PartialExit {
                account,
                token,
                amount,
                fee,
            } => {
                draft.lhs = self.store.branch(account, token)?;
                draft.args = packed_args(amount, fee)?;
                let total = amount.checked_add(fee).ok_or_else(overflow)?;
                draft.ranges[0] = (draft.lhs.balance, total);
                draft.signing = Some((Side::Lhs, vec![draft.lhs.owner_pubkey]));
            }
            OpSpec::FullExit { account, token } => {
                draft.lhs = self.store.branch(account, token)?;
            }
            OpSpec::Escalation { account, token } => {
                draft.lhs = self.store.branch(account, token)?;
                let candidates = vec![
                    draft.lhs.owner_pubkey,
                    draft.lhs.subaccount.cosigner_pubkey,
                ];
                draft.signing = Some((Side::Lhs, candidates));
            }
            OpSpec::CreateSubaccount {
                owner_account,
                cosigner_account,
                token,
                amount,
                fee,
            } => {
                self.load_pair(&mut draft, cosigner_account, owner_account, token)?;
                draft.args = packed_args(amount, fee)?;
                let total = amount.checked_add(fee).ok_or_else(overflow)?;
                let sub = &draft.rhs.subaccount;
                let funded = sub.balance.checked_add(amount).ok_or_else(overflow)?;
                draft.ranges = [(draft.rhs.balance, total), (funded, sub.balance)];
                draft.signing = Some((Side::Rhs, vec![draft.rhs.owner_pubkey]));
            }
            OpSpec::CloseSubaccount {
                owner_account,
                cosigner_account,
                token,
                fee,
            } => {
                self.load_pair(&mut draft, cosigner_account, owner_account, token)?;
                draft.args = packed_args(0, fee)?;
                let sub = &draft.rhs.subaccount;
                let credited = draft
                    .lhs
                    .balance
                    .checked_add(sub.cosigner_balance)
                    .ok_or_else(overflow)?;
                let released = draft
                    .rhs
                    .balance
                    .checked_add(sub.balance)
                    .ok_or_else(overflow)?;
                draft.ranges = [(credited, draft.lhs.balance), (released, fee)];
                draft.signing = Some((Side::Rhs, vec![draft.rhs.owner_pubkey]));
            }
        }
        Ok(draft)
    }

    fn load_pair(&self, draft: &mut Draft, lhs: u32, rhs: u32, token: u32) -> WitnessResult<()> {
        if lhs == rhs {
            return Err(WitnessError::SameAccount {
                tx_type: draft.tx_type,
                account: lhs,
            });
        }
        draft.lhs = self.store.branch(lhs, token)?;
        draft.rhs = self.store.branch(rhs, token)?;
        Ok(())
    }
}

fn sides(tx_type: TxType) -> &'static [Side] {
    if tx_type.is_two_sided() {
        &[Side::Lhs, Side::Rhs]
    } else {
        &[Side::Lhs]
    }
}

fn first_chunk(tx_type: TxType, side: Side) -> u32 {
    (0..tx_type.max_chunks())
        .find(|&chunk| tx_type.side_for_chunk(chunk) == side)
        .unwrap_or(0)
}

fn chunk_operation(
    draft: &Draft,
    snapshot: &Snapshot,
    chunks: &[PubdataChunk],
    chunk: u32,
    new_root: Digest,
) -> Operation {
    let side = draft.tx_type.side_for_chunk(chunk);
    let witness = snapshot.side(side);
    let (a, b) = match side {
        Side::Lhs => draft.ranges[0],
        Side::Rhs => draft.ranges[1],
    };
    Operation {
        tx_type: draft.tx_type,
        chunk,
        pubdata_chunk: chunks.get(chunk as usize).copied().unwrap_or_default(),
        args: draft.args.clone(),
        lhs: draft.lhs.clone(),
        rhs: draft.rhs.clone(),
        a,
        b,
        new_root,
        account_path: witness.account_path.clone(),
        subtree_path: witness.subtree_path.clone(),
    }
}

fn packed_args(amount: u128, fee: u128) -> WitnessResult<OpArgs> {
    Ok(OpArgs {
        amount_packed: AMOUNT_FORMAT
            .pack(amount)
            .ok_or(WitnessError::Unrepresentable {
                field: "amount",
                value: amount,
            })?,
        fee_packed: FEE_FORMAT.pack(fee).ok_or(WitnessError::Unrepresentable {
            field: "fee",
            value: fee,
        })?,
        ..OpArgs::default()
    })
}

fn compact_amount(amount: u128) -> WitnessResult<u64> {
    let compact = amount >> COMPACT_AMOUNT_SHIFT;
    if compact << COMPACT_AMOUNT_SHIFT != amount || !fits_bits(compact, COMPACT_AMOUNT_BIT_WIDTH) {
        return Err(WitnessError::Unrepresentable {
            field: "compact_amount",
            value: amount,
        });
    }
    Ok(compact as u64)
}
