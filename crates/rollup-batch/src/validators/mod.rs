//! Operation validators
//!
//! Each validator inspects one chunk through a [`ValidationContext`] and
//! either declines (`Ok(None)`), accepts with the updated current branch, or
//! fails the batch outright once it has authorized the chunk but finds its
//! pubdata or nonce inconsistent. The [`ValidatorRegistry`] requires exactly
//! one acceptance per chunk.
//!
//! # Available Validators
//!
//! - `noop`: zero pubdata, no state change
//! - `deposit`: credits an empty balance leaf
//! - `transfer`, `fill_orders`: two-sided debit and credit
//! - `transfer_to_new`: debit into a fresh account
//! - `partial_exit`, `full_exit`: withdrawals
//! - `escalation`: unilateral subaccount close
//! - `create_subaccount`, `close_subaccount`: subaccount lifecycle

pub mod deposit;
pub mod escalation;
pub mod exit;
pub mod noop;
pub mod subaccount;
pub mod transfer;
pub mod transfer_to_new;

pub use deposit::DepositValidator;
pub use escalation::EscalationValidator;
pub use exit::{FullExitValidator, PartialExitValidator};
pub use noop::NoopValidator;
pub use subaccount::{CloseSubaccountValidator, CreateSubaccountValidator};
pub use transfer::{FillOrdersValidator, TransferValidator};
pub use transfer_to_new::TransferToNewValidator;

use rayon::prelude::*;

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{MAX_NONCE, SIGNATURE_DOMAIN};
use rollup_primitives::{Digest, Hash256, PubKey, PubkeyHash};

use crate::error::{VerifyError, VerifyResult};
use crate::witness::{BranchRecord, OpArgs, Operation};

/// Values derived once per chunk and shared by every validator
#[derive(Debug, Clone)]
pub struct Computed<'a> {
    /// Decoded `args.amount_packed`
    pub amount: u128,
    /// Decoded `args.fee_packed`
    pub fee: u128,
    /// `op.a >= op.b`
    pub range_checked: bool,
    pub compact_amount_correct: bool,
    pub new_pubkey_hash: PubkeyHash,
    /// The current branch's signature verifies against its signer and message
    pub signature_valid: bool,
    pub account_is_empty: bool,
    pub subaccount_is_empty: bool,
    /// Pre-update subtree root of the current branch
    pub subtree_root: Digest,
    /// Transcript of the operation so far
    pub pubdata: &'a [u8],
    pub last_chunk: bool,
}

/// Everything a validator may read for one chunk
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub index: usize,
    pub op: &'a Operation,
    pub side: Side,
    pub cur: &'a BranchRecord,
    pub computed: &'a Computed<'a>,
}

impl<'a> ValidationContext<'a> {
    pub fn is(&self, tx_type: TxType, side: Side) -> bool {
        self.op.tx_type == tx_type && self.side == side
    }

    pub fn lhs(&self) -> &'a BranchRecord {
        &self.op.lhs
    }

    pub fn rhs(&self) -> &'a BranchRecord {
        &self.op.rhs
    }

    pub fn args(&self) -> &'a OpArgs {
        &self.op.args
    }

    /// `a >= b` holds and both witnesses are the values the validator expects
    ///
    /// `None` stands for an expected value that overflowed; it never matches.
    pub fn range_holds(&self, a: Option<u128>, b: Option<u128>) -> bool {
        self.computed.range_checked && a == Some(self.op.a) && b == Some(self.op.b)
    }

    /// `key` signed exactly `msg` through the current branch's signature witness
    pub fn authorized_by(&self, key: &PubKey, msg: &Hash256) -> bool {
        self.computed.signature_valid
            && !key.is_empty()
            && self.cur.signer_pubkey == *key
            && self.cur.sig_msg == *msg
    }

    /// Compare the full transcript against `layout` on the operation's last chunk
    pub fn expect_pubdata(&self, layout: impl FnOnce() -> Vec<u8>) -> VerifyResult<()> {
        if !self.computed.last_chunk || self.computed.pubdata == layout().as_slice() {
            Ok(())
        } else {
            Err(VerifyError::PubdataMismatch {
                index: self.index,
                tx_type: self.op.tx_type,
            })
        }
    }

    /// Nonce after one increment of the current branch's account nonce
    pub fn incremented_nonce(&self) -> VerifyResult<u32> {
        let nonce = self.cur.account_nonce;
        if nonce < MAX_NONCE {
            Ok(nonce + 1)
        } else {
            Err(VerifyError::NonceOverflow {
                index: self.index,
                account: self.cur.account,
            })
        }
    }
}

/// Post-update view of the current branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchUpdate {
    pub record: BranchRecord,
    /// Replace the whole account leaf with the empty leaf
    pub clear_account: bool,
}

impl BranchUpdate {
    pub fn new(record: BranchRecord) -> Self {
        Self {
            record,
            clear_account: false,
        }
    }

    pub fn cleared(record: BranchRecord) -> Self {
        Self {
            record,
            clear_account: true,
        }
    }
}

/// One operation kind's authorization predicate and state update
pub trait OperationValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` declines the chunk; `Ok(Some(_))` accepts it
    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>>;
}

/// Ordered set of validators reduced by exactly-one acceptance
pub struct ValidatorRegistry {
    validators: Vec<Box<dyn OperationValidator>>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.name()))
            .finish()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ValidatorRegistry {
    /// An empty registry; every chunk is rejected until validators are added
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// One validator per transaction type
    pub fn standard() -> Self {
        Self::new()
            .with(NoopValidator)
            .with(DepositValidator)
            .with(TransferToNewValidator)
            .with(TransferValidator)
            .with(PartialExitValidator)
            .with(FullExitValidator)
            .with(EscalationValidator)
            .with(CreateSubaccountValidator)
            .with(CloseSubaccountValidator)
            .with(FillOrdersValidator)
    }

    pub fn register(&mut self, validator: impl OperationValidator + 'static) {
        self.validators.push(Box::new(validator));
    }

    pub fn with(mut self, validator: impl OperationValidator + 'static) -> Self {
        self.register(validator);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    /// Run every validator and return the single accepted update
    ///
    /// Errors surface in registry order, so the outcome does not depend on
    /// `parallel`.
    pub fn evaluate(
        &self,
        ctx: &ValidationContext<'_>,
        parallel: bool,
    ) -> VerifyResult<BranchUpdate> {
        let outcomes: Vec<VerifyResult<Option<BranchUpdate>>> = if parallel {
            self.validators.par_iter().map(|v| v.validate(ctx)).collect()
        } else {
            self.validators.iter().map(|v| v.validate(ctx)).collect()
        };

        let mut accepted = Vec::with_capacity(1);
        for outcome in outcomes {
            if let Some(update) = outcome? {
                accepted.push(update);
            }
        }

        if accepted.len() == 1 {
            Ok(accepted.remove(0))
        } else {
            Err(VerifyError::InvalidOperation {
                index: ctx.index,
                tx_type: ctx.op.tx_type,
                accepted: accepted.len(),
            })
        }
    }
}

/// Domain-separated signature message: tx name followed by big-endian fields
#[derive(Debug, Clone)]
pub struct SigMessage {
    bytes: Vec<u8>,
}

impl SigMessage {
    pub fn new(tx_type: TxType) -> Self {
        Self {
            bytes: tx_type.name().as_bytes().to_vec(),
        }
    }

    pub fn uint(mut self, value: impl Into<u128>, width: usize) -> Self {
        let value: u128 = value.into();
        let be = value.to_be_bytes();
        self.bytes.extend_from_slice(&be[be.len() - width..]);
        self
    }

    pub fn key(mut self, key: &PubKey) -> Self {
        self.bytes.extend_from_slice(&key.0);
        self
    }

    pub fn finish(self) -> Hash256 {
        Hash256::sha256_with_domain(SIGNATURE_DOMAIN, &self.bytes)
    }
}

/// Expected transcript of a complete operation
///
/// `lhs_subtree_root` is only read by `full_exit`, which publishes the
/// account's pre-exit subtree root.
pub fn pubdata_layout(
    tx_type: TxType,
    args: &OpArgs,
    lhs: &BranchRecord,
    rhs: &BranchRecord,
    lhs_subtree_root: &Digest,
) -> Vec<u8> {
    match tx_type {
        TxType::Noop => noop::pubdata(),
        TxType::Deposit => deposit::pubdata(args, lhs),
        TxType::TransferToNew => transfer_to_new::pubdata(args, lhs, rhs),
        TxType::Transfer | TxType::FillOrders => transfer::pubdata(tx_type, args, lhs, rhs),
        TxType::PartialExit => exit::partial_exit_pubdata(args, lhs),
        TxType::FullExit => exit::full_exit_pubdata(lhs, lhs_subtree_root),
        TxType::Escalation => escalation::pubdata(lhs),
        TxType::CreateSubaccount => subaccount::create_pubdata(args, lhs, rhs),
        TxType::CloseSubaccount => subaccount::close_pubdata(args, lhs, rhs),
    }
}

/// Message the authorizing key signs, or `None` for unsigned operations
pub fn signed_message(
    tx_type: TxType,
    args: &OpArgs,
    lhs: &BranchRecord,
    rhs: &BranchRecord,
) -> Option<Hash256> {
    match tx_type {
        TxType::Noop | TxType::Deposit | TxType::FullExit => None,
        TxType::Transfer | TxType::FillOrders => {
            Some(transfer::signed_message(tx_type, args, lhs, &rhs.owner_pubkey))
        }
        TxType::TransferToNew => Some(transfer::signed_message(
            tx_type,
            args,
            lhs,
            &args.new_pubkey,
        )),
        TxType::PartialExit => Some(exit::partial_exit_message(args, lhs)),
        TxType::Escalation => Some(escalation::signed_message(lhs)),
        TxType::CreateSubaccount => Some(subaccount::create_message(args, lhs, rhs)),
        TxType::CloseSubaccount => Some(subaccount::close_message(args, lhs, rhs)),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    struct AcceptAll;

    impl OperationValidator for AcceptAll {
        fn name(&self) -> &'static str {
            "accept_all"
        }

        fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
            Ok(Some(BranchUpdate::new(ctx.cur.clone())))
        }
    }

    fn evaluate(
        registry: &ValidatorRegistry,
        op: &Operation,
        parallel: bool,
    ) -> VerifyResult<BranchUpdate> {
        let pubdata = noop::pubdata();
        let computed = Computed {
            amount: 0,
            fee: 0,
            range_checked: true,
            compact_amount_correct: true,
            new_pubkey_hash: [0u8; 20],
            signature_valid: false,
            account_is_empty: true,
            subaccount_is_empty: true,
            subtree_root: Digest::default(),
            pubdata: &pubdata,
            last_chunk: true,
        };
        let ctx = ValidationContext {
            index: 4,
            op,
            side: Side::Lhs,
            cur: &op.lhs,
            computed: &computed,
        };
        registry.evaluate(&ctx, parallel)
    }

    #[test]
    fn test_standard_registry_covers_every_type() {
        let registry = ValidatorRegistry::standard();
        assert_eq!(registry.len(), TxType::ALL.len());
        for tx in TxType::ALL {
            assert!(registry.names().contains(&tx.name()));
        }
    }

    #[test]
    fn test_exactly_one_noop() {
        let op = operation(TxType::Noop, 0);
        for parallel in [false, true] {
            let update = evaluate(&ValidatorRegistry::standard(), &op, parallel).unwrap();
            assert_eq!(update.record, op.lhs);
        }
    }

    #[test]
    fn test_ambiguous_registry_rejected() {
        let registry = ValidatorRegistry::standard().with(AcceptAll);
        let op = operation(TxType::Noop, 0);
        assert_eq!(
            evaluate(&registry, &op, false),
            Err(VerifyError::InvalidOperation {
                index: 4,
                tx_type: TxType::Noop,
                accepted: 2
            })
        );
    }

    #[test]
    fn test_empty_registry_accepts_nothing() {
        let op = operation(TxType::Noop, 0);
        assert!(matches!(
            evaluate(&ValidatorRegistry::new(), &op, true),
            Err(VerifyError::InvalidOperation { accepted: 0, .. })
        ));
    }

    #[test]
    fn test_sig_message_is_domain_separated() {
        let msg = SigMessage::new(TxType::Transfer).uint(7u32, 3).finish();
        let mut raw = b"transfer".to_vec();
        raw.extend_from_slice(&[0, 0, 7]);
        assert_eq!(msg, Hash256::sha256_with_domain(SIGNATURE_DOMAIN, &raw));
        assert_ne!(msg, Hash256::sha256(&raw));
    }

    #[test]
    fn test_authorized_by_rejects_empty_key() {
        let op = operation(TxType::Noop, 0);
        let computed = Computed {
            amount: 0,
            fee: 0,
            range_checked: true,
            compact_amount_correct: false,
            new_pubkey_hash: [0u8; 20],
            signature_valid: true,
            account_is_empty: true,
            subaccount_is_empty: true,
            subtree_root: Digest::default(),
            pubdata: &[],
            last_chunk: false,
        };
        let ctx = ValidationContext {
            index: 0,
            op: &op,
            side: Side::Lhs,
            cur: &op.lhs,
            computed: &computed,
        };
        assert!(!ctx.authorized_by(&PubKey::EMPTY, &Hash256::zero()));
    }

    #[test]
    fn test_nonce_guard() {
        let mut op = operation(TxType::PartialExit, 0);
        op.lhs.account = 9;
        op.lhs.account_nonce = MAX_NONCE;
        let computed = Computed {
            amount: 0,
            fee: 0,
            range_checked: true,
            compact_amount_correct: false,
            new_pubkey_hash: [0u8; 20],
            signature_valid: false,
            account_is_empty: false,
            subaccount_is_empty: true,
            subtree_root: Digest::default(),
            pubdata: &[],
            last_chunk: false,
        };
        let ctx = ValidationContext {
            index: 2,
            op: &op,
            side: Side::Lhs,
            cur: &op.lhs,
            computed: &computed,
        };
        assert_eq!(
            ctx.incremented_nonce(),
            Err(VerifyError::NonceOverflow {
                index: 2,
                account: 9
            })
        );
    }

    #[test]
    fn test_every_layout_fills_its_chunks() {
        let record = BranchRecord::default();
        for tx_type in TxType::ALL {
            let layout = pubdata_layout(
                tx_type,
                &OpArgs::default(),
                &record,
                &record,
                &Digest::default(),
            );
            assert_eq!(
                layout.len(),
                tx_type.max_chunks() as usize * rollup_primitives::params::CHUNK_BYTES,
                "{tx_type}"
            );
            assert_eq!(layout[0], tx_type.code());
        }
    }
}
