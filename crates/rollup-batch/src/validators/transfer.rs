//! Transfers between two existing accounts, and order fills which settle
//! the same way

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{
    ACCOUNT_BYTES, AMOUNT_PACKED_BYTES, FEE_PACKED_BYTES, NONCE_BYTES, TOKEN_BYTES,
};
use rollup_primitives::{Hash256, PubKey};

use super::{BranchUpdate, OperationValidator, SigMessage, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;
use crate::witness::{BranchRecord, OpArgs};

pub fn pubdata(tx_type: TxType, args: &OpArgs, lhs: &BranchRecord, rhs: &BranchRecord) -> Vec<u8> {
    PubdataWriter::new(tx_type)
        .uint(lhs.account, ACCOUNT_BYTES)
        .uint(lhs.token, TOKEN_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(rhs.account, ACCOUNT_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .finish()
}

/// Message a sender signs to move funds to `recipient`
pub fn signed_message(
    tx_type: TxType,
    args: &OpArgs,
    sender: &BranchRecord,
    recipient: &PubKey,
) -> Hash256 {
    SigMessage::new(tx_type)
        .uint(sender.account, ACCOUNT_BYTES)
        .uint(sender.token, TOKEN_BYTES)
        .uint(sender.account_nonce, NONCE_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .key(recipient)
        .finish()
}

/// Sender side shared by every transfer flavour: the owner signs, the
/// balance covers `amount + fee`, and the nonce advances.
pub(crate) fn debit_sender(
    ctx: &ValidationContext<'_>,
    recipient: &PubKey,
    layout: impl FnOnce() -> Vec<u8>,
) -> VerifyResult<Option<BranchUpdate>> {
    let (cur, computed) = (ctx.cur, ctx.computed);
    let total = computed.amount.checked_add(computed.fee);
    let msg = signed_message(ctx.op.tx_type, ctx.args(), cur, recipient);

    let authorized =
        ctx.authorized_by(&cur.owner_pubkey, &msg) && ctx.range_holds(Some(cur.balance), total);
    let Some(total) = total.filter(|_| authorized) else {
        return Ok(None);
    };

    ctx.expect_pubdata(layout)?;
    let nonce = ctx.incremented_nonce()?;

    let mut record = cur.clone();
    record.balance = cur.balance - total;
    record.account_nonce = nonce;
    Ok(Some(BranchUpdate::new(record)))
}

fn validate_transfer(
    ctx: &ValidationContext<'_>,
    tx_type: TxType,
) -> VerifyResult<Option<BranchUpdate>> {
    if ctx.op.tx_type != tx_type {
        return Ok(None);
    }
    let (lhs, rhs, args) = (ctx.lhs(), ctx.rhs(), ctx.args());
    let layout = || pubdata(tx_type, args, lhs, rhs);

    match ctx.side {
        Side::Lhs => debit_sender(ctx, &rhs.owner_pubkey, layout),
        Side::Rhs => {
            let cur = ctx.cur;
            let credited = cur.balance.checked_add(ctx.computed.amount);
            let authorized = !ctx.computed.account_is_empty
                && cur.token == lhs.token
                && ctx.range_holds(credited, Some(cur.balance));
            let Some(credited) = credited.filter(|_| authorized) else {
                return Ok(None);
            };

            ctx.expect_pubdata(layout)?;

            let mut record = cur.clone();
            record.balance = credited;
            Ok(Some(BranchUpdate::new(record)))
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferValidator;

impl OperationValidator for TransferValidator {
    fn name(&self) -> &'static str {
        TxType::Transfer.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        validate_transfer(ctx, TxType::Transfer)
    }
}

/// Settles a matched order pair as a debit on the taker and a credit on the
/// maker, with the same arithmetic as a transfer
#[derive(Debug, Clone, Copy, Default)]
pub struct FillOrdersValidator;

impl OperationValidator for FillOrdersValidator {
    fn name(&self) -> &'static str {
        TxType::FillOrders.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        validate_transfer(ctx, TxType::FillOrders)
    }
}
