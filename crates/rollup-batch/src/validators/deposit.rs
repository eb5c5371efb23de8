//! Deposit: credits a fresh balance leaf from the L1 bridge

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{
    ACCOUNT_BYTES, AMOUNT_PACKED_BYTES, FEE_PACKED_BYTES, TOKEN_BYTES,
};

use super::{BranchUpdate, OperationValidator, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;
use crate::witness::{BranchRecord, OpArgs};

pub fn pubdata(args: &OpArgs, target: &BranchRecord) -> Vec<u8> {
    PubdataWriter::new(TxType::Deposit)
        .uint(target.account, ACCOUNT_BYTES)
        .uint(target.token, TOKEN_BYTES)
        .uint(args.amount_packed, AMOUNT_PACKED_BYTES)
        .uint(args.fee_packed, FEE_PACKED_BYTES)
        .bytes(&args.new_pubkey.hash())
        .finish()
}

/// Deposits need no signature: the bridge contract vouches for the funds.
/// The target leaf must be unused and the account either empty or already
/// owned by the depositing key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepositValidator;

impl OperationValidator for DepositValidator {
    fn name(&self) -> &'static str {
        TxType::Deposit.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if !ctx.is(TxType::Deposit, Side::Lhs) {
            return Ok(None);
        }
        let (cur, args, computed) = (ctx.cur, ctx.args(), ctx.computed);

        let leaf_empty = cur.balance == 0 && cur.leaf_nonce == 0;
        let owner_ok = computed.account_is_empty || cur.owner_pubkey == args.new_pubkey;
        let authorized = leaf_empty
            && owner_ok
            && !args.new_pubkey.is_empty()
            && ctx.range_holds(Some(computed.amount), Some(computed.fee));
        if !authorized {
            return Ok(None);
        }

        ctx.expect_pubdata(|| pubdata(args, cur))?;

        let mut record = cur.clone();
        record.owner_pubkey = args.new_pubkey;
        record.balance = computed.amount - computed.fee;
        Ok(Some(BranchUpdate::new(record)))
    }
}
