//! Escalation: either party of a subaccount closes it unilaterally
//!
//! The subaccount and cosigner balances are published so they can be
//! settled on L1; the leaf itself is reset.

use rollup_constraints::{Side, TxType};
use rollup_primitives::params::{ACCOUNT_BYTES, BALANCE_BYTES, NONCE_BYTES, TOKEN_BYTES};
use rollup_primitives::Hash256;

use super::{BranchUpdate, OperationValidator, SigMessage, ValidationContext};
use crate::error::VerifyResult;
use crate::pubdata::PubdataWriter;
use crate::witness::{BranchRecord, SubaccountLeaf};

pub fn pubdata(account: &BranchRecord) -> Vec<u8> {
    let sub = &account.subaccount;
    PubdataWriter::new(TxType::Escalation)
        .uint(account.account, ACCOUNT_BYTES)
        .uint(account.token, TOKEN_BYTES)
        .uint(sub.creation_nonce, NONCE_BYTES)
        .uint(sub.balance, BALANCE_BYTES)
        .uint(sub.cosigner_balance, BALANCE_BYTES)
        .finish()
}

pub fn signed_message(account: &BranchRecord) -> Hash256 {
    SigMessage::new(TxType::Escalation)
        .uint(account.account, ACCOUNT_BYTES)
        .uint(account.token, TOKEN_BYTES)
        .uint(account.subaccount.creation_nonce, NONCE_BYTES)
        .finish()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EscalationValidator;

impl OperationValidator for EscalationValidator {
    fn name(&self) -> &'static str {
        TxType::Escalation.name()
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> VerifyResult<Option<BranchUpdate>> {
        if !ctx.is(TxType::Escalation, Side::Lhs) || ctx.computed.subaccount_is_empty {
            return Ok(None);
        }
        let cur = ctx.cur;
        let msg = signed_message(cur);
        let authorized = ctx.authorized_by(&cur.owner_pubkey, &msg)
            || ctx.authorized_by(&cur.subaccount.cosigner_pubkey, &msg);
        if !authorized {
            return Ok(None);
        }

        ctx.expect_pubdata(|| pubdata(cur))?;

        let mut record = cur.clone();
        record.subaccount = SubaccountLeaf::default();
        Ok(Some(BranchUpdate::new(record)))
    }
}
