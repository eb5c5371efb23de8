//! Canned batches used by the demo command, benches and tests

use rollup_batch::BatchInput;
use rollup_primitives::SigningKey;

use crate::builder::{BatchBuilder, OpSpec};
use crate::error::WitnessResult;
use crate::store::AccountStore;

/// Named demo batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Deposit into a fresh account, then exit part of it and close another
    DepositExit,
    /// Transfers, a transfer to a new account, an order fill and a noop
    Transfers,
    /// Open a subaccount, close it, and escalate another
    Subaccounts,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::DepositExit,
        Scenario::Transfers,
        Scenario::Subaccounts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Scenario::DepositExit => "deposit-exit",
            Scenario::Transfers => "transfers",
            Scenario::Subaccounts => "subaccounts",
        }
    }

    pub fn build(self) -> WitnessResult<BatchInput> {
        let mut builder = demo_builder()?;
        match self {
            Scenario::DepositExit => deposit_exit(&mut builder)?,
            Scenario::Transfers => transfers(&mut builder)?,
            Scenario::Subaccounts => subaccounts(&mut builder)?,
        }
        Ok(builder.finish())
    }
}

/// Deterministic key for a demo participant
pub fn demo_key(name: &str) -> WitnessResult<SigningKey> {
    Ok(SigningKey::from_seed(name)?)
}

/// Builder over an empty store that knows every demo participant's key
pub fn demo_builder() -> WitnessResult<BatchBuilder> {
    let mut builder = BatchBuilder::new(AccountStore::new());
    for name in ["alice", "bob", "carol", "dave"] {
        builder.register_key(demo_key(name)?);
    }
    Ok(builder)
}

fn deposit_exit(builder: &mut BatchBuilder) -> WitnessResult<()> {
    builder.apply(OpSpec::Deposit {
        account: 1,
        token: 0,
        amount: 100,
        fee: 1,
        owner: demo_key("alice")?.public_key(),
    })?;
    builder.apply(OpSpec::Deposit {
        account: 2,
        token: 1,
        amount: 20,
        fee: 0,
        owner: demo_key("bob")?.public_key(),
    })?;
    builder.apply(OpSpec::PartialExit {
        account: 1,
        token: 0,
        amount: 50,
        fee: 1,
    })?;
    builder.apply(OpSpec::FullExit {
        account: 2,
        token: 1,
    })?;
    Ok(())
}

fn transfers(builder: &mut BatchBuilder) -> WitnessResult<()> {
    for (account, name) in [(1, "alice"), (2, "bob")] {
        builder.apply(OpSpec::Deposit {
            account,
            token: 0,
            amount: 5_000,
            fee: 0,
            owner: demo_key(name)?.public_key(),
        })?;
    }
    builder.apply(OpSpec::Transfer {
        from: 1,
        to: 2,
        token: 0,
        amount: 1_200,
        fee: 3,
    })?;
    builder.apply(OpSpec::TransferToNew {
        from: 2,
        to: 7,
        token: 0,
        amount: 256 * 4,
        fee: 1,
        new_owner: demo_key("carol")?.public_key(),
    })?;
    builder.apply(OpSpec::FillOrders {
        taker: 7,
        maker: 1,
        token: 0,
        amount: 500,
        fee: 2,
    })?;
    builder.apply(OpSpec::Noop)?;
    Ok(())
}

fn subaccounts(builder: &mut BatchBuilder) -> WitnessResult<()> {
    for (account, name) in [(1, "alice"), (2, "bob"), (3, "dave")] {
        builder.apply(OpSpec::Deposit {
            account,
            token: 2,
            amount: 2_000,
            fee: 0,
            owner: demo_key(name)?.public_key(),
        })?;
    }
    builder.apply(OpSpec::CreateSubaccount {
        owner_account: 1,
        cosigner_account: 2,
        token: 2,
        amount: 700,
        fee: 5,
    })?;
    builder.apply(OpSpec::CloseSubaccount {
        owner_account: 1,
        cosigner_account: 2,
        token: 2,
        fee: 5,
    })?;
    builder.apply(OpSpec::CreateSubaccount {
        owner_account: 3,
        cosigner_account: 2,
        token: 2,
        amount: 300,
        fee: 0,
    })?;
    builder.apply(OpSpec::Escalation {
        account: 3,
        token: 2,
    })?;
    Ok(())
}
