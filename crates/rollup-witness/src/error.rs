//! Error types for witness generation

use rollup_batch::VerifyError;
use rollup_constraints::TxType;
use rollup_primitives::KeyError;
use thiserror::Error;

/// Errors that can occur while building a batch
#[derive(Debug, Error)]
pub enum WitnessError {
    /// Account index outside the account tree
    #[error("account {0} is outside the account tree")]
    AccountOutOfRange(u32),

    /// Token index outside the balance tree
    #[error("token {0} is outside the balance tree")]
    TokenOutOfRange(u32),

    /// Amount has no exact packed form
    #[error("{field} {value} has no exact packed representation")]
    Unrepresentable { field: &'static str, value: u128 },

    /// Balance arithmetic left the 128-bit range
    #[error("balance arithmetic overflowed while building {0}")]
    Overflow(TxType),

    /// Both branches of a two-sided operation name one account
    #[error("{tx_type} needs two distinct accounts, got {account} twice")]
    SameAccount { tx_type: TxType, account: u32 },

    /// Key material could not be derived
    #[error(transparent)]
    Key(#[from] KeyError),

    /// No registered key can authorize the operation
    #[error("no signing key registered for account {account}")]
    MissingKey { account: u32 },

    /// The verifier's own validators refused the operation
    #[error("{tx_type} rejected: {source}")]
    Rejected {
        tx_type: TxType,
        #[source]
        source: VerifyError,
    },
}

/// Result type for witness operations
pub type WitnessResult<T> = Result<T, WitnessError>;
