//! Transaction types and the fixed per-type chunk table

use serde::{Deserialize, Serialize};

/// Closed set of rollup operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxType {
    Noop,
    Deposit,
    TransferToNew,
    Transfer,
    PartialExit,
    FullExit,
    Escalation,
    CreateSubaccount,
    CloseSubaccount,
    FillOrders,
}

/// Which branch record an operation chunk acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Lhs,
    Rhs,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Lhs => Side::Rhs,
            Side::Rhs => Side::Lhs,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Lhs => write!(f, "lhs"),
            Side::Rhs => write!(f, "rhs"),
        }
    }
}

impl TxType {
    pub const ALL: [TxType; 10] = [
        TxType::Noop,
        TxType::Deposit,
        TxType::TransferToNew,
        TxType::Transfer,
        TxType::PartialExit,
        TxType::FullExit,
        TxType::Escalation,
        TxType::CreateSubaccount,
        TxType::CloseSubaccount,
        TxType::FillOrders,
    ];

    /// Byte written at the head of the operation's pubdata
    pub const fn code(self) -> u8 {
        match self {
            TxType::Noop => 0,
            TxType::Deposit => 1,
            TxType::TransferToNew => 2,
            TxType::Transfer => 3,
            TxType::PartialExit => 4,
            TxType::FullExit => 5,
            TxType::Escalation => 6,
            TxType::CreateSubaccount => 7,
            TxType::CloseSubaccount => 8,
            TxType::FillOrders => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<TxType> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Number of 8-byte pubdata chunks the operation occupies
    pub const fn max_chunks(self) -> u32 {
        match self {
            TxType::Noop => 1,
            TxType::Deposit => 4,
            TxType::TransferToNew => 5,
            TxType::Transfer => 2,
            TxType::PartialExit => 2,
            TxType::FullExit => 7,
            TxType::Escalation => 5,
            TxType::CreateSubaccount => 2,
            TxType::CloseSubaccount => 2,
            TxType::FillOrders => 2,
        }
    }

    /// Two-sided operations touch both branch records
    pub const fn is_two_sided(self) -> bool {
        matches!(
            self,
            TxType::TransferToNew
                | TxType::Transfer
                | TxType::CreateSubaccount
                | TxType::CloseSubaccount
                | TxType::FillOrders
        )
    }

    /// Branch selection: the single-sided family always acts on LHS, two-sided
    /// operations alternate with chunk parity
    pub const fn side_for_chunk(self, chunk: u32) -> Side {
        if self.is_two_sided() && chunk % 2 == 1 {
            Side::Rhs
        } else {
            Side::Lhs
        }
    }

    /// Message tag used in signatures
    pub const fn name(self) -> &'static str {
        match self {
            TxType::Noop => "noop",
            TxType::Deposit => "deposit",
            TxType::TransferToNew => "transfer_to_new",
            TxType::Transfer => "transfer",
            TxType::PartialExit => "partial_exit",
            TxType::FullExit => "full_exit",
            TxType::Escalation => "escalation",
            TxType::CreateSubaccount => "create_subaccount",
            TxType::CloseSubaccount => "close_subaccount",
            TxType::FillOrders => "fill_orders",
        }
    }
}

impl std::fmt::Display for TxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
