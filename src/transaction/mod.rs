/// Receipt decoding
pub mod receipt;
/// Transaction submission and confirmation tracking
pub mod tracker;

pub use receipt::{ContractEvent, TransactionReceipt};
pub use tracker::{PendingTransaction, Transaction, TransactionTracker, TxOperation, TxStatus};

/// Number of decimal places of the native token (ETH).
pub const NATIVE_TOKEN_DECIMALS: u32 = 18;

/// Fixed fee attached to `pay()`: 0.001 of the native token, in wei.
pub const PAYMENT_WEI: u128 = 1_000_000_000_000_000;
