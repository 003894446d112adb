//! Payment contract integration.

/// Solidity interface of the payment contract
pub mod abi;
/// Session-to-contract binding and the contract handle
pub mod binding;

pub use binding::{BindingStatus, BoundContract, ContractBinding};
