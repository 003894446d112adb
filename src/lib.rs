//! Wallet connection and paid-query client for an EVM payment contract.
//!
//! The crate detects injected wallets, keeps one wallet session in step with the selected
//! network and the deployed contract, and runs the pay-then-ask flow: a fixed fee is paid to
//! the contract and the question is sent to the backend only after the payment confirms.

pub mod config;
pub mod contract;
pub mod network;
pub mod provider;
pub mod query;
pub mod transaction;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod testing;
