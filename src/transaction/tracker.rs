//! Transaction submission and confirmation tracking.
//!
//! A transaction is `Pending` as soon as the wallet returns its hash, which is when the caller
//! can show the explorer link. Settling it polls for the receipt and moves it exactly once to
//! `Confirmed` or `Failed`.

use super::receipt::ContractEvent;
use super::PAYMENT_WEI;
use crate::contract::BoundContract;
use crate::network::{ExplorerLink, explorer_link};
use crate::wallet::WalletError;

use alloy_primitives::{B256, U256};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info};

/// Contract operation a transaction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOperation {
	Pay,
	Withdraw,
}

impl fmt::Display for TxOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TxOperation::Pay => f.write_str("Payment"),
			TxOperation::Withdraw => f.write_str("Withdrawal"),
		}
	}
}

/// Lifecycle state of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
	Pending,
	Confirmed,
	/// Terminal failure with a human-readable reason.
	Failed(String),
}

impl TxStatus {
	pub fn is_terminal(&self) -> bool {
		!matches!(self, TxStatus::Pending)
	}
}

/// A submitted transaction and what is known about it.
#[derive(Debug, Clone)]
pub struct Transaction {
	pub hash: B256,
	pub operation: TxOperation,
	pub chain_id: u64,
	pub explorer: ExplorerLink,
	status: TxStatus,
	pub submitted_at: DateTime<Utc>,
	pub settled_at: Option<DateTime<Utc>>,
	pub block_number: Option<u64>,
	/// Contract events decoded from the receipt.
	pub events: Vec<ContractEvent>,
}

impl Transaction {
	fn pending(hash: B256, operation: TxOperation, chain_id: u64) -> Self {
		Self {
			hash,
			operation,
			chain_id,
			explorer: explorer_link(chain_id, &hash.to_string()),
			status: TxStatus::Pending,
			submitted_at: Utc::now(),
			settled_at: None,
			block_number: None,
			events: Vec::new(),
		}
	}

	pub fn status(&self) -> &TxStatus {
		&self.status
	}

	/// Move from `Pending` to a terminal state. Later transitions are ignored.
	fn settle(&mut self, status: TxStatus) {
		if self.status.is_terminal() {
			debug!("Ignoring transition of settled transaction {}", self.hash);
			return;
		}
		self.status = status;
		self.settled_at = Some(Utc::now());
	}
}

/// Submits contract transactions and waits for them to be mined.
#[derive(Debug, Clone)]
pub struct TransactionTracker {
	poll_interval: Duration,
}

impl TransactionTracker {
	/// Create a tracker that polls for receipts every `poll_interval`.
	pub fn new(poll_interval: Duration) -> Self {
		Self { poll_interval }
	}

	/// Submit `operation` through `contract`.
	///
	/// Returns as soon as the wallet returns the transaction hash. `value` applies to payments
	/// and defaults to the fixed query fee.
	pub async fn submit(
		&self,
		operation: TxOperation,
		contract: &BoundContract,
		value: Option<U256>,
	) -> Result<PendingTransaction, WalletError> {
		info!("Submitting {} to {}", operation, contract.address());

		let submitted = match operation {
			TxOperation::Pay => {
				contract
					.send_pay(value.unwrap_or(U256::from(PAYMENT_WEI)))
					.await
			}
			TxOperation::Withdraw => contract.send_withdraw().await,
		};

		let hash = submitted.map_err(|e| {
			error!("{} submission failed: {}", operation, e);
			WalletError::from_submission(e)
		})?;

		let transaction = Transaction::pending(hash, operation, contract.chain_id());
		info!(
			"{} pending: {} ({})",
			operation, transaction.hash, transaction.explorer
		);

		Ok(PendingTransaction {
			transaction,
			contract: contract.clone(),
			poll_interval: self.poll_interval,
		})
	}
}

impl Default for TransactionTracker {
	fn default() -> Self {
		Self::new(Duration::from_secs(1))
	}
}

/// A transaction waiting to be mined.
///
/// Keeps the contract handle it was submitted through, so confirmation is tracked against the
/// same provider and contract even if the session rebinds meanwhile.
pub struct PendingTransaction {
	transaction: Transaction,
	contract: BoundContract,
	poll_interval: Duration,
}

impl PendingTransaction {
	pub fn transaction(&self) -> &Transaction {
		&self.transaction
	}

	pub fn hash(&self) -> B256 {
		self.transaction.hash
	}

	pub fn explorer(&self) -> &ExplorerLink {
		&self.transaction.explorer
	}

	/// Wait for the receipt and return the transaction in its terminal state.
	///
	/// There is no overall timeout; mining may take as long as the chain needs.
	pub async fn settle(mut self) -> Transaction {
		let hash = self.transaction.hash;
		loop {
			match self.contract.receipt(hash).await {
				Ok(Some(receipt)) => {
					self.transaction.block_number = receipt.block_number();
					if receipt.succeeded() {
						self.transaction.events = receipt.contract_events(self.contract.address());
						self.transaction.settle(TxStatus::Confirmed);
						info!(
							"{} {} confirmed in block {:?}",
							self.transaction.operation, hash, self.transaction.block_number
						);
					} else {
						error!("{} {} reverted", self.transaction.operation, hash);
						self.transaction
							.settle(TxStatus::Failed("transaction reverted on-chain".to_string()));
					}
					break;
				}
				Ok(None) => {
					debug!("{} not mined yet, polling again", hash);
					tokio::time::sleep(self.poll_interval).await;
				}
				Err(e) => {
					error!("Failed while waiting for {}: {}", hash, e);
					self.transaction.settle(TxStatus::Failed(format!(
						"could not confirm transaction: {}",
						WalletError::describe_provider(&e)
					)));
					break;
				}
			}
		}
		self.transaction
	}

	/// Wait for the receipt; a failed transaction becomes [`WalletError::TransactionFailed`].
	pub async fn wait(self) -> Result<Transaction, WalletError> {
		let transaction = self.settle().await;
		match transaction.status() {
			TxStatus::Failed(reason) => Err(WalletError::TransactionFailed {
				hash: Some(transaction.hash),
				reason: reason.clone(),
			}),
			_ => Ok(transaction),
		}
	}
}
