//! Binding of a wallet session to the deployed payment contract.
//!
//! A binding is only valid while the wallet's chain, the selected chain and the contract's
//! chain agree. Whenever the account or chain changes the binding is rebuilt from scratch, and
//! transaction-issuing calls are refused unless the binding is [`BindingStatus::Bound`].

use super::abi::{IPaidQuery, calldata};
use crate::network::{ContractRef, ContractTable, network_name};
use crate::provider::{ProviderError, WalletProvider};
use crate::transaction::{PendingTransaction, TransactionReceipt, TransactionTracker, TxOperation};
use crate::wallet::{Session, WalletError};

use alloy_primitives::{Address, B256, Bytes, U256};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Contract handle captured for one account on one chain.
///
/// Cloning is cheap; in-flight operations keep their own clone so a later rebind cannot
/// retarget them.
#[derive(Clone)]
pub struct BoundContract {
	provider: Arc<dyn WalletProvider>,
	address: Address,
	chain_id: u64,
	account: Address,
	is_owner: bool,
}

impl BoundContract {
	pub fn new(provider: Arc<dyn WalletProvider>, contract: ContractRef, account: Address) -> Self {
		Self {
			provider,
			address: contract.address,
			chain_id: contract.chain_id,
			account,
			is_owner: false,
		}
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Account that signs transactions sent through this handle.
	pub fn account(&self) -> Address {
		self.account
	}

	pub fn is_owner(&self) -> bool {
		self.is_owner
	}

	async fn call(&self, data: String) -> Result<Bytes, WalletError> {
		let result = self
			.provider
			.request(
				"eth_call",
				json!([{ "to": self.address, "data": data }, "latest"]),
			)
			.await?;
		let bytes: Bytes = serde_json::from_value(result).map_err(ProviderError::from)?;

		if bytes.is_empty() {
			return Err(WalletError::ContractUnavailable(format!(
				"no contract code at {} on {}",
				self.address,
				network_name(self.chain_id)
			)));
		}
		Ok(bytes)
	}

	async fn call_word(&self, data: String) -> Result<B256, WalletError> {
		let bytes = self.call(data).await?;
		if bytes.len() < 32 {
			return Err(ProviderError::UnexpectedResponse(format!(
				"expected a 32-byte word, got {} bytes",
				bytes.len()
			))
			.into());
		}
		Ok(B256::from_slice(&bytes[..32]))
	}

	/// Current contract owner.
	pub async fn owner(&self) -> Result<Address, WalletError> {
		let word = self.call_word(calldata(&IPaidQuery::ownerCall {})).await?;
		Ok(Address::from_word(word))
	}

	/// Accumulated contract balance in wei.
	pub async fn get_balance(&self) -> Result<U256, WalletError> {
		let word = self
			.call_word(calldata(&IPaidQuery::getBalanceCall {}))
			.await?;
		Ok(U256::from_be_bytes(word.0))
	}

	async fn send(&self, data: String, value: Option<U256>) -> Result<B256, ProviderError> {
		let mut tx = json!({
			"from": self.account,
			"to": self.address,
			"data": data,
		});
		if let Some(value) = value {
			tx["value"] = Value::String(format!("0x{:x}", value));
		}

		let result = self.provider.request("eth_sendTransaction", json!([tx])).await?;
		Ok(serde_json::from_value(result)?)
	}

	/// Send `pay()` with `value` wei attached. Returns once the wallet hands back the hash.
	pub async fn send_pay(&self, value: U256) -> Result<B256, ProviderError> {
		self.send(calldata(&IPaidQuery::payCall {}), Some(value))
			.await
	}

	/// Send `withdraw()`.
	pub async fn send_withdraw(&self) -> Result<B256, ProviderError> {
		self.send(calldata(&IPaidQuery::withdrawCall {}), None).await
	}

	/// Receipt of a transaction, `None` while it is not yet mined.
	pub async fn receipt(&self, hash: B256) -> Result<Option<TransactionReceipt>, ProviderError> {
		let result = self
			.provider
			.request("eth_getTransactionReceipt", json!([hash]))
			.await?;
		if result.is_null() {
			return Ok(None);
		}
		Ok(Some(serde_json::from_value(result)?))
	}
}

impl fmt::Debug for BoundContract {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BoundContract")
			.field("address", &self.address)
			.field("chain_id", &self.chain_id)
			.field("account", &self.account)
			.field("is_owner", &self.is_owner)
			.finish()
	}
}

/// Outcome of the last bind attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingStatus {
	/// No session to bind.
	Unbound,
	/// No contract address configured for the selected chain.
	NotDeployed { chain_id: u64 },
	/// The wallet is on another chain than the selected one.
	WrongNetwork { expected: u64, actual: u64 },
	/// The contract could not be queried.
	Unavailable(String),
	/// Ready for transactions.
	Bound { address: Address, is_owner: bool },
}

impl BindingStatus {
	/// Status line for the payment area, `None` when there is nothing to report.
	pub fn message(&self) -> Option<String> {
		match self {
			BindingStatus::Unbound | BindingStatus::Bound { .. } => None,
			BindingStatus::NotDeployed { chain_id } => Some(format!(
				"No contract deployed on {}",
				network_name(*chain_id)
			)),
			BindingStatus::WrongNetwork { expected, .. } => {
				Some(format!("Please switch to {}", network_name(*expected)))
			}
			BindingStatus::Unavailable(reason) => Some(format!("Contract error: {}", reason)),
		}
	}
}

/// Binding of the live session to the contract on the selected chain.
#[derive(Debug, Clone)]
pub struct ContractBinding {
	status: BindingStatus,
	contract: Option<BoundContract>,
}

impl ContractBinding {
	pub fn unbound() -> Self {
		Self {
			status: BindingStatus::Unbound,
			contract: None,
		}
	}

	fn closed(status: BindingStatus) -> Self {
		Self {
			status,
			contract: None,
		}
	}

	/// Bind `session` to the contract deployed on `selected_chain_id`.
	///
	/// Fails closed: a missing deployment, a chain mismatch or a failing `owner()` query all
	/// produce a binding without a contract handle. Updates `session.owned_contract_address`.
	pub async fn bind(
		session: &mut Session,
		selected_chain_id: u64,
		contracts: &ContractTable,
	) -> Self {
		session.owned_contract_address = None;

		let Some(contract_ref) = contracts.lookup(selected_chain_id) else {
			info!(
				"No contract deployed on {}",
				network_name(selected_chain_id)
			);
			return Self::closed(BindingStatus::NotDeployed {
				chain_id: selected_chain_id,
			});
		};

		if session.chain_id != selected_chain_id {
			debug!(
				"Wallet on chain {} but chain {} is selected, leaving contract unbound",
				session.chain_id, selected_chain_id
			);
			return Self::closed(BindingStatus::WrongNetwork {
				expected: selected_chain_id,
				actual: session.chain_id,
			});
		}

		let mut contract = BoundContract::new(session.provider.clone(), contract_ref, session.address);
		let owner = match contract.owner().await {
			Ok(owner) => owner,
			Err(e) => {
				warn!("Contract setup error: {}", e);
				return Self::closed(BindingStatus::Unavailable(e.to_string()));
			}
		};

		// Address compares bytes, so checksum casing does not matter.
		contract.is_owner = owner == session.address;
		if contract.is_owner {
			session.owned_contract_address = Some(contract.address);
		}

		info!(
			"Bound contract {} on {} (owner: {})",
			contract.address,
			network_name(contract.chain_id),
			contract.is_owner
		);
		Self {
			status: BindingStatus::Bound {
				address: contract.address,
				is_owner: contract.is_owner,
			},
			contract: Some(contract),
		}
	}

	pub fn status(&self) -> &BindingStatus {
		&self.status
	}

	pub fn contract(&self) -> Option<&BoundContract> {
		self.contract.as_ref()
	}

	/// Clone of the contract handle for an operation about to start.
	pub fn snapshot(&self) -> Option<BoundContract> {
		self.contract.clone()
	}

	pub fn can_pay(&self) -> bool {
		self.contract.is_some()
	}

	pub fn can_withdraw(&self) -> bool {
		self.contract.as_ref().is_some_and(|c| c.is_owner)
	}

	fn require_contract(&self) -> Result<&BoundContract, WalletError> {
		match &self.status {
			BindingStatus::WrongNetwork { expected, actual } => Err(WalletError::WrongNetwork {
				expected: *expected,
				actual: *actual,
			}),
			BindingStatus::NotDeployed { chain_id } => Err(WalletError::ContractUnavailable(
				format!("no contract deployed on {}", network_name(*chain_id)),
			)),
			BindingStatus::Unavailable(reason) => {
				Err(WalletError::ContractUnavailable(reason.clone()))
			}
			BindingStatus::Unbound => Err(WalletError::NotConnected),
			BindingStatus::Bound { .. } => self.contract.as_ref().ok_or(WalletError::NotConnected),
		}
	}

	/// Submit a payment of `value` wei.
	pub async fn pay(
		&self,
		tracker: &TransactionTracker,
		value: U256,
	) -> Result<PendingTransaction, WalletError> {
		let contract = self.require_contract()?;
		tracker.submit(TxOperation::Pay, contract, Some(value)).await
	}

	/// Submit an owner withdrawal.
	pub async fn withdraw(
		&self,
		tracker: &TransactionTracker,
	) -> Result<PendingTransaction, WalletError> {
		let contract = self.require_contract()?;
		if !contract.is_owner {
			return Err(WalletError::NotOwner);
		}
		tracker.submit(TxOperation::Withdraw, contract, None).await
	}

	pub async fn get_balance(&self) -> Result<U256, WalletError> {
		self.require_contract()?.get_balance().await
	}
}

impl Default for ContractBinding {
	fn default() -> Self {
		Self::unbound()
	}
}
