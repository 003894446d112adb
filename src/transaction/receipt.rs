//! Receipt types returned by `eth_getTransactionReceipt`.

use crate::contract::abi::IPaidQuery;

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_sol_types::SolEvent;
use serde::Deserialize;

/// Log entry of a mined transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptLog {
	pub address: Address,
	#[serde(default)]
	pub topics: Vec<B256>,
	#[serde(default)]
	pub data: Bytes,
}

/// Receipt of a mined transaction, reduced to the fields the tracker needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
	pub transaction_hash: Option<B256>,
	/// `0x1` on success, `0x0` on revert. Absent on pre-Byzantium chains.
	pub status: Option<String>,
	pub block_number: Option<String>,
	#[serde(default)]
	pub logs: Vec<ReceiptLog>,
}

impl TransactionReceipt {
	pub fn succeeded(&self) -> bool {
		match &self.status {
			Some(status) => parse_hex_u64(status) == Some(1),
			None => true,
		}
	}

	pub fn block_number(&self) -> Option<u64> {
		self.block_number.as_deref().and_then(parse_hex_u64)
	}

	/// Events emitted by `contract` in this transaction.
	pub fn contract_events(&self, contract: Address) -> Vec<ContractEvent> {
		self.logs
			.iter()
			.filter(|log| log.address == contract)
			.filter_map(ContractEvent::decode)
			.collect()
	}
}

fn parse_hex_u64(value: &str) -> Option<u64> {
	u64::from_str_radix(value.strip_prefix("0x").unwrap_or(value), 16).ok()
}

/// Decoded payment contract event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEvent {
	PaymentReceived { from: Address, amount: U256 },
	Withdrawal { to: Address, amount: U256 },
}

impl ContractEvent {
	fn decode(log: &ReceiptLog) -> Option<Self> {
		let (signature, account) = match log.topics.as_slice() {
			[signature, account, ..] => (signature, Address::from_word(*account)),
			_ => return None,
		};
		if log.data.len() < 32 {
			return None;
		}
		let amount = U256::from_be_slice(&log.data[..32]);

		if *signature == IPaidQuery::PaymentReceived::SIGNATURE_HASH {
			Some(ContractEvent::PaymentReceived {
				from: account,
				amount,
			})
		} else if *signature == IPaidQuery::Withdrawal::SIGNATURE_HASH {
			Some(ContractEvent::Withdrawal {
				to: account,
				amount,
			})
		} else {
			None
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{ACCOUNT, CONTRACT, OTHER_ACCOUNT};
	use serde_json::json;

	fn amount_word(amount: u64) -> String {
		format!("0x{}", hex::encode(U256::from(amount).to_be_bytes::<32>()))
	}

	#[test]
	fn test_decodes_contract_events() {
		let receipt: TransactionReceipt = serde_json::from_value(json!({
			"transactionHash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
			"status": "0x1",
			"blockNumber": "0x10",
			"logs": [
				{
					"address": CONTRACT,
					"topics": [IPaidQuery::Withdrawal::SIGNATURE_HASH, ACCOUNT.into_word()],
					"data": amount_word(5),
				},
				{
					"address": OTHER_ACCOUNT,
					"topics": [IPaidQuery::Withdrawal::SIGNATURE_HASH, ACCOUNT.into_word()],
					"data": amount_word(7),
				}
			]
		}))
		.unwrap();

		assert!(receipt.succeeded());
		assert_eq!(receipt.block_number(), Some(16));
		assert_eq!(
			receipt.contract_events(CONTRACT),
			vec![ContractEvent::Withdrawal {
				to: ACCOUNT,
				amount: U256::from(5u64)
			}]
		);
	}

	#[test]
	fn test_reverted_status() {
		let receipt: TransactionReceipt =
			serde_json::from_value(json!({ "status": "0x0", "logs": [] })).unwrap();
		assert!(!receipt.succeeded());
		assert!(receipt.contract_events(CONTRACT).is_empty());
	}
}
