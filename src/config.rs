//! Runtime configuration read from the environment.

use crate::network::{ContractTable, LOCALHOST_CHAIN_ID};

use alloy_primitives::Address;
use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Invalid value {value:?} for {key}: {reason}")]
	InvalidValue {
		key: &'static str,
		value: String,
		reason: String,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
	/// Network selected at start-up.
	pub chain_id: u64,
	/// JSON-RPC node used as the wallet when no browser wallet is present.
	pub rpc_url: String,
	pub backend_url: String,
	pub query_path: String,
	/// Overrides the built-in contract address for `chain_id`.
	pub contract_address: Option<Address>,
	pub poll_interval: Duration,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			chain_id: LOCALHOST_CHAIN_ID,
			rpc_url: "http://localhost:8545".to_string(),
			backend_url: "http://localhost:8000".to_string(),
			query_path: "/submit-query".to_string(),
			contract_address: None,
			poll_interval: Duration::from_millis(1000),
		}
	}
}

impl ClientConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| env::var(key).ok())
	}

	/// Build a config from `lookup`, falling back to defaults for missing keys.
	pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let defaults = Self::default();
		let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

		Ok(Self {
			chain_id: match value("PAYGATE_CHAIN_ID") {
				Some(raw) => parse("PAYGATE_CHAIN_ID", &raw)?,
				None => defaults.chain_id,
			},
			rpc_url: value("PAYGATE_RPC_URL").unwrap_or(defaults.rpc_url),
			backend_url: value("PAYGATE_BACKEND_URL").unwrap_or(defaults.backend_url),
			query_path: value("PAYGATE_QUERY_PATH").unwrap_or(defaults.query_path),
			contract_address: value("PAYGATE_CONTRACT_ADDRESS")
				.map(|raw| parse("PAYGATE_CONTRACT_ADDRESS", &raw))
				.transpose()?,
			poll_interval: match value("PAYGATE_POLL_INTERVAL_MS") {
				Some(raw) => Duration::from_millis(parse("PAYGATE_POLL_INTERVAL_MS", &raw)?),
				None => defaults.poll_interval,
			},
		})
	}

	/// Contract table with the configured override applied.
	pub fn contracts(&self) -> ContractTable {
		let table = ContractTable::default();
		match self.contract_address {
			Some(address) => table.with_address(self.chain_id, address.to_string()),
			None => table,
		}
	}

	/// Full URL of the query endpoint.
	pub fn query_endpoint(&self) -> String {
		let path = self.query_path.trim_start_matches('/');
		format!("{}/{}", self.backend_url.trim_end_matches('/'), path)
	}
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
	T: std::str::FromStr,
	T::Err: std::fmt::Display,
{
	raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
		key,
		value: raw.to_string(),
		reason: e.to_string(),
	})
}
