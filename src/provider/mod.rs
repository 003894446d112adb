//! Wallet provider integration.
//!
//! A wallet provider is the capability object a wallet injects into the host: it answers
//! JSON-RPC style requests (`eth_requestAccounts`, `eth_sendTransaction`, ...) and pushes
//! account/chain events. Everything above this module talks to wallets only through the
//! [`WalletProvider`] trait, so the browser extension, a node-backed RPC wallet and test
//! doubles are interchangeable.

/// Multi-wallet connector abstraction and the injected-wallet connector
pub mod connector;
/// Detection of injected wallet capabilities
pub mod registry;
/// JSON-RPC node-backed provider
pub mod rpc;

pub use connector::{InjectedConnector, WalletConnector};
pub use registry::{
	HostEnvironment, InjectedEthereum, InjectionPoints, ProviderFlags, ProviderRegistry,
	StaticHost, WalletCapability, WalletKind,
};
pub use rpc::HttpRpcProvider;

use alloy_primitives::Address;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

/// EIP-1193 code for a request the user rejected in the wallet UI.
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193 code for a method the provider does not support.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// Code returned by `wallet_switchEthereumChain` when the wallet does not know the chain.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Stream of events pushed by a provider, delivered in order.
pub type ProviderEventStream = BoxStream<'static, ProviderEvent>;

/// Events a provider pushes while a session is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
	/// The exposed accounts changed. An empty list means the wallet revoked access.
	AccountsChanged(Vec<Address>),
	/// The wallet moved to another chain.
	ChainChanged(u64),
	/// The provider lost its connection or the wallet ended the session.
	Disconnect,
}

/// Capability interface implemented by every wallet provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
	/// Send a request to the wallet and return the raw JSON result.
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

	/// Subscribe to pushed events. Providers without push support return `None`.
	fn subscribe(&self) -> Option<ProviderEventStream> {
		None
	}

	/// Whether this provider offers its own disconnect.
	fn supports_disconnect(&self) -> bool {
		false
	}

	/// End the provider-side session.
	async fn disconnect(&self) -> Result<(), ProviderError> {
		Ok(())
	}
}

/// Errors raised by wallet providers
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
	#[error("{message} (code {code})")]
	Rpc { code: i64, message: String },

	#[error("Transport error: {0}")]
	Transport(String),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Unexpected response: {0}")]
	UnexpectedResponse(String),
}

impl ProviderError {
	pub fn rpc(code: i64, message: impl Into<String>) -> Self {
		ProviderError::Rpc {
			code,
			message: message.into(),
		}
	}

	/// RPC error code, if the provider returned one.
	pub fn code(&self) -> Option<i64> {
		match self {
			ProviderError::Rpc { code, .. } => Some(*code),
			_ => None,
		}
	}

	/// The user dismissed or rejected the wallet prompt.
	pub fn is_user_rejection(&self) -> bool {
		self.code() == Some(USER_REJECTED_REQUEST)
	}

	/// The wallet does not know the requested chain and needs `wallet_addEthereumChain`.
	pub fn is_unrecognized_chain(&self) -> bool {
		self.code() == Some(UNRECOGNIZED_CHAIN)
	}
}

/// Parse a hex quantity such as `"0x7a69"` into a `u64`.
pub fn parse_quantity(value: &Value) -> Result<u64, ProviderError> {
	match value {
		Value::String(s) => {
			let digits = s.strip_prefix("0x").unwrap_or(s);
			u64::from_str_radix(digits, 16).map_err(|e| {
				ProviderError::UnexpectedResponse(format!("invalid hex quantity {}: {}", s, e))
			})
		}
		Value::Number(n) => n.as_u64().ok_or_else(|| {
			ProviderError::UnexpectedResponse(format!("invalid numeric quantity {}", n))
		}),
		other => Err(ProviderError::UnexpectedResponse(format!(
			"expected quantity, got {}",
			other
		))),
	}
}

/// Parse an account list result (`eth_accounts` / `eth_requestAccounts`).
pub fn parse_accounts(value: &Value) -> Result<Vec<Address>, ProviderError> {
	let items = value.as_array().ok_or_else(|| {
		ProviderError::UnexpectedResponse("account list must be an array".to_string())
	})?;

	items
		.iter()
		.map(|item| {
			let raw = item.as_str().ok_or_else(|| {
				ProviderError::UnexpectedResponse("account must be a string".to_string())
			})?;
			raw.parse::<Address>().map_err(|e| {
				ProviderError::UnexpectedResponse(format!("invalid account {}: {}", raw, e))
			})
		})
		.collect()
}
