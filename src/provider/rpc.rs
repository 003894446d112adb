//!
//! JSON-RPC wallet provider backed by a node.
//!
//! Development chains expose unlocked accounts over plain JSON-RPC, so a node can stand in for a
//! browser wallet: `eth_sendTransaction` is signed by the node, and `eth_requestAccounts` is
//! answered with the node's `eth_accounts`. Wallet-only methods such as chain switching are
//! reported as unsupported. The node never pushes events.

use super::{ProviderError, UNSUPPORTED_METHOD, WalletProvider};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Wallet provider that forwards requests to a JSON-RPC node over HTTP.
pub struct HttpRpcProvider {
	/// The underlying HTTP client.
	http_client: Client,
	/// The node's JSON-RPC endpoint.
	rpc_url: String,
	next_id: AtomicU64,
}

impl HttpRpcProvider {
	/// Create a provider for the given JSON-RPC endpoint.
	pub fn new(rpc_url: String) -> Result<Self, ProviderError> {
		let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

		Ok(Self {
			http_client,
			rpc_url,
			next_id: AtomicU64::new(1),
		})
	}

	/// Execute a raw JSON-RPC call.
	pub async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let request_body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		debug!("RPC request {} -> {}", method, self.rpc_url);
		let response = self
			.http_client
			.post(&self.rpc_url)
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(ProviderError::Transport(format!(
				"HTTP error: {}",
				response.status()
			)));
		}

		let response_json: Value = response.json().await?;

		if let Some(error) = response_json.get("error") {
			let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(-32603);
			let message = error
				.get("message")
				.and_then(|m| m.as_str())
				.unwrap_or("Unknown RPC error");
			return Err(ProviderError::rpc(code, message));
		}

		response_json
			.get("result")
			.cloned()
			.ok_or_else(|| ProviderError::UnexpectedResponse("missing result".to_string()))
	}
}

#[async_trait]
impl WalletProvider for HttpRpcProvider {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
		match method {
			"eth_requestAccounts" => self.call("eth_accounts", json!([])).await,
			"wallet_switchEthereumChain" | "wallet_addEthereumChain" => Err(ProviderError::rpc(
				UNSUPPORTED_METHOD,
				format!("{} is not supported by a node-backed provider", method),
			)),
			_ => self.call(method, params).await,
		}
	}
}
