//! Multi-wallet connector abstraction.
//!
//! The connector is the component that lets the user pick a wallet and hands back a provider
//! handle. It remembers the last provider it connected so the application can reconnect on
//! start-up without prompting the user to pick again.

use super::{ProviderError, ProviderRegistry, WalletProvider};

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Connector that selects a wallet and returns its provider handle.
#[async_trait]
pub trait WalletConnector: Send + Sync {
	/// Let the user pick and authorize a wallet.
	///
	/// Returns `Ok(None)` when the user closes the selection without choosing.
	async fn connect(&mut self) -> Result<Option<Arc<dyn WalletProvider>>, ProviderError>;

	/// Name of the provider remembered from a previous connection.
	fn cached_provider(&self) -> Option<String>;

	/// Forget the remembered provider.
	fn clear_cached_provider(&mut self);
}

/// Connector over injected wallets that picks the highest-priority capability.
pub struct InjectedConnector {
	registry: ProviderRegistry,
	cached_provider: Option<String>,
}

impl InjectedConnector {
	pub fn new(registry: ProviderRegistry) -> Self {
		Self {
			registry,
			cached_provider: None,
		}
	}

	/// Start with a provider remembered from an earlier run.
	pub fn with_cached_provider(mut self, name: impl Into<String>) -> Self {
		self.cached_provider = Some(name.into());
		self
	}
}

#[async_trait]
impl WalletConnector for InjectedConnector {
	async fn connect(&mut self) -> Result<Option<Arc<dyn WalletProvider>>, ProviderError> {
		let capability = self.registry.pick_default().ok_or_else(|| {
			ProviderError::Transport("No injected wallet available".to_string())
		})?;

		debug!("Requesting accounts from {}", capability.name());
		match capability
			.handle
			.request("eth_requestAccounts", json!([]))
			.await
		{
			Ok(_) => {
				info!("Connector authorized {}", capability.name());
				self.cached_provider = Some(capability.name().to_string());
				Ok(Some(capability.handle))
			}
			Err(e) if e.is_user_rejection() => {
				info!("Wallet selection closed by user");
				Ok(None)
			}
			Err(e) => Err(e),
		}
	}

	fn cached_provider(&self) -> Option<String> {
		self.cached_provider.clone()
	}

	fn clear_cached_provider(&mut self) {
		self.cached_provider = None;
	}
}
