//! Wallet connection lifecycle.
//!
//! [`ConnectionSession`] owns the single live [`Session`] and everything derived from it: the
//! provider event stream, the selected network and the contract binding. All mutation goes
//! through `&mut self`, so provider events are handled one at a time and never overlap with a
//! connect or disconnect in progress.
//!
//! Connecting follows two paths. Wallets that inject a non-standard namespace (or none of the
//! shared one) are asked directly with `eth_requestAccounts`; everything else goes through the
//! [`WalletConnector`]. If the primary path fails for any reason other than the user
//! cancelling, the direct path is tried once before giving up.

use super::status::{ControlState, StatusDispatcher, StatusEvent};
use super::WalletError;
use crate::contract::{BindingStatus, BoundContract, ContractBinding};
use crate::network::{ContractTable, NetworkReconciler, SwitchOutcome, network_name};
use crate::provider::{
	ProviderEvent, ProviderEventStream, ProviderRegistry, WalletConnector, WalletKind,
	WalletProvider, parse_accounts, parse_quantity,
};
use crate::utils::short_address;

use alloy_primitives::Address;
use futures_util::StreamExt;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The connected wallet: provider handle, account and chain.
pub struct Session {
	pub provider: Arc<dyn WalletProvider>,
	pub wallet_name: String,
	pub address: Address,
	pub chain_id: u64,
	/// Set while the bound contract's owner is `address`.
	pub owned_contract_address: Option<Address>,
}

impl Session {
	pub fn new(
		provider: Arc<dyn WalletProvider>,
		wallet_name: impl Into<String>,
		address: Address,
		chain_id: u64,
	) -> Self {
		Self {
			provider,
			wallet_name: wallet_name.into(),
			address,
			chain_id,
			owned_contract_address: None,
		}
	}

	/// `0xAbCd...1234` form of the checksummed address.
	pub fn short_address(&self) -> String {
		short_address(&self.address)
	}
}

impl fmt::Debug for Session {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Session")
			.field("wallet_name", &self.wallet_name)
			.field("address", &self.address)
			.field("chain_id", &self.chain_id)
			.field("owned_contract_address", &self.owned_contract_address)
			.finish()
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connecting,
	Connected,
}

/// Result of a connect attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
	Connected { address: Address, chain_id: u64 },
	/// The user closed the wallet prompt; nothing changed.
	Cancelled,
}

/// Owns the wallet session and keeps the contract binding in step with it.
pub struct ConnectionSession {
	registry: ProviderRegistry,
	connector: Box<dyn WalletConnector>,
	contracts: ContractTable,
	reconciler: NetworkReconciler,
	selected_chain_id: u64,
	state: ConnectionState,
	session: Option<Session>,
	binding: ContractBinding,
	events: Option<ProviderEventStream>,
	status: StatusDispatcher,
}

impl ConnectionSession {
	pub fn new(
		registry: ProviderRegistry,
		connector: Box<dyn WalletConnector>,
		contracts: ContractTable,
		selected_chain_id: u64,
	) -> Self {
		Self {
			registry,
			connector,
			contracts,
			reconciler: NetworkReconciler::new(),
			selected_chain_id,
			state: ConnectionState::Disconnected,
			session: None,
			binding: ContractBinding::unbound(),
			events: None,
			status: StatusDispatcher::new(),
		}
	}

	/// Publish status events on `status` instead of a private dispatcher.
	pub fn with_status(mut self, status: StatusDispatcher) -> Self {
		self.status = status;
		self
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	pub fn selected_chain_id(&self) -> u64 {
		self.selected_chain_id
	}

	pub fn binding(&self) -> &ContractBinding {
		&self.binding
	}

	/// Contract handle for an operation about to start, if the binding allows one.
	pub fn bound_contract(&self) -> Option<BoundContract> {
		self.binding.snapshot()
	}

	pub fn status(&self) -> &StatusDispatcher {
		&self.status
	}

	/// Connect a wallet.
	///
	/// A cancelled prompt returns [`ConnectOutcome::Cancelled`] and leaves the session
	/// disconnected. Calling this while connected returns the current session unchanged.
	pub async fn connect(&mut self) -> Result<ConnectOutcome, WalletError> {
		if let Some(session) = &self.session {
			debug!("Already connected as {}", session.address);
			return Ok(ConnectOutcome::Connected {
				address: session.address,
				chain_id: session.chain_id,
			});
		}

		self.state = ConnectionState::Connecting;
		self.status.dispatch(StatusEvent::Connecting).await;

		let direct = self.registry.requires_direct_connect();
		if direct {
			info!("Using direct connection for non-standard wallet");
		}

		let opened = match self.open(direct).await {
			Err(e) if !e.is_silent() => {
				warn!("Connection error: {}, trying direct connection", e);
				self.open(true).await
			}
			other => other,
		};

		match opened {
			Ok(Some(session)) => Ok(self.activate(session).await),
			Ok(None) | Err(WalletError::UserCancelled) => {
				info!("Wallet connection cancelled");
				self.state = ConnectionState::Disconnected;
				self.status.dispatch(StatusEvent::ConnectionCancelled).await;
				Ok(ConnectOutcome::Cancelled)
			}
			Err(e) => {
				warn!("Connection failed: {}", e);
				self.state = ConnectionState::Disconnected;
				let error = if matches!(e, WalletError::NoProviderFound) {
					e
				} else {
					WalletError::ConnectionFailed(e.to_string())
				};
				self.status
					.dispatch(StatusEvent::ConnectionFailed(error.to_string()))
					.await;
				Err(error)
			}
		}
	}

	/// Reconnect on start-up if the connector remembers a wallet from a previous session.
	pub async fn auto_connect(&mut self) -> Result<Option<ConnectOutcome>, WalletError> {
		match self.connector.cached_provider() {
			Some(name) => {
				info!("Reconnecting cached provider {}", name);
				self.connect().await.map(Some)
			}
			None => Ok(None),
		}
	}

	/// Open a session through the direct path or the connector. `None` means cancelled.
	async fn open(&mut self, direct: bool) -> Result<Option<Session>, WalletError> {
		let (handle, wallet_name) = if direct {
			let handle = self
				.registry
				.injected_provider()
				.ok_or(WalletError::NoProviderFound)?;
			match handle.request("eth_requestAccounts", json!([])).await {
				Ok(_) => {}
				Err(e) if e.is_user_rejection() => return Err(WalletError::UserCancelled),
				Err(e) => return Err(e.into()),
			}
			(handle, self.default_wallet_name())
		} else {
			let Some(handle) = self.connector.connect().await? else {
				return Ok(None);
			};
			let name = self
				.connector
				.cached_provider()
				.unwrap_or_else(|| self.default_wallet_name());
			(handle, name)
		};

		let accounts = parse_accounts(&handle.request("eth_accounts", json!([])).await?)?;
		let address = accounts.first().copied().ok_or_else(|| {
			WalletError::ConnectionFailed("wallet did not expose any account".to_string())
		})?;
		let chain_id = parse_quantity(&handle.request("eth_chainId", json!([])).await?)?;

		Ok(Some(Session::new(handle, wallet_name, address, chain_id)))
	}

	fn default_wallet_name(&self) -> String {
		self.registry
			.pick_default()
			.map(|c| c.name())
			.unwrap_or(WalletKind::Browser.name())
			.to_string()
	}

	async fn activate(&mut self, session: Session) -> ConnectOutcome {
		let outcome = ConnectOutcome::Connected {
			address: session.address,
			chain_id: session.chain_id,
		};
		info!(
			"Connected {} as {} on {}",
			session.wallet_name,
			session.address,
			network_name(session.chain_id)
		);

		let connected = StatusEvent::Connected {
			wallet_name: session.wallet_name.clone(),
			address: session.address,
			chain_id: session.chain_id,
		};
		self.events = session.provider.subscribe();
		self.session = Some(session);
		self.state = ConnectionState::Connected;
		self.status.dispatch(connected).await;

		self.rebind().await;
		outcome
	}

	/// Disconnect and forget the cached provider. Safe to call when already disconnected.
	pub async fn disconnect(&mut self) {
		self.connector.clear_cached_provider();
		self.events = None;
		self.binding = ContractBinding::unbound();

		if let Some(session) = self.session.take() {
			if session.provider.supports_disconnect() {
				if let Err(e) = session.provider.disconnect().await {
					warn!("Provider disconnect failed: {}", e);
				}
			}
			info!("Disconnected {}", session.wallet_name);
		}

		if self.state != ConnectionState::Disconnected {
			self.state = ConnectionState::Disconnected;
			self.status.dispatch(StatusEvent::Disconnected).await;
		}
	}

	/// Next event pushed by the provider. `None` when disconnected or the provider stopped.
	pub async fn next_event(&mut self) -> Option<ProviderEvent> {
		self.events.as_mut()?.next().await
	}

	/// Apply a provider event to the session.
	pub async fn handle_event(&mut self, event: ProviderEvent) {
		if self.state != ConnectionState::Connected {
			debug!("Ignoring {:?} while not connected", event);
			return;
		}

		match event {
			ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
				None => {
					info!("Wallet revoked account access");
					self.disconnect().await;
				}
				Some(&address) => {
					if let Some(session) = self.session.as_mut() {
						session.address = address;
					}
					self.status.dispatch(StatusEvent::AccountChanged(address)).await;
					self.rebind().await;
				}
			},
			ProviderEvent::ChainChanged(chain_id) => {
				if let Some(session) = self.session.as_mut() {
					session.chain_id = chain_id;
				}
				// The selection follows the wallet.
				self.selected_chain_id = chain_id;
				self.status.dispatch(StatusEvent::NetworkChanged(chain_id)).await;
				self.rebind().await;
			}
			ProviderEvent::Disconnect => {
				info!("Provider disconnected");
				self.disconnect().await;
			}
		}
	}

	/// Wait for the next provider event and handle it. Returns `false` when there is none.
	///
	/// A stream that ends while connected is handled as a provider disconnect.
	pub async fn process_next_event(&mut self) -> bool {
		match self.next_event().await {
			Some(event) => {
				self.handle_event(event).await;
				true
			}
			None => {
				if self.events.is_some() && self.state == ConnectionState::Connected {
					info!("Provider event stream ended");
					self.disconnect().await;
				}
				false
			}
		}
	}

	/// Select the network to operate on, asking the wallet to switch when it is elsewhere.
	///
	/// The switch is best-effort. The wallet reports the actual change with a chain event.
	pub async fn select_network(&mut self, chain_id: u64) -> Option<SwitchOutcome> {
		self.selected_chain_id = chain_id;

		let mut outcome = None;
		if let Some(session) = &self.session {
			if !NetworkReconciler::is_correct(session, chain_id) {
				outcome = Some(
					self.reconciler
						.request_switch(session.provider.as_ref(), chain_id)
						.await,
				);
			}
		}

		self.rebind().await;
		outcome
	}

	/// Rebuild the contract binding from the current session and selection.
	pub async fn rebind(&mut self) -> &BindingStatus {
		self.binding = match self.session.as_mut() {
			Some(session) => {
				ContractBinding::bind(session, self.selected_chain_id, &self.contracts).await
			}
			None => ContractBinding::unbound(),
		};

		if self.session.is_some() {
			let message = self.binding.status().message();
			self.status.dispatch(StatusEvent::ContractStatus(message)).await;
		}
		self.binding.status()
	}

	/// What the UI should enable and show right now.
	pub fn controls(&self) -> ControlState {
		let Some(session) = &self.session else {
			return ControlState::disconnected();
		};

		let mut wallet_status = format!(
			"{} {}",
			session.short_address(),
			network_name(session.chain_id)
		);
		if !NetworkReconciler::is_correct(session, self.selected_chain_id) {
			wallet_status.push_str(&format!(
				" (Please switch to {})",
				network_name(self.selected_chain_id)
			));
		}

		ControlState {
			connected: true,
			submit_enabled: self.binding.can_pay(),
			withdraw_enabled: self.binding.can_withdraw(),
			wallet_status,
			contract_status: self.binding.status().message(),
		}
	}
}
