//! Status events published by the session and the paid-query flow.
//!
//! The session and the orchestrator report progress as [`StatusEvent`]s instead of writing to a
//! UI directly. Handlers are registered on a [`StatusDispatcher`]; the dispatcher is cheap to
//! clone, so every component that reports progress can hold the same one. A front end
//! registers a handler that renders events, the demo binary logs them via
//! [`TracingStatusHandler`], and tests record them with [`StatusHistory`].

use super::WalletError;
use crate::network::{ExplorerLink, network_name};
use crate::utils::short_address;

use alloy_primitives::{Address, B256};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;
use tracing::info;

/// Progress and outcome notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
	Connecting,
	Connected {
		wallet_name: String,
		address: Address,
		chain_id: u64,
	},
	ConnectionCancelled,
	ConnectionFailed(String),
	Disconnected,
	AccountChanged(Address),
	NetworkChanged(u64),
	/// Payment area status line after a rebind. `None` clears a previous message.
	ContractStatus(Option<String>),
	AwaitingPayment,
	PaymentPending(ExplorerLink),
	PaymentConfirmed,
	PaymentFailed(String),
	QuerySubmitted,
	AnswerReceived(String),
	QueryRejected(String),
	BackendUnreachable { tx_hash: B256, reason: String },
	WithdrawalStarted,
	WithdrawalPending(ExplorerLink),
	WithdrawalConfirmed,
	WithdrawalFailed(String),
}

impl fmt::Display for StatusEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StatusEvent::Connecting => write!(f, "Connecting wallet..."),
			StatusEvent::Connected {
				wallet_name,
				address,
				chain_id,
			} => write!(
				f,
				"{} connected: {} on {}",
				wallet_name,
				short_address(address),
				network_name(*chain_id)
			),
			StatusEvent::ConnectionCancelled => write!(f, "Wallet not connected"),
			StatusEvent::ConnectionFailed(reason) => write!(f, "Connection failed: {}", reason),
			StatusEvent::Disconnected => write!(f, "Wallet not connected"),
			StatusEvent::AccountChanged(address) => {
				write!(f, "Account changed to {}", short_address(address))
			}
			StatusEvent::NetworkChanged(chain_id) => {
				write!(f, "Network changed to {}", network_name(*chain_id))
			}
			StatusEvent::ContractStatus(message) => {
				write!(f, "{}", message.as_deref().unwrap_or_default())
			}
			StatusEvent::AwaitingPayment => write!(f, "Awaiting payment confirmation..."),
			StatusEvent::PaymentPending(link) => write!(f, "Payment pending: {}", link),
			StatusEvent::PaymentConfirmed => {
				write!(f, "Payment confirmed! Submitting question...")
			}
			StatusEvent::PaymentFailed(reason) => write!(f, "Payment failed: {}", reason),
			StatusEvent::QuerySubmitted => write!(f, "Thinking..."),
			StatusEvent::AnswerReceived(answer) => write!(f, "{}", answer),
			StatusEvent::QueryRejected(message) => write!(f, "Error: {}", message),
			StatusEvent::BackendUnreachable { tx_hash, reason } => write!(
				f,
				"Payment {} confirmed but the question could not be submitted: {}",
				tx_hash, reason
			),
			StatusEvent::WithdrawalStarted => write!(f, "Processing withdrawal..."),
			StatusEvent::WithdrawalPending(link) => write!(f, "Withdrawal pending: {}", link),
			StatusEvent::WithdrawalConfirmed => write!(f, "Withdrawal successful!"),
			StatusEvent::WithdrawalFailed(reason) => write!(f, "Withdrawal failed: {}", reason),
		}
	}
}

/// Receiver of status events.
#[async_trait::async_trait]
pub trait StatusHandler: Send + Sync {
	async fn handle(&mut self, event: &StatusEvent) -> Result<(), WalletError>;

	/// Name used when logging handler failures.
	fn name(&self) -> &'static str;
}

/// Fans status events out to every registered handler.
#[derive(Clone, Default)]
pub struct StatusDispatcher {
	handlers: Arc<Mutex<Vec<Box<dyn StatusHandler>>>>,
}

impl StatusDispatcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a handler. Handlers run in registration order.
	pub async fn register_handler(&self, handler: Box<dyn StatusHandler>) {
		self.handlers.lock().await.push(handler);
	}

	/// Deliver `event` to all handlers. A failing handler is logged and skipped.
	pub async fn dispatch(&self, event: StatusEvent) {
		let mut handlers = self.handlers.lock().await;
		for handler in handlers.iter_mut() {
			if let Err(e) = handler.handle(&event).await {
				tracing::error!("Handler {} failed to process status event: {}", handler.name(), e);
			}
		}
	}
}

/// Logs every status event at info level.
pub struct TracingStatusHandler;

#[async_trait::async_trait]
impl StatusHandler for TracingStatusHandler {
	async fn handle(&mut self, event: &StatusEvent) -> Result<(), WalletError> {
		info!("{}", event);
		Ok(())
	}

	fn name(&self) -> &'static str {
		"TracingStatusHandler"
	}
}

/// Keeps every event it receives. Clones share the same history.
#[derive(Clone, Default)]
pub struct StatusHistory {
	events: Arc<StdMutex<Vec<StatusEvent>>>,
}

impl StatusHistory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn events(&self) -> Vec<StatusEvent> {
		self.events
			.lock()
			.map(|events| events.clone())
			.unwrap_or_default()
	}

	pub fn last(&self) -> Option<StatusEvent> {
		self.events().pop()
	}
}

#[async_trait::async_trait]
impl StatusHandler for StatusHistory {
	async fn handle(&mut self, event: &StatusEvent) -> Result<(), WalletError> {
		if let Ok(mut events) = self.events.lock() {
			events.push(event.clone());
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"StatusHistory"
	}
}

/// Snapshot of what the UI should enable and display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
	pub connected: bool,
	pub submit_enabled: bool,
	pub withdraw_enabled: bool,
	/// Wallet area: short address and network, or "Wallet not connected".
	pub wallet_status: String,
	/// Payment area message from the last rebind, if any.
	pub contract_status: Option<String>,
}

impl ControlState {
	pub fn disconnected() -> Self {
		Self {
			connected: false,
			submit_enabled: false,
			withdraw_enabled: false,
			wallet_status: "Wallet not connected".to_string(),
			contract_status: None,
		}
	}
}
