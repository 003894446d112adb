//! Scripted test doubles for providers and the query backend.

use crate::contract::abi::IPaidQuery;
use crate::provider::{ProviderError, ProviderEvent, ProviderEventStream, WalletProvider};
use crate::query::{BackendError, QueryBackend, QueryResponse};

use alloy_primitives::{Address, B256, U256, address, b256};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures_util::StreamExt;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const ACCOUNT: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub const OTHER_ACCOUNT: Address = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
pub const CONTRACT: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");
pub const TX_HASH: B256 =
	b256!("abc0000000000000000000000000000000000000000000000000000000000001");

struct MockState {
	accounts: Vec<Address>,
	chain_id: u64,
	owner: Address,
	balance: U256,
	has_code: bool,
	receipt_status: u64,
	pending_polls: usize,
	failures: HashMap<String, (i64, String)>,
	calls: Vec<(String, Value)>,
	supports_disconnect: bool,
	disconnects: usize,
	events_tx: Option<mpsc::UnboundedSender<ProviderEvent>>,
	events_rx: Option<mpsc::UnboundedReceiver<ProviderEvent>>,
}

/// Wallet provider that answers from a script and records every request.
pub struct MockProvider {
	state: Mutex<MockState>,
}

impl MockProvider {
	/// Provider on the local chain with [`ACCOUNT`] unlocked and owning the contract.
	pub fn new() -> Self {
		let (tx, rx) = mpsc::unbounded();
		Self {
			state: Mutex::new(MockState {
				accounts: vec![ACCOUNT],
				chain_id: 31337,
				owner: ACCOUNT,
				balance: U256::ZERO,
				has_code: true,
				receipt_status: 1,
				pending_polls: 0,
				failures: HashMap::new(),
				calls: Vec::new(),
				supports_disconnect: false,
				disconnects: 0,
				events_tx: Some(tx),
				events_rx: Some(rx),
			}),
		}
	}

	pub fn on_chain(self, chain_id: u64) -> Self {
		self.state.lock().unwrap().chain_id = chain_id;
		self
	}

	pub fn with_owner(self, owner: Address) -> Self {
		self.state.lock().unwrap().owner = owner;
		self
	}

	pub fn with_balance(self, balance: U256) -> Self {
		self.state.lock().unwrap().balance = balance;
		self
	}

	pub fn without_code(self) -> Self {
		self.state.lock().unwrap().has_code = false;
		self
	}

	pub fn with_disconnect(self) -> Self {
		self.state.lock().unwrap().supports_disconnect = true;
		self
	}

	/// Receipt polls that return `null` before the receipt appears.
	pub fn with_pending_polls(self, polls: usize) -> Self {
		self.state.lock().unwrap().pending_polls = polls;
		self
	}

	/// Mined receipts report a revert.
	pub fn reverting_receipts(self) -> Self {
		self.state.lock().unwrap().receipt_status = 0;
		self
	}

	pub fn fail(&self, method: &str, code: i64, message: &str) {
		self.state
			.lock()
			.unwrap()
			.failures
			.insert(method.to_string(), (code, message.to_string()));
	}

	/// Push an event to the subscriber.
	pub fn emit(&self, event: ProviderEvent) {
		if let Some(tx) = &self.state.lock().unwrap().events_tx {
			let _ = tx.unbounded_send(event);
		}
	}

	/// Drop the sending side so the subscriber's stream ends.
	pub fn close_events(&self) {
		self.state.lock().unwrap().events_tx = None;
	}

	pub fn calls_to(&self, method: &str) -> usize {
		self.state
			.lock()
			.unwrap()
			.calls
			.iter()
			.filter(|(m, _)| m == method)
			.count()
	}

	pub fn params_of(&self, method: &str) -> Vec<Value> {
		self.state
			.lock()
			.unwrap()
			.calls
			.iter()
			.filter(|(m, _)| m == method)
			.map(|(_, p)| p.clone())
			.collect()
	}

	pub fn disconnects(&self) -> usize {
		self.state.lock().unwrap().disconnects
	}

	fn answer_call(state: &MockState, params: &Value) -> Value {
		if !state.has_code {
			return json!("0x");
		}
		let data = params[0]["data"].as_str().unwrap_or_default();
		let owner_selector = format!("0x{}", hex::encode(IPaidQuery::ownerCall::SELECTOR));
		if data.starts_with(&owner_selector) {
			json!(format!("0x{}", hex::encode(state.owner.into_word())))
		} else {
			json!(format!(
				"0x{}",
				hex::encode(B256::from(state.balance.to_be_bytes::<32>()))
			))
		}
	}

	fn answer_receipt(state: &mut MockState, params: &Value) -> Value {
		if state.pending_polls > 0 {
			state.pending_polls -= 1;
			return Value::Null;
		}
		let hash = params[0].clone();
		json!({
			"transactionHash": hash,
			"status": format!("{:#x}", state.receipt_status),
			"blockNumber": "0x2a",
			"logs": [{
				"address": CONTRACT,
				"topics": [
					IPaidQuery::PaymentReceived::SIGNATURE_HASH,
					ACCOUNT.into_word(),
				],
				"data": format!("0x{}", hex::encode(B256::from(U256::from(1_000_000_000_000_000u64).to_be_bytes::<32>()))),
			}],
		})
	}
}

#[async_trait]
impl WalletProvider for MockProvider {
	async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
		let mut state = self.state.lock().unwrap();
		state.calls.push((method.to_string(), params.clone()));

		if let Some((code, message)) = state.failures.get(method) {
			return Err(ProviderError::rpc(*code, message.clone()));
		}

		let value = match method {
			"eth_requestAccounts" | "eth_accounts" => json!(state.accounts),
			"eth_chainId" => json!(format!("{:#x}", state.chain_id)),
			"wallet_switchEthereumChain" | "wallet_addEthereumChain" => Value::Null,
			"eth_call" => Self::answer_call(&state, &params),
			"eth_sendTransaction" => json!(TX_HASH),
			"eth_getTransactionReceipt" => Self::answer_receipt(&mut state, &params),
			other => {
				return Err(ProviderError::rpc(
					4200,
					format!("mock does not implement {}", other),
				));
			}
		};
		Ok(value)
	}

	fn subscribe(&self) -> Option<ProviderEventStream> {
		self.state
			.lock()
			.unwrap()
			.events_rx
			.take()
			.map(|rx| rx.boxed())
	}

	fn supports_disconnect(&self) -> bool {
		self.state.lock().unwrap().supports_disconnect
	}

	async fn disconnect(&self) -> Result<(), ProviderError> {
		self.state.lock().unwrap().disconnects += 1;
		Ok(())
	}
}

/// Backend that replays scripted outcomes and records every question.
pub struct RecordingBackend {
	outcomes: Mutex<VecDeque<Result<QueryResponse, BackendError>>>,
	questions: Mutex<Vec<String>>,
}

impl RecordingBackend {
	pub fn answering(answer: &str) -> Self {
		Self::scripted(vec![Ok(QueryResponse::success(answer))])
	}

	pub fn scripted(outcomes: Vec<Result<QueryResponse, BackendError>>) -> Self {
		Self {
			outcomes: Mutex::new(outcomes.into()),
			questions: Mutex::new(Vec::new()),
		}
	}

	pub fn questions(&self) -> Vec<String> {
		self.questions.lock().unwrap().clone()
	}
}

#[async_trait]
impl QueryBackend for RecordingBackend {
	async fn submit_query(&self, question: &str) -> Result<QueryResponse, BackendError> {
		self.questions.lock().unwrap().push(question.to_string());
		self.outcomes
			.lock()
			.unwrap()
			.pop_front()
			.unwrap_or_else(|| Err(BackendError::Unreachable("no scripted response".to_string())))
	}
}
