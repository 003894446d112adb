//! The pay-then-ask flow.
//!
//! A question is only sent once its payment is confirmed on-chain. There is no refund path: a
//! confirmed payment whose question never reaches the backend is reported with the payment
//! hash so the user can follow up.

use super::backend::QueryBackend;
use crate::contract::BoundContract;
use crate::transaction::{PAYMENT_WEI, Transaction, TransactionTracker, TxOperation};
use crate::wallet::{StatusDispatcher, StatusEvent, WalletError};

use alloy_primitives::U256;
use tracing::{error, info, warn};

/// Answer to a paid question together with the payment that bought it.
#[derive(Debug, Clone)]
pub struct QueryAnswer {
	pub answer: String,
	pub payment: Transaction,
}

/// Sequences payment, confirmation and backend submission.
pub struct PaidQueryOrchestrator<B> {
	tracker: TransactionTracker,
	backend: B,
	payment_value: U256,
	status: StatusDispatcher,
}

impl<B: QueryBackend> PaidQueryOrchestrator<B> {
	pub fn new(tracker: TransactionTracker, backend: B) -> Self {
		Self {
			tracker,
			backend,
			payment_value: U256::from(PAYMENT_WEI),
			status: StatusDispatcher::new(),
		}
	}

	pub fn with_status(mut self, status: StatusDispatcher) -> Self {
		self.status = status;
		self
	}

	pub fn backend(&self) -> &B {
		&self.backend
	}

	pub fn payment_value(&self) -> U256 {
		self.payment_value
	}

	/// Pay the query fee through `contract`, wait for confirmation, then ask `question`.
	///
	/// The backend is never contacted unless the payment confirmed.
	pub async fn submit_query(
		&self,
		contract: Option<BoundContract>,
		question: &str,
	) -> Result<QueryAnswer, WalletError> {
		let contract = contract.ok_or(WalletError::NotConnected)?;

		self.status.dispatch(StatusEvent::AwaitingPayment).await;
		let payment = match self.pay(&contract).await {
			Ok(payment) => payment,
			Err(e) => {
				error!("Payment failed: {}", e);
				self.status
					.dispatch(StatusEvent::PaymentFailed(failure_reason(&e)))
					.await;
				return Err(e);
			}
		};

		self.status.dispatch(StatusEvent::PaymentConfirmed).await;
		self.status.dispatch(StatusEvent::QuerySubmitted).await;

		let response = match self.backend.submit_query(question).await {
			Ok(response) => response,
			Err(e) => {
				warn!("Payment {} confirmed but backend failed: {}", payment.hash, e);
				let reason = e.to_string();
				self.status
					.dispatch(StatusEvent::BackendUnreachable {
						tx_hash: payment.hash,
						reason: reason.clone(),
					})
					.await;
				return Err(WalletError::BackendUnreachable {
					tx_hash: payment.hash,
					reason,
				});
			}
		};

		match response.into_answer() {
			Ok(answer) => {
				info!("Received answer for payment {}", payment.hash);
				self.status
					.dispatch(StatusEvent::AnswerReceived(answer.clone()))
					.await;
				Ok(QueryAnswer { answer, payment })
			}
			Err(message) => {
				warn!("Backend rejected query: {}", message);
				self.status
					.dispatch(StatusEvent::QueryRejected(message.clone()))
					.await;
				Err(WalletError::QueryRejected(message))
			}
		}
	}

	async fn pay(&self, contract: &BoundContract) -> Result<Transaction, WalletError> {
		let pending = self
			.tracker
			.submit(TxOperation::Pay, contract, Some(self.payment_value))
			.await?;
		self.status
			.dispatch(StatusEvent::PaymentPending(pending.explorer().clone()))
			.await;
		pending.wait().await
	}

	/// Withdraw the contract balance to the owner.
	pub async fn withdraw(&self, contract: Option<BoundContract>) -> Result<Transaction, WalletError> {
		let contract = contract.ok_or(WalletError::NotConnected)?;
		if !contract.is_owner() {
			return Err(WalletError::NotOwner);
		}

		self.status.dispatch(StatusEvent::WithdrawalStarted).await;
		match self.send_withdrawal(&contract).await {
			Ok(transaction) => {
				self.status.dispatch(StatusEvent::WithdrawalConfirmed).await;
				Ok(transaction)
			}
			Err(e) => {
				error!("Withdrawal failed: {}", e);
				self.status
					.dispatch(StatusEvent::WithdrawalFailed(failure_reason(&e)))
					.await;
				Err(e)
			}
		}
	}

	async fn send_withdrawal(&self, contract: &BoundContract) -> Result<Transaction, WalletError> {
		let pending = self
			.tracker
			.submit(TxOperation::Withdraw, contract, None)
			.await?;
		self.status
			.dispatch(StatusEvent::WithdrawalPending(pending.explorer().clone()))
			.await;
		pending.wait().await
	}
}

/// The underlying reason, without the error-kind prefix.
fn failure_reason(error: &WalletError) -> String {
	match error {
		WalletError::TransactionRejected(reason)
		| WalletError::TransactionFailed { reason, .. } => reason.clone(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::contract::ContractBinding;
	use crate::network::{ContractTable, LOCALHOST_CHAIN_ID};
	use crate::query::{BackendError, HttpQueryBackend, QueryResponse};
	use crate::testing::{ACCOUNT, MockProvider, OTHER_ACCOUNT, RecordingBackend, TX_HASH};
	use crate::transaction::TxStatus;
	use crate::wallet::{Session, StatusHistory};
	use std::sync::Arc;
	use std::time::Duration;
	use wiremock::matchers::method;
	use wiremock::{Mock, MockServer, ResponseTemplate};

	async fn bound(provider: Arc<MockProvider>) -> BoundContract {
		let mut session = Session::new(provider, "MetaMask", ACCOUNT, LOCALHOST_CHAIN_ID);
		ContractBinding::bind(&mut session, LOCALHOST_CHAIN_ID, &ContractTable::default())
			.await
			.snapshot()
			.unwrap()
	}

	async fn orchestrator(
		backend: RecordingBackend,
	) -> (PaidQueryOrchestrator<RecordingBackend>, StatusHistory) {
		let history = StatusHistory::new();
		let status = StatusDispatcher::new();
		status.register_handler(Box::new(history.clone())).await;
		let orchestrator =
			PaidQueryOrchestrator::new(TransactionTracker::new(Duration::ZERO), backend)
				.with_status(status);
		(orchestrator, history)
	}

	#[tokio::test]
	async fn test_pays_then_asks() {
		let provider = Arc::new(MockProvider::new().with_pending_polls(1));
		let (orchestrator, history) = orchestrator(RecordingBackend::answering("42")).await;

		let answer = orchestrator
			.submit_query(Some(bound(provider.clone()).await), "meaning of life?")
			.await
			.unwrap();

		assert_eq!(answer.answer, "42");
		assert_eq!(answer.payment.hash, TX_HASH);
		assert_eq!(answer.payment.status(), &TxStatus::Confirmed);
		assert_eq!(orchestrator.backend().questions(), vec!["meaning of life?"]);
		assert_eq!(
			provider.params_of("eth_sendTransaction")[0][0]["value"],
			"0x38d7ea4c68000"
		);

		let events = history.events();
		assert_eq!(events[0], StatusEvent::AwaitingPayment);
		assert!(matches!(events[1], StatusEvent::PaymentPending(_)));
		assert_eq!(
			&events[2..],
			&[
				StatusEvent::PaymentConfirmed,
				StatusEvent::QuerySubmitted,
				StatusEvent::AnswerReceived("42".to_string())
			]
		);
	}

	#[tokio::test]
	async fn test_reverted_payment_never_reaches_backend() {
		let provider = Arc::new(MockProvider::new().reverting_receipts());
		let (orchestrator, history) = orchestrator(RecordingBackend::answering("42")).await;

		let result = orchestrator
			.submit_query(Some(bound(provider).await), "question")
			.await;

		assert!(matches!(result, Err(WalletError::TransactionFailed { .. })));
		assert!(orchestrator.backend().questions().is_empty());
		assert_eq!(
			history.last(),
			Some(StatusEvent::PaymentFailed(
				"transaction reverted on-chain".to_string()
			))
		);
	}

	#[tokio::test]
	async fn test_rejected_payment_never_reaches_backend() {
		let provider = Arc::new(MockProvider::new());
		provider.fail("eth_sendTransaction", 4001, "User denied transaction signature.");
		let (orchestrator, _) = orchestrator(RecordingBackend::answering("42")).await;

		let result = orchestrator
			.submit_query(Some(bound(provider).await), "question")
			.await;
		assert!(matches!(result, Err(WalletError::TransactionRejected(_))));
		assert!(orchestrator.backend().questions().is_empty());
	}

	#[tokio::test]
	async fn test_backend_down_keeps_payment_hash() {
		let provider = Arc::new(MockProvider::new());
		let backend = RecordingBackend::scripted(vec![Err(BackendError::Unreachable(
			"connection refused".to_string(),
		))]);
		let (orchestrator, _) = orchestrator(backend).await;

		match orchestrator
			.submit_query(Some(bound(provider).await), "question")
			.await
		{
			Err(WalletError::BackendUnreachable { tx_hash, reason }) => {
				assert_eq!(tx_hash, TX_HASH);
				assert!(reason.contains("connection refused"));
			}
			other => panic!("unexpected result {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_garbled_backend_reply_keeps_payment_hash() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
			.expect(1)
			.mount(&server)
			.await;
		let backend = HttpQueryBackend::new(format!("{}/submit-query", server.uri())).unwrap();
		let orchestrator =
			PaidQueryOrchestrator::new(TransactionTracker::new(Duration::ZERO), backend);
		let provider = Arc::new(MockProvider::new());

		match orchestrator
			.submit_query(Some(bound(provider.clone()).await), "question")
			.await
		{
			Err(WalletError::BackendUnreachable { tx_hash, reason }) => {
				assert_eq!(tx_hash, TX_HASH);
				assert!(reason.starts_with("JSON parse error"));
			}
			other => panic!("unexpected result {:?}", other),
		}
		assert_eq!(provider.calls_to("eth_sendTransaction"), 1);
	}

	#[tokio::test]
	async fn test_backend_rejection_message() {
		let provider = Arc::new(MockProvider::new());
		let backend =
			RecordingBackend::scripted(vec![Ok(QueryResponse::error("quota exceeded"))]);
		let (orchestrator, history) = orchestrator(backend).await;

		let result = orchestrator
			.submit_query(Some(bound(provider).await), "question")
			.await;
		assert!(matches!(result, Err(WalletError::QueryRejected(m)) if m == "quota exceeded"));
		assert_eq!(
			history.last(),
			Some(StatusEvent::QueryRejected("quota exceeded".to_string()))
		);
	}

	#[tokio::test]
	async fn test_requires_contract() {
		let (orchestrator, history) = orchestrator(RecordingBackend::answering("42")).await;
		assert!(matches!(
			orchestrator.submit_query(None, "question").await,
			Err(WalletError::NotConnected)
		));
		assert!(history.events().is_empty());
	}

	#[tokio::test]
	async fn test_withdraw() {
		let provider = Arc::new(MockProvider::new());
		let (orchestrator, history) = orchestrator(RecordingBackend::answering("")).await;

		let transaction = orchestrator
			.withdraw(Some(bound(provider.clone()).await))
			.await
			.unwrap();
		assert_eq!(transaction.operation, TxOperation::Withdraw);
		assert_eq!(
			provider.params_of("eth_sendTransaction")[0][0]["data"],
			"0x3ccfd60b"
		);
		assert_eq!(history.last(), Some(StatusEvent::WithdrawalConfirmed));

		let not_owner = Arc::new(MockProvider::new().with_owner(OTHER_ACCOUNT));
		assert!(matches!(
			orchestrator.withdraw(Some(bound(not_owner).await)).await,
			Err(WalletError::NotOwner)
		));
	}
}
