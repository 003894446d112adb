use crate::provider::ProviderError;

use alloy_primitives::B256;

/// Errors surfaced to the application by wallet, contract and query operations
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
	/// The user dismissed the wallet prompt. Not shown as an error.
	#[error("Connection cancelled by user")]
	UserCancelled,

	#[error("No wallet found. Please install a browser wallet.")]
	NoProviderFound,

	#[error("Connection failed: {0}")]
	ConnectionFailed(String),

	#[error("Wrong network: connected to chain {actual}, expected chain {expected}")]
	WrongNetwork { expected: u64, actual: u64 },

	#[error("Contract unavailable: {0}")]
	ContractUnavailable(String),

	#[error("Please connect your wallet first!")]
	NotConnected,

	#[error("Only the contract owner can withdraw")]
	NotOwner,

	#[error("Transaction rejected: {0}")]
	TransactionRejected(String),

	#[error("Transaction failed: {reason}")]
	TransactionFailed { hash: Option<B256>, reason: String },

	/// Payment went through but the question never reached the backend.
	#[error("Payment {tx_hash} confirmed but the backend is unreachable: {reason}")]
	BackendUnreachable { tx_hash: B256, reason: String },

	#[error("Error: {0}")]
	QueryRejected(String),

	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),
}

impl WalletError {
	/// Errors that end an operation without anything to report.
	pub fn is_silent(&self) -> bool {
		matches!(self, WalletError::UserCancelled)
	}

	/// Map a failed `eth_sendTransaction` to the rejected/failed distinction.
	pub fn from_submission(error: ProviderError) -> Self {
		if error.is_user_rejection() {
			WalletError::TransactionRejected(Self::describe_provider(&error))
		} else {
			WalletError::TransactionFailed {
				hash: None,
				reason: Self::describe_provider(&error),
			}
		}
	}

	/// Human-readable text for a provider failure, without the RPC code.
	pub fn describe_provider(error: &ProviderError) -> String {
		match error {
			ProviderError::Rpc { message, .. } => message.clone(),
			other => other.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_submission_errors() {
		let rejected =
			WalletError::from_submission(ProviderError::rpc(4001, "User denied transaction signature."));
		assert!(matches!(&rejected, WalletError::TransactionRejected(m) if m == "User denied transaction signature."));

		let failed = WalletError::from_submission(ProviderError::rpc(-32000, "insufficient funds"));
		assert_eq!(failed.to_string(), "Transaction failed: insufficient funds");
	}

	#[test]
	fn test_silent() {
		assert!(WalletError::UserCancelled.is_silent());
		assert!(!WalletError::NotConnected.is_silent());
		assert!(!WalletError::QueryRejected("quota exceeded".to_string()).is_silent());
	}
}
