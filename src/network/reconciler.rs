use super::descriptors::descriptor;
use crate::provider::WalletProvider;
use crate::wallet::Session;

use serde_json::json;
use tracing::{info, warn};

/// Result of a best-effort chain switch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
	/// The wallet accepted the switch request.
	Switched,
	/// The wallet did not know the chain and accepted the add-chain request.
	Added,
	/// The wallet declined or failed; the reason is only logged.
	NotSwitched(String),
}

/// Compares the wallet's chain with the selected one and asks the wallet to switch.
///
/// Requests are best-effort: a declined prompt or unknown chain is logged and reported as
/// [`SwitchOutcome::NotSwitched`], never as an error. No request is retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkReconciler;

impl NetworkReconciler {
	pub fn new() -> Self {
		Self
	}

	/// Whether the session is on the selected chain.
	pub fn is_correct(session: &Session, selected_chain_id: u64) -> bool {
		session.chain_id == selected_chain_id
	}

	/// Ask the wallet to move to `chain_id`, adding the chain first if the wallet lacks it.
	pub async fn request_switch(&self, handle: &dyn WalletProvider, chain_id: u64) -> SwitchOutcome {
		let network = descriptor(chain_id);
		let hex_chain_id = format!("{:#x}", chain_id);

		info!("Requesting wallet switch to chain {}", chain_id);
		let switch_error = match handle
			.request(
				"wallet_switchEthereumChain",
				json!([{ "chainId": hex_chain_id }]),
			)
			.await
		{
			Ok(_) => return SwitchOutcome::Switched,
			Err(e) => e,
		};

		let network = match network {
			Some(network) if switch_error.is_unrecognized_chain() => network,
			_ => {
				warn!("Failed to switch to chain {}: {}", chain_id, switch_error);
				return SwitchOutcome::NotSwitched(switch_error.to_string());
			}
		};

		info!(
			"Wallet does not know {}, requesting wallet_addEthereumChain",
			network.display_name
		);
		match handle
			.request("wallet_addEthereumChain", json!([network.add_chain_params()]))
			.await
		{
			Ok(_) => SwitchOutcome::Added,
			Err(e) => {
				warn!("Failed to add network {}: {}", network.display_name, e);
				SwitchOutcome::NotSwitched(e.to_string())
			}
		}
	}
}
