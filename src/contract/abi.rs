use alloy_sol_types::{SolCall, sol};

sol! {
	/// Pay-per-query contract: collects fixed payments and lets its owner withdraw them.
	interface IPaidQuery {
		function getBalance() external view returns (uint256);
		function owner() external view returns (address);
		function pay() external payable;
		function withdraw() external;

		event PaymentReceived(address indexed from, uint256 amount);
		event Withdrawal(address indexed to, uint256 amount);
	}
}

/// Hex-encoded calldata for a contract call.
pub fn calldata<C: SolCall>(call: &C) -> String {
	format!("0x{}", hex::encode(call.abi_encode()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_sol_types::SolEvent;

	#[test]
	fn test_selectors() {
		assert_eq!(calldata(&IPaidQuery::payCall {}), "0x1b9265b8");
		assert_eq!(calldata(&IPaidQuery::withdrawCall {}), "0x3ccfd60b");
		assert_eq!(calldata(&IPaidQuery::ownerCall {}), "0x8da5cb5b");
		assert_eq!(calldata(&IPaidQuery::getBalanceCall {}), "0x12065fe0");
	}

	#[test]
	fn test_event_signatures() {
		assert_eq!(
			IPaidQuery::PaymentReceived::SIGNATURE,
			"PaymentReceived(address,uint256)"
		);
		assert_eq!(IPaidQuery::Withdrawal::SIGNATURE, "Withdrawal(address,uint256)");
	}
}
