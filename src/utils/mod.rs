//!
//! Formatting helpers shared by status messages and the demo binary.

use alloy_primitives::{Address, U256};

/// Format a base-unit amount with `decimals` decimal places, trimming trailing zeros.
///
/// Integer arithmetic only, so wei amounts keep full precision.
pub fn format_token_amount(amount: U256, decimals: u32) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let base = U256::from(10u64).pow(U256::from(decimals));
	let whole = amount / base;
	let fraction = format!(
		"{:0>width$}",
		(amount % base).to_string(),
		width = decimals as usize
	);
	let fraction = fraction.trim_end_matches('0');

	if fraction.is_empty() {
		whole.to_string()
	} else {
		format!("{}.{}", whole, fraction)
	}
}

/// `0xAbCd...1234` form of a checksummed address.
pub fn short_address(address: &Address) -> String {
	let checksummed = address.to_string();
	format!("{}...{}", &checksummed[..6], &checksummed[38..])
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	#[test]
	fn test_format_token_amount() {
		assert_eq!(format_token_amount(U256::from(1_000_000_000_000_000u64), 18), "0.001");
		assert_eq!(
			format_token_amount(U256::from(1_500_000_000_000_000_000u64), 18),
			"1.5"
		);
		assert_eq!(format_token_amount(U256::ZERO, 18), "0");
		assert_eq!(format_token_amount(U256::from(1u64), 18), "0.000000000000000001");
		assert_eq!(format_token_amount(U256::from(42u64), 0), "42");
	}

	#[test]
	fn test_short_address() {
		let account = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
		assert_eq!(short_address(&account), "0xf39F...2266");
	}
}
