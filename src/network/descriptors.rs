//! Static network and deployment tables.

use alloy_primitives::Address;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Native currency of a network, as announced to wallets when adding the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
	pub name: &'static str,
	pub symbol: &'static str,
	pub decimals: u8,
}

const ETHER: NativeCurrency = NativeCurrency {
	name: "ETH",
	symbol: "ETH",
	decimals: 18,
};

/// Immutable description of a supported network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDescriptor {
	pub chain_id: u64,
	pub display_name: &'static str,
	pub native_currency: NativeCurrency,
	pub rpc_urls: &'static [&'static str],
	/// `None` for chains without a public explorer, such as a local development chain.
	pub explorer_base_url: Option<&'static str>,
}

impl NetworkDescriptor {
	/// Hex chain id as expected by `wallet_*` RPC methods.
	pub fn hex_chain_id(&self) -> String {
		format!("{:#x}", self.chain_id)
	}

	/// Parameters for `wallet_addEthereumChain`.
	pub fn add_chain_params(&self) -> Value {
		json!({
			"chainId": self.hex_chain_id(),
			"chainName": self.display_name,
			"nativeCurrency": self.native_currency,
			"rpcUrls": self.rpc_urls,
			"blockExplorerUrls": self.explorer_base_url.into_iter().collect::<Vec<_>>(),
		})
	}
}

/// Networks the application knows about.
pub const NETWORKS: &[NetworkDescriptor] = &[
	NetworkDescriptor {
		chain_id: 1,
		display_name: "Ethereum",
		native_currency: ETHER,
		rpc_urls: &["https://eth.llamarpc.com"],
		explorer_base_url: Some("https://etherscan.io"),
	},
	NetworkDescriptor {
		chain_id: 8453,
		display_name: "Base",
		native_currency: ETHER,
		rpc_urls: &["https://mainnet.base.org"],
		explorer_base_url: Some("https://basescan.org"),
	},
	NetworkDescriptor {
		chain_id: 84532,
		display_name: "Base Sepolia",
		native_currency: ETHER,
		rpc_urls: &["https://sepolia.base.org"],
		explorer_base_url: Some("https://sepolia.basescan.org"),
	},
	NetworkDescriptor {
		chain_id: 11155111,
		display_name: "Sepolia",
		native_currency: ETHER,
		rpc_urls: &["https://rpc.sepolia.org"],
		explorer_base_url: Some("https://sepolia.etherscan.io"),
	},
	NetworkDescriptor {
		chain_id: 31337,
		display_name: "Localhost",
		native_currency: ETHER,
		rpc_urls: &["http://localhost:8545"],
		explorer_base_url: None,
	},
];

/// Local development chain id.
pub const LOCALHOST_CHAIN_ID: u64 = 31337;

/// Look up a network by chain id.
pub fn descriptor(chain_id: u64) -> Option<&'static NetworkDescriptor> {
	NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// Display name for a chain, `Chain <id>` when unknown.
pub fn network_name(chain_id: u64) -> String {
	descriptor(chain_id)
		.map(|n| n.display_name.to_string())
		.unwrap_or_else(|| format!("Chain {}", chain_id))
}

/// Where a transaction can be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplorerLink {
	/// Public block explorer page.
	External(String),
	/// No public explorer; the hash can only be shown.
	LocalOnly { hash: String },
}

impl ExplorerLink {
	pub fn url(&self) -> Option<&str> {
		match self {
			ExplorerLink::External(url) => Some(url),
			ExplorerLink::LocalOnly { .. } => None,
		}
	}
}

impl fmt::Display for ExplorerLink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ExplorerLink::External(url) => f.write_str(url),
			ExplorerLink::LocalOnly { hash } => write!(f, "Tx Hash: {}", hash),
		}
	}
}

/// Explorer reference for a transaction hash on a chain.
pub fn explorer_link(chain_id: u64, hash: &str) -> ExplorerLink {
	match descriptor(chain_id).and_then(|n| n.explorer_base_url) {
		Some(base) => ExplorerLink::External(format!("{}/tx/{}", base, hash)),
		None => ExplorerLink::LocalOnly {
			hash: hash.to_string(),
		},
	}
}

/// Explorer URL for a transaction, `None` when the chain has no public explorer.
pub fn explorer_url(chain_id: u64, hash: &str) -> Option<String> {
	explorer_link(chain_id, hash).url().map(str::to_string)
}

/// Deployed contract on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractRef {
	pub chain_id: u64,
	pub address: Address,
}

/// Deployed payment contract address per chain. An empty entry means "not deployed here".
#[derive(Debug, Clone)]
pub struct ContractTable {
	addresses: BTreeMap<u64, String>,
}

impl ContractTable {
	pub fn empty() -> Self {
		Self {
			addresses: BTreeMap::new(),
		}
	}

	/// Set or clear (empty string) the address for a chain.
	pub fn with_address(mut self, chain_id: u64, address: impl Into<String>) -> Self {
		self.addresses.insert(chain_id, address.into());
		self
	}

	/// Whether the table has an entry, deployed or not, for the chain.
	pub fn knows(&self, chain_id: u64) -> bool {
		self.addresses.contains_key(&chain_id)
	}

	/// Deployed contract on the chain; `None` when the entry is missing, empty or malformed.
	pub fn lookup(&self, chain_id: u64) -> Option<ContractRef> {
		let raw = self.addresses.get(&chain_id)?.trim();
		if raw.is_empty() {
			return None;
		}
		match raw.parse::<Address>() {
			Ok(address) => Some(ContractRef { chain_id, address }),
			Err(e) => {
				tracing::warn!(
					"Ignoring malformed contract address {} for chain {}: {}",
					raw,
					chain_id,
					e
				);
				None
			}
		}
	}
}

impl Default for ContractTable {
	fn default() -> Self {
		Self::empty()
			.with_address(LOCALHOST_CHAIN_ID, "0x5FbDB2315678afecb367f032d93F642f64180aa3")
			.with_address(84532, "")
			.with_address(8453, "")
			.with_address(1, "")
			.with_address(11155111, "")
	}
}
