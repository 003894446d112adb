//! Detection of wallet capabilities injected into the host environment.
//!
//! Wallets announce themselves through a handful of well-known injection points. Some of them
//! mimic the shared `ethereum` namespace, so detection follows a fixed priority order rather
//! than alphabetical order, and the shared namespace is disambiguated by its capability flags.

use super::WalletProvider;

use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Injection namespace a capability was found in, with the flag that identified it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletKind {
	/// Dedicated `clover` namespace
	Clover,
	/// `phantom.ethereum` namespace
	Phantom,
	MetaMask,
	CoinbaseWallet,
	/// `isTrustWallet` as injected by the mobile wallet
	TrustWalletMobile,
	TrustWallet,
	BraveWallet,
	/// Shared namespace without any recognized flag
	Browser,
}

impl WalletKind {
	/// Display name of the wallet.
	pub fn name(&self) -> &'static str {
		match self {
			WalletKind::Clover => "CLV Wallet",
			WalletKind::Phantom => "Phantom",
			WalletKind::MetaMask => "MetaMask",
			WalletKind::CoinbaseWallet => "Coinbase Wallet",
			WalletKind::TrustWalletMobile | WalletKind::TrustWallet => "Trust Wallet",
			WalletKind::BraveWallet => "Brave Wallet",
			WalletKind::Browser => "Browser Wallet",
		}
	}

	/// Whether the wallet lives outside the shared `ethereum` namespace.
	pub fn is_non_standard(&self) -> bool {
		matches!(self, WalletKind::Clover)
	}
}

impl fmt::Display for WalletKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Capability flags exposed on the shared `ethereum` namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderFlags {
	pub is_meta_mask: bool,
	pub is_coinbase_wallet: bool,
	pub is_trust_wallet: bool,
	pub is_trust: bool,
	pub is_brave_wallet: bool,
}

impl ProviderFlags {
	/// Flag checks in priority order.
	fn matches(&self) -> impl Iterator<Item = WalletKind> + '_ {
		[
			(self.is_meta_mask, WalletKind::MetaMask),
			(self.is_coinbase_wallet, WalletKind::CoinbaseWallet),
			(self.is_trust_wallet, WalletKind::TrustWalletMobile),
			(self.is_trust, WalletKind::TrustWallet),
			(self.is_brave_wallet, WalletKind::BraveWallet),
		]
		.into_iter()
		.filter_map(|(set, kind)| set.then_some(kind))
	}
}

/// The shared `ethereum` injection point.
#[derive(Clone)]
pub struct InjectedEthereum {
	pub provider: Arc<dyn WalletProvider>,
	pub flags: ProviderFlags,
}

/// Snapshot of every injection point in the host at one moment.
#[derive(Clone, Default)]
pub struct InjectionPoints {
	pub clover: Option<Arc<dyn WalletProvider>>,
	pub phantom_ethereum: Option<Arc<dyn WalletProvider>>,
	pub ethereum: Option<InjectedEthereum>,
}

impl InjectionPoints {
	pub fn is_empty(&self) -> bool {
		self.clover.is_none() && self.phantom_ethereum.is_none() && self.ethereum.is_none()
	}
}

/// Host environment wallets inject themselves into.
pub trait HostEnvironment: Send + Sync {
	/// Current injection points. Called on every detection; the host may change between calls.
	fn injection_points(&self) -> InjectionPoints;
}

/// In-memory host whose injection points can be replaced at any time.
#[derive(Default)]
pub struct StaticHost {
	points: Mutex<InjectionPoints>,
}

impl StaticHost {
	pub fn new(points: InjectionPoints) -> Self {
		Self {
			points: Mutex::new(points),
		}
	}

	/// Host with only the shared namespace populated.
	pub fn with_ethereum(provider: Arc<dyn WalletProvider>, flags: ProviderFlags) -> Self {
		Self::new(InjectionPoints {
			ethereum: Some(InjectedEthereum { provider, flags }),
			..Default::default()
		})
	}

	pub fn replace(&self, points: InjectionPoints) {
		if let Ok(mut guard) = self.points.lock() {
			*guard = points;
		}
	}
}

impl HostEnvironment for StaticHost {
	fn injection_points(&self) -> InjectionPoints {
		self.points
			.lock()
			.map(|guard| guard.clone())
			.unwrap_or_default()
	}
}

/// A wallet found in the host environment.
#[derive(Clone)]
pub struct WalletCapability {
	pub kind: WalletKind,
	pub handle: Arc<dyn WalletProvider>,
}

impl WalletCapability {
	pub fn name(&self) -> &'static str {
		self.kind.name()
	}
}

impl fmt::Debug for WalletCapability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WalletCapability")
			.field("name", &self.name())
			.finish()
	}
}

/// Enumerates wallet capabilities available in the host environment.
#[derive(Clone)]
pub struct ProviderRegistry {
	host: Arc<dyn HostEnvironment>,
}

impl ProviderRegistry {
	pub fn new(host: Arc<dyn HostEnvironment>) -> Self {
		Self { host }
	}

	/// Every matching capability, highest priority first.
	pub fn detect_all(&self) -> Vec<WalletCapability> {
		let points = self.host.injection_points();
		let mut found = Vec::new();

		if let Some(handle) = &points.clover {
			found.push(WalletCapability {
				kind: WalletKind::Clover,
				handle: handle.clone(),
			});
		}

		if let Some(handle) = &points.phantom_ethereum {
			found.push(WalletCapability {
				kind: WalletKind::Phantom,
				handle: handle.clone(),
			});
		}

		if let Some(ethereum) = &points.ethereum {
			found.extend(ethereum.flags.matches().map(|kind| WalletCapability {
				kind,
				handle: ethereum.provider.clone(),
			}));

			if found.is_empty() {
				found.push(WalletCapability {
					kind: WalletKind::Browser,
					handle: ethereum.provider.clone(),
				});
			}
		}

		found
	}

	/// The capability selected by the highest-priority matching rule, if any.
	pub fn detect(&self) -> Vec<WalletCapability> {
		self.detect_all().into_iter().take(1).collect()
	}

	/// Highest-priority capability, or `None` when nothing is injected.
	pub fn pick_default(&self) -> Option<WalletCapability> {
		self.detect().into_iter().next()
	}

	/// Raw handle for a direct connection: `clover`, then `phantom.ethereum`, then `ethereum`.
	pub fn injected_provider(&self) -> Option<Arc<dyn WalletProvider>> {
		let points = self.host.injection_points();
		points
			.clover
			.or(points.phantom_ethereum)
			.or(points.ethereum.map(|e| e.provider))
	}

	/// Whether the connector should be bypassed in favor of a direct request.
	///
	/// True for the non-standard namespace, and for an injected wallet that does not populate
	/// the shared namespace at all.
	pub fn requires_direct_connect(&self) -> bool {
		let points = self.host.injection_points();
		points.clover.is_some() || (points.ethereum.is_none() && !points.is_empty())
	}
}
