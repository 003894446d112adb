//! Network tables and chain reconciliation.
//!
//! The application works against one selected chain at a time. `descriptors` holds the static
//! per-chain data (names, RPC endpoints, explorers, contract deployments) and `reconciler`
//! negotiates with the wallet when the wallet sits on a different chain.

/// Static network and contract deployment tables
mod descriptors;
/// Chain comparison and switch/add negotiation
mod reconciler;

pub use descriptors::*;
pub use reconciler::{NetworkReconciler, SwitchOutcome};
