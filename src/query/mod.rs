//! Paid question flow: payment first, backend second.

/// Backend query endpoint client
pub mod backend;
/// Pay, confirm, then ask
pub mod orchestrator;

pub use backend::{BackendError, HttpQueryBackend, QueryBackend, QueryRequest, QueryResponse};
pub use orchestrator::{PaidQueryOrchestrator, QueryAnswer};
