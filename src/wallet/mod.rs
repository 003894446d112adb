//! Wallet session management and user-facing status.

/// Connection lifecycle and session state
pub mod session;
/// Status events and UI control state
pub mod status;
pub mod types;

pub use session::{ConnectOutcome, ConnectionSession, ConnectionState, Session};
pub use status::{
	ControlState, StatusDispatcher, StatusEvent, StatusHandler, StatusHistory,
	TracingStatusHandler,
};
pub use types::*;
