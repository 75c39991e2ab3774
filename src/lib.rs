//! Connection manager core: a fan-out/fan-in aggregator over N remote
//! Docker-compatible container daemons, managed as a single
//! slot-accounted pool.
//!
//! [`Connection`] is the public entry point; see its methods for the six
//! upstream operations (enumerate/start/stop/logs plus per-node and
//! fleet-wide status).

pub mod cache;
pub mod config;
pub mod connection;
pub mod error;
pub mod fleet;
pub mod inventory;
pub mod lifecycle;
pub mod logs;
pub mod node;
pub mod projection;

/// In-memory transport fake, always compiled (like the teacher's
/// `client::fake` module) so both unit tests and the `tests/` integration
/// suite can depend on it without a feature flag.
pub mod testutil;

pub use connection::Connection;
pub use config::Config;
pub use error::{ConnectionError, NodeClientError};
pub use fleet::{NodeState, NodeStatus, SlotUsage};
pub use logs::LogRecord;
pub use projection::Instance;
