//! Control channel plumbing: address discovery, transport, connection.
//!
//! The external player publishes its channel address through a well-known
//! discovery file shortly after it spawns. This module resolves that address,
//! opens the channel, and exchanges request/response frames over it. Opening
//! may fail transiently while the player is still initializing; the session
//! orchestrator owns the retry loop.

mod connection;
mod discovery;
pub mod fake;
mod transport;

pub use connection::{Connection, DEFAULT_CALL_TIMEOUT};
pub use discovery::resolve_address;
pub use transport::{Transport, UnixTransport};
