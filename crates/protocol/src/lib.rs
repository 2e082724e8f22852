//! Wire types for the omxplayer control channel.
//!
//! This crate contains the serde-serializable types exchanged with the
//! external player over its control channel, plus the capability tables that
//! map every supported transport command and property onto its interface,
//! member, and argument signature. These types represent the "protocol
//! layer" - the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Closed: every command and notification is an enumerated variant, never a
//!   runtime-synthesized name
//! * Stable: Changes only when the wire protocol changes
//!
//! The supervisor API is built on top of these types in `omx-rs`.

pub mod capability;
pub mod notify;
pub mod wire;

pub use capability::*;
pub use notify::*;
pub use wire::*;
