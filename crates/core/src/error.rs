//! Error taxonomy for the supervisor.

use thiserror::Error;

/// Errors surfaced by supervisor operations.
///
/// Spawn and attach failures are fatal to the current start attempt and
/// escalate to full session teardown; the remaining variants are reported to
/// the immediate caller only and leave the session state untouched.
#[derive(Debug, Error)]
pub enum PlayerError {
	/// The player binary is missing, unrunnable, or died before attach.
	#[error("failed to spawn player: {0}")]
	SpawnFailed(String),

	/// No discovery file yielded a control channel address.
	#[error("control channel address unavailable: {0}")]
	AddressUnavailable(String),

	/// The control channel never became responsive within the retry budget.
	#[error("control channel attach timed out: {0}")]
	AttachTimeout(String),

	/// A control call was issued with no live channel.
	#[error("no control channel attached")]
	NotAttached,

	/// The channel is reachable but this specific call errored.
	#[error("remote call failed: {0}")]
	RemoteCallFailed(String),

	/// I/O failure on the control channel itself.
	#[error("control channel i/o: {0}")]
	Channel(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
