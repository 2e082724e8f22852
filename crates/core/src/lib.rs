//! Supervisor for a long-lived external media-playback process.
//!
//! The crate launches an omxplayer-style binary, rendezvous with the control
//! channel the player publishes through a discovery file, serializes every
//! outbound control call, polls remote state into change notifications, and
//! tears the whole thing down cleanly on stop, crash, or restart.
//!
//! Entry point is [`Player`]: one instance supervises at most one live
//! session at a time.
//!
//! ```no_run
//! use omx::{Player, PlayerConfig};
//!
//! # async fn demo() -> omx::Result<()> {
//! let player = Player::new(PlayerConfig::default());
//! let mut events = player.subscribe();
//! let identity = player.start("/movies/a.mkv").await?;
//! println!("attached to {identity}");
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod invoke;
pub mod poll;
pub mod process;
pub mod session;
pub mod snapshot;

pub use config::PlayerConfig;
pub use error::{PlayerError, Result};
pub use omx_protocol as protocol;
pub use session::{Player, SessionState};
