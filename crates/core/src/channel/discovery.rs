//! Control channel address discovery.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::config::DISCOVERY_FILE;
use crate::error::{PlayerError, Result};

/// Resolves the control channel address from the discovery file.
///
/// Tries `hints` first, then the user-suffixed well-known path, then the
/// bare well-known path. The first candidate with non-empty contents wins.
/// Fails with [`PlayerError::AddressUnavailable`] once every candidate is
/// exhausted; the caller retries, since the player writes the file a short,
/// variable time after spawn.
pub fn resolve_address(hints: &[PathBuf]) -> Result<String> {
	let mut candidates: Vec<PathBuf> = hints.to_vec();
	if let Ok(user) = std::env::var("USER") {
		candidates.push(PathBuf::from(format!("/tmp/{DISCOVERY_FILE}.{user}")));
	}
	candidates.push(PathBuf::from(format!("/tmp/{DISCOVERY_FILE}")));

	let mut last_error = "no candidate paths".to_string();
	for candidate in &candidates {
		match std::fs::read_to_string(candidate) {
			Ok(contents) => {
				let address = contents.trim();
				if address.is_empty() {
					trace!(target = "omx.channel", path = %candidate.display(), "discovery file empty");
					last_error = format!("{} is empty", candidate.display());
					continue;
				}
				debug!(target = "omx.channel", path = %candidate.display(), %address, "resolved channel address");
				return Ok(address.to_string());
			}
			Err(e) => {
				last_error = format!("{}: {}", candidate.display(), e);
			}
		}
	}

	Err(PlayerError::AddressUnavailable(last_error))
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use tempfile::NamedTempFile;

	use super::*;

	#[test]
	fn hint_path_wins_over_fallbacks() {
		let mut file = NamedTempFile::new().unwrap();
		writeln!(file, "/run/player.sock").unwrap();

		let address = resolve_address(&[file.path().to_path_buf()]).unwrap();
		assert_eq!(address, "/run/player.sock");
	}

	#[test]
	fn empty_discovery_file_is_skipped() {
		let file = NamedTempFile::new().unwrap();
		let missing = PathBuf::from("/nonexistent/discovery-file");

		let err = resolve_address(&[file.path().to_path_buf(), missing]).unwrap_err();
		assert!(matches!(err, PlayerError::AddressUnavailable(_)));
	}

	#[test]
	fn address_is_trimmed() {
		let mut file = NamedTempFile::new().unwrap();
		write!(file, "  /run/p.sock\n\n").unwrap();
		assert_eq!(resolve_address(&[file.path().to_path_buf()]).unwrap(), "/run/p.sock");
	}
}
