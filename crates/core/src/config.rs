//! Immutable-after-start supervisor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use omx_protocol::DESTINATION_PREFIX;
use serde::Deserialize;

/// Default player binary, resolved via the search path at launch.
pub const DEFAULT_BINARY: &str = "omxplayer";

/// Base name of the discovery file the player writes its channel address to.
pub const DISCOVERY_FILE: &str = "omxplayerdbus";

/// Everything a [`Player`](crate::Player) needs to launch and supervise one
/// external player process.
///
/// Owned by the caller and cloned into the session at `start()`; the session
/// never observes later mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
	/// Player binary path or name.
	pub binary: PathBuf,
	/// Extra launch arguments appended verbatim after the derived flags.
	pub extra_args: Vec<String>,
	/// Explicit discovery-file paths tried before the well-known locations.
	pub address_hints: Vec<PathBuf>,
	/// Interval between live-property poll cycles.
	#[serde(with = "duration_millis")]
	pub poll_interval: Duration,
	/// Properties re-polled on every cycle while attached.
	pub live_properties: Vec<String>,
	/// Properties polled once immediately after attach.
	pub cold_properties: Vec<String>,
	/// Maximum resolve+open+trial attempts before the attach fails.
	pub attach_retry_limit: u32,
	/// Delay between attach attempts.
	#[serde(with = "duration_millis")]
	pub attach_retry_delay: Duration,
	/// Upper bound on one control-channel exchange, attach attempts included.
	#[serde(with = "duration_millis")]
	pub call_timeout: Duration,

	// Launch flags, mapped 1:1 onto player arguments.
	pub blank_background: bool,
	pub audio_device: Option<String>,
	pub passthrough: bool,
	pub deinterlace: bool,
	pub no_hdmi_clock_sync: bool,
	/// Stall timeout in seconds.
	pub stall_timeout: Option<u32>,
	/// Display orientation in degrees.
	pub orientation: Option<u32>,
	/// 3D mode name.
	pub mode_3d: Option<String>,
	pub audio_track: Option<u32>,
	pub subtitle_track: Option<u32>,
	/// Start offset, `hh:mm:ss`.
	pub start_offset: Option<String>,
	pub subtitle_file: Option<PathBuf>,
	/// Initial volume in millibels.
	pub initial_volume: Option<i64>,
}

impl Default for PlayerConfig {
	fn default() -> Self {
		Self {
			binary: PathBuf::from(DEFAULT_BINARY),
			extra_args: Vec::new(),
			address_hints: Vec::new(),
			poll_interval: Duration::from_millis(500),
			live_properties: vec!["PlaybackStatus".into(), "Position".into(), "Volume".into()],
			cold_properties: vec![
				"Identity".into(),
				"Duration".into(),
				"CanControl".into(),
				"CanPause".into(),
				"CanPlay".into(),
				"CanSeek".into(),
			],
			attach_retry_limit: 100,
			attach_retry_delay: Duration::from_millis(50),
			call_timeout: Duration::from_secs(2),
			blank_background: false,
			audio_device: None,
			passthrough: false,
			deinterlace: false,
			no_hdmi_clock_sync: false,
			stall_timeout: None,
			orientation: None,
			mode_3d: None,
			audio_track: None,
			subtitle_track: None,
			start_offset: None,
			subtitle_file: None,
			initial_volume: None,
		}
	}
}

impl PlayerConfig {
	/// Sets the player binary.
	pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
		self.binary = binary.into();
		self
	}

	/// Sets the live-poll interval.
	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	/// Prepends an explicit discovery-file path.
	pub fn with_address_hint(mut self, hint: impl Into<PathBuf>) -> Self {
		self.address_hints.push(hint.into());
		self
	}

	/// Sets the attach retry budget.
	pub fn with_attach_budget(mut self, retries: u32, delay: Duration) -> Self {
		self.attach_retry_limit = retries;
		self.attach_retry_delay = delay;
		self
	}

	/// Sets the per-exchange timeout.
	pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
		self.call_timeout = timeout;
		self
	}

	/// Resolves the configured binary against the search path.
	///
	/// Explicit paths are kept as-is; bare names go through `which`.
	pub fn resolve_binary(&self) -> Option<PathBuf> {
		if self.binary.components().count() > 1 {
			return self.binary.exists().then(|| self.binary.clone());
		}
		which::which(&self.binary).ok()
	}

	/// Builds the full launch argument list for one session.
	///
	/// Keyboard control is always disabled: the control channel is the only
	/// input the supervisor tolerates. The media path goes last.
	pub fn launch_args(&self, media: &Path, destination: &str) -> Vec<String> {
		let mut args = vec!["--no-keys".to_string(), format!("--dbus_name={destination}")];

		if self.blank_background {
			args.push("--blank".into());
		}
		if let Some(device) = &self.audio_device {
			args.push("-o".into());
			args.push(device.clone());
		}
		if self.passthrough {
			args.push("--passthrough".into());
		}
		if self.deinterlace {
			args.push("--deinterlace".into());
		}
		if self.no_hdmi_clock_sync {
			args.push("--nohdmiclocksync".into());
		}
		if let Some(seconds) = self.stall_timeout {
			args.push("--timeout".into());
			args.push(seconds.to_string());
		}
		if let Some(degrees) = self.orientation {
			args.push("--orientation".into());
			args.push(degrees.to_string());
		}
		if let Some(mode) = &self.mode_3d {
			args.push("--3d".into());
			args.push(mode.clone());
		}
		if let Some(index) = self.audio_track {
			args.push("--aidx".into());
			args.push(index.to_string());
		}
		if let Some(index) = self.subtitle_track {
			args.push("--sidx".into());
			args.push(index.to_string());
		}
		if let Some(offset) = &self.start_offset {
			args.push("--pos".into());
			args.push(offset.clone());
		}
		if let Some(file) = &self.subtitle_file {
			args.push("--subtitles".into());
			args.push(file.display().to_string());
		}
		if let Some(millibels) = self.initial_volume {
			args.push("--vol".into());
			args.push(millibels.to_string());
		}

		args.extend(self.extra_args.iter().cloned());
		args.push(media.display().to_string());
		args
	}

	/// Formats the per-session destination identifier.
	///
	/// Uniqueness across concurrent supervisors comes from the pid; `seq` is
	/// the supervisor's own monotonically increasing session counter.
	pub fn destination_id(seq: u64) -> String {
		format!("{}.instance{}-{}", DESTINATION_PREFIX, std::process::id(), seq)
	}
}

mod duration_millis {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer};

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn launch_args_always_disable_keyboard_and_carry_destination() {
		let config = PlayerConfig::default();
		let args = config.launch_args(Path::new("/movies/a.mkv"), "dest.instance1-1");
		assert_eq!(args[0], "--no-keys");
		assert!(args.contains(&"--dbus_name=dest.instance1-1".to_string()));
		assert_eq!(args.last().unwrap(), "/movies/a.mkv");
	}

	#[test]
	fn launch_args_map_optional_flags() {
		let mut config = PlayerConfig::default();
		config.blank_background = true;
		config.audio_device = Some("hdmi".into());
		config.initial_volume = Some(-600);
		config.start_offset = Some("00:01:30".into());

		let args = config.launch_args(Path::new("a.mkv"), "d");
		assert!(args.contains(&"--blank".to_string()));
		let o = args.iter().position(|a| a == "-o").unwrap();
		assert_eq!(args[o + 1], "hdmi");
		let vol = args.iter().position(|a| a == "--vol").unwrap();
		assert_eq!(args[vol + 1], "-600");
		let pos = args.iter().position(|a| a == "--pos").unwrap();
		assert_eq!(args[pos + 1], "00:01:30");
	}

	#[test]
	fn destination_ids_differ_by_sequence() {
		let a = PlayerConfig::destination_id(1);
		let b = PlayerConfig::destination_id(2);
		assert_ne!(a, b);
		assert!(a.starts_with(DESTINATION_PREFIX));
		assert!(a.contains(&std::process::id().to_string()));
	}

	#[test]
	fn config_deserializes_from_json_with_defaults() {
		let config: PlayerConfig = serde_json::from_str(r#"{"poll_interval": 250, "live_properties": ["Position"]}"#).unwrap();
		assert_eq!(config.poll_interval, Duration::from_millis(250));
		assert_eq!(config.live_properties, vec!["Position".to_string()]);
		assert_eq!(config.binary, PathBuf::from(DEFAULT_BINARY));
	}
}
