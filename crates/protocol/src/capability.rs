//! Enumerated capability table for the player's control surface.
//!
//! Every transport verb the player understands is a [`PlayerCommand`]
//! variant carrying its member name and argument signature. A single generic
//! dispatch function in the supervisor consults this table instead of
//! synthesizing methods from name lists at runtime.

/// Interface exposing generic property access (get/set by name).
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Interface exposing the player's transport verbs.
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Object path every member lives on.
pub const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

/// Prefix for per-session destination identifiers.
pub const DESTINATION_PREFIX: &str = "org.mpris.MediaPlayer2.omxplayer";

/// Transport verbs accepted by the player-command interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerCommand {
	Next,
	Previous,
	Pause,
	PlayPause,
	Play,
	Stop,
	Mute,
	Unmute,
	HideVideo,
	UnHideVideo,
	HideSubtitles,
	ShowSubtitles,
	Quit,
	/// Seek by a relative offset in microseconds.
	Seek,
	/// Jump to an absolute position in microseconds.
	SetPosition,
	/// Move/resize the video display rectangle.
	VideoPos,
	/// Select a subtitle track by index.
	SelectSubtitle,
	/// Select an audio track by index.
	SelectAudio,
	/// Generic numeric action code.
	Action,
}

impl PlayerCommand {
	/// Wire member name for this verb.
	pub fn member(self) -> &'static str {
		match self {
			PlayerCommand::Next => "Next",
			PlayerCommand::Previous => "Previous",
			PlayerCommand::Pause => "Pause",
			PlayerCommand::PlayPause => "PlayPause",
			PlayerCommand::Play => "Play",
			PlayerCommand::Stop => "Stop",
			PlayerCommand::Mute => "Mute",
			PlayerCommand::Unmute => "Unmute",
			PlayerCommand::HideVideo => "HideVideo",
			PlayerCommand::UnHideVideo => "UnHideVideo",
			PlayerCommand::HideSubtitles => "HideSubtitles",
			PlayerCommand::ShowSubtitles => "ShowSubtitles",
			PlayerCommand::Quit => "Quit",
			PlayerCommand::Seek => "Seek",
			PlayerCommand::SetPosition => "SetPosition",
			PlayerCommand::VideoPos => "VideoPos",
			PlayerCommand::SelectSubtitle => "SelectSubtitle",
			PlayerCommand::SelectAudio => "SelectAudio",
			PlayerCommand::Action => "Action",
		}
	}

	/// Typed argument signature for this verb.
	///
	/// `x` = 64-bit offset, `ox` = object path + 64-bit position,
	/// `os` = object path + string, `i` = 32-bit index/code.
	pub fn signature(self) -> &'static str {
		match self {
			PlayerCommand::Seek => "x",
			PlayerCommand::SetPosition => "ox",
			PlayerCommand::VideoPos => "os",
			PlayerCommand::SelectSubtitle | PlayerCommand::SelectAudio | PlayerCommand::Action => "i",
			_ => "",
		}
	}

	/// All verbs, in wire-member order.
	pub fn all() -> &'static [PlayerCommand] {
		&[
			PlayerCommand::Next,
			PlayerCommand::Previous,
			PlayerCommand::Pause,
			PlayerCommand::PlayPause,
			PlayerCommand::Play,
			PlayerCommand::Stop,
			PlayerCommand::Mute,
			PlayerCommand::Unmute,
			PlayerCommand::HideVideo,
			PlayerCommand::UnHideVideo,
			PlayerCommand::HideSubtitles,
			PlayerCommand::ShowSubtitles,
			PlayerCommand::Quit,
			PlayerCommand::Seek,
			PlayerCommand::SetPosition,
			PlayerCommand::VideoPos,
			PlayerCommand::SelectSubtitle,
			PlayerCommand::SelectAudio,
			PlayerCommand::Action,
		]
	}
}

/// Member used for property reads on [`PROPERTIES_INTERFACE`].
pub const PROPERTY_GET: &str = "Get";

/// Member used for property writes on [`PROPERTIES_INTERFACE`].
pub const PROPERTY_SET: &str = "Set";

/// Signature of a property read: property name.
pub const PROPERTY_GET_SIGNATURE: &str = "s";

/// Signature of a property write: property name + variant value.
pub const PROPERTY_SET_SIGNATURE: &str = "sv";

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parameterless_verbs_have_empty_signature() {
		assert_eq!(PlayerCommand::Pause.signature(), "");
		assert_eq!(PlayerCommand::Quit.signature(), "");
	}

	#[test]
	fn parameterized_verbs_carry_signatures() {
		assert_eq!(PlayerCommand::Seek.signature(), "x");
		assert_eq!(PlayerCommand::SetPosition.signature(), "ox");
		assert_eq!(PlayerCommand::VideoPos.signature(), "os");
		assert_eq!(PlayerCommand::SelectAudio.signature(), "i");
	}

	#[test]
	fn members_are_unique() {
		let mut members: Vec<&str> = PlayerCommand::all().iter().map(|c| c.member()).collect();
		let total = members.len();
		members.sort_unstable();
		members.dedup();
		assert_eq!(members.len(), total);
	}
}
