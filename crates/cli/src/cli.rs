//! Command-line surface for `omxctl`.

use std::path::PathBuf;

use clap::Parser;

/// Plays one media file under supervisor control and streams notifications
/// to stdout as JSON lines.
#[derive(Debug, Parser)]
#[command(name = "omxctl", version, about = "Supervised omxplayer playback")]
pub struct Cli {
	/// Media file or URL to play.
	pub media: PathBuf,

	/// Player binary to launch instead of `omxplayer`.
	#[arg(long)]
	pub binary: Option<PathBuf>,

	/// Initial volume in millibels.
	#[arg(long)]
	pub volume: Option<i64>,

	/// Blank the background behind the video.
	#[arg(long)]
	pub blank: bool,

	/// Audio output device.
	#[arg(short = 'o', long)]
	pub audio_device: Option<String>,

	/// External subtitle file.
	#[arg(long)]
	pub subtitles: Option<PathBuf>,

	/// Start offset, `hh:mm:ss`.
	#[arg(long)]
	pub pos: Option<String>,

	/// Live poll interval in milliseconds.
	#[arg(long, default_value_t = 500)]
	pub poll_interval: u64,

	/// Increase log verbosity (-v: debug, -vv: trace).
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Cli::command().debug_assert();
	}

	#[test]
	fn media_is_the_only_required_argument() {
		let cli = Cli::parse_from(["omxctl", "/movies/a.mkv"]);
		assert_eq!(cli.media, PathBuf::from("/movies/a.mkv"));
		assert_eq!(cli.poll_interval, 500);
		assert!(!cli.blank);
	}
}
