mod cli;
mod logging;

use clap::Parser;
use omx::{Player, PlayerConfig};
use omx_protocol::Notification;
use tracing::error;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = run(cli).await {
		error!(target = "omxctl", error = %err, "playback failed");
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> anyhow::Result<()> {
	let mut config = PlayerConfig::default().with_poll_interval(std::time::Duration::from_millis(cli.poll_interval));
	if let Some(binary) = cli.binary {
		config = config.with_binary(binary);
	}
	config.blank_background = cli.blank;
	config.audio_device = cli.audio_device;
	config.subtitle_file = cli.subtitles;
	config.start_offset = cli.pos;
	config.initial_volume = cli.volume;

	let player = Player::new(config);
	let mut events = player.subscribe();

	let identity = player.start(&cli.media).await?;
	println!("{}", serde_json::json!({ "attached": identity }));

	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				player.stop().await;
			}
			event = events.recv() => {
				match event {
					Some(Notification::Stopped) => {
						println!("{}", serde_json::to_string(&Notification::Stopped)?);
						break;
					}
					Some(event) => println!("{}", serde_json::to_string(&event)?),
					None => break,
				}
			}
		}
	}

	Ok(())
}
