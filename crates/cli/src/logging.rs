//! Tracing setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise verbosity maps to info/debug/trace.
pub fn init_logging(verbose: u8) {
	let default_directive = match verbose {
		0 => "info",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
