//! Framed transport seam between the connection and the wire.

use std::io;

use async_trait::async_trait;
use omx_protocol::{Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tracing::trace;

/// One direction-paired frame pipe to the player.
///
/// Implementations carry exactly one request/response exchange at a time;
/// serialization is enforced above by the invocation queue.
#[async_trait]
pub trait Transport: Send {
	/// Writes one request frame.
	async fn send(&mut self, request: &Request) -> io::Result<()>;
	/// Reads the next response frame.
	async fn recv(&mut self) -> io::Result<Response>;
}

/// Newline-delimited JSON frames over a Unix domain socket.
pub struct UnixTransport {
	reader: BufReader<OwnedReadHalf>,
	writer: OwnedWriteHalf,
}

impl UnixTransport {
	/// Connects to the socket at `address`.
	///
	/// Fails transiently while the player is still binding its socket.
	pub async fn connect(address: &str) -> io::Result<Self> {
		let stream = UnixStream::connect(address).await?;
		let (read_half, write_half) = stream.into_split();
		Ok(Self {
			reader: BufReader::new(read_half),
			writer: write_half,
		})
	}
}

#[async_trait]
impl Transport for UnixTransport {
	async fn send(&mut self, request: &Request) -> io::Result<()> {
		let mut frame = serde_json::to_string(request).map_err(io::Error::other)?;
		frame.push('\n');
		trace!(target = "omx.channel", member = %request.member, "send frame");
		self.writer.write_all(frame.as_bytes()).await?;
		self.writer.flush().await
	}

	async fn recv(&mut self) -> io::Result<Response> {
		let mut line = String::new();
		let read = self.reader.read_line(&mut line).await?;
		if read == 0 {
			return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "channel closed by player"));
		}
		serde_json::from_str(line.trim_end()).map_err(io::Error::other)
	}
}
