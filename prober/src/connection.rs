use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use crate::error::ProbeError;

/// A connected transport channel: a plain TCP stream for HTTP WebWHOIS probes, or a
/// TLS-wrapped TCP stream for EPP and for WebWHOIS once a redirect switches to HTTPS.
pub enum Channel {
	Plain(TcpStream),
	Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Channel {
	fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
		match self.get_mut() {
			Channel::Plain(s) => Pin::new(s).poll_read(cx, buf),
			Channel::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
		}
	}
}

impl AsyncWrite for Channel {
	fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
		match self.get_mut() {
			Channel::Plain(s) => Pin::new(s).poll_write(cx, buf),
			Channel::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
		}
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
		match self.get_mut() {
			Channel::Plain(s) => Pin::new(s).poll_flush(cx),
			Channel::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
		}
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
		match self.get_mut() {
			Channel::Plain(s) => Pin::new(s).poll_shutdown(cx),
			Channel::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
		}
	}
}

/// Builds connected channels for probing steps, attaching the protocol and host as
/// attributes used by handlers for decisions and by logging, and enforcing a connect timeout.
#[derive(Clone)]
pub struct ConnectionManager {
	tls: Option<Arc<ClientConfig>>,
}

impl ConnectionManager {
	pub fn new(tls: Option<Arc<ClientConfig>>) -> Self {
		Self { tls }
	}

	pub async fn connect(
		&self,
		host: &str,
		port: u16,
		use_tls: bool,
		timeout: Duration,
	) -> Result<Channel, ProbeError> {
		match tokio::time::timeout(timeout, self.connect_inner(host, port, use_tls)).await {
			Ok(result) => result,
			Err(_) => Err(ProbeError::Connect {
				host: host.to_string(),
				port,
				source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
			}),
		}
	}

	async fn connect_inner(&self, host: &str, port: u16, use_tls: bool) -> Result<Channel, ProbeError> {
		debug!(host, port, use_tls, "opening channel");
		let tcp = TcpStream::connect((host, port))
			.await
			.map_err(|source| ProbeError::Connect {
				host: host.to_string(),
				port,
				source,
			})?;
		let _ = tcp.set_nodelay(true);
		if !use_tls {
			return Ok(Channel::Plain(tcp));
		}
		let tls = self
			.tls
			.clone()
			.expect("a TLS client config is required to open a TLS channel");
		let server_name = ServerName::try_from(host.to_string()).map_err(|e| ProbeError::Tls {
			host: host.to_string(),
			source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
		})?;
		let connector = TlsConnector::from(tls);
		let stream = connector
			.connect(server_name, tcp)
			.await
			.map_err(|source| ProbeError::Tls {
				host: host.to_string(),
				source,
			})?;
		Ok(Channel::Tls(Box::new(stream)))
	}
}
