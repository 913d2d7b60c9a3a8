use futures_util::{SinkExt, StreamExt};
use tokio_util::codec::Framed;

use super::codec::EppCodec;
use super::message::{EppRequest, EppResponse, parse_response};
use crate::connection::Channel;
use crate::error::ProbeError;

/// A live EPP channel: the framed TLS connection plus the greeting-first protocol state.
/// Held by a persistent token across steps until a terminal failure or sequence teardown
/// closes it.
pub struct EppConnection {
	framed: Framed<Channel, EppCodec>,
}

impl EppConnection {
	pub fn new(channel: Channel) -> Self {
		Self {
			framed: Framed::new(channel, EppCodec),
		}
	}

	/// Writes `request` and waits for the single response frame it provokes. If the request
	/// was a HELLO but the response is not a greeting (or vice versa), this is a protocol
	/// failure regardless of the step's own expected-response predicate.
	pub async fn send_and_receive(&mut self, request: &EppRequest, is_hello: bool) -> Result<EppResponse, ProbeError> {
		self.framed.send(request.bytes.clone()).await?;
		let frame = self.framed.next().await.ok_or(ProbeError::ChannelClosed)??;
		let response = parse_response(&frame)?;
		if response.is_greeting != is_hello {
			return Err(ProbeError::Protocol(if is_hello {
				"expected a greeting but received a command response".to_string()
			} else {
				"received a greeting while not expecting one".to_string()
			}));
		}
		Ok(response)
	}
}
