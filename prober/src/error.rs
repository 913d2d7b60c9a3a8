use crate::outcome::Outcome;

/// Internal errors produced while running a single probing step.
///
/// None of these ever escape a sequence iteration: [`crate::step::ProbingStep::run`] catches
/// every variant at the action-handler boundary and maps it to an [`Outcome`] via
/// [`ProbeError::outcome`].
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
	#[error("connecting to {host}:{port}: {source}")]
	Connect {
		host: String,
		port: u16,
		#[source]
		source: std::io::Error,
	},

	#[error("tls handshake with {host} failed: {source}")]
	Tls {
		host: String,
		#[source]
		source: std::io::Error,
	},

	#[error("decoding frame: {0}")]
	Decode(String),

	#[error("protocol violation: {0}")]
	Protocol(String),

	#[error("unexpected response: {0}")]
	UnexpectedResponse(String),

	#[error("the channel closed before the step completed")]
	ChannelClosed,

	#[error("step exceeded its {0:?} budget")]
	Timeout(std::time::Duration),

	#[error("redirect chain exceeded the configured maximum of {0}")]
	TooManyRedirects(u32),

	#[error("channel io error: {0}")]
	Io(#[from] std::io::Error),
}

impl ProbeError {
	/// Classify this error into the outcome taxonomy a sequence records.
	pub fn outcome(&self) -> Outcome {
		match self {
			ProbeError::Connect { .. } => Outcome::ConnectionFailure,
			ProbeError::Tls { .. } => Outcome::CertificateFailure,
			ProbeError::Decode(_) => Outcome::ProtocolFailure,
			ProbeError::Protocol(_) => Outcome::ProtocolFailure,
			ProbeError::UnexpectedResponse(_) => Outcome::ResponseFailure,
			ProbeError::ChannelClosed => Outcome::ConnectionFailure,
			ProbeError::Timeout(_) => Outcome::Timeout,
			ProbeError::TooManyRedirects(_) => Outcome::ResponseFailure,
			ProbeError::Io(_) => Outcome::ConnectionFailure,
		}
	}
}
