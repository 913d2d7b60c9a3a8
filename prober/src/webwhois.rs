use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;

use crate::connection::Channel;
use crate::error::ProbeError;
use crate::token::Scheme;

/// Result of issuing one WebWHOIS request, ahead of the sequence-level redirect-chain
/// bookkeeping in [`crate::step::ProbingStep`].
pub enum WebWhoisOutcome {
	Success,
	Redirect { host: String, scheme: Scheme },
}

/// Performs a single `GET <path>` against `host` over `channel` and classifies the response:
/// 200 is success, 301/302 with a Location header is a redirect, anything else a response
/// failure.
pub async fn issue_request(channel: Channel, host: &str, path: &str) -> Result<WebWhoisOutcome, ProbeError> {
	let io = TokioIo::new(channel);
	let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
		.await
		.map_err(|e| ProbeError::Protocol(format!("http handshake: {e}")))?;
	tokio::spawn(async move {
		if let Err(err) = conn.await {
			tracing::debug!(%err, "webwhois connection driver ended");
		}
	});

	let request = Request::builder()
		.method("GET")
		.uri(path)
		.header("Host", host)
		.header("Connection", "close")
		.body(Empty::<Bytes>::new())
		.map_err(|e| ProbeError::Protocol(format!("building request: {e}")))?;

	let response = sender
		.send_request(request)
		.await
		.map_err(|e| ProbeError::Protocol(format!("sending request: {e}")))?;

	match response.status() {
		StatusCode::OK => {
			response
				.into_body()
				.collect()
				.await
				.map_err(|e| ProbeError::Protocol(format!("reading response body: {e}")))?;
			Ok(WebWhoisOutcome::Success)
		},
		StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
			let location = response
				.headers()
				.get(hyper::header::LOCATION)
				.and_then(|v| v.to_str().ok())
				.ok_or_else(|| ProbeError::UnexpectedResponse("redirect with no Location header".to_string()))?
				.to_string();
			let (scheme, host) = parse_redirect_target(&location)?;
			Ok(WebWhoisOutcome::Redirect { host, scheme })
		},
		other => Err(ProbeError::UnexpectedResponse(format!("unexpected status {other}"))),
	}
}

fn parse_redirect_target(location: &str) -> Result<(Scheme, String), ProbeError> {
	let uri: http::Uri = location
		.parse()
		.map_err(|e| ProbeError::UnexpectedResponse(format!("invalid redirect location {location}: {e}")))?;
	let scheme = match uri.scheme_str() {
		Some("https") => Scheme::Https,
		Some("http") | None => Scheme::Http,
		Some(other) => {
			return Err(ProbeError::UnexpectedResponse(format!(
				"unsupported redirect scheme {other}"
			)));
		},
	};
	let host = uri
		.host()
		.ok_or_else(|| ProbeError::UnexpectedResponse(format!("redirect location has no host: {location}")))?
		.to_string();
	Ok((scheme, host))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_an_https_redirect_target() {
		let (scheme, host) = parse_redirect_target("https://whois.example/path").unwrap();
		assert_eq!(scheme, Scheme::Https);
		assert_eq!(host, "whois.example");
	}

	#[test]
	fn defaults_to_http_when_the_location_has_no_scheme() {
		let (scheme, host) = parse_redirect_target("whois.example").unwrap();
		assert_eq!(scheme, Scheme::Http);
		assert_eq!(host, "whois.example");
	}
}
