use std::time::{Duration, Instant};

use crate::config::{EppConfig, WebWhoisConfig};
use crate::connection::ConnectionManager;
use crate::epp::connection::EppConnection;
use crate::epp::message::{EppMessageTemplate, RequestTemplate, evaluate};
use crate::error::ProbeError;
use crate::outcome::{Outcome, StepReport};
use crate::protocol::Protocol;
use crate::token::{Scheme, Token};
use crate::webwhois::{self, WebWhoisOutcome};

enum StepKind {
	Epp(EppMessageTemplate),
	WebWhois { path: String },
}

/// One dialogue turn within a sequence: a protocol, a message template, and the maximum time
/// allowed to complete it (connect+write+read).
pub struct ProbingStep {
	pub name: &'static str,
	pub protocol: Protocol,
	pub duration: Duration,
	kind: StepKind,
}

impl ProbingStep {
	pub fn epp(name: &'static str, duration: Duration, template: EppMessageTemplate) -> Self {
		Self {
			name,
			protocol: Protocol::Epp,
			duration,
			kind: StepKind::Epp(template),
		}
	}

	pub fn webwhois(name: &'static str, protocol: Protocol, duration: Duration, path: impl Into<String>) -> Self {
		assert!(
			matches!(protocol, Protocol::Http | Protocol::Https),
			"webwhois steps only run over http/https"
		);
		Self {
			name,
			protocol,
			duration,
			kind: StepKind::WebWhois { path: path.into() },
		}
	}

	/// Runs this step against `token`: resolve or open a channel, bind the message, wait out
	/// the step's duration, and translate the result into an [`Outcome`] plus elapsed time.
	/// Never returns a `Result` — every internal error is caught here and classified.
	pub async fn run(
		&self,
		token: &mut Token,
		connections: &ConnectionManager,
		epp: Option<&EppConfig>,
		webwhois: Option<&WebWhoisConfig>,
		redirect_max_chain: u32,
	) -> StepReport {
		let start = Instant::now();
		let outcome = match &self.kind {
			StepKind::Epp(template) => {
				let epp = epp.expect("epp steps require epp configuration");
				self.run_epp(token, connections, epp, template).await
			},
			StepKind::WebWhois { path } => {
				let webwhois = webwhois.expect("webwhois steps require webwhois configuration");
				self.run_webwhois(token, connections, webwhois, path, redirect_max_chain).await
			},
		};
		StepReport {
			outcome,
			elapsed: start.elapsed(),
		}
	}

	async fn run_epp(
		&self,
		token: &mut Token,
		connections: &ConnectionManager,
		epp: &EppConfig,
		template: &EppMessageTemplate,
	) -> Outcome {
		match tokio::time::timeout(self.duration, self.run_epp_inner(token, connections, epp, template)).await {
			Ok(Ok(())) => Outcome::Success,
			Ok(Err(err)) => {
				token.close_epp_channel();
				err.outcome()
			},
			Err(_) => {
				token.close_epp_channel();
				Outcome::Timeout
			},
		}
	}

	async fn run_epp_inner(
		&self,
		token: &mut Token,
		connections: &ConnectionManager,
		epp: &EppConfig,
		template: &EppMessageTemplate,
	) -> Result<(), ProbeError> {
		if token.epp_channel().is_none() {
			let channel = connections.connect(&epp.host, epp.port, true, self.duration).await?;
			token.set_epp_channel(EppConnection::new(channel));
		}
		let cl_trid = token.next_client_transaction_id();
		let domain = token.domain_name().map(str::to_string);
		let credentials = matches!(template.request, RequestTemplate::Login)
			.then(|| (epp.user_id.clone(), epp.password.clone()));
		let request = template.bind(
			&cl_trid,
			domain.as_deref(),
			credentials.as_ref().map(|(u, p)| (u.as_str(), p.as_str())),
		);
		let connection = token.epp_channel().expect("just ensured a channel is present");
		let response = connection.send_and_receive(&request, template.is_hello()).await?;
		evaluate(template.expected, &response, &cl_trid)
	}

	async fn run_webwhois(
		&self,
		token: &mut Token,
		connections: &ConnectionManager,
		webwhois_cfg: &WebWhoisConfig,
		path: &str,
		redirect_max_chain: u32,
	) -> Outcome {
		match tokio::time::timeout(
			self.duration,
			self.run_webwhois_inner(token, connections, webwhois_cfg, path, redirect_max_chain),
		)
		.await
		{
			Ok(Ok(())) => Outcome::Success,
			Ok(Err(err)) => err.outcome(),
			Err(_) => Outcome::Timeout,
		}
	}

	async fn run_webwhois_inner(
		&self,
		token: &mut Token,
		connections: &ConnectionManager,
		webwhois_cfg: &WebWhoisConfig,
		path: &str,
		redirect_max_chain: u32,
	) -> Result<(), ProbeError> {
		let mut redirects = 0u32;
		loop {
			let use_tls = token.scheme() == Scheme::Https;
			let port = if use_tls { webwhois_cfg.https_port } else { webwhois_cfg.http_port };
			let host = token.host().to_string();
			let channel = connections.connect(&host, port, use_tls, self.duration).await?;
			match webwhois::issue_request(channel, &host, path).await? {
				WebWhoisOutcome::Success => return Ok(()),
				WebWhoisOutcome::Redirect { host, scheme } => {
					redirects += 1;
					if redirects > redirect_max_chain {
						return Err(ProbeError::TooManyRedirects(redirect_max_chain));
					}
					token.set_host(host);
					token.set_scheme(scheme);
				},
			}
		}
	}
}
