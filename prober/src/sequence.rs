use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{EppConfig, WebWhoisConfig};
use crate::connection::ConnectionManager;
use crate::domain::DomainNameGenerator;
use crate::metrics::MetricSink;
use crate::step::ProbingStep;
use crate::token::{Scheme, Token};

/// Whether a sequence's token survives across loop iterations (EPP: the channel and login
/// session persist) or is rebuilt from scratch every time (WebWHOIS: every attempt is a fresh
/// connection and, when identity-bearing, a fresh domain label).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenLifecycle {
	Persistent,
	Transient,
}

/// Ordered, non-empty list of steps run against one shared token, repeated forever with a
/// post-iteration delay. Owns its collaborators so it can run independently of any other
/// sequence on the shared worker pool.
pub struct ProbingSequence {
	pub name: String,
	steps: Vec<ProbingStep>,
	lifecycle: TokenLifecycle,
	interval: Duration,
	initial_host: String,
	initial_scheme: Scheme,
	tld: Option<String>,
	connections: ConnectionManager,
	epp: Option<EppConfig>,
	webwhois: Option<WebWhoisConfig>,
	redirect_max_chain: u32,
	domain_generator: Arc<dyn DomainNameGenerator>,
	metrics: Arc<dyn MetricSink>,
}

impl ProbingSequence {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		name: impl Into<String>,
		steps: Vec<ProbingStep>,
		lifecycle: TokenLifecycle,
		interval: Duration,
		initial_host: impl Into<String>,
		initial_scheme: Scheme,
		tld: Option<String>,
		connections: ConnectionManager,
		epp: Option<EppConfig>,
		webwhois: Option<WebWhoisConfig>,
		redirect_max_chain: u32,
		domain_generator: Arc<dyn DomainNameGenerator>,
		metrics: Arc<dyn MetricSink>,
	) -> Self {
		assert!(!steps.is_empty(), "a sequence must have at least one step");
		Self {
			name: name.into(),
			steps,
			lifecycle,
			interval,
			initial_host: initial_host.into(),
			initial_scheme,
			tld,
			connections,
			epp,
			webwhois,
			redirect_max_chain,
			domain_generator,
			metrics,
		}
	}

	/// Runs the main loop forever: acquire or refresh the token, walk the steps in order,
	/// record each outcome, and sleep for the sequence interval before the next iteration.
	/// Exits only when `shutdown` resolves, at which point the in-flight step is allowed to
	/// finish (it is already bounded by its own duration) and no further iteration starts.
	pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
		let mut token = self.new_token();
		// Persistent (EPP) tokens generate their domain identity once, up front, and keep it
		// for the sequence's lifetime; transient (WebWHOIS) tokens get a fresh one every
		// iteration below.
		if self.lifecycle == TokenLifecycle::Persistent
			&& let Some(tld) = &self.tld
		{
			token.new_attempt_identity(tld, self.domain_generator.as_ref());
		}
		loop {
			if self.lifecycle == TokenLifecycle::Transient {
				token = self.new_token();
				if let Some(tld) = &self.tld {
					token.new_attempt_identity(tld, self.domain_generator.as_ref());
				}
			}

			let mut terminal_failure = false;
			for step in &self.steps {
				let report = step
					.run(
						&mut token,
						&self.connections,
						self.epp.as_ref(),
						self.webwhois.as_ref(),
						self.redirect_max_chain,
					)
					.await;
				debug!(
					sequence = %self.name,
					step = step.name,
					protocol = %step.protocol,
					outcome = %report.outcome,
					elapsed_ms = report.elapsed.as_millis() as u64,
					"step completed"
				);
				self.metrics.record(
					&self.name,
					step.name,
					step.protocol.name(),
					report.outcome,
					report.elapsed,
				);
				if !report.outcome.is_success() {
					warn!(sequence = %self.name, step = step.name, outcome = %report.outcome, "step failed");
					terminal_failure = true;
					break;
				}
			}

			if terminal_failure || self.lifecycle == TokenLifecycle::Transient {
				token.close_epp_channel();
			}

			tokio::select! {
				_ = tokio::time::sleep(self.interval) => {},
				_ = shutdown.changed() => {
					if *shutdown.borrow() {
						return;
					}
				}
			}
			if *shutdown.borrow() {
				return;
			}
		}
	}

	fn new_token(&self) -> Token {
		Token::new(self.initial_host.clone(), self.initial_scheme)
	}
}
