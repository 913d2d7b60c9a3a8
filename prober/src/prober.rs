use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, EppConfig, WebWhoisConfig};
use crate::connection::ConnectionManager;
use crate::domain::{DomainNameGenerator, RandomDomainNameGenerator};
use crate::epp::message::{EppMessageTemplate, ExpectedResponse};
use crate::metrics::MetricSink;
use crate::protocol::Protocol;
use crate::sequence::{ProbingSequence, TokenLifecycle};
use crate::step::ProbingStep;
use crate::token::Scheme;
use crate::tls;

/// Assembles the sequences a configuration describes and runs them to completion (i.e.
/// forever, until shutdown). This is the `NewProber(cfg)` factory of this codebase's own
/// design notes: construction-time wiring lives here, not scattered across global state.
pub struct Prober {
	sequences: Vec<ProbingSequence>,
}

impl Prober {
	pub fn new(cfg: Config, metrics: Arc<dyn MetricSink>) -> anyhow::Result<Self> {
		let domain_generator: Arc<dyn DomainNameGenerator> = Arc::new(RandomDomainNameGenerator);
		let needs_tls = cfg.epp.is_some() || cfg.webwhois.is_some();
		let tls_config = if needs_tls { Some(tls::build_client_config(&cfg.tls)?) } else { None };
		let connections = ConnectionManager::new(tls_config);

		let mut sequences = Vec::new();
		if let Some(epp) = cfg.epp {
			sequences.push(Self::epp_lifecycle_sequence(
				epp,
				cfg.sequence_interval,
				cfg.step_duration,
				connections.clone(),
				domain_generator.clone(),
				metrics.clone(),
				cfg.redirect_max_chain,
			));
		}
		if let Some(webwhois) = cfg.webwhois {
			sequences.push(Self::webwhois_sequence(
				"webwhois-http",
				Protocol::Http,
				webwhois.http_host.clone(),
				Scheme::Http,
				webwhois.clone(),
				cfg.sequence_interval,
				cfg.step_duration,
				connections.clone(),
				domain_generator.clone(),
				metrics.clone(),
				cfg.redirect_max_chain,
			));
			sequences.push(Self::webwhois_sequence(
				"webwhois-https",
				Protocol::Https,
				webwhois.https_host.clone(),
				Scheme::Https,
				webwhois,
				cfg.sequence_interval,
				cfg.step_duration,
				connections.clone(),
				domain_generator,
				metrics,
				cfg.redirect_max_chain,
			));
		}
		if sequences.is_empty() {
			anyhow::bail!("no sequences configured");
		}
		Ok(Self { sequences })
	}

	/// Runs every sequence to completion on its own task, returning once all have stopped
	/// (which, absent a shutdown signal, never happens on its own).
	pub async fn run(self, shutdown: tokio::sync::watch::Receiver<bool>) {
		let handles: Vec<_> = self
			.sequences
			.into_iter()
			.map(|sequence| {
				let rx = shutdown.clone();
				tokio::spawn(sequence.run(rx))
			})
			.collect();
		for handle in handles {
			let _ = handle.await;
		}
	}

	fn epp_lifecycle_sequence(
		epp: EppConfig,
		interval: Duration,
		step_duration: Duration,
		connections: ConnectionManager,
		domain_generator: Arc<dyn DomainNameGenerator>,
		metrics: Arc<dyn MetricSink>,
		redirect_max_chain: u32,
	) -> ProbingSequence {
		let host = epp.host.clone();
		let tld = epp.tld.clone();
		let steps = vec![
			ProbingStep::epp("hello", step_duration, EppMessageTemplate::hello()),
			ProbingStep::epp("login", step_duration, EppMessageTemplate::login()),
			ProbingStep::epp("create", step_duration, EppMessageTemplate::create()),
			ProbingStep::epp(
				"check_exists",
				step_duration,
				EppMessageTemplate::check(ExpectedResponse::DomainExists),
			),
			ProbingStep::epp("delete", step_duration, EppMessageTemplate::delete()),
			ProbingStep::epp(
				"check_not_exists",
				step_duration,
				EppMessageTemplate::check(ExpectedResponse::DomainNotExists),
			),
			ProbingStep::epp("logout", step_duration, EppMessageTemplate::logout()),
		];
		ProbingSequence::new(
			"epp-lifecycle",
			steps,
			TokenLifecycle::Persistent,
			interval,
			host,
			Scheme::Http,
			Some(tld),
			connections,
			Some(epp),
			None,
			redirect_max_chain,
			domain_generator,
			metrics,
		)
	}

	#[allow(clippy::too_many_arguments)]
	fn webwhois_sequence(
		name: &'static str,
		protocol: Protocol,
		initial_host: String,
		initial_scheme: Scheme,
		webwhois: WebWhoisConfig,
		interval: Duration,
		step_duration: Duration,
		connections: ConnectionManager,
		domain_generator: Arc<dyn DomainNameGenerator>,
		metrics: Arc<dyn MetricSink>,
		redirect_max_chain: u32,
	) -> ProbingSequence {
		let path = webwhois.path.clone();
		let steps = vec![ProbingStep::webwhois("lookup", protocol, step_duration, path)];
		ProbingSequence::new(
			name,
			steps,
			TokenLifecycle::Transient,
			interval,
			initial_host,
			initial_scheme,
			None,
			connections,
			None,
			Some(webwhois),
			redirect_max_chain,
			domain_generator,
			metrics,
		)
	}
}
