// Originally derived from https://github.com/istio/ztunnel (Apache 2.0 licensed)

use std::env;
use std::sync::OnceLock;
use std::time::Instant;

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

pub static APPLICATION_START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initializes the global tracing subscriber. The returned guard must be held for the lifetime
/// of the process; dropping it stops the background flush of buffered log lines.
pub fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
	APPLICATION_START_TIME.get_or_init(Instant::now);

	let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
	let use_json = env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

	let filter = EnvFilter::builder()
		.with_default_directive(LevelFilter::INFO.into())
		.from_env_lossy();

	let registry = tracing_subscriber::registry().with(filter);
	if use_json {
		registry
			.with(tracing_subscriber::fmt::layer().json().with_writer(non_blocking))
			.init();
	} else {
		registry
			.with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
			.init();
	}
	guard
}
