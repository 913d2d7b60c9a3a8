use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use prober::metrics::PrometheusMetricSink;
use prober::prober::Prober;
use prober_core::{signal, telemetry, version};
use prometheus_client::registry::Registry;
use tracing::{info, warn};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
	/// Path to a TOML configuration file.
	#[arg(short, long, value_name = "file")]
	config: PathBuf,

	/// Parse and validate configuration, then exit without starting any sequences.
	#[arg(long)]
	validate_only: bool,

	/// Print version (as a simple version string)
	#[arg(short = 'V', value_name = "version")]
	version_short: bool,

	/// Print version (as JSON)
	#[arg(long = "version")]
	version_long: bool,
}

fn main() -> anyhow::Result<()> {
	let _log_flush = telemetry::setup_logging();

	let args = Args::parse();
	if args.version_short {
		println!("{}", version::BuildInfo::new().version);
		return Ok(());
	}
	if args.version_long {
		println!("{}", version::BuildInfo::new());
		return Ok(());
	}

	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.unwrap()
		.block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<()> {
	let contents = std::fs::read_to_string(&args.config)
		.map_err(|e| anyhow::anyhow!("reading config file {}: {e}", args.config.display()))?;
	let cfg = prober::config::parse_config(&contents)?;

	if args.validate_only {
		println!("configuration is valid");
		return Ok(());
	}

	info!(version = %version::BuildInfo::new(), "starting prober");

	let mut registry = Registry::default();
	let metrics = Arc::new(PrometheusMetricSink::new(&mut registry));
	let prober = Prober::new(cfg, metrics)?;

	let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
	let shutdown = signal::Shutdown::new();

	let prober_task = tokio::spawn(prober.run(shutdown_rx));

	shutdown.wait().await;
	info!("shutdown requested, draining in-flight sequences");
	let _ = shutdown_tx.send(true);
	if tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, prober_task).await.is_err() {
		warn!("grace period expired with sequences still in flight, exiting anyway");
	}
	Ok(())
}
