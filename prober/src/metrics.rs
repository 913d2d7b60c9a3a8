use std::time::Duration;

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::outcome::Outcome;

/// Abstract surface a sequence calls after every step, safe to call concurrently from any
/// worker. A Prometheus-backed reference implementation is provided below; shipping its
/// registry to a remote collector is left to the binary embedding this core.
pub trait MetricSink: Send + Sync {
	fn record(&self, sequence: &str, step: &str, protocol: &str, outcome: Outcome, elapsed: Duration);
}

#[derive(Clone, Hash, Default, Debug, PartialEq, Eq, EncodeLabelSet)]
struct StepLabels {
	sequence: String,
	step: String,
	protocol: String,
	outcome: String,
}

/// The default metric sink: a counter family keyed by sequence/step/protocol/outcome, and a
/// histogram family for step latency, registered in a `Registry` the binary can expose
/// however it chooses (see this codebase's own `telemetry::metrics::Metrics` for the shape).
#[derive(Debug, Clone)]
pub struct PrometheusMetricSink {
	outcomes: Family<StepLabels, Counter>,
	latency: Family<StepLabels, Histogram>,
}

impl PrometheusMetricSink {
	pub fn new(registry: &mut Registry) -> Self {
		let outcomes = Family::<StepLabels, Counter>::default();
		registry.register("probe_step_outcomes", "Total probing step outcomes", outcomes.clone());

		let latency = Family::<StepLabels, Histogram>::new_with_constructor(|| {
			Histogram::new(prometheus_client::metrics::histogram::exponential_buckets(0.001, 2.0, 16))
		});
		registry.register("probe_step_duration_seconds", "Probing step latency", latency.clone());

		Self { outcomes, latency }
	}
}

impl MetricSink for PrometheusMetricSink {
	fn record(&self, sequence: &str, step: &str, protocol: &str, outcome: Outcome, elapsed: Duration) {
		let labels = StepLabels {
			sequence: sequence.to_string(),
			step: step.to_string(),
			protocol: protocol.to_string(),
			outcome: outcome.as_str().to_string(),
		};
		self.outcomes.get_or_create(&labels).inc();
		self.latency.get_or_create(&labels).observe(elapsed.as_secs_f64());
	}
}

#[cfg(test)]
pub mod testing {
	use std::sync::Mutex;

	use super::*;

	#[derive(Default)]
	pub struct RecordingMetricSink {
		pub records: Mutex<Vec<(String, String, String, Outcome)>>,
	}

	impl MetricSink for RecordingMetricSink {
		fn record(&self, sequence: &str, step: &str, protocol: &str, outcome: Outcome, _elapsed: Duration) {
			self.records.lock().unwrap().push((
				sequence.to_string(),
				step.to_string(),
				protocol.to_string(),
				outcome,
			));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn records_counters_and_histograms() {
		let mut registry = Registry::default();
		let sink = PrometheusMetricSink::new(&mut registry);
		sink.record("epp-lifecycle", "hello", "epp", Outcome::Success, Duration::from_millis(5));
		let mut out = String::new();
		prometheus_client::encoding::text::encode(&mut out, &registry).unwrap();
		assert!(out.contains("probe_step_outcomes_total"));
		assert!(out.contains("probe_step_duration_seconds"));
	}
}
