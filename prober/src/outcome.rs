use std::time::Duration;

/// Tagged result of a single probing step, reported to the metric sink.
///
/// This is never a Rust `Result`: every internal error is caught at the action-handler
/// boundary and converted into one of these variants before it reaches a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	Success,
	ResponseFailure,
	ConnectionFailure,
	ProtocolFailure,
	Timeout,
	CertificateFailure,
}

impl Outcome {
	pub fn is_success(self) -> bool {
		matches!(self, Outcome::Success)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Outcome::Success => "success",
			Outcome::ResponseFailure => "response_failure",
			Outcome::ConnectionFailure => "connection_failure",
			Outcome::ProtocolFailure => "protocol_failure",
			Outcome::Timeout => "timeout",
			Outcome::CertificateFailure => "certificate_failure",
		}
	}
}

impl std::fmt::Display for Outcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single step execution report, handed from [`crate::step::ProbingStep::run`] to the
/// owning sequence for metric emission and control-flow decisions.
#[derive(Clone, Copy, Debug)]
pub struct StepReport {
	pub outcome: Outcome,
	pub elapsed: Duration,
}

impl StepReport {
	pub fn new(outcome: Outcome, elapsed: Duration) -> Self {
		Self { outcome, elapsed }
	}
}
