use rand::Rng;
use rand::distr::Alphanumeric;

/// Produces a domain label for EPP identity-bearing requests (CREATE/CHECK/DELETE).
///
/// Abstracted as a trait object collaborator (per the core's "out of scope" boundary) so test
/// sequences can inject deterministic labels instead of the random generator below.
pub trait DomainNameGenerator: Send + Sync {
	fn generate(&self, tld: &str) -> String;
}

#[derive(Debug, Default)]
pub struct RandomDomainNameGenerator;

impl DomainNameGenerator for RandomDomainNameGenerator {
	fn generate(&self, tld: &str) -> String {
		let label: String = rand::rng()
			.sample_iter(&Alphanumeric)
			.take(16)
			.map(char::from)
			.map(|c| c.to_ascii_lowercase())
			.collect();
		format!("probe-{label}.{tld}")
	}
}

#[cfg(test)]
#[derive(Debug)]
pub struct FixedDomainNameGenerator(pub String);

#[cfg(test)]
impl DomainNameGenerator for FixedDomainNameGenerator {
	fn generate(&self, _tld: &str) -> String {
		self.0.clone()
	}
}
