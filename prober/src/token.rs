use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::DomainNameGenerator;
use crate::epp::connection::EppConnection;

/// HTTP vs HTTPS, tracked on a WebWHOIS token so a redirect to an `https://` location can
/// switch the sequence's next step to the TLS-wrapped channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheme {
	Http,
	Https,
}

/// Per-attempt mutable context threaded through a sequence's steps.
///
/// EPP sequences use a *persistent* token: one instance lives for the sequence's lifetime and
/// carries the live EPP channel between steps. WebWHOIS sequences use a *transient*
/// token: a fresh instance is created at the start of every iteration; it never carries a
/// channel (each WebWHOIS step opens and closes its own), but still carries the
/// redirect-following `host`/`scheme` for that one iteration.
pub struct Token {
	epp_channel: Option<EppConnection>,
	host: String,
	scheme: Scheme,
	domain_name: Option<String>,
	trid_counter: AtomicU64,
	trid_prefix: String,
}

impl Token {
	pub fn new(initial_host: impl Into<String>, scheme: Scheme) -> Self {
		Self {
			epp_channel: None,
			host: initial_host.into(),
			scheme,
			domain_name: None,
			trid_counter: AtomicU64::new(0),
			trid_prefix: format!("probe-{}", std::process::id()),
		}
	}

	/// Generates a fresh domain label for this attempt. Transient sequences call this once
	/// per iteration; persistent EPP sequences call it once at process start.
	pub fn new_attempt_identity(&mut self, tld: &str, generator: &dyn DomainNameGenerator) {
		self.domain_name = Some(generator.generate(tld));
	}

	pub fn domain_name(&self) -> Option<&str> {
		self.domain_name.as_deref()
	}

	/// A fresh `clientTransactionId` for every outbound EPP request.
	pub fn next_client_transaction_id(&self) -> String {
		let n = self.trid_counter.fetch_add(1, Ordering::Relaxed);
		format!("{}-{n}", self.trid_prefix)
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn set_host(&mut self, host: impl Into<String>) {
		self.host = host.into();
	}

	pub fn scheme(&self) -> Scheme {
		self.scheme
	}

	pub fn set_scheme(&mut self, scheme: Scheme) {
		self.scheme = scheme;
	}

	pub fn epp_channel(&mut self) -> Option<&mut EppConnection> {
		self.epp_channel.as_mut()
	}

	pub fn set_epp_channel(&mut self, channel: EppConnection) {
		self.epp_channel = Some(channel);
	}

	pub fn close_epp_channel(&mut self) {
		self.epp_channel = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::domain::FixedDomainNameGenerator;

	#[test]
	fn transaction_ids_are_distinct() {
		let token = Token::new("example.com", Scheme::Http);
		let a = token.next_client_transaction_id();
		let b = token.next_client_transaction_id();
		assert_ne!(a, b);
	}

	#[test]
	fn new_attempt_identity_uses_the_generator() {
		let mut token = Token::new("example.com", Scheme::Http);
		let generator = FixedDomainNameGenerator("fixed.test".to_string());
		token.new_attempt_identity("test", &generator);
		assert_eq!(token.domain_name(), Some("fixed.test"));
	}
}
