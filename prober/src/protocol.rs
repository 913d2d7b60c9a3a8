/// Immutable per-protocol descriptor: port, whether a channel is reused across steps, and
/// whether the channel is TLS-wrapped. EPP is persistent and always TLS; WebWHOIS is
/// transient, with HTTPS used initially or after a redirect switches the scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
	Epp,
	Http,
	Https,
}

impl Protocol {
	pub fn name(&self) -> &'static str {
		match self {
			Protocol::Epp => "epp",
			Protocol::Http => "http",
			Protocol::Https => "https",
		}
	}

	/// Whether consecutive steps of a sequence must share a single channel.
	pub fn persistent_connection(&self) -> bool {
		matches!(self, Protocol::Epp)
	}

	pub fn uses_tls(&self) -> bool {
		matches!(self, Protocol::Epp | Protocol::Https)
	}
}

impl std::fmt::Display for Protocol {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}
