use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::ProbeError;

/// One of the six request shapes an EPP probing step can send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestTemplate {
	Hello,
	Login,
	Logout,
	Check,
	Create,
	Delete,
}

/// The response shape a step expects; matching yields success, non-matching a failure kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedResponse {
	Greeting,
	SimpleSuccess,
	Failure,
	DomainExists,
	DomainNotExists,
}

/// A probe's EPP message template: a request shape plus the response it must produce to
/// count as a success. `Check` is bound to `DomainExists` or `DomainNotExists` depending on
/// where it sits in the sequence (see the `checkExists`/`checkNotExists` steps of scenario 3).
#[derive(Clone, Copy, Debug)]
pub struct EppMessageTemplate {
	pub request: RequestTemplate,
	pub expected: ExpectedResponse,
}

impl EppMessageTemplate {
	pub fn hello() -> Self {
		Self {
			request: RequestTemplate::Hello,
			expected: ExpectedResponse::Greeting,
		}
	}

	pub fn login() -> Self {
		Self {
			request: RequestTemplate::Login,
			expected: ExpectedResponse::SimpleSuccess,
		}
	}

	pub fn logout() -> Self {
		Self {
			request: RequestTemplate::Logout,
			expected: ExpectedResponse::SimpleSuccess,
		}
	}

	pub fn check(expected: ExpectedResponse) -> Self {
		Self {
			request: RequestTemplate::Check,
			expected,
		}
	}

	pub fn create() -> Self {
		Self {
			request: RequestTemplate::Create,
			expected: ExpectedResponse::SimpleSuccess,
		}
	}

	pub fn delete() -> Self {
		Self {
			request: RequestTemplate::Delete,
			expected: ExpectedResponse::SimpleSuccess,
		}
	}

	pub fn is_hello(&self) -> bool {
		matches!(self.request, RequestTemplate::Hello)
	}

	/// Materialises the outbound XML bytes, substituting the token-supplied `cl_trid`,
	/// `domain`, and (for LOGIN) credentials into the template.
	pub fn bind(&self, cl_trid: &str, domain: Option<&str>, credentials: Option<(&str, &str)>) -> EppRequest {
		let bytes = match self.request {
			RequestTemplate::Hello => HELLO_XML.to_string(),
			RequestTemplate::Login => {
				let (user_id, password) = credentials.expect("LOGIN requires epp credentials");
				login_xml(cl_trid, user_id, password)
			},
			RequestTemplate::Logout => logout_xml(cl_trid),
			RequestTemplate::Check => check_xml(cl_trid, domain.expect("CHECK requires a domain")),
			RequestTemplate::Create => create_xml(cl_trid, domain.expect("CREATE requires a domain")),
			RequestTemplate::Delete => delete_xml(cl_trid, domain.expect("DELETE requires a domain")),
		}
		.into_bytes();
		EppRequest {
			cl_trid: cl_trid.to_string(),
			bytes,
		}
	}
}

pub struct EppRequest {
	pub cl_trid: String,
	pub bytes: Vec<u8>,
}

const HELLO_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><hello/></epp>"#;

fn login_xml(cl_trid: &str, user_id: &str, password: &str) -> String {
	format!(
		r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><command><login><clID>{user_id}</clID><pw>{password}</pw><options><version>1.0</version><lang>en</lang></options><svcs><objURI>urn:ietf:params:xml:ns:domain-1.0</objURI></svcs></login><clTRID>{cl_trid}</clTRID></command></epp>"#
	)
}

fn logout_xml(cl_trid: &str) -> String {
	format!(
		r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><command><logout/><clTRID>{cl_trid}</clTRID></command></epp>"#
	)
}

fn check_xml(cl_trid: &str, domain: &str) -> String {
	format!(
		r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><command><check><domain:check xmlns:domain="urn:ietf:params:xml:ns:domain-1.0"><domain:name>{domain}</domain:name></domain:check></check><clTRID>{cl_trid}</clTRID></command></epp>"#
	)
}

fn create_xml(cl_trid: &str, domain: &str) -> String {
	format!(
		r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><command><create><domain:create xmlns:domain="urn:ietf:params:xml:ns:domain-1.0"><domain:name>{domain}</domain:name></domain:create></create><clTRID>{cl_trid}</clTRID></command></epp>"#
	)
}

fn delete_xml(cl_trid: &str, domain: &str) -> String {
	format!(
		r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><command><delete><domain:delete xmlns:domain="urn:ietf:params:xml:ns:domain-1.0"><domain:name>{domain}</domain:name></domain:delete></delete><clTRID>{cl_trid}</clTRID></command></epp>"#
	)
}

/// The handful of fields our probe cares about, extracted from a parsed EPP response
/// document: `epp`, `greeting`, `response > result[code]`, `response > trID >
/// clTRID|svTRID`, and `response > resData > chkData > cd > name[avail]`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EppResponse {
	pub is_greeting: bool,
	pub code: Option<u16>,
	pub cl_trid: Option<String>,
	pub sv_trid: Option<String>,
	pub avail: Option<bool>,
}

pub fn parse_response(bytes: &[u8]) -> Result<EppResponse, ProbeError> {
	let mut reader = Reader::from_reader(bytes);
	reader.config_mut().trim_text(true);
	let mut buf = Vec::new();
	let mut out = EppResponse::default();
	let mut path: Vec<String> = Vec::new();

	loop {
		let event = reader
			.read_event_into(&mut buf)
			.map_err(|e| ProbeError::Decode(e.to_string()))?;
		match event {
			Event::Eof => break,
			Event::Start(start) => {
				let name = local_name(start.name().local_name().as_ref());
				apply_start_tag(&mut out, &name, &start, path.last());
				path.push(name);
			},
			// A self-closing tag (`<result code="1000"/>`) never produces a `Start`/`End`
			// pair, only this one event, so its attributes must be read here too.
			Event::Empty(start) => {
				let name = local_name(start.name().local_name().as_ref());
				apply_start_tag(&mut out, &name, &start, path.last());
			},
			Event::Text(text) => {
				let value = text.unescape().map_err(|e| ProbeError::Decode(e.to_string()))?.into_owned();
				match path.last().map(String::as_str) {
					Some("clTRID") => out.cl_trid = Some(value),
					Some("svTRID") => out.sv_trid = Some(value),
					_ => {},
				}
			},
			Event::End(_) => {
				path.pop();
			},
			_ => {},
		}
		buf.clear();
	}
	Ok(out)
}

fn local_name(raw: &[u8]) -> String {
	String::from_utf8_lossy(raw).into_owned()
}

/// Shared by `Start` and `Empty` events: records the handful of attributes this parser cares
/// about regardless of whether the element self-closes.
fn apply_start_tag(out: &mut EppResponse, name: &str, start: &quick_xml::events::BytesStart, parent: Option<&String>) {
	if name == "greeting" {
		out.is_greeting = true;
	}
	if name == "result" {
		for attr in start.attributes().flatten() {
			if attr.key.local_name().as_ref() == b"code" {
				out.code = std::str::from_utf8(&attr.value).ok().and_then(|s| s.parse().ok());
			}
		}
	}
	if name == "name" && parent.map(String::as_str) == Some("cd") {
		for attr in start.attributes().flatten() {
			if attr.key.local_name().as_ref() == b"avail" {
				out.avail = std::str::from_utf8(&attr.value).ok().map(|s| s == "true");
			}
		}
	}
}

/// Checks a response against a step's expected variant, per the predicates of RFC 5730/5731.
pub fn evaluate(expected: ExpectedResponse, resp: &EppResponse, request_cl_trid: &str) -> Result<(), ProbeError> {
	match expected {
		ExpectedResponse::Greeting => {
			if resp.is_greeting {
				Ok(())
			} else {
				Err(ProbeError::UnexpectedResponse("expected a greeting".to_string()))
			}
		},
		ExpectedResponse::SimpleSuccess => {
			check_cl_trid(resp, request_cl_trid)?;
			match resp.code {
				Some(1000) => Ok(()),
				Some(code) => Err(ProbeError::UnexpectedResponse(format!(
					"result code {code}, expected 1000"
				))),
				None => Err(ProbeError::Protocol("response carried no result code".to_string())),
			}
		},
		ExpectedResponse::Failure => {
			check_cl_trid(resp, request_cl_trid)?;
			match resp.code {
				Some(code) if code >= 2000 => Ok(()),
				Some(code) => Err(ProbeError::UnexpectedResponse(format!(
					"result code {code}, expected >= 2000"
				))),
				None => Err(ProbeError::Protocol("response carried no result code".to_string())),
			}
		},
		ExpectedResponse::DomainExists => {
			check_cl_trid(resp, request_cl_trid)?;
			match resp.avail {
				Some(false) => Ok(()),
				Some(true) => Err(ProbeError::UnexpectedResponse(
					"domain reported available, expected it to exist".to_string(),
				)),
				None => Err(ProbeError::Protocol(
					"check response carried no avail attribute".to_string(),
				)),
			}
		},
		ExpectedResponse::DomainNotExists => {
			check_cl_trid(resp, request_cl_trid)?;
			match resp.avail {
				Some(true) => Ok(()),
				Some(false) => Err(ProbeError::UnexpectedResponse(
					"domain reported existing, expected it to be available".to_string(),
				)),
				None => Err(ProbeError::Protocol(
					"check response carried no avail attribute".to_string(),
				)),
			}
		},
	}
}

fn check_cl_trid(resp: &EppResponse, request_cl_trid: &str) -> Result<(), ProbeError> {
	match &resp.cl_trid {
		Some(cl_trid) if cl_trid == request_cl_trid => Ok(()),
		Some(cl_trid) => Err(ProbeError::Protocol(format!(
			"clTRID mismatch: sent {request_cl_trid}, server echoed {cl_trid}"
		))),
		None => Err(ProbeError::Protocol("response carried no clTRID".to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_greeting() {
		let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><greeting><svID>test</svID></greeting></epp>"#;
		let resp = parse_response(xml).unwrap();
		assert!(resp.is_greeting);
	}

	#[test]
	fn parses_simple_success() {
		let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response><result code="1000"><msg>Command completed successfully</msg></result><trID><clTRID>abc-1</clTRID><svTRID>srv-1</svTRID></trID></response></epp>"#;
		let resp = parse_response(xml).unwrap();
		assert_eq!(resp.code, Some(1000));
		assert_eq!(resp.cl_trid.as_deref(), Some("abc-1"));
		assert_eq!(resp.sv_trid.as_deref(), Some("srv-1"));
		evaluate(ExpectedResponse::SimpleSuccess, &resp, "abc-1").unwrap();
	}

	#[test]
	fn parses_a_self_closing_result_tag() {
		let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response><result code="1000"/><trID><clTRID>abc-1</clTRID><svTRID>srv-1</svTRID></trID></response></epp>"#;
		let resp = parse_response(xml).unwrap();
		assert_eq!(resp.code, Some(1000));
		evaluate(ExpectedResponse::SimpleSuccess, &resp, "abc-1").unwrap();
	}

	#[test]
	fn cl_trid_mismatch_is_protocol_failure() {
		let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response><result code="1000"/><trID><clTRID>wrong</clTRID><svTRID>srv-1</svTRID></trID></response></epp>"#;
		let resp = parse_response(xml).unwrap();
		let err = evaluate(ExpectedResponse::SimpleSuccess, &resp, "abc-1").unwrap_err();
		assert!(matches!(err, ProbeError::Protocol(_)));
	}

	#[test]
	fn parses_check_avail() {
		let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response><result code="1000"/><resData><chkData><cd><name avail="false">example.com</name></cd></chkData></resData><trID><clTRID>c-1</clTRID><svTRID>s-1</svTRID></trID></response></epp>"#;
		let resp = parse_response(xml).unwrap();
		assert_eq!(resp.avail, Some(false));
		evaluate(ExpectedResponse::DomainExists, &resp, "c-1").unwrap();
		evaluate(ExpectedResponse::DomainNotExists, &resp, "c-1").unwrap_err();
	}

	#[test]
	fn check_cl_trid_mismatch_is_protocol_failure_even_with_matching_avail() {
		let xml = br#"<epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response><result code="1000"/><resData><chkData><cd><name avail="false">example.com</name></cd></chkData></resData><trID><clTRID>wrong</clTRID><svTRID>s-1</svTRID></trID></response></epp>"#;
		let resp = parse_response(xml).unwrap();
		let err = evaluate(ExpectedResponse::DomainExists, &resp, "c-1").unwrap_err();
		assert!(matches!(err, ProbeError::Protocol(_)));
		let err = evaluate(ExpectedResponse::DomainNotExists, &resp, "c-1").unwrap_err();
		assert!(matches!(err, ProbeError::Protocol(_)));
	}

	#[test]
	fn bind_is_idempotent_except_for_trid() {
		let template = EppMessageTemplate::check(ExpectedResponse::DomainExists);
		let a = template.bind("trid-1", Some("example.com"), None);
		let b = template.bind("trid-2", Some("example.com"), None);
		let a_norm = String::from_utf8(a.bytes).unwrap().replace("trid-1", "TRID");
		let b_norm = String::from_utf8(b.bytes).unwrap().replace("trid-2", "TRID");
		assert_eq!(a_norm, b_norm);
	}
}
