use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Fully resolved, validated configuration for a prober process.
#[derive(Debug, Clone)]
pub struct Config {
	pub epp: Option<EppConfig>,
	pub webwhois: Option<WebWhoisConfig>,
	pub tls: TlsConfig,
	pub sequence_interval: Duration,
	pub step_duration: Duration,
	pub redirect_max_chain: u32,
}

#[derive(Debug, Clone)]
pub struct EppConfig {
	pub host: String,
	pub port: u16,
	pub tld: String,
	pub user_id: String,
	pub password: String,
}

#[derive(Debug, Clone)]
pub struct WebWhoisConfig {
	pub http_host: String,
	pub https_host: String,
	pub http_port: u16,
	pub https_port: u16,
	pub path: String,
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
	pub trust_store: Option<PathBuf>,
	pub client_cert: Option<PathBuf>,
	pub client_key: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawConfig {
	epp: RawEpp,
	webwhois: RawWebWhois,
	tls: RawTls,
	sequence: RawSequence,
	step: RawStep,
	redirect: RawRedirect,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawEpp {
	host: Option<String>,
	port: Option<u16>,
	tld: Option<String>,
	user_id: Option<String>,
	password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawWebWhois {
	http_host: Option<String>,
	https_host: Option<String>,
	http_port: Option<u16>,
	https_port: Option<u16>,
	path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawTls {
	trust_store: Option<PathBuf>,
	client_cert: Option<PathBuf>,
	client_key: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawSequence {
	interval: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawStep {
	duration: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct RawRedirect {
	max_chain: Option<u32>,
}

const DEFAULT_EPP_PORT: u16 = 700;
const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HTTPS_PORT: u16 = 443;
const DEFAULT_SEQUENCE_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_STEP_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_REDIRECT_MAX_CHAIN: u32 = 3;

/// Loads configuration from a TOML file's contents, then overlays environment variables
/// following the `SECTION_FIELD` convention (e.g. `EPP_USERID` overrides `epp.user_id`).
/// Missing required fields produce a descriptive error, never a panic.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
	let raw: RawConfig = toml::from_str(contents)?;

	let epp = parse_epp(raw.epp)?;
	let webwhois = parse_webwhois(raw.webwhois)?;
	if epp.is_none() && webwhois.is_none() {
		anyhow::bail!("at least one sequence must be configured: add an [epp] or [webwhois] section");
	}

	let tls = TlsConfig {
		trust_store: parse::<PathBuf>("TLS_TRUSTSTORE")?.or(raw.tls.trust_store),
		client_cert: parse::<PathBuf>("TLS_CLIENTCERT")?.or(raw.tls.client_cert),
		client_key: parse::<PathBuf>("TLS_CLIENTKEY")?.or(raw.tls.client_key),
	};
	if tls.client_cert.is_some() != tls.client_key.is_some() {
		anyhow::bail!("tls.client_cert and tls.client_key must be configured together");
	}

	let sequence_interval = parse_duration("SEQUENCE_INTERVAL")?
		.or(raw.sequence.interval.map(|s| parse_duration_str("sequence.interval", &s)).transpose()?)
		.unwrap_or(DEFAULT_SEQUENCE_INTERVAL);
	let step_duration = parse_duration("STEP_DURATION")?
		.or(raw.step.duration.map(|s| parse_duration_str("step.duration", &s)).transpose()?)
		.unwrap_or(DEFAULT_STEP_DURATION);
	let redirect_max_chain = parse::<u32>("REDIRECT_MAXCHAIN")?
		.or(raw.redirect.max_chain)
		.unwrap_or(DEFAULT_REDIRECT_MAX_CHAIN);

	Ok(Config {
		epp,
		webwhois,
		tls,
		sequence_interval,
		step_duration,
		redirect_max_chain,
	})
}

fn parse_epp(raw: RawEpp) -> anyhow::Result<Option<EppConfig>> {
	let host = parse::<String>("EPP_HOST")?.or(raw.host);
	let tld = parse::<String>("EPP_TLD")?.or(raw.tld);
	let user_id = parse::<String>("EPP_USERID")?.or(raw.user_id);
	let password = parse::<String>("EPP_PASSWORD")?.or(raw.password);
	let port = parse::<u16>("EPP_PORT")?.or(raw.port).unwrap_or(DEFAULT_EPP_PORT);

	if host.is_none() && tld.is_none() && user_id.is_none() && password.is_none() {
		return Ok(None);
	}
	Ok(Some(EppConfig {
		host: host.ok_or_else(|| anyhow::anyhow!("epp.host is required"))?,
		port,
		tld: tld.ok_or_else(|| anyhow::anyhow!("epp.tld is required"))?,
		user_id: user_id.ok_or_else(|| anyhow::anyhow!("epp.user_id is required"))?,
		password: password.ok_or_else(|| anyhow::anyhow!("epp.password is required"))?,
	}))
}

fn parse_webwhois(raw: RawWebWhois) -> anyhow::Result<Option<WebWhoisConfig>> {
	let http_host = parse::<String>("WEBWHOIS_HTTPHOST")?.or(raw.http_host);
	let https_host = parse::<String>("WEBWHOIS_HTTPSHOST")?.or(raw.https_host);
	let path = parse::<String>("WEBWHOIS_PATH")?.or(raw.path);
	let http_port = parse::<u16>("WEBWHOIS_HTTPPORT")?.or(raw.http_port).unwrap_or(DEFAULT_HTTP_PORT);
	let https_port = parse::<u16>("WEBWHOIS_HTTPSPORT")?
		.or(raw.https_port)
		.unwrap_or(DEFAULT_HTTPS_PORT);

	if http_host.is_none() && https_host.is_none() && path.is_none() {
		return Ok(None);
	}
	Ok(Some(WebWhoisConfig {
		http_host: http_host.ok_or_else(|| anyhow::anyhow!("webwhois.http_host is required"))?,
		https_host: https_host.ok_or_else(|| anyhow::anyhow!("webwhois.https_host is required"))?,
		http_port,
		https_port,
		path: path.ok_or_else(|| anyhow::anyhow!("webwhois.path is required"))?,
	}))
}

fn parse<T: FromStr>(env: &str) -> anyhow::Result<Option<T>>
where
	<T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
	match env::var(env) {
		Ok(val) => val
			.parse()
			.map(Some)
			.map_err(|e| anyhow::anyhow!("invalid env var {env}={val} ({e})")),
		Err(_) => Ok(None),
	}
}

fn parse_duration(env: &str) -> anyhow::Result<Option<Duration>> {
	parse::<String>(env)?.map(|s| parse_duration_str(env, &s)).transpose()
}

fn parse_duration_str(context: &str, s: &str) -> anyhow::Result<Duration> {
	duration_str::parse_std(s).map_err(|e| anyhow::anyhow!("invalid duration for {context}={s} ({e})"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn requires_at_least_one_sequence() {
		let err = parse_config("").unwrap_err();
		assert!(err.to_string().contains("at least one sequence"));
	}

	#[test]
	fn parses_a_minimal_epp_config() {
		let toml = r#"
[epp]
host = "epp.example.com"
tld = "example"
user_id = "probe"
password = "secret"
"#;
		let cfg = parse_config(toml).unwrap();
		let epp = cfg.epp.unwrap();
		assert_eq!(epp.host, "epp.example.com");
		assert_eq!(epp.port, DEFAULT_EPP_PORT);
		assert_eq!(cfg.sequence_interval, DEFAULT_SEQUENCE_INTERVAL);
	}

	#[test]
	fn rejects_a_partial_epp_config() {
		let toml = r#"
[epp]
host = "epp.example.com"
"#;
		let err = parse_config(toml).unwrap_err();
		assert!(err.to_string().contains("epp.tld"));
	}

	#[test]
	fn env_overrides_file() {
		// SAFETY: test-only, single-threaded access to this specific var.
		unsafe { env::set_var("EPP_USERID", "from-env") };
		let toml = r#"
[epp]
host = "epp.example.com"
tld = "example"
user_id = "from-file"
password = "secret"
"#;
		let cfg = parse_config(toml).unwrap();
		assert_eq!(cfg.epp.unwrap().user_id, "from-env");
		unsafe { env::remove_var("EPP_USERID") };
	}
}
