use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rustls::ClientConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::config::TlsConfig;

/// Builds the TLS client configuration EPP channels (and HTTPS WebWHOIS channels) are
/// opened with: trust store plus an optional client certificate/key for EPP mutual-TLS.
pub fn build_client_config(cfg: &TlsConfig) -> anyhow::Result<Arc<ClientConfig>> {
	let mut roots = rustls::RootCertStore::empty();
	if let Some(path) = &cfg.trust_store {
		let certs = load_certs(path)?;
		roots.add_parsable_certificates(certs);
	} else {
		let native = rustls_native_certs::load_native_certs();
		for err in &native.errors {
			tracing::warn!(%err, "failed to load a native root certificate");
		}
		for cert in native.certs {
			roots.add(cert)?;
		}
	}

	let builder = ClientConfig::builder().with_root_certificates(roots);

	let mut client_config = match (&cfg.client_cert, &cfg.client_key) {
		(Some(cert_path), Some(key_path)) => {
			let cert_chain = load_certs(cert_path)?;
			let key = load_key(key_path)?;
			builder.with_client_auth_cert(cert_chain, key)?
		},
		(None, None) => builder.with_no_client_auth(),
		_ => anyhow::bail!("tls.client_cert and tls.client_key must be configured together"),
	};
	client_config.alpn_protocols = vec![b"http/1.1".to_vec()];
	Ok(Arc::new(client_config))
}

fn load_certs(path: &Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
	let pem = std::fs::read(path)?;
	rustls_pemfile::certs(&mut Cursor::new(pem))
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| anyhow::anyhow!("parsing certificates from {}: {e}", path.display()))
}

fn load_key(path: &Path) -> anyhow::Result<PrivateKeyDer<'static>> {
	let pem = std::fs::read(path)?;
	rustls_pemfile::private_key(&mut Cursor::new(pem))?
		.ok_or_else(|| anyhow::anyhow!("no private key found in {}", path.display()))
}
