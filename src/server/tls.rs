use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

use crate::config::Config;

type Identity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

/// Builds the TLS acceptor for `config`, negotiating `h2` over ALPN.
pub(crate) fn acceptor(config: &Config) -> crate::Result<TlsAcceptor> {
    let (certs, key) = match (&config.cert_file, &config.key_file) {
        (Some(cert), Some(key)) => load_certificates(cert, key)?,
        _ => {
            warn!(
                "no certificate configured, generating a self-signed one for {:?}",
                config.domain_name
            );
            generate_self_signed(&config.domain_name)?
        }
    };
    server_config(certs, key).map(|config| TlsAcceptor::from(Arc::new(config)))
}

fn server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> crate::Result<ServerConfig> {
    let mut config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(crate::Error::new_tls)?;
    config.alpn_protocols = vec![b"h2".to_vec()];
    Ok(config)
}

/// Load a PEM certificate chain and private key.
fn load_certificates(cert: &Path, key: &Path) -> crate::Result<Identity> {
    let cert_pem = fs::read(cert).map_err(crate::Error::new_tls)?;
    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(crate::Error::new_tls)?;
    if certs.is_empty() {
        return Err(crate::Error::new_tls(format!(
            "no certificate found in {}",
            cert.display()
        )));
    }

    let key_pem = fs::read(key).map_err(crate::Error::new_tls)?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(crate::Error::new_tls)?
        .ok_or_else(|| {
            crate::Error::new_tls(format!("no private key found in {}", key.display()))
        })?;

    info!("loaded {} certificate(s) from {}", certs.len(), cert.display());
    Ok((certs, key))
}

/// Generate a self-signed certificate for `domain`.
fn generate_self_signed(domain: &str) -> crate::Result<Identity> {
    let cert =
        rcgen::generate_simple_self_signed(vec![domain.to_owned()]).map_err(crate::Error::new_tls)?;
    let cert_der = cert.serialize_der().map_err(crate::Error::new_tls)?;
    let key_der = PrivatePkcs8KeyDer::from(cert.serialize_private_key_der());
    Ok((vec![CertificateDer::from(cert_der)], PrivateKeyDer::Pkcs8(key_der)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_signed_config_offers_h2() {
        let (certs, key) = generate_self_signed("localhost").unwrap();
        assert_eq!(certs.len(), 1);
        let config = server_config(certs, key).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec()]);
    }

    #[test]
    fn loads_pem_files() {
        let cert = rcgen::generate_simple_self_signed(vec!["bench.test".to_owned()]).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        fs::write(&cert_path, cert.serialize_pem().unwrap()).unwrap();
        fs::write(&key_path, cert.serialize_private_key_pem()).unwrap();

        let (certs, key) = load_certificates(&cert_path, &key_path).unwrap();
        assert_eq!(certs.len(), 1);
        assert!(server_config(certs, key).is_ok());
    }

    #[test]
    fn missing_key_is_tls_error() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("cert.pem");
        let key_path = dir.path().join("key.pem");
        let cert = rcgen::generate_simple_self_signed(vec!["bench.test".to_owned()]).unwrap();
        fs::write(&cert_path, cert.serialize_pem().unwrap()).unwrap();
        fs::write(&key_path, "").unwrap();

        let err = load_certificates(&cert_path, &key_path).unwrap_err();
        assert!(err.is_tls());
    }
}
