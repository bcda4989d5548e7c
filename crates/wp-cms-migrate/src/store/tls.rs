//! TLS for the CMS database connection.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{info, warn};

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};

/// Connector for the target's `ssl_mode`, or `None` for a plain connection.
///
/// `verify-ca` and `verify-full` both check the chain and the hostname,
/// against `ssl_root_cert` when set and the public web roots otherwise.
pub fn connector(target: &TargetConfig) -> Result<Option<MakeRustlsConnect>> {
    let provider = crypto_provider();
    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|e| MigrateError::Config(format!("TLS setup failed: {}", e)))?;

    let config = match target.ssl_mode.to_lowercase().as_str() {
        "disable" | "" => return Ok(None),
        "require" => {
            warn!(
                "ssl_mode=require encrypts the connection to {} without checking its \
                 certificate",
                target.host
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(EncryptOnly(provider)))
                .with_no_client_auth()
        }
        "verify-ca" | "verify-full" => builder
            .with_root_certificates(trusted_roots(target.ssl_root_cert.as_deref())?)
            .with_no_client_auth(),
        other => {
            return Err(MigrateError::Config(format!(
                "target.ssl_mode '{}' is not one of disable, require, verify-ca, verify-full",
                other
            )))
        }
    };

    Ok(Some(MakeRustlsConnect::new(config)))
}

fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

fn trusted_roots(ca_file: Option<&Path>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    let Some(path) = ca_file else {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(roots);
    };

    let file = File::open(path).map_err(|e| {
        MigrateError::Config(format!("Cannot open target.ssl_root_cert {:?}: {}", path, e))
    })?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::io::Result<_>>()
        .map_err(|e| {
            MigrateError::Config(format!("Cannot parse target.ssl_root_cert {:?}: {}", path, e))
        })?;

    let (added, ignored) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(MigrateError::Config(format!(
            "target.ssl_root_cert {:?} holds no usable CA certificate",
            path
        )));
    }
    if ignored > 0 {
        warn!("{:?}: {} certificates could not be parsed", path, ignored);
    }
    info!("Trusting {} CA certificates from {:?}", added, path);
    Ok(roots)
}

/// `ssl_mode=require`: any certificate is accepted, but the handshake
/// signatures are still checked against it.
#[derive(Debug)]
struct EncryptOnly(Arc<CryptoProvider>);

impl ServerCertVerifier for EncryptOnly {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn target(ssl_mode: &str) -> TargetConfig {
        let yaml = format!(
            "host: db.internal\ndatabase: cms\nuser: cms\nssl_mode: {}\n",
            ssl_mode
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn test_disable_is_plain() {
        assert!(connector(&target("disable")).unwrap().is_none());
        assert!(connector(&target("''")).unwrap().is_none());
    }

    #[test]
    fn test_tls_modes_build_a_connector() {
        assert!(connector(&target("require")).unwrap().is_some());
        assert!(connector(&target("VERIFY-FULL")).unwrap().is_some());
        assert!(connector(&target("verify-ca")).unwrap().is_some());
    }

    #[test]
    fn test_unknown_mode_is_config_error() {
        let err = connector(&target("prefer")).err().unwrap();
        assert!(matches!(err, MigrateError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_root_cert_file() {
        let mut config = target("verify-full");
        config.ssl_root_cert = Some("/nonexistent/cms-ca.pem".into());
        let err = connector(&config).err().unwrap();
        assert!(err.to_string().contains("cms-ca.pem"));
    }

    #[test]
    fn test_root_cert_file_without_certificates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let mut config = target("verify-ca");
        config.ssl_root_cert = Some(file.path().to_path_buf());
        let err = connector(&config).err().unwrap();
        assert!(err.to_string().contains("no usable CA certificate"));
    }
}
