use std::{error::Error as StdError, sync::Arc, time::Duration};

use async_trait::async_trait;
use http::{uri::Scheme, Uri};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{pem::PemObject, CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use tokio::sync::OnceCell;
use tonic::transport::{Channel, Endpoint};
use tower::{service_fn, Service};
use tracing::debug;

use super::{Transport, TransportError};
use crate::config::{ClientConfig, CredentialSource, DEFAULT_CONNECT_TIMEOUT};
use crate::credentials::{load_macaroon, load_tls_certificate, ConfigError, MacaroonHex};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Authenticated TLS channel to a single LND node.
///
/// The node's certificate is the only trust anchor: the server must present exactly that
/// certificate, or a chain that validates against it as a root. LND's self-signed `tls.cert`
/// carries `CA:TRUE`, which stock webpki rejects as an end-entity certificate, hence the pinned
/// comparison before falling back to path validation.
///
/// Certificate and macaroon are read on first use and cached for the life of the transport;
/// read failures are returned as [`ConfigError`] and retried on the next call.
pub struct DirectGrpc {
    addr: String,
    tls_cert: CredentialSource,
    macaroon: CredentialSource,
    connect_timeout: Duration,
    channel: OnceCell<Channel>,
    macaroon_hex: OnceCell<MacaroonHex>,
}

impl DirectGrpc {
    #[must_use]
    pub fn new(addr: String, tls_cert: CredentialSource, macaroon: CredentialSource) -> Self {
        Self {
            addr,
            tls_cert,
            macaroon,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            channel: OnceCell::new(),
            macaroon_hex: OnceCell::new(),
        }
    }

    /// Build the transport described by `config` without touching the filesystem or network.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.endpoint(),
            config.tls_cert_source(),
            config.macaroon_source(),
        )
        .connect_timeout(config.connect_timeout)
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn build_channel(&self) -> Result<Channel, TransportError> {
        let pem = load_tls_certificate(&self.tls_cert).await?;
        let verifier = PinnedCertVerifier::from_pem(&pem)?;

        // tonic dials the connector with an http:// URI; the connector upgrades it to TLS.
        let original_uri: Uri = self.addr.parse().map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: self.addr.clone(),
            source: Box::new(e),
        })?;
        let mut http_parts = original_uri.into_parts();
        http_parts.scheme = Some(Scheme::HTTP);
        let http_uri = Uri::from_parts(http_parts)
            .map_err(|e| TransportError::connection("invalid http URI", e))?;

        let ep = Endpoint::from_shared(http_uri.to_string())
            .map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: self.addr.clone(),
                source: Box::new(e),
            })?
            .connect_timeout(self.connect_timeout);

        let connector = self.build_https_connector(verifier)?;
        let svc = service_fn(move |uri: Uri| {
            let mut inner = connector.clone();
            async move {
                let mut parts = uri.into_parts();
                parts.scheme = Some(Scheme::HTTPS);
                let https_target_uri =
                    Uri::from_parts(parts).map_err(|e| -> BoxError { BoxError::from(e) })?;
                inner
                    .call(https_target_uri)
                    .await
                    .map_err(|e| -> BoxError { BoxError::from(e) })
            }
        });

        debug!(target: "lnd_rpc_client::direct", addr = %self.addr, "authenticated channel configured");
        Ok(ep.connect_with_connector_lazy(svc))
    }

    fn build_https_connector(
        &self,
        verifier: PinnedCertVerifier,
    ) -> Result<hyper_rustls::HttpsConnector<HttpConnector>, TransportError> {
        let verifier: Arc<dyn ServerCertVerifier> = Arc::new(verifier);
        let tls_config = rustls::ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::connection("unsupported TLS crypto provider", e))?
            .dangerous()
            .with_custom_certificate_verifier(verifier)
            .with_no_client_auth();

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(self.connect_timeout));

        Ok(HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_only()
            .enable_http2()
            .wrap_connector(http))
    }
}

#[async_trait]
impl Transport for DirectGrpc {
    type Svc = Channel;

    async fn service(&self) -> Result<Self::Svc, TransportError> {
        let channel = self
            .channel
            .get_or_try_init(|| self.build_channel())
            .await?;
        Ok(channel.clone())
    }

    async fn metadata(&self) -> Result<Vec<(String, String)>, TransportError> {
        let macaroon = self
            .macaroon_hex
            .get_or_try_init(|| load_macaroon(&self.macaroon))
            .await?;
        Ok(vec![("macaroon".to_string(), macaroon.as_str().to_string())])
    }
}

fn crypto_provider() -> Arc<CryptoProvider> {
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Accepts the configured certificate byte-for-byte, otherwise validates the presented chain with
/// the configured certificates as the only roots.
#[derive(Debug)]
struct PinnedCertVerifier {
    pinned: Vec<CertificateDer<'static>>,
    fallback: Option<Arc<WebPkiServerVerifier>>,
    provider: Arc<CryptoProvider>,
}

impl PinnedCertVerifier {
    fn from_pem(pem: &[u8]) -> Result<Self, ConfigError> {
        let pinned: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(pem)
            .filter_map(Result::ok)
            .collect();
        if pinned.is_empty() {
            return Err(ConfigError::InvalidCertificate {
                origin: "TLS certificate".to_string(),
            });
        }

        let provider = crypto_provider();
        let mut roots = RootCertStore::empty();
        let (added, _ignored) = roots.add_parsable_certificates(pinned.iter().cloned());
        let fallback = if added > 0 {
            WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
                .build()
                .ok()
        } else {
            None
        };

        Ok(Self {
            pinned,
            fallback,
            provider,
        })
    }
}

impl ServerCertVerifier for PinnedCertVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if self
            .pinned
            .iter()
            .any(|cert| cert.as_ref() == end_entity.as_ref())
        {
            return Ok(ServerCertVerified::assertion());
        }
        match &self.fallback {
            Some(webpki) => webpki.verify_server_cert(
                end_entity,
                intermediates,
                server_name,
                ocsp_response,
                now,
            ),
            None => Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::UnknownIssuer,
            )),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_in(dir: &std::path::Path) -> ClientConfig {
        ClientConfig {
            lnd_dir: dir.to_path_buf(),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn missing_certificate_is_a_config_error_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let transport = DirectGrpc::from_config(&config_in(dir.path()));
        assert_eq!(transport.addr(), "https://localhost:10009");

        let err = transport.service().await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Config(ConfigError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn macaroon_metadata_is_loaded_once_and_hex_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let mac_path = config.macaroon_path();
        std::fs::create_dir_all(mac_path.parent().unwrap()).unwrap();
        std::fs::File::create(&mac_path)
            .unwrap()
            .write_all(&[0x02, 0x01, 0x03])
            .unwrap();

        let transport = DirectGrpc::from_config(&config);
        let md = transport.metadata().await.unwrap();
        assert_eq!(md, vec![("macaroon".to_string(), "020103".to_string())]);

        // Cached: removing the file afterwards does not affect later calls.
        std::fs::remove_file(&mac_path).unwrap();
        assert_eq!(transport.metadata().await.unwrap(), md);
    }

    #[test]
    fn non_pem_certificate_is_rejected() {
        let err = PinnedCertVerifier::from_pem(b"not a certificate").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCertificate { .. }));
    }
}
