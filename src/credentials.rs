use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::config::CredentialSource;

const PEM_CERT_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Failure to resolve connection material. Raised on first use of the channel.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{origin} does not contain a PEM certificate")]
    InvalidCertificate { origin: String },
    #[error("invalid macaroon: {0}")]
    InvalidMacaroon(&'static str),
    #[error("invalid endpoint `{endpoint}`")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Lower-case hex macaroon as sent in the `macaroon` call metadata header.
///
/// `Debug` prints only the length so the token never lands in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct MacaroonHex(String);

impl MacaroonHex {
    /// Hex-encode a raw macaroon.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidMacaroon`] when `raw` is empty.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::InvalidMacaroon("macaroon is empty"));
        }
        Ok(Self(hex::encode(raw)))
    }

    /// Accept an already-encoded macaroon, normalizing it to lower case.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidMacaroon`] when `encoded` is empty or not valid hex.
    pub fn from_hex(encoded: &str) -> Result<Self, ConfigError> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidMacaroon("macaroon is empty"));
        }
        if hex::decode(trimmed).is_err() {
            return Err(ConfigError::InvalidMacaroon("macaroon is not valid hex"));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MacaroonHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacaroonHex(<{} chars>)", self.0.len())
    }
}

async fn read_source(path: &Path) -> Result<Vec<u8>, ConfigError> {
    tokio::fs::read(path).await.map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the node's TLS certificate as PEM bytes.
///
/// The file must be UTF-8 text containing at least one PEM certificate block.
///
/// # Errors
/// Returns [`ConfigError`] when the file cannot be read or does not look like a PEM certificate.
pub async fn load_tls_certificate(source: &CredentialSource) -> Result<Vec<u8>, ConfigError> {
    let (pem, origin) = match source {
        CredentialSource::Path(path) => (read_source(path).await?, path.display().to_string()),
        CredentialSource::Inline(bytes) => (bytes.clone(), "inline certificate".to_string()),
        CredentialSource::Hex(_) => {
            return Err(ConfigError::InvalidCertificate {
                origin: "hex credential source".to_string(),
            })
        }
    };
    let is_pem = std::str::from_utf8(&pem).is_ok_and(|text| text.contains(PEM_CERT_MARKER));
    if !is_pem {
        return Err(ConfigError::InvalidCertificate { origin });
    }
    debug!(target: "lnd_rpc_client::credentials", origin = %origin, len = pem.len(), "loaded TLS certificate");
    Ok(pem)
}

/// Load a macaroon and hex-encode it for transmission.
///
/// # Errors
/// Returns [`ConfigError`] when the file cannot be read or the material is empty or malformed.
pub async fn load_macaroon(source: &CredentialSource) -> Result<MacaroonHex, ConfigError> {
    let macaroon = match source {
        CredentialSource::Path(path) => MacaroonHex::from_bytes(&read_source(path).await?)?,
        CredentialSource::Inline(bytes) => MacaroonHex::from_bytes(bytes)?,
        CredentialSource::Hex(encoded) => MacaroonHex::from_hex(encoded)?,
    };
    debug!(target: "lnd_rpc_client::credentials", hex_len = macaroon.as_str().len(), "loaded macaroon");
    Ok(macaroon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----\n";

    #[tokio::test]
    async fn macaroon_file_is_hex_encoded_lowercase() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x02, 0x01, 0xAB, 0xFF]).unwrap();
        let mac = load_macaroon(&CredentialSource::Path(file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(mac.as_str(), "0201abff");
    }

    #[tokio::test]
    async fn missing_macaroon_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.macaroon");
        let err = load_macaroon(&CredentialSource::Path(path.clone()))
            .await
            .unwrap_err();
        match err {
            ConfigError::Read { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_macaroon_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_macaroon(&CredentialSource::Path(file.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMacaroon(_)));
    }

    #[tokio::test]
    async fn hex_macaroon_is_validated_and_normalized() {
        let mac = load_macaroon(&CredentialSource::Hex(" 0201ABFF\n".into()))
            .await
            .unwrap();
        assert_eq!(mac.as_str(), "0201abff");

        let err = load_macaroon(&CredentialSource::Hex("not-hex".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMacaroon(_)));
    }

    #[tokio::test]
    async fn certificate_must_be_pem_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PEM.as_bytes()).unwrap();
        let pem = load_tls_certificate(&CredentialSource::Path(file.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(pem, PEM.as_bytes());

        let err = load_tls_certificate(&CredentialSource::Inline(vec![0xff, 0xfe, 0x00]))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCertificate { .. }));
    }

    #[test]
    fn macaroon_debug_does_not_leak_token() {
        let mac = MacaroonHex::from_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(format!("{mac:?}"), "MacaroonHex(<6 chars>)");
    }
}
