use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Default LND gRPC host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default LND gRPC port.
pub const DEFAULT_PORT: u16 = 10009;
/// Placeholder wallet password used by local test nodes. Supply a real one in any deployment.
pub const DEFAULT_WALLET_PASSWORD: &str = "test_password";
/// Deadline applied to unary calls unless overridden.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(60);
/// Bound on establishing the TCP + TLS connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Wait after a successful unlock before issuing further calls.
///
/// LND needs a moment to bring up the Lightning service once the wallet is unlocked.
pub const DEFAULT_UNLOCK_SETTLE_DELAY: Duration = Duration::from_secs(3);

const TLS_CERT_FILE: &str = "tls.cert";
const ADMIN_MACAROON_FILE: &str = "admin.macaroon";

/// Bitcoin network the node runs on. Names follow LND's `data/chain/bitcoin/<network>` layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Regtest,
}

impl Network {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Regtest => "regtest",
        }
    }

    /// Bech32 human-readable part of segwit addresses on this network.
    #[must_use]
    pub fn address_hrp(self) -> &'static str {
        match self {
            Self::Mainnet => "bc",
            Self::Testnet => "tb",
            Self::Regtest => "bcrt",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown network `{0}` (expected mainnet, testnet or regtest)")]
pub struct UnknownNetwork(String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "regtest" => Ok(Self::Regtest),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}

/// Where credential material comes from.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Read the file at this path on first use.
    Path(PathBuf),
    /// Raw bytes: PEM text for certificates, binary token for macaroons.
    Inline(Vec<u8>),
    /// An already hex-encoded macaroon.
    Hex(String),
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Inline(b) => write!(f, "Inline(<{} bytes>)", b.len()),
            Self::Hex(h) => write!(f, "Hex(<{} chars>)", h.len()),
        }
    }
}

impl From<PathBuf> for CredentialSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for CredentialSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Connection configuration owned by an [`crate::LndClient`].
///
/// Paths left unset are derived from `lnd_dir`:
/// `<lnd_dir>/tls.cert` and `<lnd_dir>/data/chain/bitcoin/<network>/admin.macaroon`.
///
/// The config is fixed once a client is built; use [`crate::LndClient::reconfigure`] to point at
/// another node.
///
/// # Examples
///
/// ```
/// use lnd_rpc_client::config::{ClientConfig, Network};
///
/// let config = ClientConfig {
///     host: "10.0.0.5".into(),
///     network: Network::Regtest,
///     lnd_dir: "/srv/lnd".into(),
///     ..ClientConfig::default()
/// };
/// assert_eq!(config.endpoint(), "https://10.0.0.5:10009");
/// assert_eq!(
///     config.macaroon_path(),
///     std::path::Path::new("/srv/lnd/data/chain/bitcoin/regtest/admin.macaroon")
/// );
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub network: Network,
    /// LND data directory used to derive credential paths.
    pub lnd_dir: PathBuf,
    /// Overrides the derived `tls.cert` path.
    pub tls_cert: Option<CredentialSource>,
    /// Overrides the derived `admin.macaroon` path.
    pub macaroon: Option<CredentialSource>,
    /// Password used by [`crate::LndClient::ensure_ready`]; `None` skips unlocking.
    pub wallet_password: Option<String>,
    /// Deadline for unary calls. `None` leaves calls unbounded.
    pub rpc_timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub unlock_settle_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            network: Network::default(),
            lnd_dir: default_lnd_dir(),
            tls_cert: None,
            macaroon: None,
            wallet_password: Some(DEFAULT_WALLET_PASSWORD.to_string()),
            rpc_timeout: Some(DEFAULT_RPC_TIMEOUT),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            unlock_settle_delay: DEFAULT_UNLOCK_SETTLE_DELAY,
        }
    }
}

impl ClientConfig {
    /// `https://<host>:<port>`.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("https://{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn tls_cert_path(&self) -> PathBuf {
        self.lnd_dir.join(TLS_CERT_FILE)
    }

    #[must_use]
    pub fn macaroon_path(&self) -> PathBuf {
        self.lnd_dir
            .join("data")
            .join("chain")
            .join("bitcoin")
            .join(self.network.as_str())
            .join(ADMIN_MACAROON_FILE)
    }

    /// Effective certificate source: the override, else the derived path.
    #[must_use]
    pub fn tls_cert_source(&self) -> CredentialSource {
        self.tls_cert
            .clone()
            .unwrap_or_else(|| CredentialSource::Path(self.tls_cert_path()))
    }

    /// Effective macaroon source: the override, else the derived path.
    #[must_use]
    pub fn macaroon_source(&self) -> CredentialSource {
        self.macaroon
            .clone()
            .unwrap_or_else(|| CredentialSource::Path(self.macaroon_path()))
    }
}

/// LND's default data directory for the current platform.
///
/// `<local data dir>/Lnd` on Windows and macOS, `~/.lnd` elsewhere. Falls back to a relative
/// `.lnd` when no home directory can be determined.
#[must_use]
pub fn default_lnd_dir() -> PathBuf {
    if cfg!(any(target_os = "windows", target_os = "macos")) {
        if let Some(dir) = dirs::data_local_dir() {
            return dir.join("Lnd");
        }
    } else if let Some(home) = dirs::home_dir() {
        return home.join(".lnd");
    }
    PathBuf::from(".lnd")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_a_local_testnet_node() {
        let config = ClientConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 10009);
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.wallet_password.as_deref(), Some("test_password"));
        assert_eq!(config.endpoint(), "https://localhost:10009");
        assert_eq!(config.rpc_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn credential_paths_follow_lnd_layout() {
        let config = ClientConfig {
            lnd_dir: PathBuf::from("/data/lnd"),
            network: Network::Mainnet,
            ..ClientConfig::default()
        };
        assert_eq!(config.tls_cert_path(), PathBuf::from("/data/lnd/tls.cert"));
        assert_eq!(
            config.macaroon_path(),
            PathBuf::from("/data/lnd/data/chain/bitcoin/mainnet/admin.macaroon")
        );
    }

    #[test]
    fn overrides_win_over_derived_paths() {
        let config = ClientConfig {
            lnd_dir: PathBuf::from("/data/lnd"),
            macaroon: Some(CredentialSource::Hex("0201".into())),
            tls_cert: Some(CredentialSource::Path("/etc/lnd/tls.pem".into())),
            ..ClientConfig::default()
        };
        assert_eq!(config.macaroon_source(), CredentialSource::Hex("0201".into()));
        assert_eq!(
            config.tls_cert_source(),
            CredentialSource::Path("/etc/lnd/tls.pem".into())
        );
    }

    #[test]
    fn network_parses_lnd_directory_names() {
        assert_eq!("regtest".parse::<Network>().unwrap(), Network::Regtest);
        assert_eq!("MAINNET".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("bitcoin".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("signet-ish".parse::<Network>().is_err());
        assert_eq!(Network::Testnet.to_string(), "testnet");
        assert_eq!(Network::Regtest.address_hrp(), "bcrt");
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"host":"node.lan","network":"regtest","lnd_dir":"/x"}"#)
                .unwrap();
        assert_eq!(config.host, "node.lan");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.tls_cert_path(), PathBuf::from("/x/tls.cert"));
    }

    #[test]
    fn inline_credentials_are_redacted_in_debug() {
        let source = CredentialSource::Inline(vec![0xde, 0xad, 0xbe, 0xef]);
        let rendered = format!("{source:?}");
        assert_eq!(rendered, "Inline(<4 bytes>)");
    }
}
