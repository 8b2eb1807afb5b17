//! Connection flags shared by the demos.

use lnd_rpc_client::{ClientConfig, CredentialSource};
use tokio::fs;

/// Build a [`ClientConfig`] from `--config <json>` (or the defaults), then apply
/// `--host`, `--port`, `--network`, `--lnd-dir`, `--tls-cert`, `--macaroon` and `--password`.
pub async fn config_from_args(args: &[String]) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => serde_json::from_slice(&fs::read(path).await?)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = flag_value(args, "--host") {
        config.host = host;
    }
    if let Some(port) = flag_value(args, "--port") {
        config.port = port.parse()?;
    }
    if let Some(network) = flag_value(args, "--network") {
        config.network = network.parse()?;
    }
    if let Some(dir) = flag_value(args, "--lnd-dir") {
        config.lnd_dir = dir.into();
    }
    if let Some(path) = flag_value(args, "--tls-cert") {
        config.tls_cert = Some(CredentialSource::Path(path.into()));
    }
    if let Some(path) = flag_value(args, "--macaroon") {
        config.macaroon = Some(CredentialSource::Path(path.into()));
    }
    if let Some(password) = flag_value(args, "--password") {
        config.wallet_password = Some(password);
    }
    Ok(config)
}

pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].clone())
}
