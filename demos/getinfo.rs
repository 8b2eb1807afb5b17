use lnd_rpc_client::LndClient;
use tracing_subscriber::EnvFilter;

mod common;
use common::config_from_args;

/// Unlocks the wallet if needed and prints the node's `GetInfo` and balances.
///
/// Usage: cargo run --example getinfo -- [--config cfg.json] [--host h] [--port p]
///        [--network regtest] [--lnd-dir dir] [--tls-cert path] [--macaroon path]
///        [--password pw]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = config_from_args(&args).await?;
    let client = LndClient::new(config);

    let info = client.ensure_ready().await?;
    println!("alias:        {}", info.alias);
    println!("pubkey:       {}", info.identity_pubkey);
    println!("version:      {}", info.version);
    println!("block height: {}", info.block_height);
    println!("synced:       {}", info.synced_to_chain);
    println!("channels:     {} active, {} pending", info.num_active_channels, info.num_pending_channels);

    let wallet = client.wallet_balance().await?;
    println!("on-chain:     {} sat ({} unconfirmed)", wallet.confirmed_balance, wallet.unconfirmed_balance);
    let channels = client.channel_balance().await?;
    let local = channels.local_balance.map(|a| a.sat).unwrap_or_default();
    println!("in channels:  {local} sat");
    Ok(())
}
