use std::time::Duration;

use lnd_rpc_client::{LndClient, OpenChannelParams, PeerAddress};
use tracing_subscriber::EnvFilter;

mod common;
use common::{config_from_args, flag_value};

/// Lists channels, or opens/closes one.
///
/// Usage:
///   cargo run --example channels -- [connection flags as in `getinfo`]
///   cargo run --example channels -- --connect <pubkey@host:port>
///   cargo run --example channels -- --open <pubkey> --amount <sat> [--push <sat>] [--public]
///   cargo run --example channels -- --close <txid:index> [--force] [--follow]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let client = LndClient::new(config_from_args(&args).await?);
    client.ensure_ready().await?;
    let timeout = Duration::from_secs(120);

    if let Some(addr) = flag_value(&args, "--connect") {
        let addr: PeerAddress = addr.parse()?;
        client.connect_peer(&addr, false).await?;
        println!("connected to {addr}");
        return Ok(());
    }

    if let Some(pubkey) = flag_value(&args, "--open") {
        let amount: i64 = flag_value(&args, "--amount").ok_or("--amount is required")?.parse()?;
        let mut params = OpenChannelParams::new(pubkey, amount);
        if let Some(push) = flag_value(&args, "--push") {
            params.push_sat = push.parse()?;
        }
        params.private = !args.iter().any(|a| a == "--public");

        let mut updates = client.open_channel(&params, timeout).await?;
        // The first update reports the funding transaction; the rest arrive as it confirms.
        if let Some(update) = updates.message().await? {
            println!("{}", update.describe());
        }
        return Ok(());
    }

    if let Some(point) = flag_value(&args, "--close") {
        let force = args.iter().any(|a| a == "--force");
        if args.iter().any(|a| a == "--follow") {
            let mut updates = client.close_channel_updates(&point, force, timeout).await?;
            while let Some(update) = updates.message().await? {
                println!("{}", update.describe());
            }
        } else {
            println!("{}", client.close_channel(&point, force).await?.describe());
        }
        return Ok(());
    }

    let open = client.list_channels().await?;
    println!("open channels ({}):", open.channels.len());
    for ch in &open.channels {
        println!(
            "  {} {} local={} remote={} active={}",
            ch.channel_point, ch.remote_pubkey, ch.local_balance, ch.remote_balance, ch.active
        );
    }

    let pending = client.list_pending_channels().await?;
    println!(
        "pending: {} opening, {} waiting close",
        pending.pending_open_channels.len(),
        pending.waiting_close_channels.len()
    );

    let closed = client.list_closed_channels().await?;
    println!("closed channels ({}):", closed.channels.len());
    for ch in &closed.channels {
        println!("  {} settled={} sat", ch.channel_point, ch.settled_balance);
    }
    Ok(())
}
