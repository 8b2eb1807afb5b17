//! Checks against a running node. Point `LND_CLIENT_CONFIG` at a JSON `ClientConfig` and run
//! `cargo test --test live_node -- --ignored`.

use lnd_rpc_client::{ClientConfig, FeeLimit, LndClient, LndError, UnlockOutcome};
use tonic::Code;

fn live_client() -> LndClient<lnd_rpc_client::transport::direct::DirectGrpc> {
    let path = std::env::var("LND_CLIENT_CONFIG")
        .expect("set LND_CLIENT_CONFIG to a JSON client config file");
    let raw = std::fs::read_to_string(&path).expect("read LND_CLIENT_CONFIG");
    let config: ClientConfig = serde_json::from_str(&raw).expect("parse client config");
    LndClient::new(config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn unlock_is_idempotent() {
    init_tracing();
    let client = live_client();
    let password = client
        .config()
        .wallet_password
        .clone()
        .unwrap_or_default();
    let first = client.try_unlock_wallet(&password).await.unwrap();
    let second = client.try_unlock_wallet(&password).await.unwrap();
    assert!(matches!(
        first,
        UnlockOutcome::Unlocked | UnlockOutcome::AlreadyUnlocked
    ));
    assert_eq!(second, UnlockOutcome::AlreadyUnlocked);
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn get_info_reports_an_identity() {
    init_tracing();
    let client = live_client();
    let info = client.ensure_ready().await.unwrap();
    assert_eq!(info.identity_pubkey.len(), 66);
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn new_address_matches_network() {
    init_tracing();
    let client = live_client();
    client.ensure_ready().await.unwrap();
    let hrp = client.config().network.address_hrp();
    let addr = client.new_default_address().await.unwrap();
    assert!(
        addr.address.starts_with(&format!("{hrp}1")),
        "{} does not start with {hrp}1",
        addr.address
    );
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn read_only_calls_succeed() {
    init_tracing();
    let client = live_client();
    client.ensure_ready().await.unwrap();
    let balance = client.wallet_balance().await.unwrap();
    assert_eq!(
        balance.total_balance,
        balance.confirmed_balance + balance.unconfirmed_balance
    );
    client.channel_balance().await.unwrap();
    client.list_peers().await.unwrap();
    client.list_channels().await.unwrap();
    client.list_pending_channels().await.unwrap();
    client.list_closed_channels().await.unwrap();
    client.list_payments().await.unwrap();
    client.get_transactions().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn garbage_invoice_is_rejected_by_the_node() {
    init_tracing();
    let client = live_client();
    client.ensure_ready().await.unwrap();
    let err = client
        .plan_payment("lnbc1notaninvoice", FeeLimit::NoLimit)
        .await
        .unwrap_err();
    assert!(matches!(err, LndError::Rpc(_)));
}

#[tokio::test]
#[ignore = "requires a running LND node"]
async fn closing_an_unknown_channel_fails() {
    init_tracing();
    let client = live_client();
    client.ensure_ready().await.unwrap();
    let point = format!("{}:0", "00".repeat(32));
    let err = client.close_channel(&point, false).await.unwrap_err();
    assert!(err.status().is_some_and(|s| s.code() != Code::Ok));
}
