use std::time::Duration;

use lnd_rpc_client::{FeeLimit, LndClient, PaymentOutcome};
use tracing_subscriber::EnvFilter;

mod common;
use common::{config_from_args, flag_value};

/// Pays a BOLT-11 invoice: decode, look up routes within the fee limit, then send.
///
/// Usage: cargo run --example pay -- --invoice <bolt11> [--max-fee sat] [--max-fee-percent pct]
///        [--timeout secs] [--sync] [connection flags as in `getinfo`]
///
/// `--sync` skips planning and uses the unary `SendPaymentSync` call instead.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(invoice) = flag_value(&args, "--invoice") else {
        eprintln!("usage: pay --invoice <bolt11> [--max-fee sat] [--max-fee-percent pct]");
        std::process::exit(2);
    };
    let fixed = flag_value(&args, "--max-fee").map_or(Ok(0), |v| v.parse())?;
    let percent = flag_value(&args, "--max-fee-percent").map_or(Ok(0), |v| v.parse())?;
    let timeout = Duration::from_secs(flag_value(&args, "--timeout").map_or(Ok(60), |v| v.parse())?);

    let client = LndClient::new(config_from_args(&args).await?);
    client.ensure_ready().await?;

    if args.iter().any(|a| a == "--sync") {
        let outcome = PaymentOutcome::from(client.send_payment_sync(&invoice).await?);
        report(&outcome);
        return Ok(());
    }

    let plan = client.plan_payment(&invoice, FeeLimit::from_parts(fixed, percent)).await?;
    println!(
        "paying {} sat to {} ({} candidate routes)",
        plan.amount_sat(),
        plan.decoded.destination,
        plan.routes.len()
    );
    for (i, route) in plan.routes.iter().enumerate() {
        println!("  route {i}: {} hops, {} msat fees", route.hops.len(), route.total_fees_msat);
    }

    let outcome = client.execute_plan(&plan, timeout).await?;
    report(&outcome);
    Ok(())
}

fn report(outcome: &PaymentOutcome) {
    match outcome {
        PaymentOutcome::Succeeded { .. } => {
            println!("payment succeeded");
            if let Some(preimage) = outcome.preimage_hex() {
                println!("  preimage: {preimage}");
            }
            if let Some(fees) = outcome.fees_msat() {
                println!("  fees:     {fees} msat");
            }
        }
        PaymentOutcome::Failed { reason } => println!("payment failed: {reason}"),
    }
}
