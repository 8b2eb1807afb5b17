#![deny(unsafe_code)]

//! Async gRPC client for an LND node.
//!
//! [`LndClient`] wraps the `lnrpc` Lightning and WalletUnlocker services behind typed
//! operations. It connects over TLS using the node's own certificate as the trust anchor and
//! attaches the hex-encoded macaroon to every Lightning call.
//!
//! Features
//! - `transport-direct` (default): authenticated TLS gRPC via tonic
//!
//! Protos
//! - The vendored protos under `protos/lnd/<tag>/` are compiled at build time; set `LND_TAG`
//!   to pick a tag other than the latest.
//!
//! Example
//! ```no_run
//! use lnd_rpc_client::{ClientConfig, LndClient, Network};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LndClient::new(ClientConfig {
//!     network: Network::Regtest,
//!     ..ClientConfig::default()
//! });
//! let info = client.ensure_ready().await?;
//! println!("{} at height {}", info.alias, info.block_height);
//! # Ok(())
//! # }
//! ```
//!
//! Paying an invoice
//! ```no_run
//! use std::time::Duration;
//! use lnd_rpc_client::{ClientConfig, FeeLimit, LndClient, PaymentOutcome};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LndClient::new(ClientConfig::default());
//! let plan = client.plan_payment("lntb10u1...", FeeLimit::Percent(1)).await?;
//! match client.execute_plan(&plan, Duration::from_secs(60)).await? {
//!     PaymentOutcome::Succeeded { .. } => println!("paid {} sat", plan.amount_sat()),
//!     PaymentOutcome::Failed { reason } => println!("payment failed: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod credentials;
pub mod payment;
pub mod proto;
pub mod request;
pub mod stream;
pub mod transport;

pub use client::{is_wallet_already_unlocked, LndClient, LndError, Result, UnlockOutcome};
pub use config::{ClientConfig, CredentialSource, Network};
pub use payment::{PaymentOutcome, PaymentPlan};
pub use proto::lnrpc;
pub use request::{ChannelPointRef, FeeLimit, OpenChannelParams, PeerAddress, QueryRoutesParams};
pub use stream::{PaymentStream, UpdateStream};
