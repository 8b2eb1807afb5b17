use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::{sync::mpsc, time::Instant};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{
    service::interceptor::InterceptedService, service::Interceptor as TonicInterceptor, Code,
    Status, Streaming,
};
use tracing::{debug, trace, warn};

#[cfg(feature = "transport-direct")]
use crate::transport::direct::DirectGrpc;
use crate::{
    config::ClientConfig,
    credentials::ConfigError,
    payment::{PaymentOutcome, PaymentPlan},
    proto::lnrpc,
    request::{
        closed_channels_request, decode_payment_hash, ChannelPointError, ChannelPointRef,
        FeeLimit, OpenChannelParams, PeerAddress, QueryRoutesParams, RequestError,
    },
    stream::{deadline_exceeded, PaymentStream, UpdateStream},
    transport::{Transport, TransportError},
};

/// Deadline for [`LndClient::send_payment_sync`].
pub const SEND_PAYMENT_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

const PAYMENT_STREAM_BUFFER: usize = 4;
const WALLET_UNLOCKER_SERVICE: &str = "lnrpc.WalletUnlocker";

/// Library-level error type surfaced by [`LndClient`].
#[derive(Debug, Error)]
pub enum LndError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(TransportError),
    #[error(transparent)]
    Rpc(#[from] Box<Status>),
    #[error(transparent)]
    ChannelPoint(#[from] ChannelPointError),
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("stream closed before the node responded")]
    StreamClosed,
}

impl From<Status> for LndError {
    fn from(status: Status) -> Self {
        Self::Rpc(Box::new(status))
    }
}

impl From<TransportError> for LndError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Config(config) => Self::Config(config),
            other => Self::Transport(other),
        }
    }
}

impl LndError {
    /// The gRPC status returned by the node, if this error came from an RPC.
    #[must_use]
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Rpc(status) => Some(status.as_ref()),
            _ => None,
        }
    }
}

/// Result alias that defaults to [`LndError`].
pub type Result<T, E = LndError> = std::result::Result<T, E>;

/// Result of [`LndClient::try_unlock_wallet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked,
    AlreadyUnlocked,
}

/// Whether `status` is the node telling us the wallet is already open.
///
/// Once unlocked, older LND stops serving `lnrpc.WalletUnlocker` entirely (`Unimplemented`,
/// "unknown service lnrpc.WalletUnlocker"); newer releases answer "wallet already unlocked".
#[must_use]
pub fn is_wallet_already_unlocked(status: &Status) -> bool {
    let message = status.message();
    message == "unknown service lnrpc.WalletUnlocker"
        || (status.code() == Code::Unimplemented && message.contains(WALLET_UNLOCKER_SERVICE))
        || message.contains("wallet already unlocked")
}

// Intercepted service over the transport-provided gRPC service.
type LndGrpcService<T> = InterceptedService<<T as Transport>::Svc, MetadataInterceptor>;
type LightningClient<T> = lnrpc::lightning_client::LightningClient<LndGrpcService<T>>;
type WalletUnlockerClient<T> =
    lnrpc::wallet_unlocker_client::WalletUnlockerClient<LndGrpcService<T>>;

/// Async client for one LND node.
///
/// The client owns its [`ClientConfig`]; nothing is read from disk or the network until the
/// first call. Every operation is stateless and may be issued concurrently from clones of the
/// underlying channel.
pub struct LndClient<T: Transport> {
    transport: T,
    config: ClientConfig,
}

#[cfg(feature = "transport-direct")]
impl LndClient<DirectGrpc> {
    /// Build a client over an authenticated TLS channel described by `config`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            transport: DirectGrpc::from_config(&config),
            config,
        }
    }
}

impl<T: Transport> LndClient<T> {
    /// Build a client over a caller-supplied transport.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    /// Drop this client and build a fresh one for `config`.
    #[cfg(feature = "transport-direct")]
    #[must_use]
    pub fn reconfigure(self, config: ClientConfig) -> LndClient<DirectGrpc> {
        debug!(target: "lnd_rpc_client::client", endpoint = %config.endpoint(), "reconfiguring client");
        LndClient::new(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T> LndClient<T>
where
    T: Transport,
    T::Svc: tower::Service<
        http::Request<tonic::body::BoxBody>,
        Response = http::Response<tonic::body::BoxBody>,
    >,
    <T::Svc as tower::Service<http::Request<tonic::body::BoxBody>>>::Error:
        Into<Box<dyn std::error::Error + Send + Sync>> + Send + Sync,
{
    /// Construct an lnrpc.Lightning client that attaches the transport metadata to every call.
    ///
    /// # Errors
    /// Returns [`LndError::Config`] when credentials cannot be loaded and
    /// [`LndError::Transport`] when the channel cannot be created.
    pub async fn lightning_client(&self) -> Result<LightningClient<T>> {
        let svc = self.transport.service().await?;
        let interceptor = MetadataInterceptor {
            md: self.transport.metadata().await?,
        };
        Ok(lnrpc::lightning_client::LightningClient::new(
            InterceptedService::new(svc, interceptor),
        ))
    }

    // The unlocker runs before the macaroon database is open, so no credentials are attached.
    async fn wallet_unlocker_client(&self) -> Result<WalletUnlockerClient<T>> {
        let svc = self.transport.service().await?;
        Ok(lnrpc::wallet_unlocker_client::WalletUnlockerClient::new(
            InterceptedService::new(svc, MetadataInterceptor::default()),
        ))
    }

    fn request<M>(&self, message: M) -> tonic::Request<M> {
        request_within(message, self.config.rpc_timeout)
    }

    async fn unary<R, F>(&self, call: &'static str, fut: F) -> Result<R>
    where
        F: Future<Output = std::result::Result<tonic::Response<R>, Status>>,
    {
        unary_within(call, self.config.rpc_timeout, fut).await
    }

    /// Call lnrpc.Lightning.GetInfo.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails or the channel cannot be created.
    pub async fn get_info(&self) -> Result<lnrpc::GetInfoResponse> {
        let mut client = self.lightning_client().await?;
        self.unary("GetInfo", client.get_info(self.request(lnrpc::GetInfoRequest {})))
            .await
    }

    /// Call lnrpc.WalletUnlocker.UnlockWallet. Every failure is returned unchanged.
    ///
    /// Unlike the Lightning calls, this request carries no macaroon: the node cannot check one
    /// until its wallet is open.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails, including when the wallet is already unlocked.
    pub async fn unlock_wallet(&self, password: &str) -> Result<lnrpc::UnlockWalletResponse> {
        let mut client = self.wallet_unlocker_client().await?;
        let req = lnrpc::UnlockWalletRequest {
            wallet_password: password.as_bytes().to_vec(),
            ..Default::default()
        };
        self.unary("UnlockWallet", client.unlock_wallet(self.request(req)))
            .await
    }

    /// Unlock the wallet, treating an already-unlocked wallet as success.
    ///
    /// After a fresh unlock this waits `unlock_settle_delay` so the Lightning service is up
    /// before the next call.
    ///
    /// # Errors
    /// Returns [`LndError`] for any failure other than the wallet already being unlocked.
    pub async fn try_unlock_wallet(&self, password: &str) -> Result<UnlockOutcome> {
        match self.unlock_wallet(password).await {
            Ok(_) => {
                debug!(
                    target: "lnd_rpc_client::client",
                    settle = ?self.config.unlock_settle_delay,
                    "wallet unlocked"
                );
                tokio::time::sleep(self.config.unlock_settle_delay).await;
                Ok(UnlockOutcome::Unlocked)
            }
            Err(LndError::Rpc(status)) if is_wallet_already_unlocked(&status) => {
                debug!(target: "lnd_rpc_client::client", "wallet already unlocked");
                Ok(UnlockOutcome::AlreadyUnlocked)
            }
            Err(e) => Err(e),
        }
    }

    /// Startup sequence: unlock with the configured password (if any), then `GetInfo`.
    ///
    /// # Errors
    /// Returns [`LndError`] when unlocking fails for a reason other than an already-open wallet,
    /// or when `GetInfo` fails.
    pub async fn ensure_ready(&self) -> Result<lnrpc::GetInfoResponse> {
        if let Some(password) = &self.config.wallet_password {
            self.try_unlock_wallet(password).await?;
        }
        self.get_info().await
    }

    /// Call lnrpc.Lightning.StopDaemon.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn stop_daemon(&self) -> Result<lnrpc::StopResponse> {
        let mut client = self.lightning_client().await?;
        self.unary("StopDaemon", client.stop_daemon(self.request(lnrpc::StopRequest {})))
            .await
    }

    /// Connect to a peer; `perm` asks the node to keep reconnecting.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn connect_peer(
        &self,
        addr: &PeerAddress,
        perm: bool,
    ) -> Result<lnrpc::ConnectPeerResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::ConnectPeerRequest {
            addr: Some(addr.clone().into()),
            perm,
            ..Default::default()
        };
        self.unary("ConnectPeer", client.connect_peer(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn disconnect_peer(&self, pubkey: &str) -> Result<lnrpc::DisconnectPeerResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::DisconnectPeerRequest {
            pub_key: pubkey.to_string(),
        };
        self.unary("DisconnectPeer", client.disconnect_peer(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn list_peers(&self) -> Result<lnrpc::ListPeersResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::ListPeersRequest::default();
        self.unary("ListPeers", client.list_peers(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn wallet_balance(&self) -> Result<lnrpc::WalletBalanceResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::WalletBalanceRequest {};
        self.unary("WalletBalance", client.wallet_balance(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn channel_balance(&self) -> Result<lnrpc::ChannelBalanceResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::ChannelBalanceRequest {};
        self.unary("ChannelBalance", client.channel_balance(self.request(req)))
            .await
    }

    /// On-chain transactions known to the wallet.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn get_transactions(&self) -> Result<lnrpc::TransactionDetails> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::GetTransactionsRequest::default();
        self.unary("GetTransactions", client.get_transactions(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn new_address(
        &self,
        address_type: lnrpc::AddressType,
    ) -> Result<lnrpc::NewAddressResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::NewAddressRequest {
            r#type: address_type as i32,
            ..Default::default()
        };
        self.unary("NewAddress", client.new_address(self.request(req)))
            .await
    }

    /// New native segwit (p2wkh) address.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn new_default_address(&self) -> Result<lnrpc::NewAddressResponse> {
        self.new_address(lnrpc::AddressType::WitnessPubkeyHash)
            .await
    }

    /// Open a channel and return its status updates, bounded by `timeout` overall.
    ///
    /// # Errors
    /// Returns [`LndError::Request`] for an invalid pubkey before contacting the node, and
    /// [`LndError`] when the call fails or does not start before the deadline.
    pub async fn open_channel(
        &self,
        params: &OpenChannelParams,
        timeout: Duration,
    ) -> Result<UpdateStream<lnrpc::OpenStatusUpdate>> {
        let req = params.to_proto()?;
        let deadline = Instant::now() + timeout;
        let mut client = self.lightning_client().await?;
        open_stream(
            "OpenChannel",
            Some(deadline),
            client.open_channel(request_within(req, Some(timeout))),
        )
        .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn list_channels(&self) -> Result<lnrpc::ListChannelsResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::ListChannelsRequest::default();
        self.unary("ListChannels", client.list_channels(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn list_pending_channels(&self) -> Result<lnrpc::PendingChannelsResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::PendingChannelsRequest {};
        self.unary("PendingChannels", client.pending_channels(self.request(req)))
            .await
    }

    /// Closed channels of every closure type.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn list_closed_channels(&self) -> Result<lnrpc::ClosedChannelsResponse> {
        let mut client = self.lightning_client().await?;
        let req = closed_channels_request();
        self.unary("ClosedChannels", client.closed_channels(self.request(req)))
            .await
    }

    /// Start closing the channel at `channel_point` (`<txid>:<index>`) and return the first
    /// status update only. Use [`close_channel_updates`](Self::close_channel_updates) to follow
    /// the close to completion.
    ///
    /// The call is bounded by [`ClientConfig::rpc_timeout`], and unbounded when that is `None`.
    ///
    /// # Errors
    /// Returns [`LndError::ChannelPoint`] for a malformed channel point before contacting the
    /// node, [`LndError::StreamClosed`] when the node sends nothing, and [`LndError`] when the
    /// call fails.
    pub async fn close_channel(
        &self,
        channel_point: &str,
        force: bool,
    ) -> Result<lnrpc::CloseStatusUpdate> {
        self.close_stream(channel_point, force, self.config.rpc_timeout)
            .await?
            .first()
            .await
    }

    /// Start closing a channel and return every status update until `timeout` elapses.
    ///
    /// # Errors
    /// As [`close_channel`](Self::close_channel).
    pub async fn close_channel_updates(
        &self,
        channel_point: &str,
        force: bool,
        timeout: Duration,
    ) -> Result<UpdateStream<lnrpc::CloseStatusUpdate>> {
        self.close_stream(channel_point, force, Some(timeout)).await
    }

    async fn close_stream(
        &self,
        channel_point: &str,
        force: bool,
        timeout: Option<Duration>,
    ) -> Result<UpdateStream<lnrpc::CloseStatusUpdate>> {
        let point: ChannelPointRef = channel_point.parse()?;
        debug!(target: "lnd_rpc_client::client", channel_point = %point, force, "closing channel");
        let req = lnrpc::CloseChannelRequest {
            channel_point: Some(point.into()),
            force,
            ..Default::default()
        };
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut client = self.lightning_client().await?;
        open_stream(
            "CloseChannel",
            deadline,
            client.close_channel(request_within(req, timeout)),
        )
        .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails.
    pub async fn list_payments(&self) -> Result<lnrpc::ListPaymentsResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::ListPaymentsRequest::default();
        self.unary("ListPayments", client.list_payments(self.request(req)))
            .await
    }

    /// Decode a BOLT-11 payment request.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC fails, including for an undecodable invoice.
    pub async fn decode_payment_request(&self, payment_request: &str) -> Result<lnrpc::PayReq> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::PayReqString {
            pay_req: payment_request.to_string(),
        };
        self.unary("DecodePayReq", client.decode_pay_req(self.request(req)))
            .await
    }

    /// # Errors
    /// Returns [`LndError`] when the RPC fails, including when no route exists.
    pub async fn query_routes(
        &self,
        params: &QueryRoutesParams,
    ) -> Result<lnrpc::QueryRoutesResponse> {
        let mut client = self.lightning_client().await?;
        self.unary(
            "QueryRoutes",
            client.query_routes(self.request(params.to_proto())),
        )
        .await
    }

    /// Pay a BOLT-11 invoice over the duplex `SendPayment` call.
    ///
    /// The request is written before the call starts; the returned stream yields the node's
    /// response. The whole exchange is bounded by `timeout`.
    ///
    /// # Errors
    /// Returns [`LndError`] when the call cannot be started before the deadline.
    pub async fn send_payment(
        &self,
        payment_request: &str,
        timeout: Duration,
    ) -> Result<PaymentStream<lnrpc::SendRequest>> {
        let req = lnrpc::SendRequest {
            payment_request: payment_request.to_string(),
            ..Default::default()
        };
        let deadline = Instant::now() + timeout;
        let mut client = self.lightning_client().await?;

        let (tx, rx) = mpsc::channel(PAYMENT_STREAM_BUFFER);
        tx.send(req).await.map_err(|_| LndError::StreamClosed)?;
        trace!(target: "lnd_rpc_client::client", call = "SendPayment", "rpc");
        let response = tokio::time::timeout_at(
            deadline,
            client.send_payment(request_within(ReceiverStream::new(rx), Some(timeout))),
        )
        .await
        .map_err(|_| deadline_exceeded("SendPayment"))??;

        Ok(PaymentStream::new(
            "SendPayment",
            tx,
            response.into_inner(),
            Vec::new(),
            Some(deadline),
        ))
    }

    /// Pay along caller-chosen routes over the duplex `SendToRoute` call.
    ///
    /// The first route is attempted immediately. Each further route is attempted only after the
    /// previous one fails in-band, all within `timeout`.
    ///
    /// # Errors
    /// Returns [`LndError::Request`] for a malformed hash or an empty route list before
    /// contacting the node, and [`LndError`] when the call cannot be started before the deadline.
    pub async fn send_to_route(
        &self,
        payment_hash_hex: &str,
        routes: Vec<lnrpc::Route>,
        timeout: Duration,
    ) -> Result<PaymentStream<lnrpc::SendToRouteRequest>> {
        let payment_hash = decode_payment_hash(payment_hash_hex)?;
        let mut requests = routes.into_iter().map(|route| lnrpc::SendToRouteRequest {
            payment_hash: payment_hash.clone(),
            route: Some(route),
        });
        let first = requests.next().ok_or(RequestError::NoRoutes)?;
        let queued: Vec<_> = requests.collect();

        let deadline = Instant::now() + timeout;
        let mut client = self.lightning_client().await?;

        let (tx, rx) = mpsc::channel(PAYMENT_STREAM_BUFFER);
        tx.send(first).await.map_err(|_| LndError::StreamClosed)?;
        trace!(target: "lnd_rpc_client::client", call = "SendToRoute", fallbacks = queued.len(), "rpc");
        let response = tokio::time::timeout_at(
            deadline,
            client.send_to_route(request_within(ReceiverStream::new(rx), Some(timeout))),
        )
        .await
        .map_err(|_| deadline_exceeded("SendToRoute"))??;

        Ok(PaymentStream::new(
            "SendToRoute",
            tx,
            response.into_inner(),
            queued,
            Some(deadline),
        ))
    }

    /// Pay a BOLT-11 invoice with the unary `SendPaymentSync`, bounded by
    /// [`SEND_PAYMENT_SYNC_TIMEOUT`]. Routing failures come back in `payment_error`.
    ///
    /// # Errors
    /// Returns [`LndError`] when the RPC itself fails.
    pub async fn send_payment_sync(&self, payment_request: &str) -> Result<lnrpc::SendResponse> {
        let mut client = self.lightning_client().await?;
        let req = lnrpc::SendRequest {
            payment_request: payment_request.to_string(),
            ..Default::default()
        };
        let limit = Some(SEND_PAYMENT_SYNC_TIMEOUT);
        unary_within(
            "SendPaymentSync",
            limit,
            client.send_payment_sync(request_within(req, limit)),
        )
        .await
    }

    /// Decode `payment_request` and look up candidate routes for it.
    ///
    /// A failed route lookup is not fatal: the plan comes back without routes and
    /// [`execute_plan`](Self::execute_plan) lets the node find a path.
    ///
    /// # Errors
    /// Returns [`LndError`] when the invoice cannot be decoded.
    pub async fn plan_payment(
        &self,
        payment_request: &str,
        fee_limit: FeeLimit,
    ) -> Result<PaymentPlan> {
        let decoded = self.decode_payment_request(payment_request).await?;
        let plan = PaymentPlan::new(payment_request, decoded);
        let Some(query) = plan.route_query(fee_limit) else {
            debug!(target: "lnd_rpc_client::payment", "zero-amount invoice; skipping route query");
            return Ok(plan);
        };
        match self.query_routes(&query).await {
            Ok(found) => {
                let plan = plan.with_routes(found.routes, fee_limit);
                debug!(target: "lnd_rpc_client::payment", routes = plan.routes.len(), "payment planned");
                Ok(plan)
            }
            Err(e) => {
                warn!(target: "lnd_rpc_client::payment", error = %e, "route query failed; falling back to node pathfinding");
                Ok(plan)
            }
        }
    }

    /// Pay a planned invoice: over the planned routes when there are any, otherwise with
    /// `SendPayment`.
    ///
    /// # Errors
    /// Returns [`LndError`] when the call fails; an unsuccessful payment is
    /// [`PaymentOutcome::Failed`].
    pub async fn execute_plan(
        &self,
        plan: &PaymentPlan,
        timeout: Duration,
    ) -> Result<PaymentOutcome> {
        let outcome = if plan.has_routes() {
            self.send_to_route(plan.payment_hash(), plan.routes.clone(), timeout)
                .await?
                .outcome()
                .await?
        } else {
            self.send_payment(&plan.payment_request, timeout)
                .await?
                .outcome()
                .await?
        };
        debug!(target: "lnd_rpc_client::payment", success = outcome.is_success(), "payment finished");
        Ok(outcome)
    }
}

fn request_within<M>(message: M, timeout: Option<Duration>) -> tonic::Request<M> {
    let mut req = tonic::Request::new(message);
    if let Some(timeout) = timeout {
        req.set_timeout(timeout);
    }
    req
}

async fn open_stream<U, F>(
    call: &'static str,
    deadline: Option<Instant>,
    fut: F,
) -> Result<UpdateStream<U>>
where
    F: Future<Output = std::result::Result<tonic::Response<Streaming<U>>, Status>>,
{
    trace!(target: "lnd_rpc_client::client", call, "rpc");
    let response = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| deadline_exceeded(call))??,
        None => fut.await?,
    };
    Ok(UpdateStream::new(call, response.into_inner(), deadline))
}

async fn unary_within<R, F>(call: &'static str, timeout: Option<Duration>, fut: F) -> Result<R>
where
    F: Future<Output = std::result::Result<tonic::Response<R>, Status>>,
{
    trace!(target: "lnd_rpc_client::client", call, "rpc");
    let res = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| deadline_exceeded(call))?,
        None => fut.await,
    };
    match res {
        Ok(response) => Ok(response.into_inner()),
        Err(status) => {
            trace!(target: "lnd_rpc_client::client", call, code = ?status.code(), "rpc failed");
            Err(status.into())
        }
    }
}

/// Inserts transport metadata (the macaroon, for direct connections) into every request.
#[derive(Clone, Default)]
pub struct MetadataInterceptor {
    md: Vec<(String, String)>,
}

impl MetadataInterceptor {
    #[must_use]
    pub fn new(md: Vec<(String, String)>) -> Self {
        Self { md }
    }
}

impl TonicInterceptor for MetadataInterceptor {
    fn call(&mut self, mut req: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        for (k, v) in &self.md {
            let val = tonic::metadata::MetadataValue::try_from(v.as_str())
                .map_err(|e| tonic::Status::internal(e.to_string()))?;
            let key = tonic::metadata::AsciiMetadataKey::from_bytes(k.as_bytes())
                .map_err(|_| tonic::Status::internal("invalid metadata key"))?;
            req.metadata_mut().insert(key, val);
        }
        Ok(req)
    }
}
