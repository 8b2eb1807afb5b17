//! Deadline-bounded wrappers over the streaming Lightning calls.

use std::{collections::VecDeque, marker::PhantomData};

use tokio::{sync::mpsc, time::Instant};
use tokio_stream::{Stream, StreamExt};
use tonic::Status;
use tracing::{debug, trace};

use crate::client::{LndError, Result};
use crate::payment::PaymentOutcome;
use crate::proto::lnrpc;

pub(crate) fn deadline_exceeded(call: &str) -> LndError {
    LndError::from(Status::deadline_exceeded(format!(
        "{call}: deadline elapsed before the node responded"
    )))
}

async fn next_before<S, T>(
    inbound: &mut S,
    deadline: Option<Instant>,
    call: &str,
) -> Result<Option<T>>
where
    S: Stream<Item = std::result::Result<T, Status>> + Unpin,
{
    let next = match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, inbound.next())
            .await
            .map_err(|_| deadline_exceeded(call))?,
        None => inbound.next().await,
    };
    next.transpose().map_err(LndError::from)
}

/// Server-streaming updates (`OpenChannel`, `CloseChannel`) read against an optional deadline.
pub struct UpdateStream<T, S = tonic::Streaming<T>> {
    inner: S,
    deadline: Option<Instant>,
    call: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> UpdateStream<T, S>
where
    S: Stream<Item = std::result::Result<T, Status>> + Unpin,
{
    pub fn new(call: &'static str, inner: S, deadline: Option<Instant>) -> Self {
        Self {
            inner,
            deadline,
            call,
            _item: PhantomData,
        }
    }

    /// Next update, `Ok(None)` once the node closes the stream.
    ///
    /// # Errors
    /// Returns [`LndError::Rpc`] for an error status from the node or a `DeadlineExceeded`
    /// status once the deadline passes.
    pub async fn message(&mut self) -> Result<Option<T>> {
        next_before(&mut self.inner, self.deadline, self.call).await
    }

    /// The first update; a stream that ends before yielding one is [`LndError::StreamClosed`].
    ///
    /// # Errors
    /// As [`message`](Self::message), plus [`LndError::StreamClosed`].
    pub async fn first(mut self) -> Result<T> {
        self.message().await?.ok_or(LndError::StreamClosed)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// One duplex `SendPayment` or `SendToRoute` call.
///
/// The first request is already on the wire when the stream is handed out. Each response with a
/// non-empty `payment_error` releases the next queued request, so several candidate routes are
/// tried one after another over the same call. The outbound side is closed as soon as the payment
/// settles or nothing is left to try.
pub struct PaymentStream<R, S = tonic::Streaming<lnrpc::SendResponse>> {
    outbound: Option<mpsc::Sender<R>>,
    inbound: S,
    queued: VecDeque<R>,
    in_flight: bool,
    settled: bool,
    deadline: Option<Instant>,
    call: &'static str,
}

impl<R, S> PaymentStream<R, S>
where
    S: Stream<Item = std::result::Result<lnrpc::SendResponse, Status>> + Unpin,
{
    /// Wrap a call whose first request has already been written to `outbound`.
    pub fn new(
        call: &'static str,
        outbound: mpsc::Sender<R>,
        inbound: S,
        queued: impl IntoIterator<Item = R>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            outbound: Some(outbound),
            inbound,
            queued: queued.into_iter().collect(),
            in_flight: true,
            settled: false,
            deadline,
            call,
        }
    }

    /// Next response from the node, or `Ok(None)` once nothing is in flight.
    ///
    /// In-band routing failures are returned as responses, not errors.
    ///
    /// # Errors
    /// Returns [`LndError::Rpc`] for an error status or an elapsed deadline, and
    /// [`LndError::StreamClosed`] if the node hangs up before a queued request can be sent.
    pub async fn message(&mut self) -> Result<Option<lnrpc::SendResponse>> {
        if !self.in_flight {
            self.close();
            return Ok(None);
        }

        let Some(resp) = next_before(&mut self.inbound, self.deadline, self.call).await? else {
            trace!(target: "lnd_rpc_client::stream", call = self.call, "payment stream ended by node");
            self.in_flight = false;
            self.close();
            return Ok(None);
        };

        if resp.payment_error.is_empty() {
            debug!(target: "lnd_rpc_client::stream", call = self.call, "payment settled");
            self.settled = true;
            self.in_flight = false;
            self.close();
        } else if let Some(next) = self.queued.pop_front() {
            debug!(
                target: "lnd_rpc_client::stream",
                call = self.call,
                error = %resp.payment_error,
                remaining = self.queued.len(),
                "payment attempt failed; trying next request"
            );
            self.send(next).await?;
        } else {
            debug!(target: "lnd_rpc_client::stream", call = self.call, error = %resp.payment_error, "payment failed");
            self.in_flight = false;
            self.close();
        }
        Ok(Some(resp))
    }

    /// The first response only. Any queued requests are dropped.
    ///
    /// # Errors
    /// As [`message`](Self::message), plus [`LndError::StreamClosed`] when no response arrives.
    pub async fn first(mut self) -> Result<lnrpc::SendResponse> {
        self.queued.clear();
        let resp = self.message().await?;
        self.close();
        resp.ok_or(LndError::StreamClosed)
    }

    /// Drive the call to completion and report the final response.
    ///
    /// # Errors
    /// As [`message`](Self::message), plus [`LndError::StreamClosed`] when no response arrives.
    pub async fn outcome(mut self) -> Result<PaymentOutcome> {
        let mut last = None;
        while let Some(resp) = self.message().await? {
            last = Some(resp);
        }
        last.map(PaymentOutcome::from).ok_or(LndError::StreamClosed)
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Requests not yet written to the node.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    async fn send(&mut self, req: R) -> Result<()> {
        let Some(tx) = &self.outbound else {
            return Err(LndError::StreamClosed);
        };
        if tx.send(req).await.is_err() {
            self.in_flight = false;
            self.outbound = None;
            return Err(LndError::StreamClosed);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.queued.clear();
        self.outbound = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tonic::Code;

    fn failed(reason: &str) -> std::result::Result<lnrpc::SendResponse, Status> {
        Ok(lnrpc::SendResponse {
            payment_error: reason.to_string(),
            ..Default::default()
        })
    }

    fn settled(preimage: &[u8]) -> std::result::Result<lnrpc::SendResponse, Status> {
        Ok(lnrpc::SendResponse {
            payment_preimage: preimage.to_vec(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn update_stream_yields_then_ends() {
        let inner = tokio_stream::iter(vec![
            Ok::<_, Status>(lnrpc::CloseStatusUpdate::default()),
            Ok(lnrpc::CloseStatusUpdate::default()),
        ]);
        let mut updates = UpdateStream::new("CloseChannel", inner, None);
        assert!(updates.message().await.unwrap().is_some());
        assert!(updates.message().await.unwrap().is_some());
        assert!(updates.message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_update_stream_is_closed() {
        let inner = tokio_stream::iter(Vec::<
            std::result::Result<lnrpc::OpenStatusUpdate, Status>,
        >::new());
        let err = UpdateStream::new("OpenChannel", inner, None)
            .first()
            .await
            .unwrap_err();
        assert!(matches!(err, LndError::StreamClosed));
    }

    #[tokio::test]
    async fn update_stream_passes_node_status_through() {
        let inner = tokio_stream::iter(vec![Err::<lnrpc::OpenStatusUpdate, _>(
            Status::failed_precondition("not enough witness outputs"),
        )]);
        let err = UpdateStream::new("OpenChannel", inner, None)
            .first()
            .await
            .unwrap_err();
        assert_eq!(err.status().map(Status::code), Some(Code::FailedPrecondition));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_update_stream_times_out_at_deadline() {
        let inner =
            tokio_stream::pending::<std::result::Result<lnrpc::CloseStatusUpdate, Status>>();
        let deadline = Instant::now() + Duration::from_secs(5);
        let err = UpdateStream::new("CloseChannel", inner, Some(deadline))
            .first()
            .await
            .unwrap_err();
        assert_eq!(err.status().map(Status::code), Some(Code::DeadlineExceeded));
    }

    #[tokio::test]
    async fn settled_payment_closes_outbound() {
        let (tx, mut rx) = mpsc::channel::<lnrpc::SendToRouteRequest>(4);
        let inbound = tokio_stream::iter(vec![settled(b"pre")]);
        let mut stream = PaymentStream::new("SendToRoute", tx, inbound, Vec::new(), None);

        let resp = stream.message().await.unwrap().unwrap();
        assert_eq!(resp.payment_preimage, b"pre");
        assert!(stream.is_settled());
        assert!(stream.message().await.unwrap().is_none());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn failures_release_queued_routes_in_order() {
        let (tx, mut rx) = mpsc::channel::<u32>(4);
        let inbound = tokio_stream::iter(vec![
            failed("no route"),
            failed("temporary channel failure"),
            settled(b"ok"),
        ]);
        let stream = PaymentStream::new("SendToRoute", tx, inbound, vec![2, 3], None);

        let outcome = stream.outcome().await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn exhausted_routes_report_last_failure() {
        let (tx, _rx) = mpsc::channel::<u32>(4);
        let inbound = tokio_stream::iter(vec![failed("first"), failed("second")]);
        let mut stream = PaymentStream::new("SendToRoute", tx, inbound, vec![2], None);

        assert_eq!(stream.message().await.unwrap().unwrap().payment_error, "first");
        assert_eq!(stream.queued(), 0);
        assert_eq!(stream.message().await.unwrap().unwrap().payment_error, "second");
        assert!(stream.message().await.unwrap().is_none());
        assert!(!stream.is_settled());
    }

    #[tokio::test]
    async fn first_ignores_fallbacks() {
        let (tx, mut rx) = mpsc::channel::<u32>(4);
        let inbound = tokio_stream::iter(vec![failed("unable to find a path"), settled(b"x")]);
        let stream = PaymentStream::new("SendPayment", tx, inbound, vec![9], None);

        let resp = stream.first().await.unwrap();
        assert_eq!(resp.payment_error, "unable to find a path");
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn node_hanging_up_before_fallback_is_stream_closed() {
        let (tx, rx) = mpsc::channel::<u32>(4);
        drop(rx);
        let inbound = tokio_stream::iter(vec![failed("first")]);
        let mut stream = PaymentStream::new("SendToRoute", tx, inbound, vec![2], None);
        assert!(matches!(stream.message().await, Err(LndError::StreamClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_payment_times_out_at_deadline() {
        let (tx, _rx) = mpsc::channel::<u32>(1);
        let inbound = tokio_stream::pending::<std::result::Result<lnrpc::SendResponse, Status>>();
        let deadline = Instant::now() + Duration::from_secs(30);
        let err = PaymentStream::new("SendPayment", tx, inbound, Vec::new(), Some(deadline))
            .outcome()
            .await
            .unwrap_err();
        assert_eq!(err.status().map(Status::code), Some(Code::DeadlineExceeded));
    }

    #[tokio::test]
    async fn stream_without_responses_has_no_outcome() {
        let (tx, _rx) = mpsc::channel::<u32>(1);
        let inbound =
            tokio_stream::iter(Vec::<std::result::Result<lnrpc::SendResponse, Status>>::new());
        let err = PaymentStream::new("SendPayment", tx, inbound, Vec::new(), None)
            .outcome()
            .await
            .unwrap_err();
        assert!(matches!(err, LndError::StreamClosed));
    }
}
