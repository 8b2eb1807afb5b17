//! Payment results and the decode, route, send flow.

use serde::{Deserialize, Serialize};

use crate::proto::lnrpc;
use crate::request::{FeeLimit, QueryRoutesParams};

/// Final result of a payment attempt. Routing failures reported by the node are data here, not
/// errors: the call itself succeeded, the payment did not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaymentOutcome {
    Succeeded {
        preimage: Vec<u8>,
        payment_hash: Vec<u8>,
        route: Option<lnrpc::Route>,
    },
    Failed {
        reason: String,
    },
}

impl PaymentOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    /// Hex-encoded preimage of a successful payment.
    #[must_use]
    pub fn preimage_hex(&self) -> Option<String> {
        match self {
            Self::Succeeded { preimage, .. } => Some(hex::encode(preimage)),
            Self::Failed { .. } => None,
        }
    }

    /// Total routing fee paid, in millisatoshis, when the node reported the route.
    #[must_use]
    pub fn fees_msat(&self) -> Option<i64> {
        match self {
            Self::Succeeded {
                route: Some(route), ..
            } => Some(route.total_fees_msat),
            _ => None,
        }
    }
}

impl From<lnrpc::SendResponse> for PaymentOutcome {
    fn from(resp: lnrpc::SendResponse) -> Self {
        if resp.payment_error.is_empty() {
            Self::Succeeded {
                preimage: resp.payment_preimage,
                payment_hash: resp.payment_hash,
                route: resp.payment_route,
            }
        } else {
            Self::Failed {
                reason: resp.payment_error,
            }
        }
    }
}

/// A decoded invoice together with candidate routes for paying it.
///
/// Built by [`crate::LndClient::plan_payment`] and consumed by
/// [`crate::LndClient::execute_plan`]. An empty `routes` list means the node picks the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub payment_request: String,
    pub decoded: lnrpc::PayReq,
    pub routes: Vec<lnrpc::Route>,
}

impl PaymentPlan {
    #[must_use]
    pub fn new(payment_request: impl Into<String>, decoded: lnrpc::PayReq) -> Self {
        Self {
            payment_request: payment_request.into(),
            decoded,
            routes: Vec::new(),
        }
    }

    /// Route query for this invoice, or `None` for zero-amount invoices, which cannot be
    /// routed ahead of time.
    #[must_use]
    pub fn route_query(&self, fee_limit: FeeLimit) -> Option<QueryRoutesParams> {
        if self.decoded.num_satoshis <= 0 {
            return None;
        }
        let mut params = QueryRoutesParams::new(&self.decoded.destination, self.decoded.num_satoshis)
            .fee_limit(fee_limit);
        if self.decoded.cltv_expiry > 0 {
            params = params.final_cltv_delta(
                i32::try_from(self.decoded.cltv_expiry).unwrap_or(i32::MAX),
            );
        }
        Some(params)
    }

    /// Keep the candidate routes whose fees fit under `fee_limit`.
    #[must_use]
    pub fn with_routes(mut self, routes: Vec<lnrpc::Route>, fee_limit: FeeLimit) -> Self {
        let amount = self.amount_sat();
        self.routes = routes
            .into_iter()
            .filter(|route| fee_limit.permits(amount, route))
            .collect();
        self
    }

    #[must_use]
    pub fn amount_sat(&self) -> i64 {
        self.decoded.num_satoshis
    }

    #[must_use]
    pub fn payment_hash(&self) -> &str {
        &self.decoded.payment_hash
    }

    #[must_use]
    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }
}
