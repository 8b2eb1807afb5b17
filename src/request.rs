//! Typed inputs for Lightning calls and their conversion into `lnrpc` requests.
//!
//! Everything here is pure: parsing and validation happen before any network I/O, so malformed
//! input fails fast with a descriptive error instead of an opaque RPC status.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::proto::lnrpc;

const TXID_HEX_LEN: usize = 64;
const PUBKEY_HEX_LEN: usize = 66;

/// Default minimum HTLC size offered on new channels, in millisatoshis.
pub const DEFAULT_MIN_HTLC_MSAT: i64 = 16_000;
/// Default CLTV delta for the final hop when querying routes.
pub const DEFAULT_FINAL_CLTV_DELTA: i32 = 144;
/// Default number of routes requested from `QueryRoutes`.
pub const DEFAULT_MAX_ROUTES: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelPointError {
    #[error("channel point `{0}` is missing the `:` separator")]
    MissingSeparator(String),
    #[error("channel point txid `{0}` is not 64 hex characters")]
    InvalidTxid(String),
    #[error("channel point output index `{0}` is not a non-negative integer")]
    InvalidOutputIndex(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("`{0}` is not a 33-byte hex-encoded public key")]
    InvalidPubkey(String),
    #[error("peer address `{0}` must look like <pubkey>@<host>")]
    InvalidPeerAddress(String),
    #[error("payment hash `{0}` is not 32 hex-encoded bytes")]
    InvalidPaymentHash(String),
    #[error("at least one route is required")]
    NoRoutes,
}

/// A channel's funding outpoint, written `<txid>:<output_index>`.
///
/// ```
/// use lnd_rpc_client::request::ChannelPointRef;
///
/// let cp: ChannelPointRef =
///     "a3f1ad0000000000000000000000000000000000000000000000000000c0ffee:1".parse()?;
/// assert_eq!(cp.output_index, 1);
/// # Ok::<(), lnd_rpc_client::request::ChannelPointError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPointRef {
    /// Funding txid in the usual display (big-endian) hex form.
    pub txid: String,
    pub output_index: u32,
}

impl FromStr for ChannelPointRef {
    type Err = ChannelPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (txid, index) = s
            .split_once(':')
            .ok_or_else(|| ChannelPointError::MissingSeparator(s.to_string()))?;
        if txid.len() != TXID_HEX_LEN || !txid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChannelPointError::InvalidTxid(txid.to_string()));
        }
        let output_index = index
            .parse::<u32>()
            .map_err(|_| ChannelPointError::InvalidOutputIndex(index.to_string()))?;
        Ok(Self {
            txid: txid.to_ascii_lowercase(),
            output_index,
        })
    }
}

impl fmt::Display for ChannelPointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.output_index)
    }
}

impl From<ChannelPointRef> for lnrpc::ChannelPoint {
    fn from(cp: ChannelPointRef) -> Self {
        Self {
            funding_txid: Some(lnrpc::channel_point::FundingTxid::FundingTxidStr(cp.txid)),
            output_index: cp.output_index,
        }
    }
}

/// Routing fee ceiling. Fixed and percentage limits are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeLimit {
    #[default]
    NoLimit,
    /// Absolute ceiling in satoshis.
    Fixed(i64),
    /// Ceiling as a percentage of the payment amount.
    Percent(i64),
}

impl FeeLimit {
    /// Pick a limit from two optional knobs: a positive `fixed` wins, then a positive `percent`.
    #[must_use]
    pub fn from_parts(fixed: i64, percent: i64) -> Self {
        if fixed > 0 {
            Self::Fixed(fixed)
        } else if percent > 0 {
            Self::Percent(percent)
        } else {
            Self::NoLimit
        }
    }

    /// Maximum fee in satoshis for a payment of `amount_sat`, or `None` when unbounded.
    #[must_use]
    pub fn max_fee_sat(self, amount_sat: i64) -> Option<i64> {
        match self {
            Self::NoLimit => None,
            Self::Fixed(sat) => Some(sat),
            Self::Percent(pct) => Some(amount_sat.saturating_mul(pct) / 100),
        }
    }

    /// Whether `route`'s total fee fits under this limit for a payment of `amount_sat`.
    #[must_use]
    pub fn permits(self, amount_sat: i64, route: &lnrpc::Route) -> bool {
        self.max_fee_sat(amount_sat)
            .map_or(true, |max| route.total_fees_msat <= max.saturating_mul(1000))
    }

    #[must_use]
    pub fn to_proto(self) -> Option<lnrpc::FeeLimit> {
        let limit = match self {
            Self::NoLimit => return None,
            Self::Fixed(sat) => lnrpc::fee_limit::Limit::Fixed(sat),
            Self::Percent(pct) => lnrpc::fee_limit::Limit::Percent(pct),
        };
        Some(lnrpc::FeeLimit { limit: Some(limit) })
    }
}

/// `<pubkey>@<host[:port]>` as printed by `lncli getinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub pubkey: String,
    pub host: String,
}

impl FromStr for PeerAddress {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (pubkey, host) = s
            .split_once('@')
            .ok_or_else(|| RequestError::InvalidPeerAddress(s.to_string()))?;
        if host.is_empty() {
            return Err(RequestError::InvalidPeerAddress(s.to_string()));
        }
        validate_pubkey(pubkey)?;
        Ok(Self {
            pubkey: pubkey.to_ascii_lowercase(),
            host: host.to_string(),
        })
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.pubkey, self.host)
    }
}

impl From<PeerAddress> for lnrpc::LightningAddress {
    fn from(addr: PeerAddress) -> Self {
        Self {
            pubkey: addr.pubkey,
            host: addr.host,
        }
    }
}

fn validate_pubkey(pubkey: &str) -> Result<Vec<u8>, RequestError> {
    if pubkey.len() != PUBKEY_HEX_LEN {
        return Err(RequestError::InvalidPubkey(pubkey.to_string()));
    }
    hex::decode(pubkey).map_err(|_| RequestError::InvalidPubkey(pubkey.to_string()))
}

/// Decode a hex payment hash into its 32 raw bytes.
///
/// # Errors
/// Returns [`RequestError::InvalidPaymentHash`] for anything other than 64 hex characters.
pub fn decode_payment_hash(hash_hex: &str) -> Result<Vec<u8>, RequestError> {
    match hex::decode(hash_hex.trim()) {
        Ok(bytes) if bytes.len() == 32 => Ok(bytes),
        _ => Err(RequestError::InvalidPaymentHash(hash_hex.to_string())),
    }
}

/// Inputs to `OpenChannel`. Zero for `remote_csv_delay`, `sat_per_vbyte` and `target_conf` lets
/// the node choose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenChannelParams {
    pub node_pubkey: String,
    pub local_funding_amount: i64,
    pub push_sat: i64,
    pub private: bool,
    pub min_htlc_msat: i64,
    pub min_confs: i32,
    pub remote_csv_delay: u32,
    pub sat_per_vbyte: u64,
    pub target_conf: i32,
}

impl OpenChannelParams {
    #[must_use]
    pub fn new(node_pubkey: impl Into<String>, local_funding_amount: i64) -> Self {
        Self {
            node_pubkey: node_pubkey.into(),
            local_funding_amount,
            push_sat: 0,
            private: true,
            min_htlc_msat: DEFAULT_MIN_HTLC_MSAT,
            min_confs: 1,
            remote_csv_delay: 0,
            sat_per_vbyte: 0,
            target_conf: 0,
        }
    }

    /// Build the `lnrpc` request.
    ///
    /// # Errors
    /// Returns [`RequestError::InvalidPubkey`] when `node_pubkey` is not a 33-byte hex key.
    pub fn to_proto(&self) -> Result<lnrpc::OpenChannelRequest, RequestError> {
        let node_pubkey = validate_pubkey(&self.node_pubkey)?;
        let mut req = lnrpc::OpenChannelRequest {
            node_pubkey,
            local_funding_amount: self.local_funding_amount,
            push_sat: self.push_sat,
            private: self.private,
            min_htlc_msat: self.min_htlc_msat,
            min_confs: self.min_confs,
            ..Default::default()
        };
        if self.remote_csv_delay > 0 {
            req.remote_csv_delay = self.remote_csv_delay;
        }
        if self.sat_per_vbyte > 0 {
            req.sat_per_vbyte = self.sat_per_vbyte;
        }
        if self.target_conf > 0 {
            req.target_conf = self.target_conf;
        }
        Ok(req)
    }
}

/// Inputs to `QueryRoutes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRoutesParams {
    pub pub_key: String,
    pub amount_sat: i64,
    pub fee_limit: FeeLimit,
    pub final_cltv_delta: i32,
    /// Kept for callers that size result tables; current LND returns a single best route.
    pub max_routes: i32,
}

impl QueryRoutesParams {
    #[must_use]
    pub fn new(pub_key: impl Into<String>, amount_sat: i64) -> Self {
        Self {
            pub_key: pub_key.into(),
            amount_sat,
            fee_limit: FeeLimit::NoLimit,
            final_cltv_delta: DEFAULT_FINAL_CLTV_DELTA,
            max_routes: DEFAULT_MAX_ROUTES,
        }
    }

    #[must_use]
    pub fn fee_limit(mut self, fee_limit: FeeLimit) -> Self {
        self.fee_limit = fee_limit;
        self
    }

    #[must_use]
    pub fn final_cltv_delta(mut self, delta: i32) -> Self {
        self.final_cltv_delta = delta;
        self
    }

    #[must_use]
    pub fn to_proto(&self) -> lnrpc::QueryRoutesRequest {
        lnrpc::QueryRoutesRequest {
            pub_key: self.pub_key.clone(),
            amt: self.amount_sat,
            fee_limit: self.fee_limit.to_proto(),
            final_cltv_delta: self.final_cltv_delta,
            ..Default::default()
        }
    }
}

/// `ClosedChannels` request covering every closure category.
#[must_use]
pub fn closed_channels_request() -> lnrpc::ClosedChannelsRequest {
    lnrpc::ClosedChannelsRequest {
        cooperative: true,
        local_force: true,
        remote_force: true,
        breach: true,
        funding_canceled: true,
        abandoned: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "4c3b9b2b7f0d8a1e6a2f4b9c0d7e5f3a1b2c3d4e5f60718293a4b5c6d7e8f901";
    const PUBKEY: &str = "03a3b07a5b0bf68f0972dd2d1f4ae5c16a9793f8580fefc844d38acdae71cf1242";

    #[test]
    fn channel_point_parses_txid_and_index() {
        let cp: ChannelPointRef = format!("{TXID}:0").parse().unwrap();
        assert_eq!(cp.txid, TXID);
        assert_eq!(cp.output_index, 0);
        assert_eq!(cp.to_string(), format!("{TXID}:0"));

        let proto = lnrpc::ChannelPoint::from(cp);
        assert_eq!(proto.output_index, 0);
        assert_eq!(
            proto.funding_txid,
            Some(lnrpc::channel_point::FundingTxid::FundingTxidStr(
                TXID.to_string()
            ))
        );
    }

    #[test]
    fn malformed_channel_points_fail_fast() {
        assert!(matches!(
            TXID.parse::<ChannelPointRef>(),
            Err(ChannelPointError::MissingSeparator(_))
        ));
        assert!(matches!(
            format!("{TXID}:one").parse::<ChannelPointRef>(),
            Err(ChannelPointError::InvalidOutputIndex(_))
        ));
        assert!(matches!(
            format!("{TXID}:-1").parse::<ChannelPointRef>(),
            Err(ChannelPointError::InvalidOutputIndex(_))
        ));
        assert!(matches!(
            "deadbeef:0".parse::<ChannelPointRef>(),
            Err(ChannelPointError::InvalidTxid(_))
        ));
    }

    #[test]
    fn fixed_fee_limit_takes_priority() {
        assert_eq!(FeeLimit::from_parts(100, 5), FeeLimit::Fixed(100));
        assert_eq!(FeeLimit::from_parts(0, 5), FeeLimit::Percent(5));
        assert_eq!(FeeLimit::from_parts(0, 0), FeeLimit::NoLimit);
        assert_eq!(FeeLimit::from_parts(-3, 0), FeeLimit::NoLimit);

        assert_eq!(FeeLimit::NoLimit.to_proto(), None);
        assert_eq!(
            FeeLimit::Percent(2).to_proto(),
            Some(lnrpc::FeeLimit {
                limit: Some(lnrpc::fee_limit::Limit::Percent(2))
            })
        );
    }

    #[test]
    fn fee_limit_checks_route_totals() {
        let route = lnrpc::Route {
            total_fees_msat: 12_000,
            ..Default::default()
        };
        assert!(FeeLimit::Fixed(12).permits(50_000, &route));
        assert!(!FeeLimit::Fixed(11).permits(50_000, &route));
        // 1% of 1000 sat is 10 sat.
        assert!(!FeeLimit::Percent(1).permits(1_000, &route));
        assert!(FeeLimit::NoLimit.permits(1, &route));
    }

    #[test]
    fn open_channel_only_sets_positive_optionals() {
        let params = OpenChannelParams::new(PUBKEY, 500_000);
        let req = params.to_proto().unwrap();
        assert_eq!(req.node_pubkey, hex::decode(PUBKEY).unwrap());
        assert_eq!(req.local_funding_amount, 500_000);
        assert!(req.private);
        assert_eq!(req.min_htlc_msat, 16_000);
        assert_eq!(req.min_confs, 1);
        assert_eq!(req.remote_csv_delay, 0);
        assert_eq!(req.sat_per_vbyte, 0);
        assert_eq!(req.target_conf, 0);

        let tuned = OpenChannelParams {
            remote_csv_delay: 144,
            sat_per_vbyte: 12,
            target_conf: 3,
            ..params
        };
        let req = tuned.to_proto().unwrap();
        assert_eq!(req.remote_csv_delay, 144);
        assert_eq!(req.sat_per_vbyte, 12);
        assert_eq!(req.target_conf, 3);

        let bad = OpenChannelParams::new("02abc", 1);
        assert!(matches!(bad.to_proto(), Err(RequestError::InvalidPubkey(_))));
    }

    #[test]
    fn query_routes_defaults() {
        let req = QueryRoutesParams::new(PUBKEY, 1_000)
            .fee_limit(FeeLimit::Fixed(5))
            .to_proto();
        assert_eq!(req.pub_key, PUBKEY);
        assert_eq!(req.amt, 1_000);
        assert_eq!(req.final_cltv_delta, 144);
        assert_eq!(
            req.fee_limit.and_then(|f| f.limit),
            Some(lnrpc::fee_limit::Limit::Fixed(5))
        );
    }

    #[test]
    fn closed_channels_request_sets_every_category() {
        let req = closed_channels_request();
        assert!(
            req.cooperative
                && req.local_force
                && req.remote_force
                && req.breach
                && req.funding_canceled
                && req.abandoned
        );
    }

    #[test]
    fn peer_address_parses_uri_form() {
        let addr: PeerAddress = format!("{PUBKEY}@127.0.0.1:9735").parse().unwrap();
        assert_eq!(addr.pubkey, PUBKEY);
        assert_eq!(addr.host, "127.0.0.1:9735");
        assert!(matches!(
            PUBKEY.parse::<PeerAddress>(),
            Err(RequestError::InvalidPeerAddress(_))
        ));
        assert!(matches!(
            "02ab@host".parse::<PeerAddress>(),
            Err(RequestError::InvalidPubkey(_))
        ));
    }

    #[test]
    fn payment_hash_must_be_32_bytes() {
        assert_eq!(decode_payment_hash(&"ab".repeat(32)).unwrap().len(), 32);
        assert!(decode_payment_hash("abcd").is_err());
        assert!(decode_payment_hash(&"zz".repeat(32)).is_err());
    }
}
