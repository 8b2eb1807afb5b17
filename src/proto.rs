// Generated prost/tonic code. build.rs emits lnrpc.rs into OUT_DIR
pub mod lnrpc {
    #![allow(clippy::all, clippy::pedantic, missing_docs)]
    include!(concat!(env!("OUT_DIR"), "/lnrpc.rs"));
}

use lnrpc::{channel_point::FundingTxid, close_status_update, open_status_update};

/// Render raw txid bytes (internal byte order) the way block explorers print them.
#[must_use]
pub fn txid_display(raw: &[u8]) -> String {
    let mut reversed = raw.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}

impl lnrpc::PendingUpdate {
    /// `<txid>:<output_index>` of the pending transaction.
    #[must_use]
    pub fn outpoint(&self) -> String {
        format!("{}:{}", txid_display(&self.txid), self.output_index)
    }
}

impl lnrpc::ChannelPoint {
    /// `<txid>:<output_index>`, whichever txid form the node sent.
    #[must_use]
    pub fn outpoint(&self) -> String {
        let txid = match &self.funding_txid {
            Some(FundingTxid::FundingTxidStr(s)) => s.clone(),
            Some(FundingTxid::FundingTxidBytes(b)) => txid_display(b),
            None => String::new(),
        };
        format!("{txid}:{}", self.output_index)
    }
}

impl lnrpc::OpenStatusUpdate {
    /// Short human-readable summary of this update.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.update {
            Some(open_status_update::Update::ChanPending(p)) => {
                format!("pending: {}", p.outpoint())
            }
            Some(open_status_update::Update::ChanOpen(o)) => format!(
                "open: {}",
                o.channel_point
                    .as_ref()
                    .map(lnrpc::ChannelPoint::outpoint)
                    .unwrap_or_default()
            ),
            None => "no update".to_string(),
        }
    }
}

impl lnrpc::CloseStatusUpdate {
    /// Short human-readable summary of this update.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.update {
            Some(close_status_update::Update::ClosePending(p)) => {
                format!("closing: {}", p.outpoint())
            }
            Some(close_status_update::Update::ChanClose(c)) => format!(
                "closed: {} (success: {})",
                txid_display(&c.closing_txid),
                c.success
            ),
            None => "no update".to_string(),
        }
    }
}
