//! Append-only audit trail for announce and scrape requests.
//!
//! Writes are fire-and-forget: a failed append is logged and never fails the
//! request that produced it.
use crate::core::AnnounceRequest;
use crate::shared::clock;

/// One parsed announce request, as appended to the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceLog {
    /// 40-char hex infohash.
    pub info_hash: String,
    pub passkey: String,
    pub ip: String,
    pub port: u16,
    pub udp: bool,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
    pub event: String,
    pub client: String,
    /// Unix seconds.
    pub time: i64,
}

impl AnnounceLog {
    #[must_use]
    pub fn from_request(req: &AnnounceRequest, passkey: &str) -> Self {
        Self {
            info_hash: req.info_hash.to_hex_string(),
            passkey: passkey.to_string(),
            ip: req.ip.clone(),
            port: req.port,
            udp: req.udp,
            uploaded: req.uploaded,
            downloaded: req.downloaded,
            left: req.left,
            event: req.event.to_string(),
            client: req.client.clone(),
            time: clock::now_unix(),
        }
    }
}

/// One scraped infohash, as appended to the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeLog {
    /// 40-char hex infohash.
    pub info_hash: String,
    pub passkey: String,
    pub ip: String,
    /// Unix seconds.
    pub time: i64,
}

impl ScrapeLog {
    #[must_use]
    pub fn new(info_hash: &str, passkey: &str, ip: &str) -> Self {
        Self {
            info_hash: info_hash.to_string(),
            passkey: passkey.to_string(),
            ip: ip.to_string(),
            time: clock::now_unix(),
        }
    }
}
