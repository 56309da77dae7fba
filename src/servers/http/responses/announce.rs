//! `Announce` response for the HTTP tracker.
//!
//! Only the compact form of [BEP 23](https://www.bittorrent.org/beps/bep_0023.html)
//! is produced: the tracker rejects announces without `compact=1` before it
//! gets here. `peers` is a raw byte string of 6 bytes per peer (IPv4 and
//! port, both big-endian).
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use super::Writer;
use crate::core::AnnounceData;

/// Compact `announce` response.
///
/// ```text
/// d8:intervali3600e12:min intervali1800e5:peers6:~~~~~~e
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Announce {
    /// Seconds the client should wait between regular announces.
    pub interval: u32,
    /// Clients must not reannounce more frequently than this.
    pub min_interval: u32,
    /// Compact peer list, 6 bytes per peer.
    pub peers: Vec<u8>,
}

impl Announce {
    /// Returns the bencoded body of the announce response. Keys are emitted
    /// in sorted order as bencode requires.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut writer = Writer::new();

        writer.start_dict();
        writer.str("interval");
        writer.int(i64::from(self.interval));
        writer.str("min interval");
        writer.int(i64::from(self.min_interval));
        writer.str("peers");
        writer.bytes(&self.peers);
        writer.end();

        writer.finalize()
    }
}

impl From<AnnounceData> for Announce {
    fn from(data: AnnounceData) -> Self {
        Self {
            interval: data.interval,
            min_interval: data.min_interval,
            peers: data.peers,
        }
    }
}

impl IntoResponse for Announce {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, super::CONTENT_TYPE)], self.body()).into_response()
    }
}
