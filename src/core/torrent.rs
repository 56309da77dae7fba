//! Torrent (file) data structures stored by the tracker.
use serde::Serialize;

/// A torrent tracked by the tracker, one row per known infohash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    /// 40-char lowercase hex infohash. Unique per record.
    pub info_hash: String,
    /// Set out-of-band by an administrator; unverified torrents are tracked
    /// all the same.
    pub verified: bool,
    /// Unix seconds.
    pub create_time: i64,
    /// Unix seconds.
    pub update_time: i64,
}

/// Aggregate swarm counters for one torrent.
///
/// Field names follow the `scrape` response convention: `complete` are the
/// active seeders, `downloaded` counts every peer that ever completed,
/// `incomplete` are the active leechers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwarmMetadata {
    pub complete: i64,
    pub downloaded: i64,
    pub incomplete: i64,
}

impl SwarmMetadata {
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }
}
