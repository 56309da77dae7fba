//! Swarm membership data structures.
use serde::Serialize;

/// Membership of a peer in a swarm, keyed by (`file_id`, `user_id`, `ip`).
///
/// Records are created on the first announce for the key and updated on every
/// later announce. They are never deleted: the reaper and `stopped` events
/// only clear the `active` bit, which is the truth source for peer lists and
/// swarm counts.
///
/// Two clients behind one NAT share a record; the later announcer overwrites
/// the port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRecord {
    pub file_id: i64,
    pub user_id: i64,
    /// Dotted-quad IPv4 address, as reported or taken from the transport.
    pub ip: String,
    pub port: u16,
    pub active: bool,
    /// Sticky: once set by a `completed` event, no later announce clears it.
    pub completed: bool,
    /// Unix seconds of the last announce for this key.
    pub announced: i64,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
}

impl PeerRecord {
    /// A peer that has all the data (`left == 0`) seeds the swarm.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left == 0
    }
}

/// Key of a peer inside one swarm, used by the reaper to address records in
/// bulk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    pub user_id: i64,
    pub ip: String,
}
