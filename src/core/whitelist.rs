//! Client (user-agent) whitelist data structures.
use serde::Serialize;

/// A known torrent client user-agent and whether an administrator has
/// approved it.
///
/// When the whitelist is active, unknown user-agents are inserted with
/// `approved = false` so an administrator can approve them later. Browsers
/// and crawlers are filtered out before insertion so they do not clutter the
/// table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistRecord {
    pub client: String,
    pub approved: bool,
}

impl WhitelistRecord {
    /// A new, not yet approved, client entry.
    #[must_use]
    pub fn pending(client: &str) -> Self {
        Self {
            client: client.to_string(),
            approved: false,
        }
    }
}
