//! Tracker user data structures.
use serde::Serialize;

/// A tracker user. Users are identified on announce URLs by their passkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    /// 40-char hex token embedded in announce URLs. The empty passkey is the
    /// anonymous user.
    pub passkey: String,
    /// Maximum number of swarms the user may be active in at once.
    pub torrent_limit: i64,
}

impl UserRecord {
    /// The zero user: UDP announces carry no passkey and are attributed to it.
    /// Anonymous announces are exempt from the torrent limit.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            id: 0,
            username: String::new(),
            passkey: String::new(),
            torrent_limit: 0,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id == 0
    }
}
