//! The persistence module.
//!
//! The store is the sole durable collaborator of the tracker engine. It is
//! defined by one [`Database`] trait with two implementations (two drivers):
//!
//! - [`Sqlite`](crate::core::databases::sqlite::Sqlite)
//! - [`Mysql`](crate::core::databases::mysql::Mysql)
//!
//! > **NOTICE**: There are no database migrations. Tables are created on
//! > startup if they do not exist.
//!
//! The persistent objects are:
//!
//! # Files
//!
//! Field         | Sample data                                | Description
//! ---|---|---
//! `id`          | 1                                          | Autoincrement id
//! `info_hash`   | `c1277613db1d28709b034a017ab2cae4be07ae10` | `BitTorrent` infohash V1, unique
//! `verified`    | 0                                          | Set out-of-band by an administrator
//! `create_time` | 1672419840                                 | Unix seconds
//! `update_time` | 1672419840                                 | Unix seconds
//!
//! # Users
//!
//! One row per tracker user: `username`, a unique 40-hex-char `passkey` and
//! the `torrent_limit` policy value.
//!
//! # Peers (`files_users`)
//!
//! Swarm membership, keyed by (`file_id`, `user_id`, `ip`). The `active` bit
//! is the truth source for peer lists and counts; rows are never deleted by
//! the tracker. [`Database::upsert_peer`] must be atomic with respect to
//! concurrent announces for the same key: last writer wins on every field
//! except `completed`, which is sticky once set.
//!
//! # Audit logs
//!
//! Append-only `announce_log` and `scrape_log` tables with the parsed request
//! fields. Appends are best-effort from the engine's point of view.
//!
//! # API keys and client whitelist
//!
//! Admin API credentials (`user_id`, `pubkey`, `secret`, `salt`) and the
//! user-agent whitelist (`client`, `approved`).
//!
//! # Error policy
//!
//! Every call returns a `Result`; a missing record is `Ok(None)`, never an
//! error.
pub mod driver;
pub mod error;
pub mod mysql;
pub mod sqlite;

use std::marker::PhantomData;
use std::time::Duration;

use async_trait::async_trait;

use self::error::Error;
use crate::core::auth::ApiKey;
use crate::core::logs::{AnnounceLog, ScrapeLog};
use crate::core::peer::{PeerInfo, PeerRecord};
use crate::core::torrent::FileRecord;
use crate::core::user::UserRecord;
use crate::core::whitelist::WhitelistRecord;

struct Builder<T>
where
    T: Database,
{
    phantom: PhantomData<T>,
}

impl<T> Builder<T>
where
    T: Database + 'static,
{
    pub(self) fn build(db_path: &str) -> Result<Box<dyn Database>, Error> {
        Ok(Box::new(T::new(db_path)?))
    }
}

/// The persistence trait. It contains all the methods the tracker engine,
/// the reaper and the admin API use to interact with the database.
#[async_trait]
pub trait Database: Sync + Send {
    /// It instantiates a new database driver.
    ///
    /// # Errors
    ///
    /// Will return an error if `db_path` cannot be opened as a database.
    fn new(db_path: &str) -> Result<Self, Error>
    where
        Self: std::marker::Sized;

    /// It generates the database tables. SQL queries are hardcoded in the
    /// trait implementation.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to create the tables.
    fn create_database_tables(&self) -> Result<(), Error>;

    /// It drops the database tables.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to drop the tables.
    fn drop_database_tables(&self) -> Result<(), Error>;

    // Files

    /// It loads a file (torrent) record by its id.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_file(&self, id: i64) -> Result<Option<FileRecord>, Error>;

    /// It loads a file (torrent) record by its 40-hex-char infohash.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_file_by_info_hash(&self, info_hash: &str) -> Result<Option<FileRecord>, Error>;

    /// It inserts a file record, or updates `verified` and `update_time` if
    /// the infohash is already known.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to save.
    async fn save_file(&self, file: &FileRecord) -> Result<(), Error>;

    /// It deletes a file record. Used by administrative purges only.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to delete.
    async fn delete_file(&self, id: i64) -> Result<(), Error>;

    /// It loads every file record.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn all_files(&self) -> Result<Vec<FileRecord>, Error>;

    // Users

    /// It loads a user record by its id.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_user(&self, id: i64) -> Result<Option<UserRecord>, Error>;

    /// It loads a user record by its passkey.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_user_by_passkey(&self, passkey: &str) -> Result<Option<UserRecord>, Error>;

    /// It inserts or updates a user record.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to save.
    async fn save_user(&self, user: &UserRecord) -> Result<(), Error>;

    /// It deletes a user record.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to delete.
    async fn delete_user(&self, id: i64) -> Result<(), Error>;

    /// It loads every user record.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn all_users(&self) -> Result<Vec<UserRecord>, Error>;

    // Peers

    /// It loads a swarm membership record by its (`file_id`, `user_id`, `ip`)
    /// key.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_peer(&self, file_id: i64, user_id: i64, ip: &str) -> Result<Option<PeerRecord>, Error>;

    /// It inserts or updates a swarm membership record in one atomic
    /// statement. Last writer wins on every field except `completed`, which
    /// stays set once set.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to save.
    async fn upsert_peer(&self, peer: &PeerRecord) -> Result<(), Error>;

    /// It loads every membership record of one swarm, active or not.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn file_peers(&self, file_id: i64) -> Result<Vec<PeerRecord>, Error>;

    // Swarm counts

    /// Number of active peers of the swarm with nothing left to download.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to count.
    async fn count_seeders(&self, file_id: i64) -> Result<i64, Error>;

    /// Number of active peers of the swarm with bytes left to download.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to count.
    async fn count_leechers(&self, file_id: i64) -> Result<i64, Error>;

    /// Number of peers, active or not, that ever completed the download.
    /// Counting records with the bit set is what makes repeated `completed`
    /// events idempotent.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to count.
    async fn count_completed(&self, file_id: i64) -> Result<i64, Error>;

    /// It returns the compact peer list for a swarm: 6 bytes per active peer
    /// (IPv4 and port, big-endian), excluding `exclude_ip`, capped at
    /// `limit` entries. Each (ip, port) pair appears at most once.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn compact_peer_list(&self, info_hash: &str, exclude_ip: &str, limit: u32) -> Result<Vec<u8>, Error>;

    // Reaper support

    /// Keys of the swarm's active peers whose last announce is older than
    /// `older_than`.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn inactive_peers(&self, file_id: i64, older_than: Duration) -> Result<Vec<PeerInfo>, Error>;

    /// It clears the `active` bit of the given peers in bulk. Idempotent.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to update.
    async fn mark_peers_inactive(&self, file_id: i64, peers: &[PeerInfo]) -> Result<(), Error>;

    // Per-user aggregates

    /// Number of swarms the user actively seeds.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to count.
    async fn user_seeding(&self, user_id: i64) -> Result<i64, Error>;

    /// Number of swarms the user actively leeches.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to count.
    async fn user_leeching(&self, user_id: i64) -> Result<i64, Error>;

    /// Total bytes the user reported as uploaded, across all swarms.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn user_uploaded(&self, user_id: i64) -> Result<i64, Error>;

    /// Total bytes the user reported as downloaded, across all swarms.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn user_downloaded(&self, user_id: i64) -> Result<i64, Error>;

    // API keys

    /// It loads the API key of a user.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_api_key(&self, user_id: i64) -> Result<Option<ApiKey>, Error>;

    /// It inserts or replaces the API key of a user.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to save.
    async fn save_api_key(&self, key: &ApiKey) -> Result<(), Error>;

    /// It deletes the API key of a user.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to delete.
    async fn delete_api_key(&self, user_id: i64) -> Result<(), Error>;

    // Whitelist

    /// It loads a whitelist record by its client user-agent string.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to load.
    async fn load_whitelist(&self, client: &str) -> Result<Option<WhitelistRecord>, Error>;

    /// It inserts or updates a whitelist record.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to save.
    async fn save_whitelist(&self, record: &WhitelistRecord) -> Result<(), Error>;

    // Audit logs

    /// It appends one announce to the audit log.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to append.
    async fn append_announce_log(&self, entry: &AnnounceLog) -> Result<(), Error>;

    /// It appends one scraped infohash to the audit log.
    ///
    /// # Errors
    ///
    /// Will return `Error` if unable to append.
    async fn append_scrape_log(&self, entry: &ScrapeLog) -> Result<(), Error>;
}

/// Builds the 6-byte-per-peer compact blob from (ip, port) rows, skipping
/// addresses that are not IPv4.
#[must_use]
pub(crate) fn compact_blob(rows: &[(String, u16)]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(rows.len() * 6);

    for (ip, port) in rows {
        let Ok(ip) = ip.parse::<std::net::Ipv4Addr>() else {
            continue;
        };
        blob.extend_from_slice(&ip.octets());
        blob.extend_from_slice(&port.to_be_bytes());
    }

    blob
}

#[cfg(test)]
mod tests {
    use super::compact_blob;

    #[test]
    fn it_should_pack_each_peer_into_six_big_endian_bytes() {
        let rows = vec![("126.0.0.1".to_string(), 6881u16), ("10.0.0.2".to_string(), 51413u16)];

        assert_eq!(
            compact_blob(&rows),
            vec![126, 0, 0, 1, 0x1a, 0xe1, 10, 0, 0, 2, 0xc8, 0xd5]
        );
    }

    #[test]
    fn it_should_skip_addresses_that_are_not_ipv4() {
        let rows = vec![("::1".to_string(), 6881u16), ("not-an-ip".to_string(), 1u16)];

        assert!(compact_blob(&rows).is_empty());
    }
}
