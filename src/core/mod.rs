//! The tracker core: the `BitTorrent` swarm coordination logic which is
//! independent of the delivery layer.
//!
//! Typically this module is used by the higher delivery modules:
//!
//! - The HTTP tracker
//! - The UDP tracker
//! - The tracker REST API
//!
//! ```text
//! Delivery layer     Domain layer
//!
//!     HTTP tracker |
//!      UDP tracker |> Core tracker
//! Tracker REST API |
//! ```
//!
//! # Announce
//!
//! Handling announce requests is the most important task for a tracker.
//! Front ends normalize their wire format into an [`AnnounceRequest`] and
//! call [`Tracker::announce`], which:
//!
//! 1. Enforces the per-user active torrent limit (anonymous UDP announces
//!    are exempt, UDP has no passkey slot).
//! 2. Creates the [`FileRecord`] for the infohash on first sight.
//! 3. Upserts the [`PeerRecord`] keyed by (file, user, ip). The `active` bit
//!    follows the announce event; `completed` is sticky so an out-of-order
//!    `started` replay can never un-complete a peer.
//! 4. Returns the compact peer list for the swarm (excluding the caller's
//!    ip) together with the swarm counts.
//!
//! The announce audit log is appended best-effort: a failed append is logged
//! and never fails the announce.
//!
//! # Scrape
//!
//! [`Tracker::scrape`] answers aggregate queries for a batch of infohashes.
//! It never fails per hash: unknown infohashes and store errors yield zeroed
//! counts.
//!
//! # Persistence
//!
//! All durable state lives behind the [`databases::Database`] trait. The
//! in-memory state of the whole tracker is limited to the transport counters
//! ([`statistics::Metrics`]) and the UDP connection map owned by the UDP
//! front end.
pub mod auth;
pub mod counter;
pub mod databases;
pub mod error;
pub mod logs;
pub mod peer;
pub mod statistics;
pub mod torrent;
pub mod user;
pub mod whitelist;

use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use self::databases::Database;
use self::error::Error;
use self::logs::{AnnounceLog, ScrapeLog};
use self::peer::PeerRecord;
use self::torrent::{FileRecord, SwarmMetadata};
use self::user::UserRecord;
use self::whitelist::WhitelistRecord;
use crate::config::Configuration;
use crate::shared::bit_torrent::info_hash::InfoHash;
use crate::shared::clock;

/// Peer list length used when a client does not say how many peers it
/// wants.
pub const DEFAULT_NUMWANT: u32 = 50;

/// The event a peer reports on announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    /// One of the announcements done at regular intervals.
    None,
    /// The peer has completed downloading the torrent.
    Completed,
    /// The peer has started downloading the torrent.
    Started,
    /// The peer has ceased downloading the torrent.
    Stopped,
}

impl AnnounceEvent {
    /// Event names on the HTTP querystring. Anything unknown counts as a
    /// regular interval announce.
    #[must_use]
    pub fn from_query_value(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "started" => Self::Started,
            "stopped" => Self::Stopped,
            _ => Self::None,
        }
    }

    /// Event codes on the UDP wire.
    #[must_use]
    pub fn from_udp_code(code: u32) -> Self {
        match code {
            1 => Self::Completed,
            2 => Self::Started,
            3 => Self::Stopped,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, ""),
            Self::Completed => write!(f, "completed"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A normalized, transport-agnostic announce request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub info_hash: InfoHash,
    /// Dotted-quad IPv4 of the announcing peer.
    pub ip: String,
    pub port: u16,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
    pub event: AnnounceEvent,
    /// Requested peer list length; capped by the configured maximum.
    pub numwant: u32,
    /// Client user-agent; empty over UDP.
    pub client: String,
    pub udp: bool,
}

/// Data returned by an announce request, encoded by the originating front
/// end in its own wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceData {
    pub interval: u32,
    pub min_interval: u32,
    /// Compact peer list, 6 bytes per peer.
    pub peers: Vec<u8>,
    pub seeders: i64,
    pub leechers: i64,
    pub completed: i64,
}

/// Data returned by a scrape request, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScrapeData {
    pub files: Vec<(InfoHash, SwarmMetadata)>,
}

impl ScrapeData {
    /// Creates a new empty `ScrapeData` with no files (torrents).
    #[must_use]
    pub fn empty() -> Self {
        Self { files: Vec::new() }
    }

    /// Adds a torrent to the `ScrapeData`.
    pub fn add_file(&mut self, info_hash: InfoHash, metadata: SwarmMetadata) {
        self.files.push((info_hash, metadata));
    }
}

/// The domain layer tracker service.
///
/// Its main responsibility is to handle the announce and scrape requests.
/// It also carries the store handle, the client policy checks (passkey,
/// whitelist, torrent limit) and the transport counters.
///
/// > **NOTICE**: the `Tracker` is not responsible for handling the network
/// > layer; it never writes to a socket.
pub struct Tracker {
    config: Arc<Configuration>,
    /// A database driver implementation: [`Sqlite3`](databases::sqlite) or
    /// [`MySQL`](databases::mysql).
    pub database: Arc<Box<dyn Database>>,
    /// Per-transport request counters.
    pub stats: statistics::Metrics,
}

impl Tracker {
    /// `Tracker` constructor. Connects the configured store and creates its
    /// tables.
    ///
    /// # Errors
    ///
    /// Will return a `databases::error::Error` if unable to connect to the
    /// database.
    pub fn new(config: Arc<Configuration>) -> Result<Tracker, databases::error::Error> {
        let database = Arc::new(databases::driver::build(&config.store.driver, &config.store.path)?);

        Ok(Self::with_database(config, database))
    }

    /// `Tracker` constructor over an already connected store.
    #[must_use]
    pub fn with_database(config: Arc<Configuration>, database: Arc<Box<dyn Database>>) -> Tracker {
        Tracker {
            config,
            database,
            stats: statistics::Metrics::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// It resolves the user a request announces as.
    ///
    /// When passkey mode is off an unknown or missing passkey falls back to
    /// the anonymous user; when it is on, both are failures.
    ///
    /// # Errors
    ///
    /// Will return `Error::MissingPasskey` or `Error::InvalidPasskey` in
    /// passkey mode, or a store error.
    pub async fn resolve_user(&self, passkey: Option<&str>) -> Result<UserRecord, Error> {
        if self.config.passkey && passkey.is_none() {
            return Err(Error::MissingPasskey);
        }

        let user = match passkey {
            Some(passkey) => self.database.load_user_by_passkey(passkey).await?,
            None => None,
        };

        match user {
            Some(user) => Ok(user),
            None if self.config.passkey => Err(Error::InvalidPasskey),
            None => Ok(UserRecord::anonymous()),
        }
    }

    /// It checks the client user-agent against the whitelist, when the
    /// whitelist is active.
    ///
    /// Unknown clients are recorded with `approved = false` for later manual
    /// approval. Browsers and crawlers (`Mozilla`, `Opera`) are rejected
    /// without being recorded so they do not clutter the table.
    ///
    /// # Errors
    ///
    /// Will return `Error::ClientNotWhitelisted` unless the client is known
    /// and approved, or a store error.
    pub async fn check_client_whitelist(&self, client: &str) -> Result<(), Error> {
        if !self.config.whitelist {
            return Ok(());
        }

        match self.database.load_whitelist(client).await? {
            Some(record) if record.approved => Ok(()),
            Some(_) => Err(Error::ClientNotWhitelisted),
            None => {
                if !client.contains("Mozilla") && !client.contains("Opera") {
                    info!("whitelist: detected new client '{client}', awaiting manual approval");

                    if let Err(e) = self.database.save_whitelist(&WhitelistRecord::pending(client)).await {
                        warn!("whitelist: could not record client '{client}': {e}");
                    }
                }

                Err(Error::ClientNotWhitelisted)
            }
        }
    }

    /// It handles an announce request.
    ///
    /// # Errors
    ///
    /// Will return `Error::TorrentLimitExceeded` when a non-anonymous user
    /// is active in more swarms than its limit allows, or a store error.
    pub async fn announce(&self, user: &UserRecord, req: &AnnounceRequest) -> Result<AnnounceData, Error> {
        if !user.is_anonymous() {
            let active = self.database.user_seeding(user.id).await? + self.database.user_leeching(user.id).await?;

            if active > user.torrent_limit {
                return Err(Error::TorrentLimitExceeded {
                    active,
                    limit: user.torrent_limit,
                });
            }
        }

        let info_hash = req.info_hash.to_hex_string();
        let file = self.load_or_create_file(&info_hash).await?;

        let now = clock::now_unix();
        let peer = PeerRecord {
            file_id: file.id,
            user_id: user.id,
            ip: req.ip.clone(),
            port: req.port,
            active: req.event != AnnounceEvent::Stopped,
            completed: req.event == AnnounceEvent::Completed,
            announced: now,
            uploaded: req.uploaded,
            downloaded: req.downloaded,
            left: req.left,
        };

        self.database.upsert_peer(&peer).await?;

        let numwant = req.numwant.min(self.config.max_numwant);
        let peers = self.database.compact_peer_list(&info_hash, &req.ip, numwant).await?;

        let seeders = self.database.count_seeders(file.id).await?;
        let leechers = self.database.count_leechers(file.id).await?;
        let completed = self.database.count_completed(file.id).await?;

        if let Err(e) = self.database.append_announce_log(&AnnounceLog::from_request(req, &user.passkey)).await {
            warn!("could not append announce log: {e}");
        }

        Ok(AnnounceData {
            interval: self.config.interval,
            min_interval: self.config.min_interval(),
            peers,
            seeders,
            leechers,
            completed,
        })
    }

    /// It handles a scrape request. Unknown infohashes and store errors
    /// yield zeroed counts; a scrape as a whole never fails.
    pub async fn scrape(&self, user: &UserRecord, info_hashes: &[InfoHash], origin_ip: &str) -> ScrapeData {
        let mut scrape_data = ScrapeData::empty();

        for info_hash in info_hashes {
            let hex = info_hash.to_hex_string();

            let metadata = match self.swarm_metadata(&hex).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("scrape failed for {hex}: {e}");
                    SwarmMetadata::zeroed()
                }
            };

            if let Err(e) = self.database.append_scrape_log(&ScrapeLog::new(&hex, &user.passkey, origin_ip)).await {
                warn!("could not append scrape log: {e}");
            }

            scrape_data.add_file(*info_hash, metadata);
        }

        scrape_data
    }

    /// Swarm counts for one file, zeroed when the infohash is unknown.
    ///
    /// # Errors
    ///
    /// Will return a store error.
    pub async fn swarm_metadata(&self, info_hash: &str) -> Result<SwarmMetadata, databases::error::Error> {
        let Some(file) = self.database.load_file_by_info_hash(info_hash).await? else {
            return Ok(SwarmMetadata::zeroed());
        };

        Ok(SwarmMetadata {
            complete: self.database.count_seeders(file.id).await?,
            downloaded: self.database.count_completed(file.id).await?,
            incomplete: self.database.count_leechers(file.id).await?,
        })
    }

    /// It clears the `active` bit of every peer that has not announced for
    /// longer than the announce interval plus a 60 second grace.
    ///
    /// Rows are never deleted, which makes reaping idempotent and
    /// retry-safe.
    ///
    /// # Errors
    ///
    /// Will return a store error if the file list cannot be loaded. Failures
    /// on a single file are logged and reaping continues with the next one.
    pub async fn reap_inactive_peers(&self) -> Result<(), databases::error::Error> {
        let older_than = Duration::from_secs(u64::from(self.config.interval) + 60);

        for file in self.database.all_files().await? {
            let inactive = match self.database.inactive_peers(file.id, older_than).await {
                Ok(inactive) => inactive,
                Err(e) => {
                    warn!("reaper: could not list inactive peers on file {}: {e}", file.id);
                    continue;
                }
            };

            if inactive.is_empty() {
                continue;
            }

            if let Err(e) = self.database.mark_peers_inactive(file.id, &inactive).await {
                warn!("reaper: could not mark peers inactive on file {}: {e}", file.id);
                continue;
            }

            info!("reaper: reaped {} peer(s) on file {}", inactive.len(), file.id);
        }

        Ok(())
    }

    async fn load_or_create_file(&self, info_hash: &str) -> Result<FileRecord, Error> {
        if let Some(file) = self.database.load_file_by_info_hash(info_hash).await? {
            return Ok(file);
        }

        let now = clock::now_unix();
        self.database
            .save_file(&FileRecord {
                id: 0,
                info_hash: info_hash.to_string(),
                verified: false,
                create_time: now,
                update_time: now,
            })
            .await?;

        match self.database.load_file_by_info_hash(info_hash).await? {
            Some(file) => Ok(file),
            None => Err(Error::Database(databases::error::Error::InsertFailed {
                location: Location::caller(),
                driver: self.config.store.driver,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::databases::sqlite::Sqlite;
    use super::databases::Database;
    use super::{AnnounceEvent, AnnounceRequest, Error, Tracker};
    use crate::config::Configuration;
    use crate::core::user::UserRecord;
    use crate::shared::bit_torrent::info_hash::InfoHash;
    use crate::shared::clock;

    fn ephemeral_tracker() -> Tracker {
        static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

        let path = std::env::temp_dir().join(format!(
            "goat-tracker-core-{}-{}.db",
            std::process::id(),
            NEXT_DB.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_file(&path);

        let database = Sqlite::new(path.to_str().unwrap()).unwrap();
        database.create_database_tables().unwrap();

        let config = Arc::new(Configuration::default());

        Tracker::with_database(config, Arc::new(Box::new(database) as Box<dyn Database>))
    }

    fn sample_request(info_hash: InfoHash, ip: &str) -> AnnounceRequest {
        AnnounceRequest {
            info_hash,
            ip: ip.to_string(),
            port: 6881,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::Started,
            numwant: 50,
            client: "Test/1.0".to_string(),
            udp: false,
        }
    }

    async fn registered_user(tracker: &Tracker, username: &str, torrent_limit: i64) -> UserRecord {
        let passkey = format!("{:0>40}", username.len() * 7);
        tracker
            .database
            .save_user(&UserRecord {
                id: 0,
                username: username.to_string(),
                passkey: passkey.clone(),
                torrent_limit,
            })
            .await
            .unwrap();

        tracker.database.load_user_by_passkey(&passkey).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn an_announce_for_an_unknown_info_hash_should_create_the_file_record() {
        let tracker = ephemeral_tracker();
        let info_hash = InfoHash([0x69; 20]);

        let data = tracker
            .announce(&UserRecord::anonymous(), &sample_request(info_hash, "126.0.0.1"))
            .await
            .unwrap();

        assert_eq!(data.interval, tracker.config().interval);
        assert_eq!(data.min_interval, tracker.config().interval / 2);
        assert_eq!(data.seeders, 1);
        assert_eq!(data.leechers, 0);

        let file = tracker
            .database
            .load_file_by_info_hash(&info_hash.to_hex_string())
            .await
            .unwrap();
        assert!(file.is_some());
    }

    #[tokio::test]
    async fn the_peer_list_should_exclude_the_announcing_peer() {
        let tracker = ephemeral_tracker();
        let info_hash = InfoHash([0x69; 20]);
        let user = registered_user(&tracker, "alpha", 50).await;

        tracker
            .announce(&user, &sample_request(info_hash, "126.0.0.1"))
            .await
            .unwrap();

        let data = tracker
            .announce(&UserRecord::anonymous(), &sample_request(info_hash, "126.0.0.2"))
            .await
            .unwrap();

        assert_eq!(data.peers, vec![126, 0, 0, 1, 0x1a, 0xe1]);

        // And the first announcer does not see itself either.
        let data = tracker
            .announce(&user, &sample_request(info_hash, "126.0.0.1"))
            .await
            .unwrap();
        assert_eq!(data.peers, vec![126, 0, 0, 2, 0x1a, 0xe1]);
    }

    #[tokio::test]
    async fn the_completed_bit_should_survive_a_later_started_event() {
        let tracker = ephemeral_tracker();
        let info_hash = InfoHash([0x42; 20]);

        let mut request = sample_request(info_hash, "126.0.0.1");
        request.event = AnnounceEvent::Completed;
        tracker.announce(&UserRecord::anonymous(), &request).await.unwrap();

        request.event = AnnounceEvent::Started;
        let data = tracker.announce(&UserRecord::anonymous(), &request).await.unwrap();

        assert_eq!(data.completed, 1);

        // A second completed event does not double-count either.
        request.event = AnnounceEvent::Completed;
        let data = tracker.announce(&UserRecord::anonymous(), &request).await.unwrap();
        assert_eq!(data.completed, 1);
    }

    #[tokio::test]
    async fn a_stopped_event_should_deactivate_the_peer() {
        let tracker = ephemeral_tracker();
        let info_hash = InfoHash([0x42; 20]);

        let mut request = sample_request(info_hash, "126.0.0.1");
        tracker.announce(&UserRecord::anonymous(), &request).await.unwrap();

        request.event = AnnounceEvent::Stopped;
        let data = tracker.announce(&UserRecord::anonymous(), &request).await.unwrap();

        assert_eq!(data.seeders, 0);

        let other = tracker
            .announce(&UserRecord::anonymous(), &sample_request(info_hash, "126.0.0.2"))
            .await
            .unwrap();
        assert!(other.peers.is_empty());
    }

    #[tokio::test]
    async fn a_user_over_its_torrent_limit_should_be_rejected() {
        let tracker = ephemeral_tracker();
        let user = registered_user(&tracker, "limited", 1).await;

        tracker
            .announce(&user, &sample_request(InfoHash([0x01; 20]), "126.0.0.1"))
            .await
            .unwrap();

        let mut leeching = sample_request(InfoHash([0x02; 20]), "126.0.0.1");
        leeching.left = 1024;
        tracker.announce(&user, &leeching).await.unwrap();

        // Seeding one and leeching one: the next announce is over the limit.
        let error = tracker
            .announce(&user, &sample_request(InfoHash([0x03; 20]), "126.0.0.1"))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Exceeded active torrent limit: 2 > 1");
    }

    #[tokio::test]
    async fn anonymous_announces_should_be_exempt_from_the_torrent_limit() {
        let tracker = ephemeral_tracker();

        for i in 1..=3u8 {
            tracker
                .announce(&UserRecord::anonymous(), &sample_request(InfoHash([i; 20]), "126.0.0.1"))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn scrape_should_report_counts_per_hash_and_zeros_for_unknown_hashes() {
        let tracker = ephemeral_tracker();
        let known = InfoHash([0x69; 20]);
        let unknown = InfoHash([0x42; 20]);

        let mut request = sample_request(known, "126.0.0.1");
        request.event = AnnounceEvent::Completed;
        tracker.announce(&UserRecord::anonymous(), &request).await.unwrap();

        let scrape = tracker.scrape(&UserRecord::anonymous(), &[known, unknown], "126.0.0.9").await;

        assert_eq!(scrape.files.len(), 2);
        assert_eq!(scrape.files[0].0, known);
        assert_eq!(scrape.files[0].1.complete, 1);
        assert_eq!(scrape.files[0].1.downloaded, 1);
        assert_eq!(scrape.files[0].1.incomplete, 0);
        assert_eq!(scrape.files[1].1.complete, 0);
    }

    #[tokio::test]
    async fn the_reaper_should_deactivate_peers_past_the_interval_plus_grace() {
        let tracker = ephemeral_tracker();
        let info_hash = InfoHash([0x69; 20]);

        tracker
            .announce(&UserRecord::anonymous(), &sample_request(info_hash, "126.0.0.1"))
            .await
            .unwrap();

        // Backdate the announce beyond interval + 60s.
        let file = tracker
            .database
            .load_file_by_info_hash(&info_hash.to_hex_string())
            .await
            .unwrap()
            .unwrap();
        let mut peer = tracker.database.load_peer(file.id, 0, "126.0.0.1").await.unwrap().unwrap();
        peer.announced = clock::now_unix() - i64::from(tracker.config().interval) - 61;
        tracker.database.upsert_peer(&peer).await.unwrap();

        tracker.reap_inactive_peers().await.unwrap();

        assert!(!tracker.database.load_peer(file.id, 0, "126.0.0.1").await.unwrap().unwrap().active);
        assert_eq!(tracker.database.count_seeders(file.id).await.unwrap(), 0);
        assert!(tracker
            .database
            .compact_peer_list(&info_hash.to_hex_string(), "0.0.0.0", 50)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn resolving_users_should_honor_passkey_mode() {
        let tracker = ephemeral_tracker();
        let user = registered_user(&tracker, "alpha", 10).await;

        // Passkey mode off: unknown passkeys fall back to anonymous.
        assert!(tracker.resolve_user(None).await.unwrap().is_anonymous());
        assert_eq!(tracker.resolve_user(Some(&user.passkey)).await.unwrap().id, user.id);

        let mut config = Configuration::default();
        config.passkey = true;
        let strict = Tracker::with_database(Arc::new(config), tracker.database.clone());

        assert!(matches!(strict.resolve_user(None).await.unwrap_err(), Error::MissingPasskey));
        assert!(matches!(
            strict.resolve_user(Some("bad")).await.unwrap_err(),
            Error::InvalidPasskey
        ));
        assert_eq!(strict.resolve_user(Some(&user.passkey)).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn unknown_clients_should_be_recorded_pending_but_browsers_should_not() {
        let mut config = Configuration::default();
        config.whitelist = true;

        let tracker = ephemeral_tracker();
        let tracker = Tracker::with_database(Arc::new(config), tracker.database.clone());

        assert!(tracker.check_client_whitelist("Deluge 2.0.3").await.is_err());
        assert!(tracker.database.load_whitelist("Deluge 2.0.3").await.unwrap().is_some());

        assert!(tracker.check_client_whitelist("Mozilla/5.0").await.is_err());
        assert!(tracker.database.load_whitelist("Mozilla/5.0").await.unwrap().is_none());

        // Approval flips the outcome.
        tracker
            .database
            .save_whitelist(&crate::core::whitelist::WhitelistRecord {
                client: "Deluge 2.0.3".to_string(),
                approved: true,
            })
            .await
            .unwrap();
        assert!(tracker.check_client_whitelist("Deluge 2.0.3").await.is_ok());
    }
}
