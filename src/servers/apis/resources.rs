//! JSON representations of the tracker records served by the admin API.
use serde::Serialize;

use crate::core::databases;
use crate::core::peer::PeerRecord;
use crate::core::statistics::MetricsSnapshot;
use crate::core::torrent::FileRecord;
use crate::core::user::UserRecord;
use crate::core::Tracker;

/// A tracked file with its swarm counters and membership list.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    pub id: i64,
    pub info_hash: String,
    pub verified: bool,
    pub create_time: i64,
    pub update_time: i64,
    pub completed: i64,
    pub seeders: i64,
    pub leechers: i64,
    pub file_users: Vec<PeerRecord>,
}

impl FileResource {
    /// It loads the swarm counters and membership for one file record.
    ///
    /// # Errors
    ///
    /// Will return a store error.
    pub async fn from_record(tracker: &Tracker, file: FileRecord) -> Result<Self, databases::error::Error> {
        Ok(Self {
            completed: tracker.database.count_completed(file.id).await?,
            seeders: tracker.database.count_seeders(file.id).await?,
            leechers: tracker.database.count_leechers(file.id).await?,
            file_users: tracker.database.file_peers(file.id).await?,
            id: file.id,
            info_hash: file.info_hash,
            verified: file.verified,
            create_time: file.create_time,
            update_time: file.update_time,
        })
    }
}

/// A tracker user with its activity aggregates.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResource {
    pub id: i64,
    pub username: String,
    pub passkey: String,
    pub torrent_limit: i64,
    pub seeding: i64,
    pub leeching: i64,
    pub uploaded: i64,
    pub downloaded: i64,
}

impl UserResource {
    /// It loads the activity aggregates for one user record.
    ///
    /// # Errors
    ///
    /// Will return a store error.
    pub async fn from_record(tracker: &Tracker, user: UserRecord) -> Result<Self, databases::error::Error> {
        Ok(Self {
            seeding: tracker.database.user_seeding(user.id).await?,
            leeching: tracker.database.user_leeching(user.id).await?,
            uploaded: tracker.database.user_uploaded(user.id).await?,
            downloaded: tracker.database.user_downloaded(user.id).await?,
            id: user.id,
            username: user.username,
            passkey: user.passkey,
            torrent_limit: user.torrent_limit,
        })
    }
}

/// Facts about the process running the tracker.
#[derive(Serialize, Debug)]
pub struct ServerStatus {
    pub pid: u32,
    pub hostname: String,
    pub platform: String,
    pub architecture: String,
    pub num_cpu: usize,
    pub num_tasks: usize,
    pub memory_mb: f64,
    pub http_total: i64,
    pub http_current: i64,
}

impl ServerStatus {
    #[must_use]
    pub fn snapshot(metrics: &MetricsSnapshot) -> Self {
        Self {
            pid: std::process::id(),
            hostname: hostname(),
            platform: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            num_cpu: std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get),
            num_tasks: alive_tasks(),
            memory_mb: resident_memory_mb(),
            http_total: metrics.http_total,
            http_current: metrics.http_current,
        }
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|hostname| !hostname.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|hostname| hostname.trim().to_string())
                .filter(|hostname| !hostname.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

fn alive_tasks() -> usize {
    tokio::runtime::Handle::try_current().map_or(0, |handle| handle.metrics().num_alive_tasks())
}

#[cfg(target_os = "linux")]
fn resident_memory_mb() -> f64 {
    let Ok(statm) = std::fs::read_to_string("/proc/self/statm") else {
        return 0.0;
    };

    let resident_pages: f64 = statm
        .split_whitespace()
        .nth(1)
        .and_then(|pages| pages.parse().ok())
        .unwrap_or(0.0);

    resident_pages * 4096.0 / 1_000_000.0
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_mb() -> f64 {
    0.0
}
