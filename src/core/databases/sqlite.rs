//! The `SQLite3` database driver.
use std::time::Duration;

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::{params, OptionalExtension, Row};
use r2d2_sqlite::SqliteConnectionManager;

use super::driver::Driver;
use super::{compact_blob, Database, Error};
use crate::core::auth::ApiKey;
use crate::core::logs::{AnnounceLog, ScrapeLog};
use crate::core::peer::{PeerInfo, PeerRecord};
use crate::core::torrent::FileRecord;
use crate::core::user::UserRecord;
use crate::core::whitelist::WhitelistRecord;
use crate::shared::clock;

const DRIVER: Driver = Driver::Sqlite3;

pub struct Sqlite {
    pool: Pool<SqliteConnectionManager>,
}

fn file_from_row(row: &Row<'_>) -> r2d2_sqlite::rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        info_hash: row.get(1)?,
        verified: row.get(2)?,
        create_time: row.get(3)?,
        update_time: row.get(4)?,
    })
}

fn user_from_row(row: &Row<'_>) -> r2d2_sqlite::rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        passkey: row.get(2)?,
        torrent_limit: row.get(3)?,
    })
}

fn peer_from_row(row: &Row<'_>) -> r2d2_sqlite::rusqlite::Result<PeerRecord> {
    Ok(PeerRecord {
        file_id: row.get(0)?,
        user_id: row.get(1)?,
        ip: row.get(2)?,
        port: row.get(3)?,
        active: row.get(4)?,
        completed: row.get(5)?,
        announced: row.get(6)?,
        uploaded: row.get(7)?,
        downloaded: row.get(8)?,
        left: row.get(9)?,
    })
}

const PEER_COLUMNS: &str = "file_id, user_id, ip, port, active, completed, announced, uploaded, downloaded, \"left\"";

#[async_trait]
impl Database for Sqlite {
    /// It instantiates a new `SQLite3` database driver.
    ///
    /// Refer to [`Database::new`].
    ///
    /// # Errors
    ///
    /// Will return `r2d2::Error` if `db_path` is not able to create an
    /// `SQLite` database.
    fn new(db_path: &str) -> Result<Sqlite, Error> {
        let cm = SqliteConnectionManager::file(db_path);
        Pool::new(cm).map_or_else(|err| Err((err, DRIVER).into()), |pool| Ok(Sqlite { pool }))
    }

    /// Refer to [`Database::create_database_tables`].
    fn create_database_tables(&self) -> Result<(), Error> {
        let create_files_table = "
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL UNIQUE,
            verified INTEGER DEFAULT 0 NOT NULL,
            create_time INTEGER NOT NULL,
            update_time INTEGER NOT NULL
        );";

        let create_users_table = "
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            passkey TEXT NOT NULL UNIQUE,
            torrent_limit INTEGER DEFAULT 0 NOT NULL
        );";

        let create_files_users_table = "
        CREATE TABLE IF NOT EXISTS files_users (
            file_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            ip TEXT NOT NULL,
            port INTEGER NOT NULL,
            active INTEGER NOT NULL,
            completed INTEGER NOT NULL,
            announced INTEGER NOT NULL,
            uploaded INTEGER NOT NULL,
            downloaded INTEGER NOT NULL,
            \"left\" INTEGER NOT NULL,
            PRIMARY KEY (file_id, user_id, ip)
        );";

        let create_api_keys_table = "
        CREATE TABLE IF NOT EXISTS api_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL UNIQUE,
            pubkey TEXT NOT NULL,
            secret TEXT NOT NULL,
            salt TEXT NOT NULL
        );";

        let create_whitelist_table = "
        CREATE TABLE IF NOT EXISTS whitelist (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client TEXT NOT NULL UNIQUE,
            approved INTEGER DEFAULT 0 NOT NULL
        );";

        let create_announce_log_table = "
        CREATE TABLE IF NOT EXISTS announce_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL,
            passkey TEXT NOT NULL,
            ip TEXT NOT NULL,
            port INTEGER NOT NULL,
            udp INTEGER NOT NULL,
            uploaded INTEGER NOT NULL,
            downloaded INTEGER NOT NULL,
            \"left\" INTEGER NOT NULL,
            event TEXT NOT NULL,
            client TEXT NOT NULL,
            time INTEGER NOT NULL
        );";

        let create_scrape_log_table = "
        CREATE TABLE IF NOT EXISTS scrape_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            info_hash TEXT NOT NULL,
            passkey TEXT NOT NULL,
            ip TEXT NOT NULL,
            time INTEGER NOT NULL
        );";

        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(create_files_table, []).map_err(|e| (e, DRIVER))?;
        conn.execute(create_users_table, []).map_err(|e| (e, DRIVER))?;
        conn.execute(create_files_users_table, []).map_err(|e| (e, DRIVER))?;
        conn.execute(create_api_keys_table, []).map_err(|e| (e, DRIVER))?;
        conn.execute(create_whitelist_table, []).map_err(|e| (e, DRIVER))?;
        conn.execute(create_announce_log_table, []).map_err(|e| (e, DRIVER))?;
        conn.execute(create_scrape_log_table, []).map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    /// Refer to [`Database::drop_database_tables`].
    fn drop_database_tables(&self) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        for table in [
            "files",
            "users",
            "files_users",
            "api_keys",
            "whitelist",
            "announce_log",
            "scrape_log",
        ] {
            conn.execute(&format!("DROP TABLE IF EXISTS {table};"), [])
                .map_err(|e| (e, DRIVER))?;
        }

        Ok(())
    }

    async fn load_file(&self, id: i64) -> Result<Option<FileRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT id, info_hash, verified, create_time, update_time FROM files WHERE id = ?1",
            params![id],
            file_from_row,
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn load_file_by_info_hash(&self, info_hash: &str) -> Result<Option<FileRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT id, info_hash, verified, create_time, update_time FROM files WHERE info_hash = ?1",
            params![info_hash],
            file_from_row,
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn save_file(&self, file: &FileRecord) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO files (info_hash, verified, create_time, update_time) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(info_hash) DO UPDATE SET verified = excluded.verified, update_time = excluded.update_time",
            params![file.info_hash, file.verified, file.create_time, file.update_time],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn delete_file(&self, id: i64) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("DELETE FROM files WHERE id = ?1", params![id])
            .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn all_files(&self) -> Result<Vec<FileRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn
            .prepare("SELECT id, info_hash, verified, create_time, update_time FROM files")
            .map_err(|e| (e, DRIVER))?;

        let files = stmt
            .query_map([], file_from_row)
            .map_err(|e| (e, DRIVER))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(files)
    }

    async fn load_user(&self, id: i64) -> Result<Option<UserRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT id, username, passkey, torrent_limit FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn load_user_by_passkey(&self, passkey: &str) -> Result<Option<UserRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT id, username, passkey, torrent_limit FROM users WHERE passkey = ?1",
            params![passkey],
            user_from_row,
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn save_user(&self, user: &UserRecord) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO users (username, passkey, torrent_limit) VALUES (?1, ?2, ?3)
             ON CONFLICT(passkey) DO UPDATE SET username = excluded.username, torrent_limit = excluded.torrent_limit",
            params![user.username, user.passkey, user.torrent_limit],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn
            .prepare("SELECT id, username, passkey, torrent_limit FROM users")
            .map_err(|e| (e, DRIVER))?;

        let users = stmt
            .query_map([], user_from_row)
            .map_err(|e| (e, DRIVER))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(users)
    }

    async fn load_peer(&self, file_id: i64, user_id: i64, ip: &str) -> Result<Option<PeerRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            &format!("SELECT {PEER_COLUMNS} FROM files_users WHERE file_id = ?1 AND user_id = ?2 AND ip = ?3"),
            params![file_id, user_id, ip],
            peer_from_row,
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn upsert_peer(&self, peer: &PeerRecord) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        // Single statement so concurrent announces for the same key cannot
        // interleave. `completed` stays set once set.
        conn.execute(
            "INSERT INTO files_users (file_id, user_id, ip, port, active, completed, announced, uploaded, downloaded, \"left\")
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(file_id, user_id, ip) DO UPDATE SET
                port = excluded.port,
                active = excluded.active,
                completed = files_users.completed OR excluded.completed,
                announced = excluded.announced,
                uploaded = excluded.uploaded,
                downloaded = excluded.downloaded,
                \"left\" = excluded.\"left\"",
            params![
                peer.file_id,
                peer.user_id,
                peer.ip,
                peer.port,
                peer.active,
                peer.completed,
                peer.announced,
                peer.uploaded,
                peer.downloaded,
                peer.left
            ],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn file_peers(&self, file_id: i64) -> Result<Vec<PeerRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn
            .prepare(&format!("SELECT {PEER_COLUMNS} FROM files_users WHERE file_id = ?1"))
            .map_err(|e| (e, DRIVER))?;

        let peers = stmt
            .query_map(params![file_id], peer_from_row)
            .map_err(|e| (e, DRIVER))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(peers)
    }

    async fn count_seeders(&self, file_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COUNT(*) FROM files_users WHERE file_id = ?1 AND active = 1 AND \"left\" = 0",
            params![file_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn count_leechers(&self, file_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COUNT(*) FROM files_users WHERE file_id = ?1 AND active = 1 AND \"left\" > 0",
            params![file_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn count_completed(&self, file_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COUNT(*) FROM files_users WHERE file_id = ?1 AND completed = 1",
            params![file_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn compact_peer_list(&self, info_hash: &str, exclude_ip: &str, limit: u32) -> Result<Vec<u8>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn
            .prepare(
                "SELECT ip, port FROM files_users
                 INNER JOIN files ON files_users.file_id = files.id
                 WHERE files.info_hash = ?1 AND files_users.active = 1 AND files_users.ip != ?2
                 GROUP BY ip, port
                 ORDER BY MAX(files_users.announced) DESC
                 LIMIT ?3",
            )
            .map_err(|e| (e, DRIVER))?;

        let rows: Vec<(String, u16)> = stmt
            .query_map(params![info_hash, exclude_ip, i64::from(limit)], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .map_err(|e| (e, DRIVER))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(compact_blob(&rows))
    }

    async fn inactive_peers(&self, file_id: i64, older_than: Duration) -> Result<Vec<PeerInfo>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let cutoff = clock::now_unix() - i64::try_from(older_than.as_secs()).unwrap_or(i64::MAX);

        let mut stmt = conn
            .prepare("SELECT user_id, ip FROM files_users WHERE file_id = ?1 AND active = 1 AND announced < ?2")
            .map_err(|e| (e, DRIVER))?;

        let peers = stmt
            .query_map(params![file_id, cutoff], |row| {
                Ok(PeerInfo {
                    user_id: row.get(0)?,
                    ip: row.get(1)?,
                })
            })
            .map_err(|e| (e, DRIVER))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(peers)
    }

    async fn mark_peers_inactive(&self, file_id: i64, peers: &[PeerInfo]) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        let mut stmt = conn
            .prepare("UPDATE files_users SET active = 0 WHERE file_id = ?1 AND user_id = ?2 AND ip = ?3")
            .map_err(|e| (e, DRIVER))?;

        for peer in peers {
            stmt.execute(params![file_id, peer.user_id, peer.ip])
                .map_err(|e| (e, DRIVER))?;
        }

        Ok(())
    }

    async fn user_seeding(&self, user_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COUNT(DISTINCT file_id) FROM files_users WHERE user_id = ?1 AND active = 1 AND \"left\" = 0",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn user_leeching(&self, user_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COUNT(DISTINCT file_id) FROM files_users WHERE user_id = ?1 AND active = 1 AND \"left\" > 0",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn user_uploaded(&self, user_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COALESCE(SUM(uploaded), 0) FROM files_users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn user_downloaded(&self, user_id: i64) -> Result<i64, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT COALESCE(SUM(downloaded), 0) FROM files_users WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .map_err(|e| (e, DRIVER).into())
    }

    async fn load_api_key(&self, user_id: i64) -> Result<Option<ApiKey>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT user_id, pubkey, secret, salt FROM api_keys WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(ApiKey {
                    user_id: row.get(0)?,
                    pubkey: row.get(1)?,
                    secret: row.get(2)?,
                    salt: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn save_api_key(&self, key: &ApiKey) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO api_keys (user_id, pubkey, secret, salt) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET pubkey = excluded.pubkey, secret = excluded.secret, salt = excluded.salt",
            params![key.user_id, key.pubkey, key.secret, key.salt],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn delete_api_key(&self, user_id: i64) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute("DELETE FROM api_keys WHERE user_id = ?1", params![user_id])
            .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn load_whitelist(&self, client: &str) -> Result<Option<WhitelistRecord>, Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.query_row(
            "SELECT client, approved FROM whitelist WHERE client = ?1",
            params![client],
            |row| {
                Ok(WhitelistRecord {
                    client: row.get(0)?,
                    approved: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| (e, DRIVER).into())
    }

    async fn save_whitelist(&self, record: &WhitelistRecord) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO whitelist (client, approved) VALUES (?1, ?2)
             ON CONFLICT(client) DO UPDATE SET approved = excluded.approved",
            params![record.client, record.approved],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn append_announce_log(&self, entry: &AnnounceLog) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO announce_log (info_hash, passkey, ip, port, udp, uploaded, downloaded, \"left\", event, client, time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                entry.info_hash,
                entry.passkey,
                entry.ip,
                entry.port,
                entry.udp,
                entry.uploaded,
                entry.downloaded,
                entry.left,
                entry.event,
                entry.client,
                entry.time
            ],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }

    async fn append_scrape_log(&self, entry: &ScrapeLog) -> Result<(), Error> {
        let conn = self.pool.get().map_err(|e| (e, DRIVER))?;

        conn.execute(
            "INSERT INTO scrape_log (info_hash, passkey, ip, time) VALUES (?1, ?2, ?3, ?4)",
            params![entry.info_hash, entry.passkey, entry.ip, entry.time],
        )
        .map_err(|e| (e, DRIVER))?;

        Ok(())
    }
}
