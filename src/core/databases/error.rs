//! Database errors.
use std::panic::Location;
use std::sync::Arc;

use super::driver::Driver;

/// Error returned by a database driver. Every variant carries the driver
/// name so a mixed deployment can tell which backend failed.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// The query was malformed or the backend rejected it.
    #[error("The {driver} query failed: {err}")]
    InvalidQuery {
        err: Arc<dyn std::error::Error + Send + Sync>,
        driver: Driver,
    },

    /// Unable to insert a record into the database.
    #[error("Unable to insert record into {driver} database, {location}")]
    InsertFailed {
        location: &'static Location<'static>,
        driver: Driver,
    },

    /// The connection URL for the driver could not be parsed.
    #[error("Failed to connect to {driver} database: {message}")]
    ConnectionError { message: String, driver: Driver },

    /// Unable to create a connection pool.
    #[error("Failed to create r2d2 {driver} connection pool: {err}")]
    ConnectionPool { err: Arc<r2d2::Error>, driver: Driver },
}

impl From<(r2d2_sqlite::rusqlite::Error, Driver)> for Error {
    #[track_caller]
    fn from(e: (r2d2_sqlite::rusqlite::Error, Driver)) -> Self {
        let (err, driver) = e;
        Error::InvalidQuery {
            err: Arc::new(err),
            driver,
        }
    }
}

impl From<(r2d2_mysql::mysql::Error, Driver)> for Error {
    #[track_caller]
    fn from(e: (r2d2_mysql::mysql::Error, Driver)) -> Self {
        let (err, driver) = e;
        Error::InvalidQuery {
            err: Arc::new(err),
            driver,
        }
    }
}

impl From<(r2d2::Error, Driver)> for Error {
    #[track_caller]
    fn from(e: (r2d2::Error, Driver)) -> Self {
        let (err, driver) = e;
        Self::ConnectionPool {
            err: Arc::new(err),
            driver,
        }
    }
}
