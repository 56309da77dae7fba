//! Error returned by the core `Tracker`.
//!
//! The `Display` form of each variant is the exact failure text surfaced to
//! the client, in the transport's own failure format (a bencoded
//! `failure reason` for HTTP, an error packet for UDP). Store failures are
//! logged with their cause but reach the client as a generic
//! `tracker error`.
use crate::core::databases;

/// Policy or store error returned by the core `Tracker`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Authentication errors
    #[error("No passkey found in announce URL")]
    MissingPasskey,
    #[error("Invalid passkey")]
    InvalidPasskey,

    // Client policy errors
    #[error("Your client is not identifying itself")]
    UnidentifiedClient,
    #[error("Your client is not whitelisted")]
    ClientNotWhitelisted,
    #[error("Exceeded active torrent limit: {active} > {limit}")]
    TorrentLimitExceeded { active: i64, limit: i64 },

    // Store errors, surfaced to the client without detail
    #[error("tracker error")]
    Database(#[from] databases::error::Error),
}
