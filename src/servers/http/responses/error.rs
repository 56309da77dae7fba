//! `Error` response for the HTTP tracker.
//!
//! _"Tracker responses are bencoded dictionaries. If a tracker response has
//! a key failure reason, then that maps to a human readable string which
//! explains why the query failed, and no other keys are required."_
//!
//! > **NOTICE**: error responses are bencoded and always have a `200 OK`
//! > status code. The official `BitTorrent` specification does not specify
//! > the status code.
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core;

/// `Error` response for the HTTP tracker.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Error {
    /// Human readable string which explains why the request failed.
    #[serde(rename = "failure reason")]
    pub failure_reason: String,
}

impl Error {
    /// Returns the bencoded representation of the `Error` struct.
    ///
    /// # Panics
    ///
    /// It would panic if the `Error` struct contained an inappropriate field
    /// type.
    #[must_use]
    pub fn write(&self) -> String {
        serde_bencode::to_string(&self).unwrap()
    }
}

impl From<core::error::Error> for Error {
    fn from(err: core::error::Error) -> Self {
        Self {
            failure_reason: err.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, super::CONTENT_TYPE)], self.write()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn http_tracker_errors_can_be_bencoded() {
        let err = Error {
            failure_reason: "error message".to_owned(),
        };

        assert_eq!(err.write(), "d14:failure reason13:error messagee"); // cspell:disable-line
    }

    #[test]
    fn the_compact_failure_has_the_documented_wire_form() {
        let err = Error {
            failure_reason: "Your client does not support compact announce".to_owned(),
        };

        assert_eq!(
            err.write(),
            "d14:failure reason45:Your client does not support compact announcee"
        );
    }
}
