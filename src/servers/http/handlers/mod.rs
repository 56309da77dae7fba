//! Axum handlers for the HTTP tracker.
//!
//! Every request runs the same admission pipeline the original tracker used:
//! the client must advertise a user-agent, the user-agent must pass the
//! whitelist (when active), and the passkey path segment must resolve to a
//! user (when passkey mode is on). Only then is the querystring parsed and
//! the engine called.
pub mod announce;
pub mod scrape;

use axum::http::header;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use super::responses;
use crate::core::error::Error;
use crate::core::user::UserRecord;
use crate::core::Tracker;

/// Fallback for every path that is not an announce, a scrape or an API
/// call.
pub async fn malformed() -> Response {
    responses::error::Error {
        failure_reason: "Malformed announce".to_string(),
    }
    .into_response()
}

/// The client user-agent; announcing without one is refused so the
/// whitelist stays meaningful.
pub(crate) fn client_from_headers(headers: &HeaderMap) -> Result<String, Error> {
    match headers.get(header::USER_AGENT).and_then(|value| value.to_str().ok()) {
        Some(client) if !client.is_empty() => Ok(client.to_string()),
        _ => Err(Error::UnidentifiedClient),
    }
}

/// The shared admission pipeline: user-agent, whitelist, passkey.
pub(crate) async fn admit_client(
    tracker: &Tracker,
    headers: &HeaderMap,
    passkey: Option<&str>,
) -> Result<(String, UserRecord), responses::error::Error> {
    let client = client_from_headers(headers)?;

    tracker.check_client_whitelist(&client).await?;

    let user = tracker.resolve_user(passkey).await?;

    Ok((client, user))
}
