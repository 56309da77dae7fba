//! Axum handlers for the `announce` requests.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::admit_client;
use crate::core::error::Error;
use crate::core::{AnnounceData, Tracker};
use crate::servers::http::query::Query;
use crate::servers::http::requests::announce::Announce;
use crate::servers::http::responses;

/// It handles the `announce` request when the announce URL carries no
/// passkey segment.
pub async fn handle_without_key(
    State(tracker): State<Arc<Tracker>>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    handle(&tracker, raw_query.as_deref(), &headers, remote_addr, None).await
}

/// It handles the `announce` request for `/<passkey>/announce` URLs.
pub async fn handle_with_key(
    State(tracker): State<Arc<Tracker>>,
    Path(key): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    handle(&tracker, raw_query.as_deref(), &headers, remote_addr, Some(key)).await
}

async fn handle(
    tracker: &Arc<Tracker>,
    raw_query: Option<&str>,
    headers: &HeaderMap,
    remote_addr: SocketAddr,
    key: Option<String>,
) -> Response {
    match handle_announce(tracker, raw_query, headers, remote_addr, key.as_deref()).await {
        Ok(data) => responses::announce::Announce::from(data).into_response(),
        Err(failure) => failure.into_response(),
    }
}

async fn handle_announce(
    tracker: &Arc<Tracker>,
    raw_query: Option<&str>,
    headers: &HeaderMap,
    remote_addr: SocketAddr,
    key: Option<&str>,
) -> Result<AnnounceData, responses::error::Error> {
    let (client, user) = admit_client(tracker, headers, key).await?;

    let query = parse_query(raw_query)?;
    let announce = Announce::from_query(&query, &remote_addr.ip())?;

    // Only compact announces are supported.
    if announce.compact.as_deref() != Some("1") {
        return Err(responses::error::Error {
            failure_reason: "Your client does not support compact announce".to_string(),
        });
    }

    let request = announce.into_request(&client);

    tracker.announce(&user, &request).await.map_err(|e| {
        if let Error::Database(source) = &e {
            error!("announce failed: {source}");
        }

        e.into()
    })
}

pub(crate) fn parse_query(raw_query: Option<&str>) -> Result<Query, responses::error::Error> {
    raw_query
        .unwrap_or_default()
        .parse::<Query>()
        .map_err(|_| responses::error::Error {
            failure_reason: "Malformed announce".to_string(),
        })
}
