//! Axum handlers for the `scrape` requests.
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use super::admit_client;
use super::announce::parse_query;
use crate::core::{ScrapeData, Tracker};
use crate::servers::http::requests::scrape::Scrape;
use crate::servers::http::responses;

/// It handles the `scrape` request when the URL carries no passkey segment.
pub async fn handle_without_key(
    State(tracker): State<Arc<Tracker>>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Response {
    handle(&tracker, raw_query.as_deref(), &headers, remote_addr, None).await
}

/// It handles the `scrape` request for `/<passkey>/scrape` URLs.
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
    match handle_scrape(tracker, raw_query, headers, remote_addr, key.as_deref()).await {
        Ok(data) => responses::scrape::Bencoded::from(data).into_response(),
        Err(failure) => failure.into_response(),
    }
}

async fn handle_scrape(
    tracker: &Arc<Tracker>,
    raw_query: Option<&str>,
    headers: &HeaderMap,
    remote_addr: SocketAddr,
    key: Option<&str>,
) -> Result<ScrapeData, responses::error::Error> {
    let (_, user) = admit_client(tracker, headers, key).await?;

    let query = parse_query(raw_query)?;
    let scrape = Scrape::try_from(&query)?;

    let origin_ip = remote_addr.ip().to_canonical().to_string();

    Ok(tracker.scrape(&user, &scrape.info_hashes, &origin_ip).await)
}
