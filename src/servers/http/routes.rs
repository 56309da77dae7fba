//! HTTP tracker routes.
//!
//! The admin API is served from the same listener, nested under `/api`.
//! Everything else that is not an announce or a scrape falls back to a
//! bencoded `Malformed announce` failure.
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use super::handlers;
use crate::core::counter::Counter;
use crate::core::Tracker;
use crate::servers::apis;
use crate::{APP_NAME, VERSION};

/// It builds the tracker router: announce and scrape routes with and
/// without a passkey path segment, the nested admin API, the `Server`
/// header and the connection counters.
pub fn router(tracker: Arc<Tracker>, counter: Option<Arc<dyn Counter>>) -> Router {
    let api_routes = apis::routes::router(tracker.clone(), counter);

    let server_header = HeaderValue::from_str(&format!("{APP_NAME}/{VERSION}")).expect("server header is valid ascii");

    Router::new()
        .route("/announce", get(handlers::announce::handle_without_key))
        .route("/:key/announce", get(handlers::announce::handle_with_key))
        .route("/scrape", get(handlers::scrape::handle_without_key))
        .route("/:key/scrape", get(handlers::scrape::handle_with_key))
        .with_state(tracker.clone())
        .nest("/api", api_routes)
        .fallback(handlers::malformed)
        .layer(SetResponseHeaderLayer::overriding(header::SERVER, server_header))
        .layer(middleware::from_fn_with_state(tracker, count_request))
}

/// Connection counting: every request bumps the totals and holds a slot in
/// `http_current` while it is in flight.
async fn count_request(State(tracker): State<Arc<Tracker>>, request: Request, next: Next) -> Response {
    tracker.stats.http_request_started();

    let response = next.run(request).await;

    tracker.stats.http_request_finished();

    response
}
