//! Admission middleware for the admin API: rate limit, then HTTP Basic
//! authentication, then the read-only method check.
//!
//! Credentials are `user_id:secret`. The stored key holds
//! `sha1(secret || salt)` and the comparison is constant time, so the check
//! leaks nothing about how many leading bytes matched.
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, warn};

use crate::core::auth::BasicCredentials;
use crate::core::databases;
use crate::core::Tracker;
use crate::servers::apis::responses;
use crate::servers::apis::routes::ApiState;

/// The window the per-IP request budget applies to.
const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

pub async fn admission(
    State(state): State<ApiState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    // Rate limiting, only when a counter store is configured.
    if let Some(counter) = &state.counter {
        let key = format!("api:{}", remote_addr.ip().to_canonical());

        match counter.incr(&key, RATE_LIMIT_WINDOW).await {
            Ok(count) if count > state.tracker.config().api_limit => {
                return responses::rate_limit_exceeded();
            }
            Ok(_) => {}
            // A broken counter store must not take the API down with it.
            Err(e) => warn!("api: rate limit counter failed: {e}"),
        }
    }

    // Authentication.
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match authorization {
        Some(header) => match verify_credentials(&state.tracker, header).await {
            Ok(true) => {}
            Ok(false) => return responses::authentication_failed(),
            Err(e) => {
                error!("api: could not verify credentials: {e}");
                return responses::tracker_error();
            }
        },
        None => return responses::authentication_failed(),
    }

    // The API is read-only, at least for the time being.
    if request.method() != Method::GET {
        return responses::method_not_allowed();
    }

    next.run(request).await
}

async fn verify_credentials(tracker: &Tracker, header: &str) -> Result<bool, databases::error::Error> {
    let Some(credentials) = BasicCredentials::from_header(header) else {
        return Ok(false);
    };

    let Some(key) = tracker.database.load_api_key(credentials.user_id).await? else {
        return Ok(false);
    };

    Ok(credentials.verify(&key))
}
