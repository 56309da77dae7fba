//! Axum handlers for the admin API routes.
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::resources::{FileResource, ServerStatus, UserResource};
use super::responses;
use super::routes::ApiState;
use crate::core::databases;
use crate::core::Tracker;

/// `GET /api/files`: every tracked file with its swarm counters and
/// membership.
pub async fn get_files(State(state): State<ApiState>) -> Response {
    match file_resources(&state.tracker).await {
        Ok(files) => Json(files).into_response(),
        Err(e) => {
            error!("api: could not load files: {e}");
            responses::tracker_error()
        }
    }
}

/// `GET /api/files/<id>`: one tracked file.
pub async fn get_file(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_positive_id(&id) else {
        return responses::invalid_integer_id();
    };

    match load_file_resource(&state.tracker, id).await {
        Ok(Some(file)) => Json(file).into_response(),
        Ok(None) => responses::error_response(axum::http::StatusCode::NOT_FOUND, "File not found"),
        Err(e) => {
            error!("api: could not load file {id}: {e}");
            responses::tracker_error()
        }
    }
}

/// `GET /api/users`: every tracker user with its activity aggregates.
pub async fn get_users(State(state): State<ApiState>) -> Response {
    match user_resources(&state.tracker).await {
        Ok(users) => Json(users).into_response(),
        Err(e) => {
            error!("api: could not load users: {e}");
            responses::tracker_error()
        }
    }
}

/// `GET /api/users/<id>`: one tracker user.
pub async fn get_user(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Some(id) = parse_positive_id(&id) else {
        return responses::invalid_integer_id();
    };

    match load_user_resource(&state.tracker, id).await {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => responses::error_response(axum::http::StatusCode::NOT_FOUND, "User not found"),
        Err(e) => {
            error!("api: could not load user {id}: {e}");
            responses::tracker_error()
        }
    }
}

/// `GET /api/status`: process facts and HTTP counters.
pub async fn get_status(State(state): State<ApiState>) -> Response {
    Json(ServerStatus::snapshot(&state.tracker.stats.snapshot())).into_response()
}

/// Fallback for unknown `/api` paths.
pub async fn undefined_api_call() -> Response {
    responses::undefined_api_call()
}

/// Every `/api` path when the API is disabled in the configuration.
pub async fn api_disabled() -> Response {
    responses::api_disabled()
}

/// Path ids must parse as positive integers.
fn parse_positive_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

async fn file_resources(tracker: &Tracker) -> Result<Vec<FileResource>, databases::error::Error> {
    let mut resources = Vec::new();

    for file in tracker.database.all_files().await? {
        resources.push(FileResource::from_record(tracker, file).await?);
    }

    Ok(resources)
}

async fn load_file_resource(tracker: &Tracker, id: i64) -> Result<Option<FileResource>, databases::error::Error> {
    match tracker.database.load_file(id).await? {
        Some(file) => Ok(Some(FileResource::from_record(tracker, file).await?)),
        None => Ok(None),
    }
}

async fn user_resources(tracker: &Tracker) -> Result<Vec<UserResource>, databases::error::Error> {
    let mut resources = Vec::new();

    for user in tracker.database.all_users().await? {
        resources.push(UserResource::from_record(tracker, user).await?);
    }

    Ok(resources)
}

async fn load_user_resource(tracker: &Tracker, id: i64) -> Result<Option<UserResource>, databases::error::Error> {
    match tracker.database.load_user(id).await? {
        Some(user) => Ok(Some(UserResource::from_record(tracker, user).await?)),
        None => Ok(None),
    }
}
