//! Admin API routes, nested under `/api` by the HTTP tracker router.
use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::compression::CompressionLayer;

use super::{handlers, middlewares};
use crate::core::counter::Counter;
use crate::core::Tracker;

/// State shared by the API handlers and the admission middleware.
#[derive(Clone)]
pub struct ApiState {
    pub tracker: Arc<Tracker>,
    /// Rate-limit counter; `None` disables rate limiting.
    pub counter: Option<Arc<dyn Counter>>,
}

/// It builds the `/api` router. When the API is disabled in the
/// configuration every path answers `503`.
pub fn router(tracker: Arc<Tracker>, counter: Option<Arc<dyn Counter>>) -> Router {
    if !tracker.config().api {
        return Router::new().fallback(handlers::api_disabled);
    }

    let state = ApiState { tracker, counter };

    Router::new()
        .route("/files", get(handlers::get_files))
        .route("/files/:id", get(handlers::get_file))
        .route("/users", get(handlers::get_users))
        .route("/users/:id", get(handlers::get_user))
        .route("/status", get(handlers::get_status))
        .fallback(handlers::undefined_api_call)
        .layer(middleware::from_fn_with_state(state.clone(), middlewares::auth::admission))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::extract::connect_info::ConnectInfo;
    use axum::http::{header, Request, StatusCode};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use tower::ServiceExt;

    use super::router;
    use crate::config::Configuration;
    use crate::core::auth::{digest, ApiKey};
    use crate::core::counter::{Counter, MemoryCounter};
    use crate::core::databases::sqlite::Sqlite;
    use crate::core::databases::Database;
    use crate::core::Tracker;

    fn ephemeral_tracker(config: Configuration) -> Arc<Tracker> {
        static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

        let path = std::env::temp_dir().join(format!(
            "goat-tracker-api-{}-{}.db",
            std::process::id(),
            NEXT_DB.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_file(&path);

        let database = Sqlite::new(path.to_str().unwrap()).unwrap();
        database.create_database_tables().unwrap();

        Arc::new(Tracker::with_database(
            Arc::new(config),
            Arc::new(Box::new(database) as Box<dyn Database>),
        ))
    }

    async fn save_admin_credentials(tracker: &Tracker) -> String {
        tracker
            .database
            .save_api_key(&ApiKey {
                user_id: 1,
                pubkey: digest("deadbeef", "salt"),
                secret: "deadbeef".to_string(),
                salt: "salt".to_string(),
            })
            .await
            .unwrap();

        format!("Basic {}", STANDARD.encode("1:deadbeef"))
    }

    fn request(method: &str, uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(authorization) = authorization {
            builder = builder.header(header::AUTHORIZATION, authorization);
        }

        let mut request = builder.body(Body::empty()).unwrap();

        // The router is exercised without a real connection.
        let remote_addr: SocketAddr = "126.0.0.1:54321".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(remote_addr));

        request
    }

    #[tokio::test]
    async fn requests_without_credentials_should_be_rejected() {
        let tracker = ephemeral_tracker(Configuration::default());
        let app = router(tracker, None);

        let response = app.oneshot(request("GET", "/status", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn requests_with_a_wrong_secret_should_be_rejected() {
        let tracker = ephemeral_tracker(Configuration::default());
        save_admin_credentials(&tracker).await;

        let app = router(tracker, None);
        let bad = format!("Basic {}", STANDARD.encode("1:feedface"));

        let response = app.oneshot(request("GET", "/status", Some(&bad))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_status_requests_should_answer_json() {
        let tracker = ephemeral_tracker(Configuration::default());
        let authorization = save_admin_credentials(&tracker).await;

        let app = router(tracker, None);

        let response = app.oneshot(request("GET", "/status", Some(&authorization))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(status["pid"], u64::from(std::process::id()));
    }

    #[tokio::test]
    async fn the_api_should_be_read_only() {
        let tracker = ephemeral_tracker(Configuration::default());
        let authorization = save_admin_credentials(&tracker).await;

        let app = router(tracker, None);

        let response = app
            .oneshot(request("PUT", "/files/1", Some(&authorization)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unknown_api_paths_should_answer_404() {
        let tracker = ephemeral_tracker(Configuration::default());
        let authorization = save_admin_credentials(&tracker).await;

        let app = router(tracker, None);

        let response = app
            .oneshot(request("GET", "/abcdef", Some(&authorization)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"error":"Undefined API call"}"#);
    }

    #[tokio::test]
    async fn non_numeric_ids_should_answer_400() {
        let tracker = ephemeral_tracker(Configuration::default());
        let authorization = save_admin_credentials(&tracker).await;

        let app = router(tracker, None);

        let response = app
            .oneshot(request("GET", "/files/a", Some(&authorization)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), br#"{"error":"Invalid integer ID"}"#);
    }

    #[tokio::test]
    async fn requests_past_the_rate_limit_should_answer_429() {
        let mut config = Configuration::default();
        config.api_limit = 2;

        let tracker = ephemeral_tracker(config);
        let authorization = save_admin_credentials(&tracker).await;

        let counter: Arc<dyn Counter> = Arc::new(MemoryCounter::default());
        let app = router(tracker, Some(counter));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(request("GET", "/status", Some(&authorization)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.oneshot(request("GET", "/status", Some(&authorization))).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn a_disabled_api_should_answer_503_everywhere() {
        let mut config = Configuration::default();
        config.api = false;

        let tracker = ephemeral_tracker(config);
        let app = router(tracker, None);

        let response = app.oneshot(request("GET", "/status", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn files_should_be_listed_with_their_swarm_counters() {
        let tracker = ephemeral_tracker(Configuration::default());
        let authorization = save_admin_credentials(&tracker).await;

        // Track one swarm with one seeder.
        let request_data = crate::core::AnnounceRequest {
            info_hash: crate::shared::bit_torrent::info_hash::InfoHash([0x69; 20]),
            ip: "126.0.0.1".to_string(),
            port: 6881,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: crate::core::AnnounceEvent::Started,
            numwant: 50,
            client: "Test/1.0".to_string(),
            udp: false,
        };
        tracker
            .announce(&crate::core::user::UserRecord::anonymous(), &request_data)
            .await
            .unwrap();

        let app = router(tracker, None);

        let response = app.oneshot(request("GET", "/files", Some(&authorization))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let files: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(files[0]["infoHash"], "69".repeat(20));
        assert_eq!(files[0]["seeders"], 1);
        assert_eq!(files[0]["fileUsers"][0]["ip"], "126.0.0.1");
    }
}
