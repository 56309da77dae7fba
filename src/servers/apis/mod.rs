//! The tracker admin REST API, served under `/api` on the HTTP listener.
//!
//! Read-only JSON over HTTP. Only `GET` is accepted; credentials are HTTP
//! Basic (`user_id:secret`) checked against the stored API keys; responses
//! are gzip-compressed when the client accepts it. An optional per-IP rate
//! limit runs in front of authentication.
//!
//! Routes:
//!
//! - `GET /api/files` and `GET /api/files/<id>`
//! - `GET /api/users` and `GET /api/users/<id>`
//! - `GET /api/status`
pub mod handlers;
pub mod middlewares;
pub mod resources;
pub mod responses;
pub mod routes;
