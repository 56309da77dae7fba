//! The HTTP tracker front end.
//!
//! URL shapes accepted:
//!
//! - `/announce` and `/scrape` (passkey mode off)
//! - `/<passkey>/announce` and `/<passkey>/scrape` (passkey is 40 hex chars)
//! - `/api/...`: the admin REST API (see [`crate::servers::apis`])
//!
//! Responses are bencoded with `Content-Type: text/plain; charset=utf-8`.
//! Any other path yields a bencoded `Malformed announce` failure.
pub mod handlers;
pub mod percent_encoding;
pub mod query;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod server;
