//! Middlewares for the admin API.
pub mod auth;
