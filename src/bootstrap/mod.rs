//! Setup for the main tracker application.
//!
//! The [`app`](crate::bootstrap::app) module builds the application and its
//! dependencies; the [`jobs`](crate::bootstrap::jobs) module starts the
//! long-running services.
pub mod app;
pub mod jobs;
pub mod logging;
