//! `goat-tracker` is a `BitTorrent` tracker: a network service that
//! coordinates peer discovery for torrent swarms.
//!
//! Peers periodically report their state (uploaded, downloaded, left, event)
//! for an infohash; the tracker persists swarm membership, returns a compact
//! peer list for that infohash and answers aggregate scrape queries. It
//! speaks two wire formats (a text/querystring HTTP transport and a binary
//! UDP transport with a handshake-based connection-id protocol) and serves
//! a small authenticated read-only JSON API for administrators.
//!
//! # Layout
//!
//! - [`core`]: the tracker engine, its records and the store trait. Never
//!   touches the network.
//! - [`servers`]: the HTTP and UDP front ends and the admin API. They
//!   normalize their wire formats into the engine's request types and encode
//!   its responses back.
//! - [`bootstrap`] and [`app`]: process setup and the supervisor that
//!   starts/stops the listeners and the peer reaper.
//! - [`config`]: the TOML + environment configuration.
//! - [`shared`]: infohash and clock helpers with no other dependencies.
//!
//! # Data flow
//!
//! ```text
//! peer ──HTTP──▶ servers::http ──┐
//!                                ├──▶ core::Tracker ──▶ core::databases
//! peer ──UDP───▶ servers::udp ───┘
//!
//! admin ─HTTP──▶ servers::apis ──────▶ core::databases (read only)
//! ```
//!
//! The reaper runs independently against the store on the announce-interval
//! cadence; the `active` bit it clears is the truth source for peer lists
//! and swarm counts.
pub mod app;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod servers;
pub mod shared;

/// Application name, as used in the HTTP `Server` header.
pub const APP_NAME: &str = "goat";

/// Application version, as used in the HTTP `Server` header.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
