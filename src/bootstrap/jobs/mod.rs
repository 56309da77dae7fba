//! Application job starters.
//!
//! The main application setup has only two stages: build the domain tracker,
//! then launch the services as concurrent jobs. Each starter returns the
//! spawned task together with the halt channel the supervisor uses to stop
//! it.
pub mod http_tracker;
pub mod peer_reaper;
pub mod udp_tracker;

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;

/// It loads the TLS material for the HTTPS listener.
///
/// # Errors
///
/// Will return `Err` when the certificate or key cannot be read or parsed.
pub async fn make_rust_tls(certificate: &str, key: &str) -> std::io::Result<RustlsConfig> {
    info!("Using https: cert path: {certificate}.");
    info!("Using https: key path: {key}.");

    RustlsConfig::from_pem_file(certificate, key).await
}
