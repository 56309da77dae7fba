//! HTTP(S) tracker job starter.
//!
//! The listener is bound synchronously before the server task is spawned so
//! a busy port fails the startup instead of a background task, and so the
//! caller learns the bound address (useful when binding port 0).
use std::net::SocketAddr;

use axum_server::tls_rustls::RustlsConfig;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::core::Tracker;
use crate::core::counter::Counter;
use crate::servers::http::server::Launcher;
use crate::servers::signals::{shutdown_signal, Halted};

/// It starts an HTTP tracker server job, with TLS when `tls` is given.
///
/// # Panics
///
/// It would panic if the listener cannot be bound.
#[must_use]
pub fn start_job(
    bind_address: SocketAddr,
    tls: Option<RustlsConfig>,
    tracker: std::sync::Arc<Tracker>,
    counter: Option<std::sync::Arc<dyn Counter>>,
) -> (SocketAddr, JoinHandle<()>, oneshot::Sender<Halted>) {
    let scheme = if tls.is_some() { "https" } else { "http" };

    let tcp_listener = std::net::TcpListener::bind(bind_address)
        .unwrap_or_else(|e| panic!("could not bind {scheme} tracker to {bind_address}: {e}"));
    tcp_listener
        .set_nonblocking(true)
        .expect("could not set the listener to non-blocking");

    let bound_addr = tcp_listener.local_addr().expect("could not get the bound address");

    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let server =
        Launcher::start_from_tcp_listener_with_graceful_shutdown(tcp_listener, tls, tracker, counter, shutdown_signal(rx_halt));

    let task = tokio::spawn(server);

    info!("{scheme} tracker listening on {scheme}://{bound_addr}");

    (bound_addr, task, tx_halt)
}
