//! UDP tracker job starter.
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::core::Tracker;
use crate::servers::signals::{shutdown_signal, Halted};
use crate::servers::udp::server::Udp;

/// It starts a UDP tracker server job.
///
/// # Panics
///
/// It would panic if the socket cannot be bound.
pub async fn start_job(bind_address: SocketAddr, tracker: Arc<Tracker>) -> (SocketAddr, JoinHandle<()>, oneshot::Sender<Halted>) {
    let udp = Udp::bind(bind_address)
        .await
        .unwrap_or_else(|e| panic!("could not bind udp tracker to {bind_address}: {e}"));

    let bound_addr = udp.local_addr().expect("could not get the bound address");

    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let task = tokio::spawn(async move {
        udp.start_with_graceful_shutdown(tracker, shutdown_signal(rx_halt)).await;
    });

    info!("UDP tracker listening on udp://{bound_addr}");

    (bound_addr, task, tx_halt)
}
