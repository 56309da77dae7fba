//! Job that expires stale swarm members on a fixed cadence.
//!
//! Clients get one announce interval plus a 60 second grace before the
//! reaper clears their `active` bit. The reaper never deletes rows, so a
//! missed or repeated run is harmless.
use std::sync::Arc;
use std::time::Duration;

use futures::pin_mut;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::core::Tracker;
use crate::servers::signals::{shutdown_signal, Halted};

/// It starts the peer reaper job. The cadence is one announce interval.
#[must_use]
pub fn start_job(tracker: &Arc<Tracker>) -> (JoinHandle<()>, oneshot::Sender<Halted>) {
    let cadence = Duration::from_secs(u64::from(tracker.config().interval));
    let tracker = tracker.clone();

    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let task = tokio::spawn(async move {
        let signal = shutdown_signal(rx_halt);
        pin_mut!(signal);

        let mut interval = tokio::time::interval(cadence);
        // The first tick fires immediately; peers announced before a restart
        // have not expired yet.
        interval.tick().await;

        loop {
            tokio::select! {
                () = &mut signal => {
                    info!("Stopping peer reaper ..");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = tracker.reap_inactive_peers().await {
                        warn!("reaper: {e}");
                    }
                }
            }
        }
    });

    (task, tx_halt)
}
