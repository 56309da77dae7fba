//! The UDP tracker server loop.
//!
//! Each accepted datagram is processed on its own task so a slow store call
//! for one peer does not delay another. Responses are written back to the
//! originating address; whether they arrive is the network's problem.
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::pin_mut;
use tokio::net::UdpSocket;
use tracing::info;

use super::connections::{ConnectionMap, CONNECTION_ID_TTL};
use super::handlers::handle_packet;
use super::{MAX_PACKET_SIZE, MIN_PACKET_LEN};
use crate::core::Tracker;

/// How often unspent connection ids are swept.
const SWEEP_INTERVAL_SECS: u64 = 60;

/// A bound UDP tracker instance.
pub struct Udp {
    socket: Arc<UdpSocket>,
    connections: Arc<ConnectionMap>,
}

impl Udp {
    /// It binds the UDP socket.
    ///
    /// # Errors
    ///
    /// Will return `Err` when unable to bind to the supplied address.
    pub async fn bind(bind_address: SocketAddr) -> io::Result<Udp> {
        let socket = UdpSocket::bind(bind_address).await?;

        Ok(Udp {
            socket: Arc::new(socket),
            connections: Arc::new(ConnectionMap::default()),
        })
    }

    /// The bound address, useful when binding to port 0.
    ///
    /// # Errors
    ///
    /// Will return `Err` when the socket has no local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// It runs the receive loop until the shutdown signal resolves.
    pub async fn start_with_graceful_shutdown<F>(&self, tracker: Arc<Tracker>, shutdown_signal: F)
    where
        F: Future<Output = ()>,
    {
        pin_mut!(shutdown_signal);

        let mut sweep = tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));

        loop {
            let mut data = [0; MAX_PACKET_SIZE];

            tokio::select! {
                () = &mut shutdown_signal => {
                    info!("Stopping UDP tracker on {} ...", self.socket.local_addr().map_or_else(|_| "unknown".to_string(), |a| a.to_string()));
                    break;
                }
                _ = sweep.tick() => {
                    let evicted = self.connections.sweep(CONNECTION_ID_TTL);
                    if evicted > 0 {
                        info!("udp: evicted {evicted} stale connection id(s)");
                    }
                }
                result = self.socket.recv_from(&mut data) => {
                    let Ok((valid_bytes, remote_addr)) = result else {
                        continue;
                    };

                    tracker.stats.udp_request_started();

                    if valid_bytes < MIN_PACKET_LEN {
                        tracker.stats.udp_request_finished();
                        continue;
                    }

                    let payload = data[..valid_bytes].to_vec();
                    let socket = self.socket.clone();
                    let connections = self.connections.clone();
                    let tracker = tracker.clone();

                    tokio::spawn(async move {
                        if let Some(response) = handle_packet(remote_addr, &payload, &tracker, &connections).await {
                            // Whether the reply arrives is not our problem.
                            drop(socket.send_to(&response.to_bytes(), remote_addr).await);
                        }

                        tracker.stats.udp_request_finished();
                    });
                }
            }
        }
    }
}
