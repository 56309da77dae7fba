//! The UDP connection-id state machine.
//!
//! The tracker has no sessions: the only state it keeps per client address
//! is the connection id issued by the last connect request. An announce or
//! scrape is accepted when it carries that id, and acceptance consumes the
//! entry, so every request cycle needs a fresh handshake.
//!
//! Entries that are never spent (clients that connect and walk away) are
//! evicted by a periodic sweep to bound memory.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

/// How long an unspent connection id survives before the sweep evicts it.
pub const CONNECTION_ID_TTL: Duration = Duration::from_secs(120);

/// Why an announce or scrape was rejected by the connection map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    /// The address has no outstanding connection id.
    NotEstablished,
    /// The packet's connection id does not match the outstanding one.
    Mismatch,
}

struct Entry {
    connection_id: u64,
    issued_at: Instant,
}

/// Map from client address to the connection id it is expected to present.
#[derive(Default)]
pub struct ConnectionMap {
    entries: Mutex<HashMap<SocketAddr, Entry>>,
}

impl ConnectionMap {
    /// It issues a fresh connection id for `addr`, replacing any unspent
    /// one. Ids are random 64-bit values in `[1, 1_000_000_000]`.
    pub fn issue(&self, addr: SocketAddr) -> u64 {
        let connection_id = rand::thread_rng().gen_range(1..=1_000_000_000u64);

        self.entries.lock().expect("connection map mutex poisoned").insert(
            addr,
            Entry {
                connection_id,
                issued_at: Instant::now(),
            },
        );

        connection_id
    }

    /// It checks the connection id presented by `addr` and consumes the
    /// entry on success: a connection id is accepted at most once.
    ///
    /// # Errors
    ///
    /// Will return `ConnectionError::NotEstablished` when the address never
    /// handshaked (or its id was already spent), `ConnectionError::Mismatch`
    /// when the id differs from the issued one. A mismatch does not consume
    /// the entry.
    pub fn verify_and_remove(&self, addr: SocketAddr, connection_id: u64) -> Result<(), ConnectionError> {
        let mut entries = self.entries.lock().expect("connection map mutex poisoned");

        match entries.get(&addr) {
            None => Err(ConnectionError::NotEstablished),
            Some(entry) if entry.connection_id != connection_id => Err(ConnectionError::Mismatch),
            Some(_) => {
                entries.remove(&addr);
                Ok(())
            }
        }
    }

    /// It evicts entries older than `ttl`. Returns how many were evicted.
    pub fn sweep(&self, ttl: Duration) -> usize {
        let mut entries = self.entries.lock().expect("connection map mutex poisoned");

        let before = entries.len();
        entries.retain(|_, entry| entry.issued_at.elapsed() < ttl);

        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("connection map mutex poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
