//! The UDP tracker front end.
//!
//! Wire-compatible with [BEP 15](https://www.bittorrent.org/beps/bep_0015.html),
//! except that announce and scrape require a fresh connect handshake each
//! time: connection ids are single use (see [`connections`]).
pub mod connections;
pub mod handlers;
pub mod request;
pub mod responses;
pub mod server;

/// Receive buffer size. Larger datagrams are truncated, like the original
/// implementations of this protocol do.
pub const MAX_PACKET_SIZE: usize = 2048;

/// Datagrams shorter than one request header are dropped without an answer.
pub const MIN_PACKET_LEN: usize = 16;

/// Magic connection id every connect request must carry.
pub const PROTOCOL_ID: u64 = 0x0417_2710_1980;
