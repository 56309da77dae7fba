//! Handlers for the UDP tracker packets.
//!
//! Each accepted datagram is decoded, run through the connection-id state
//! machine and dispatched to the tracker engine. The returned [`Response`]
//! is written back to the originating address by the server loop.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tracing::error;

use super::connections::{ConnectionError, ConnectionMap};
use super::request::{self, ParseError, Request};
use super::responses::{Response, ScrapeEntry};
use super::PROTOCOL_ID;
use crate::core::user::UserRecord;
use crate::core::{self, AnnounceEvent, Tracker, DEFAULT_NUMWANT};

/// It handles one datagram and returns the response to send back, if any.
/// Datagrams shorter than a request header are dropped silently.
pub async fn handle_packet(
    remote_addr: SocketAddr,
    payload: &[u8],
    tracker: &Arc<Tracker>,
    connections: &ConnectionMap,
) -> Option<Response> {
    let request = match Request::from_bytes(payload) {
        Ok(request) => request,
        Err(ParseError::TooShort) => return None,
        Err(ParseError::UnknownAction { transaction_id, .. }) => {
            return Some(Response::Error {
                transaction_id,
                message: "Invalid action".to_string(),
            })
        }
        Err(ParseError::TruncatedAnnounce { transaction_id }) => {
            return Some(Response::Error {
                transaction_id,
                message: "Invalid announce".to_string(),
            })
        }
    };

    match request {
        Request::Connect(connect) => Some(handle_connect(remote_addr, &connect, connections)),
        Request::Announce(announce) => Some(handle_announce(remote_addr, &announce, tracker, connections).await),
        Request::Scrape(scrape) => Some(handle_scrape(remote_addr, &scrape, tracker, connections).await),
    }
}

/// A connect request must carry the protocol magic; it is answered with a
/// fresh single-use connection id.
fn handle_connect(remote_addr: SocketAddr, request: &request::ConnectRequest, connections: &ConnectionMap) -> Response {
    if request.connection_id != PROTOCOL_ID {
        return Response::Error {
            transaction_id: request.transaction_id,
            message: "Invalid UDP tracker handshake".to_string(),
        };
    }

    Response::Connect {
        transaction_id: request.transaction_id,
        connection_id: connections.issue(remote_addr),
    }
}

async fn handle_announce(
    remote_addr: SocketAddr,
    request: &request::AnnounceRequest,
    tracker: &Arc<Tracker>,
    connections: &ConnectionMap,
) -> Response {
    if let Err(e) = connections.verify_and_remove(remote_addr, request.connection_id) {
        return connection_error_response(request.transaction_id, e);
    }

    let ip = match announce_ip(request.ip, remote_addr) {
        Some(ip) => ip,
        None => {
            return Response::Error {
                transaction_id: request.transaction_id,
                message: "Invalid integer parameter: ip".to_string(),
            }
        }
    };

    let numwant = if request.numwant == u32::MAX {
        DEFAULT_NUMWANT
    } else {
        request.numwant
    };

    let announce = core::AnnounceRequest {
        info_hash: request.info_hash,
        ip,
        port: request.port,
        uploaded: clamp_bytes(request.uploaded),
        downloaded: clamp_bytes(request.downloaded),
        left: clamp_bytes(request.left),
        event: AnnounceEvent::from_udp_code(request.event),
        numwant,
        client: String::new(),
        udp: true,
    };

    // UDP has no passkey slot: announces are attributed to the zero user.
    match tracker.announce(&UserRecord::anonymous(), &announce).await {
        Ok(data) => Response::Announce {
            transaction_id: request.transaction_id,
            interval: data.interval,
            leechers: clamp_count(data.leechers),
            seeders: clamp_count(data.seeders),
            peers: data.peers,
        },
        Err(e) => {
            if let core::error::Error::Database(source) = &e {
                error!("udp announce failed: {source}");
            }

            Response::Error {
                transaction_id: request.transaction_id,
                message: e.to_string(),
            }
        }
    }
}

async fn handle_scrape(
    remote_addr: SocketAddr,
    request: &request::ScrapeRequest,
    tracker: &Arc<Tracker>,
    connections: &ConnectionMap,
) -> Response {
    if let Err(e) = connections.verify_and_remove(remote_addr, request.connection_id) {
        return connection_error_response(request.transaction_id, e);
    }

    let origin_ip = remote_addr.ip().to_canonical().to_string();
    let scrape_data = tracker
        .scrape(&UserRecord::anonymous(), &request.info_hashes, &origin_ip)
        .await;

    let files = scrape_data
        .files
        .iter()
        .map(|(_, metadata)| ScrapeEntry {
            seeders: clamp_count(metadata.complete),
            completed: clamp_count(metadata.downloaded),
            leechers: clamp_count(metadata.incomplete),
        })
        .collect();

    Response::Scrape {
        transaction_id: request.transaction_id,
        files,
    }
}

fn connection_error_response(transaction_id: u32, error: ConnectionError) -> Response {
    let message = match error {
        ConnectionError::NotEstablished => "Client must properly handshake before announce",
        ConnectionError::Mismatch => "Invalid UDP connection ID",
    };

    Response::Error {
        transaction_id,
        message: message.to_string(),
    }
}

/// The BEP 15 `ip` field is an IPv4 as a 32-bit integer; 0 means "use the
/// datagram source". `None` when the source is IPv6 and the field is 0.
fn announce_ip(field: u32, remote_addr: SocketAddr) -> Option<String> {
    if field == 0 {
        match remote_addr.ip().to_canonical() {
            IpAddr::V4(v4) => Some(v4.to_string()),
            IpAddr::V6(_) => None,
        }
    } else {
        Some(Ipv4Addr::from(field).to_string())
    }
}

fn clamp_bytes(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(if value < 0 { 0 } else { u32::MAX })
}
