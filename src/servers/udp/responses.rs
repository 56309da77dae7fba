//! UDP tracker response packets.
//!
//! All integers are big-endian. Every response echoes the transaction id of
//! the request it answers.
use thiserror::Error;

use super::request::{ACTION_ANNOUNCE, ACTION_CONNECT, ACTION_ERROR, ACTION_SCRAPE};

/// Per-file counters in a scrape response, 12 bytes each, in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeEntry {
    pub seeders: u32,
    pub completed: u32,
    pub leechers: u32,
}

/// A response datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// 16 bytes: `action(4)=0`, `transaction_id(4)`, `connection_id(8)`.
    Connect { transaction_id: u32, connection_id: u64 },
    /// 20 bytes of counters followed by the compact peer list.
    Announce {
        transaction_id: u32,
        interval: u32,
        leechers: u32,
        seeders: u32,
        peers: Vec<u8>,
    },
    /// 8 bytes of header followed by 12 bytes per scraped file.
    Scrape {
        transaction_id: u32,
        files: Vec<ScrapeEntry>,
    },
    /// 8 bytes of header followed by a UTF-8 message.
    Error { transaction_id: u32, message: String },
}

/// Errors decoding a response datagram. Only the test clients decode
/// responses, but the codec keeps both directions symmetrical.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("datagram shorter than a response of its action")]
    TooShort,
    #[error("unknown action {action}")]
    UnknownAction { action: u32 },
    #[error("error message is not valid UTF-8")]
    InvalidMessage,
}

impl Response {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Response::Connect {
                transaction_id,
                connection_id,
            } => {
                let mut packet = Vec::with_capacity(16);
                packet.extend_from_slice(&ACTION_CONNECT.to_be_bytes());
                packet.extend_from_slice(&transaction_id.to_be_bytes());
                packet.extend_from_slice(&connection_id.to_be_bytes());
                packet
            }
            Response::Announce {
                transaction_id,
                interval,
                leechers,
                seeders,
                peers,
            } => {
                let mut packet = Vec::with_capacity(20 + peers.len());
                packet.extend_from_slice(&ACTION_ANNOUNCE.to_be_bytes());
                packet.extend_from_slice(&transaction_id.to_be_bytes());
                packet.extend_from_slice(&interval.to_be_bytes());
                packet.extend_from_slice(&leechers.to_be_bytes());
                packet.extend_from_slice(&seeders.to_be_bytes());
                packet.extend_from_slice(peers);
                packet
            }
            Response::Scrape { transaction_id, files } => {
                let mut packet = Vec::with_capacity(8 + files.len() * 12);
                packet.extend_from_slice(&ACTION_SCRAPE.to_be_bytes());
                packet.extend_from_slice(&transaction_id.to_be_bytes());
                for file in files {
                    packet.extend_from_slice(&file.seeders.to_be_bytes());
                    packet.extend_from_slice(&file.completed.to_be_bytes());
                    packet.extend_from_slice(&file.leechers.to_be_bytes());
                }
                packet
            }
            Response::Error {
                transaction_id,
                message,
            } => {
                let mut packet = Vec::with_capacity(8 + message.len());
                packet.extend_from_slice(&ACTION_ERROR.to_be_bytes());
                packet.extend_from_slice(&transaction_id.to_be_bytes());
                packet.extend_from_slice(message.as_bytes());
                packet
            }
        }
    }

    /// It decodes a response datagram.
    ///
    /// # Errors
    ///
    /// Will return a `ParseError` if the datagram is shorter than its action
    /// requires or the action is unknown.
    pub fn from_bytes(packet: &[u8]) -> Result<Response, ParseError> {
        if packet.len() < 8 {
            return Err(ParseError::TooShort);
        }

        let action = u32::from_be_bytes(packet[0..4].try_into().unwrap());
        let transaction_id = u32::from_be_bytes(packet[4..8].try_into().unwrap());

        match action {
            ACTION_CONNECT => {
                if packet.len() < 16 {
                    return Err(ParseError::TooShort);
                }

                Ok(Response::Connect {
                    transaction_id,
                    connection_id: u64::from_be_bytes(packet[8..16].try_into().unwrap()),
                })
            }
            ACTION_ANNOUNCE => {
                if packet.len() < 20 {
                    return Err(ParseError::TooShort);
                }

                Ok(Response::Announce {
                    transaction_id,
                    interval: u32::from_be_bytes(packet[8..12].try_into().unwrap()),
                    leechers: u32::from_be_bytes(packet[12..16].try_into().unwrap()),
                    seeders: u32::from_be_bytes(packet[16..20].try_into().unwrap()),
                    peers: packet[20..].to_vec(),
                })
            }
            ACTION_SCRAPE => {
                let files = packet[8..]
                    .chunks_exact(12)
                    .map(|chunk| ScrapeEntry {
                        seeders: u32::from_be_bytes(chunk[0..4].try_into().unwrap()),
                        completed: u32::from_be_bytes(chunk[4..8].try_into().unwrap()),
                        leechers: u32::from_be_bytes(chunk[8..12].try_into().unwrap()),
                    })
                    .collect();

                Ok(Response::Scrape { transaction_id, files })
            }
            ACTION_ERROR => Ok(Response::Error {
                transaction_id,
                message: String::from_utf8(packet[8..].to_vec()).map_err(|_| ParseError::InvalidMessage)?,
            }),
            action => Err(ParseError::UnknownAction { action }),
        }
    }
}
