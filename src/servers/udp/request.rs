//! UDP tracker request packets.
//!
//! All integers are big-endian. The request header is 16 bytes:
//! `connection_id(8)`, `action(4)`, `transaction_id(4)`. An announce is
//! exactly 98 bytes; a scrape carries one 20-byte infohash per file after
//! the header.
use thiserror::Error;

use crate::shared::bit_torrent::info_hash::InfoHash;

pub const ACTION_CONNECT: u32 = 0;
pub const ACTION_ANNOUNCE: u32 = 1;
pub const ACTION_SCRAPE: u32 = 2;
pub const ACTION_ERROR: u32 = 3;

/// Announce request packet length: header plus 82 bytes of fields.
pub const ANNOUNCE_PACKET_LEN: usize = 98;

/// A decoded request datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    Announce(AnnounceRequest),
    Scrape(ScrapeRequest),
}

/// Connect request: the `connection_id` slot carries the protocol magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectRequest {
    pub connection_id: u64,
    pub transaction_id: u32,
}

/// Announce request, 98 bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    pub connection_id: u64,
    pub transaction_id: u32,
    pub info_hash: InfoHash,
    pub peer_id: [u8; 20],
    pub downloaded: u64,
    pub left: u64,
    pub uploaded: u64,
    /// 0 none, 1 completed, 2 started, 3 stopped.
    pub event: u32,
    /// IPv4 as a 32-bit integer; 0 means "use the datagram source".
    pub ip: u32,
    pub key: u32,
    /// `0xFFFF_FFFF` means "let the tracker choose".
    pub numwant: u32,
    pub port: u16,
}

/// Scrape request: one or more infohashes after the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub connection_id: u64,
    pub transaction_id: u32,
    pub info_hashes: Vec<InfoHash>,
}

/// Errors decoding a request datagram. Variants that know the transaction
/// id can be answered with an error packet.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("datagram shorter than a request header")]
    TooShort,
    #[error("unknown action {action}")]
    UnknownAction { action: u32, transaction_id: u32 },
    #[error("announce packet shorter than 98 bytes")]
    TruncatedAnnounce { transaction_id: u32 },
}

impl Request {
    /// It decodes a request datagram.
    ///
    /// # Errors
    ///
    /// Will return a `ParseError` if the datagram is shorter than a header,
    /// carries an unknown action, or truncates an announce.
    pub fn from_bytes(packet: &[u8]) -> Result<Request, ParseError> {
        if packet.len() < super::MIN_PACKET_LEN {
            return Err(ParseError::TooShort);
        }

        let connection_id = u64::from_be_bytes(packet[0..8].try_into().unwrap());
        let action = u32::from_be_bytes(packet[8..12].try_into().unwrap());
        let transaction_id = u32::from_be_bytes(packet[12..16].try_into().unwrap());

        match action {
            ACTION_CONNECT => Ok(Request::Connect(ConnectRequest {
                connection_id,
                transaction_id,
            })),
            ACTION_ANNOUNCE => {
                if packet.len() < ANNOUNCE_PACKET_LEN {
                    return Err(ParseError::TruncatedAnnounce { transaction_id });
                }

                let mut peer_id = [0u8; 20];
                peer_id.copy_from_slice(&packet[36..56]);

                Ok(Request::Announce(AnnounceRequest {
                    connection_id,
                    transaction_id,
                    info_hash: InfoHash::try_from(&packet[16..36]).expect("slice is 20 bytes"),
                    peer_id,
                    downloaded: u64::from_be_bytes(packet[56..64].try_into().unwrap()),
                    left: u64::from_be_bytes(packet[64..72].try_into().unwrap()),
                    uploaded: u64::from_be_bytes(packet[72..80].try_into().unwrap()),
                    event: u32::from_be_bytes(packet[80..84].try_into().unwrap()),
                    ip: u32::from_be_bytes(packet[84..88].try_into().unwrap()),
                    key: u32::from_be_bytes(packet[88..92].try_into().unwrap()),
                    numwant: u32::from_be_bytes(packet[92..96].try_into().unwrap()),
                    port: u16::from_be_bytes(packet[96..98].try_into().unwrap()),
                }))
            }
            ACTION_SCRAPE => {
                let info_hashes = packet[16..]
                    .chunks_exact(20)
                    .map(|chunk| InfoHash::try_from(chunk).expect("chunk is 20 bytes"))
                    .collect();

                Ok(Request::Scrape(ScrapeRequest {
                    connection_id,
                    transaction_id,
                    info_hashes,
                }))
            }
            action => Err(ParseError::UnknownAction { action, transaction_id }),
        }
    }
}

impl ConnectRequest {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(16);
        packet.extend_from_slice(&self.connection_id.to_be_bytes());
        packet.extend_from_slice(&ACTION_CONNECT.to_be_bytes());
        packet.extend_from_slice(&self.transaction_id.to_be_bytes());
        packet
    }
}

impl AnnounceRequest {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(ANNOUNCE_PACKET_LEN);
        packet.extend_from_slice(&self.connection_id.to_be_bytes());
        packet.extend_from_slice(&ACTION_ANNOUNCE.to_be_bytes());
        packet.extend_from_slice(&self.transaction_id.to_be_bytes());
        packet.extend_from_slice(&self.info_hash.bytes());
        packet.extend_from_slice(&self.peer_id);
        packet.extend_from_slice(&self.downloaded.to_be_bytes());
        packet.extend_from_slice(&self.left.to_be_bytes());
        packet.extend_from_slice(&self.uploaded.to_be_bytes());
        packet.extend_from_slice(&self.event.to_be_bytes());
        packet.extend_from_slice(&self.ip.to_be_bytes());
        packet.extend_from_slice(&self.key.to_be_bytes());
        packet.extend_from_slice(&self.numwant.to_be_bytes());
        packet.extend_from_slice(&self.port.to_be_bytes());
        packet
    }
}

impl ScrapeRequest {
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(16 + self.info_hashes.len() * 20);
        packet.extend_from_slice(&self.connection_id.to_be_bytes());
        packet.extend_from_slice(&ACTION_SCRAPE.to_be_bytes());
        packet.extend_from_slice(&self.transaction_id.to_be_bytes());
        for info_hash in &self.info_hashes {
            packet.extend_from_slice(&info_hash.bytes());
        }
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::{AnnounceRequest, ConnectRequest, ParseError, Request, ScrapeRequest};
    use crate::servers::udp::PROTOCOL_ID;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    #[test]
    fn a_connect_request_should_round_trip() {
        let request = ConnectRequest {
            connection_id: PROTOCOL_ID,
            transaction_id: 0x0102_0304,
        };

        let packet = request.to_bytes();

        assert_eq!(packet.len(), 16);
        assert_eq!(&packet[0..8], &[0x00, 0x00, 0x04, 0x17, 0x27, 0x10, 0x19, 0x80]);
        assert_eq!(&packet[8..12], &[0, 0, 0, 0]);
        assert_eq!(&packet[12..16], &[0x01, 0x02, 0x03, 0x04]);

        assert_eq!(Request::from_bytes(&packet).unwrap(), Request::Connect(request));
    }

    #[test]
    fn an_announce_request_should_round_trip() {
        let request = AnnounceRequest {
            connection_id: 0x0011_2233_4455_6677,
            transaction_id: 0xDEAD_BEEF,
            info_hash: InfoHash([0x69; 20]),
            peer_id: *b"-qB00000000000000001",
            downloaded: 1,
            left: 2,
            uploaded: 3,
            event: 2,
            ip: 0,
            key: 0xCAFE_BABE,
            numwant: u32::MAX,
            port: 6881,
        };

        let packet = request.to_bytes();

        assert_eq!(packet.len(), 98);
        assert_eq!(Request::from_bytes(&packet).unwrap(), Request::Announce(request));
    }

    #[test]
    fn a_scrape_request_should_round_trip_with_multiple_info_hashes() {
        let request = ScrapeRequest {
            connection_id: 1,
            transaction_id: 2,
            info_hashes: vec![InfoHash([0x69; 20]), InfoHash([0x42; 20])],
        };

        let packet = request.to_bytes();

        assert_eq!(packet.len(), 16 + 40);
        assert_eq!(Request::from_bytes(&packet).unwrap(), Request::Scrape(request));
    }

    #[test]
    fn datagrams_shorter_than_a_header_should_not_decode() {
        assert_eq!(Request::from_bytes(&[0u8; 15]).unwrap_err(), ParseError::TooShort);
    }

    #[test]
    fn an_unknown_action_should_keep_the_transaction_id_for_the_error_reply() {
        let mut packet = vec![0u8; 16];
        packet[8..12].copy_from_slice(&9u32.to_be_bytes());
        packet[12..16].copy_from_slice(&0x0102_0304u32.to_be_bytes());

        assert_eq!(
            Request::from_bytes(&packet).unwrap_err(),
            ParseError::UnknownAction {
                action: 9,
                transaction_id: 0x0102_0304
            }
        );
    }

    #[test]
    fn a_truncated_announce_should_not_decode() {
        let mut packet = vec![0u8; 50];
        packet[8..12].copy_from_slice(&1u32.to_be_bytes());

        assert_eq!(
            Request::from_bytes(&packet).unwrap_err(),
            ParseError::TruncatedAnnounce { transaction_id: 0 }
        );
    }
}
