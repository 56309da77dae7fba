//! A `BitTorrent` infohash: the SHA-1 hash of a torrent's `info` dictionary.
//!
//! On the wire it's a raw 20-byte array. Everywhere else the tracker handles
//! it as its 40-character lowercase hex form, which is also how it is stored
//! in the database.
use std::panic::Location;

use thiserror::Error;

/// A 20-byte `BitTorrent` infohash.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

const INFO_HASH_BYTES_LEN: usize = 20;

impl InfoHash {
    /// Returns the raw 20 bytes of the infohash.
    #[must_use]
    pub fn bytes(&self) -> [u8; 20] {
        self.0
    }

    /// Returns the infohash as a 40-char lowercase hex string.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for InfoHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for InfoHash {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != INFO_HASH_BYTES_LEN * 2 {
            return Err(ConversionError::InvalidHexLength {
                len: s.len(),
                location: Location::caller(),
            });
        }

        let mut bytes = [0u8; INFO_HASH_BYTES_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| ConversionError::InvalidHexChar {
                location: Location::caller(),
            })?;
        }

        Ok(InfoHash(bytes))
    }
}

impl From<[u8; 20]> for InfoHash {
    fn from(bytes: [u8; 20]) -> Self {
        InfoHash(bytes)
    }
}

impl TryFrom<&[u8]> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != INFO_HASH_BYTES_LEN {
            return Err(ConversionError::InvalidByteLength {
                len: bytes.len(),
                location: Location::caller(),
            });
        }

        let mut ret = [0u8; INFO_HASH_BYTES_LEN];
        ret.copy_from_slice(bytes);
        Ok(InfoHash(ret))
    }
}

impl TryFrom<Vec<u8>> for InfoHash {
    type Error = ConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        InfoHash::try_from(bytes.as_slice())
    }
}

impl serde::Serialize for InfoHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Error returned when a byte slice or hex string is not a valid infohash.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("invalid infohash byte length {len}, expected 20, {location}")]
    InvalidByteLength {
        len: usize,
        location: &'static Location<'static>,
    },
    #[error("invalid infohash hex length {len}, expected 40, {location}")]
    InvalidHexLength {
        len: usize,
        location: &'static Location<'static>,
    },
    #[error("invalid hex character in infohash, {location}")]
    InvalidHexChar { location: &'static Location<'static> },
}
