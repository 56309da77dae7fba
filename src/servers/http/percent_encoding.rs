//! Percent decoding for binary query params.
//!
//! `BitTorrent` infohashes are percent encoded like any other URL parameter,
//! but they encode raw binary (a 20-byte SHA-1) which is usually not valid
//! UTF-8. Decoding must therefore run on the raw querystring bytes, before
//! any UTF-8 interpretation.
use crate::shared::bit_torrent::info_hash::{ConversionError, InfoHash};

/// Percent decodes a percent encoded infohash.
///
/// For example, the infohash `3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0` is
/// percent encoded as `%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0`.
///
/// # Errors
///
/// Will return `Err` if the decoded bytes are not a valid [`InfoHash`].
pub fn percent_decode_info_hash(raw_info_hash: &str) -> Result<InfoHash, ConversionError> {
    let bytes = percent_encoding::percent_decode_str(raw_info_hash).collect::<Vec<u8>>();
    InfoHash::try_from(bytes)
}
