//! `Scrape` request for the HTTP tracker.
use thiserror::Error;

use crate::servers::http::percent_encoding::percent_decode_info_hash;
use crate::servers::http::query::Query;
use crate::servers::http::responses;
use crate::shared::bit_torrent::info_hash::InfoHash;

const INFO_HASH: &str = "info_hash";

/// The `scrape` request: one or more infohashes, in request order.
#[derive(Debug, PartialEq, Eq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// Errors that can occur when parsing the `scrape` querystring. The
/// `Display` form is the exact client-facing failure reason.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseScrapeError {
    #[error("Missing required parameter: info_hash")]
    MissingInfoHash,
    #[error("Invalid info hash")]
    InvalidInfoHash,
}

impl From<ParseScrapeError> for responses::error::Error {
    fn from(err: ParseScrapeError) -> Self {
        responses::error::Error {
            failure_reason: err.to_string(),
        }
    }
}

impl TryFrom<&Query> for Scrape {
    type Error = ParseScrapeError;

    fn try_from(query: &Query) -> Result<Self, Self::Error> {
        let raw_params = query.get_param_vec(INFO_HASH).ok_or(ParseScrapeError::MissingInfoHash)?;

        let mut info_hashes = Vec::with_capacity(raw_params.len());
        for raw_param in &raw_params {
            info_hashes.push(percent_decode_info_hash(raw_param).map_err(|_| ParseScrapeError::InvalidInfoHash)?);
        }

        Ok(Self { info_hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::{ParseScrapeError, Scrape};
    use crate::servers::http::query::Query;

    #[test]
    fn it_should_parse_multiple_info_hashes_in_request_order() {
        let query = Query::from(vec![
            ("info_hash", "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0"),
            ("info_hash", "%69%69%69%69%69%69%69%69%69%69%69%69%69%69%69%69%69%69%69%69"),
        ]);

        let scrape = Scrape::try_from(&query).unwrap();

        assert_eq!(scrape.info_hashes.len(), 2);
        assert_eq!(
            scrape.info_hashes[0].to_hex_string(),
            "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0"
        );
        assert_eq!(scrape.info_hashes[1].to_hex_string(), "69".repeat(20));
    }

    #[test]
    fn it_should_fail_without_any_info_hash_param() {
        let query = Query::from(vec![("ip", "126.0.0.1")]);

        assert_eq!(Scrape::try_from(&query).unwrap_err(), ParseScrapeError::MissingInfoHash);
    }

    #[test]
    fn it_should_fail_when_one_info_hash_is_invalid() {
        let query = Query::from(vec![("info_hash", "abc")]);

        assert_eq!(Scrape::try_from(&query).unwrap_err(), ParseScrapeError::InvalidInfoHash);
    }
}
