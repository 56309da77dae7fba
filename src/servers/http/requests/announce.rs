//! `Announce` request for the HTTP tracker.
use std::net::IpAddr;

use thiserror::Error;

use crate::core::{AnnounceEvent, AnnounceRequest, DEFAULT_NUMWANT};
use crate::servers::http::percent_encoding::percent_decode_info_hash;
use crate::servers::http::query::Query;
use crate::servers::http::responses;
use crate::shared::bit_torrent::info_hash::InfoHash;

// Query param names
const INFO_HASH: &str = "info_hash";
const IP: &str = "ip";
const PORT: &str = "port";
const UPLOADED: &str = "uploaded";
const DOWNLOADED: &str = "downloaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const NUMWANT: &str = "numwant";
const COMPACT: &str = "compact";

/// The `announce` request, parsed from the querystring.
///
/// The `ip` param is optional on the wire; when absent it is taken from the
/// transport's remote address, so after parsing it is always set.
#[derive(Debug, PartialEq, Eq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub ip: String,
    pub port: u16,
    pub uploaded: i64,
    pub downloaded: i64,
    pub left: i64,
    pub event: AnnounceEvent,
    pub numwant: u32,
    /// Raw `compact` param. The tracker only supports compact announces, so
    /// the handler rejects anything but `"1"`.
    pub compact: Option<String>,
}

/// Errors that can occur when parsing the `announce` querystring. The
/// `Display` form is the exact client-facing failure reason.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseAnnounceError {
    #[error("Missing required parameter: {param_name}")]
    MissingParam { param_name: String },
    #[error("Invalid integer parameter: {param_name}")]
    InvalidIntParam { param_name: String },
    #[error("Invalid info hash")]
    InvalidInfoHash,
}

impl From<ParseAnnounceError> for responses::error::Error {
    fn from(err: ParseAnnounceError) -> Self {
        responses::error::Error {
            failure_reason: err.to_string(),
        }
    }
}

impl Announce {
    /// It parses the announce params from the querystring. `remote_ip` is
    /// the peer address of the underlying connection, used when the `ip`
    /// param is absent.
    ///
    /// # Errors
    ///
    /// Will return an error when a required param is missing or malformed.
    pub fn from_query(query: &Query, remote_ip: &IpAddr) -> Result<Self, ParseAnnounceError> {
        let info_hash = extract_info_hash(query)?;

        let ip = match query.get_param(IP) {
            Some(ip) => ip,
            None => remote_ip.to_canonical().to_string(),
        };

        Ok(Self {
            info_hash,
            ip,
            port: extract_port(query)?,
            uploaded: extract_number_of_bytes(UPLOADED, query)?,
            downloaded: extract_number_of_bytes(DOWNLOADED, query)?,
            left: extract_number_of_bytes(LEFT, query)?,
            event: extract_event(query),
            numwant: extract_numwant(query)?,
            compact: query.get_param(COMPACT),
        })
    }

    /// Normalizes the parsed request for the tracker engine.
    #[must_use]
    pub fn into_request(self, client: &str) -> AnnounceRequest {
        AnnounceRequest {
            info_hash: self.info_hash,
            ip: self.ip,
            port: self.port,
            uploaded: self.uploaded,
            downloaded: self.downloaded,
            left: self.left,
            event: self.event,
            numwant: self.numwant,
            client: client.to_string(),
            udp: false,
        }
    }
}

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseAnnounceError> {
    match query.get_param(INFO_HASH) {
        Some(raw_param) => percent_decode_info_hash(&raw_param).map_err(|_| ParseAnnounceError::InvalidInfoHash),
        None => Err(ParseAnnounceError::MissingParam {
            param_name: INFO_HASH.to_owned(),
        }),
    }
}

fn extract_port(query: &Query) -> Result<u16, ParseAnnounceError> {
    let raw_param = query.get_param(PORT).ok_or(ParseAnnounceError::MissingParam {
        param_name: PORT.to_owned(),
    })?;

    match raw_param.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ParseAnnounceError::InvalidIntParam {
            param_name: PORT.to_owned(),
        }),
    }
}

fn extract_number_of_bytes(param_name: &str, query: &Query) -> Result<i64, ParseAnnounceError> {
    let raw_param = query.get_param(param_name).ok_or(ParseAnnounceError::MissingParam {
        param_name: param_name.to_owned(),
    })?;

    raw_param
        .parse::<u64>()
        .ok()
        .and_then(|number_of_bytes| i64::try_from(number_of_bytes).ok())
        .ok_or(ParseAnnounceError::InvalidIntParam {
            param_name: param_name.to_owned(),
        })
}

fn extract_event(query: &Query) -> AnnounceEvent {
    match query.get_param(EVENT) {
        Some(raw_param) => AnnounceEvent::from_query_value(&raw_param),
        None => AnnounceEvent::None,
    }
}

fn extract_numwant(query: &Query) -> Result<u32, ParseAnnounceError> {
    match query.get_param(NUMWANT) {
        Some(raw_param) => raw_param.parse::<u32>().map_err(|_| ParseAnnounceError::InvalidIntParam {
            param_name: NUMWANT.to_owned(),
        }),
        None => Ok(DEFAULT_NUMWANT),
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{Announce, ParseAnnounceError};
    use crate::core::AnnounceEvent;
    use crate::servers::http::query::Query;

    const ENCODED_INFO_HASH: &str = "%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0";

    fn remote_ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))
    }

    fn minimal_query() -> Vec<(&'static str, &'static str)> {
        vec![
            ("info_hash", ENCODED_INFO_HASH),
            ("port", "17548"),
            ("uploaded", "0"),
            ("downloaded", "0"),
            ("left", "0"),
            ("compact", "1"),
        ]
    }

    #[test]
    fn it_should_be_parsed_from_the_mandatory_params() {
        let announce = Announce::from_query(&Query::from(minimal_query()), &remote_ip()).unwrap();

        assert_eq!(announce.info_hash.to_hex_string(), "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0");
        assert_eq!(announce.port, 17548);
        assert_eq!(announce.event, AnnounceEvent::None);
        assert_eq!(announce.numwant, 50);
        assert_eq!(announce.compact.as_deref(), Some("1"));
    }

    #[test]
    fn the_ip_param_should_default_to_the_remote_address() {
        let announce = Announce::from_query(&Query::from(minimal_query()), &remote_ip()).unwrap();

        assert_eq!(announce.ip, "126.0.0.1");
    }

    #[test]
    fn an_explicit_ip_param_should_win_over_the_remote_address() {
        let mut params = minimal_query();
        params.push(("ip", "10.0.0.9"));

        let announce = Announce::from_query(&Query::from(params), &remote_ip()).unwrap();

        assert_eq!(announce.ip, "10.0.0.9");
    }

    #[test]
    fn it_should_fail_when_a_required_param_is_missing() {
        for missing in ["info_hash", "port", "uploaded", "downloaded", "left"] {
            let params: Vec<_> = minimal_query().into_iter().filter(|(name, _)| *name != missing).collect();

            let error = Announce::from_query(&Query::from(params), &remote_ip()).unwrap_err();

            if missing == "info_hash" {
                assert_eq!(error.to_string(), "Missing required parameter: info_hash");
            } else {
                assert_eq!(error.to_string(), format!("Missing required parameter: {missing}"));
            }
        }
    }

    #[test]
    fn it_should_fail_when_an_integer_param_is_malformed() {
        for bad in ["port", "uploaded", "downloaded", "left"] {
            let params: Vec<_> = minimal_query()
                .into_iter()
                .map(|(name, value)| if name == bad { (name, "not-a-number") } else { (name, value) })
                .collect();

            let error = Announce::from_query(&Query::from(params), &remote_ip()).unwrap_err();

            assert_eq!(error.to_string(), format!("Invalid integer parameter: {bad}"));
        }
    }

    #[test]
    fn it_should_fail_when_the_info_hash_does_not_decode_to_20_bytes() {
        let params: Vec<_> = minimal_query()
            .into_iter()
            .map(|(name, value)| if name == "info_hash" { (name, "abc") } else { (name, value) })
            .collect();

        let error = Announce::from_query(&Query::from(params), &remote_ip()).unwrap_err();

        assert_eq!(error, ParseAnnounceError::InvalidInfoHash);
    }

    #[test]
    fn unknown_event_names_should_count_as_regular_announces() {
        let mut params = minimal_query();
        params.push(("event", "paused"));

        let announce = Announce::from_query(&Query::from(params), &remote_ip()).unwrap();

        assert_eq!(announce.event, AnnounceEvent::None);
    }

    #[test]
    fn it_should_parse_the_announce_events() {
        for (name, event) in [
            ("started", AnnounceEvent::Started),
            ("stopped", AnnounceEvent::Stopped),
            ("completed", AnnounceEvent::Completed),
        ] {
            let mut params = minimal_query();
            params.push(("event", name));

            let announce = Announce::from_query(&Query::from(params), &remote_ip()).unwrap();

            assert_eq!(announce.event, event);
        }
    }

    #[test]
    fn a_port_of_zero_should_be_rejected() {
        let params: Vec<_> = minimal_query()
            .into_iter()
            .map(|(name, value)| if name == "port" { (name, "0") } else { (name, value) })
            .collect();

        let error = Announce::from_query(&Query::from(params), &remote_ip()).unwrap_err();

        assert_eq!(error.to_string(), "Invalid integer parameter: port");
    }
}
