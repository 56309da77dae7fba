//! The `Query` struct used to parse and store the raw URL query parameters.
//!
//! Values are kept percent-encoded: binary params like `info_hash` must be
//! decoded from the raw form (see
//! [`percent_encoding`](crate::servers::http::percent_encoding)), and the
//! plain params do not need decoding at all.
use std::panic::Location;
use std::str::FromStr;

use multimap::MultiMap;
use thiserror::Error;

type ParamName = String;
type ParamValue = String;

/// The query component of a request URL, with support for repeated params
/// (`info_hash` appears once per file on a scrape).
#[derive(Debug)]
pub struct Query {
    params: MultiMap<ParamName, ParamValue>,
}

impl Query {
    /// Returns the first value of a param, still percent-encoded.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).cloned()
    }

    /// Returns all the values of a param, still percent-encoded.
    #[must_use]
    pub fn get_param_vec(&self, name: &str) -> Option<Vec<String>> {
        self.params.get_vec(name).cloned()
    }
}

/// This error can be returned when parsing a [`Query`] from a string.
#[derive(Error, Debug)]
pub enum ParseQueryError {
    /// Invalid URL query param, for example `"name=value=value"` with an
    /// unescaped `=` character.
    #[error("invalid param {raw_param} in {location}")]
    InvalidParam {
        location: &'static Location<'static>,
        raw_param: String,
    },
}

impl FromStr for Query {
    type Err = ParseQueryError;

    fn from_str(raw_query: &str) -> Result<Self, Self::Err> {
        let mut params: MultiMap<ParamName, ParamValue> = MultiMap::new();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            let pair = raw_param.split('=').collect::<Vec<&str>>();

            if pair.len() != 2 {
                return Err(ParseQueryError::InvalidParam {
                    location: Location::caller(),
                    raw_param: raw_param.to_owned(),
                });
            }

            params.insert(pair[0].to_owned(), pair[1].to_owned());
        }

        Ok(Self { params })
    }
}

impl From<Vec<(&str, &str)>> for Query {
    fn from(raw_params: Vec<(&str, &str)>) -> Self {
        let mut params: MultiMap<ParamName, ParamValue> = MultiMap::new();

        for (name, value) in raw_params {
            params.insert(name.to_owned(), value.to_owned());
        }

        Self { params }
    }
}
