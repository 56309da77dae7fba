//! `Scrape` response for the HTTP tracker.
use std::collections::BTreeMap;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use super::Writer;
use crate::core::ScrapeData;
use crate::core::torrent::SwarmMetadata;

/// The `scrape` response: a `files` dictionary keyed by the raw 20-byte
/// infohashes.
///
/// ```text
/// d5:filesd20:~~~~~~~~~~~~~~~~~~~~d8:completei1e10:downloadedi2e10:incompletei3eeee
/// ```
#[derive(Debug, PartialEq, Eq, Default)]
pub struct Bencoded {
    scrape_data: ScrapeData,
}

impl Bencoded {
    /// Returns the bencoded body of the scrape response. The `files` keys
    /// are raw infohash bytes, sorted as bencode requires.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let files: BTreeMap<[u8; 20], SwarmMetadata> = self
            .scrape_data
            .files
            .iter()
            .map(|(info_hash, metadata)| (info_hash.bytes(), *metadata))
            .collect();

        let mut writer = Writer::new();

        writer.start_dict();
        writer.str("files");
        writer.start_dict();

        for (info_hash, metadata) in &files {
            writer.bytes(info_hash);
            writer.start_dict();
            writer.str("complete");
            writer.int(metadata.complete);
            writer.str("downloaded");
            writer.int(metadata.downloaded);
            writer.str("incomplete");
            writer.int(metadata.incomplete);
            writer.end();
        }

        writer.end();
        writer.end();

        writer.finalize()
    }
}

impl From<ScrapeData> for Bencoded {
    fn from(scrape_data: ScrapeData) -> Self {
        Self { scrape_data }
    }
}

impl IntoResponse for Bencoded {
    fn into_response(self) -> Response {
        (StatusCode::OK, [(header::CONTENT_TYPE, super::CONTENT_TYPE)], self.body()).into_response()
    }
}
