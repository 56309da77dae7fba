//! Parsing of the `announce` and `scrape` querystrings into the tracker
//! engine's normalized request types.
pub mod announce;
pub mod scrape;
