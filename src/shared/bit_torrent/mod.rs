//! Types shared by all `BitTorrent` delivery layers.
pub mod info_hash;
