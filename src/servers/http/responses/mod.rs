//! Bencoded response bodies for the HTTP tracker.
//!
//! The failure dictionary round-trips through `serde_bencode`; the announce
//! and scrape bodies carry raw byte strings (compact peer blobs, 20-byte
//! infohash keys) that a string-keyed serde serializer cannot express, so
//! they are written with the small [`Writer`] below. Dictionary keys must be
//! emitted in sorted order.
pub mod announce;
pub mod error;
pub mod scrape;

/// Minimal bencode writer: just enough for tracker response dictionaries.
#[derive(Default)]
pub(crate) struct Writer {
    output: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_dict(&mut self) {
        self.output.push(b'd');
    }

    pub fn end(&mut self) {
        self.output.push(b'e');
    }

    pub fn int(&mut self, value: i64) {
        self.output.push(b'i');
        self.output.extend_from_slice(value.to_string().as_bytes());
        self.output.push(b'e');
    }

    pub fn bytes(&mut self, value: &[u8]) {
        self.output.extend_from_slice(value.len().to_string().as_bytes());
        self.output.push(b':');
        self.output.extend_from_slice(value);
    }

    pub fn str(&mut self, value: &str) {
        self.bytes(value.as_bytes());
    }

    pub fn finalize(self) -> Vec<u8> {
        self.output
    }
}

/// `Content-Type` of every HTTP tracker response.
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[cfg(test)]
mod tests {
    use super::Writer;

    #[test]
    fn it_should_write_bencoded_dictionaries() {
        let mut writer = Writer::new();

        writer.start_dict();
        writer.str("interval");
        writer.int(3600);
        writer.str("peers");
        writer.bytes(&[126, 0, 0, 1, 0x1a, 0xe1]);
        writer.end();

        assert_eq!(
            writer.finalize(),
            [
                b"d8:intervali3600e5:peers6:".as_slice(),
                [126, 0, 0, 1, 0x1a, 0xe1].as_slice(),
                b"e".as_slice()
            ]
            .concat()
        );
    }

    #[test]
    fn it_should_write_negative_integers() {
        let mut writer = Writer::new();

        writer.int(-17);

        assert_eq!(writer.finalize(), b"i-17e");
    }
}
