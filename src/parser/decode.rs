//! Raw line decoding
//!
//! Log files are split on `\n` bytes before decoding, so only
//! ASCII-compatible encodings can be used.

use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;

/// Decodes raw line bytes with a configured text encoding
#[derive(Debug, Clone, Copy)]
pub struct LineDecoder {
    encoding: &'static Encoding,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self { encoding: UTF_8 }
    }
}

impl LineDecoder {
    /// Resolve a WHATWG encoding label (`utf-8`, `latin1`, `windows-1252`, ...)
    ///
    /// Returns `None` for unknown labels and for encodings that are not
    /// ASCII-compatible (UTF-16 and friends).
    pub fn for_label(label: &str) -> Option<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())?;
        if !encoding.is_ascii_compatible() {
            return None;
        }
        Some(Self { encoding })
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode one line; malformed sequences become U+FFFD
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, _had_errors) = self.encoding.decode_without_bom_handling(bytes);
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(LineDecoder::for_label("utf-8").unwrap().name(), "UTF-8");
        assert_eq!(LineDecoder::for_label("latin1").unwrap().name(), "windows-1252");
        assert!(LineDecoder::for_label("utf-16le").is_none());
        assert!(LineDecoder::for_label("klingon").is_none());
    }

    #[test]
    fn test_decode_latin1() {
        let decoder = LineDecoder::for_label("latin1").unwrap();
        assert_eq!(decoder.decode(b"caf\xe9"), "café");
    }
}
