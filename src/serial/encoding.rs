// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Text encodings understood by the serial channel.
//!
//! Decoding never fails: bytes that do not fit the encoding become U+FFFD.
//! Encoding never fails either: characters that do not fit become `?`.

/// Supported line encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Ascii,
}

impl TextEncoding {
    /// Resolve a configuration label such as `utf-8` or `ISO-8859-1`.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Some(Self::Latin1),
            "ascii" | "us-ascii" => Some(Self::Ascii),
            _ => None,
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Self::Ascii => bytes
                .iter()
                .map(|&b| {
                    if b.is_ascii() {
                        char::from(b)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
        }
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
            Self::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_variants() {
        assert_eq!(TextEncoding::from_label("UTF-8"), Some(TextEncoding::Utf8));
        assert_eq!(TextEncoding::from_label("utf8"), Some(TextEncoding::Utf8));
        assert_eq!(
            TextEncoding::from_label("iso_8859_1"),
            Some(TextEncoding::Latin1)
        );
        assert_eq!(TextEncoding::from_label(" ascii "), Some(TextEncoding::Ascii));
        assert_eq!(TextEncoding::from_label("cp1250"), None);
    }

    #[test]
    fn test_utf8_decode_replaces_invalid_bytes() {
        let text = TextEncoding::Utf8.decode(&[b'o', b'k', 0xff, b'!']);
        assert_eq!(text, "ok\u{fffd}!");
    }

    #[test]
    fn test_latin1_round_trips_high_bytes() {
        let bytes = [0x41, 0xe9, 0xff];
        let text = TextEncoding::Latin1.decode(&bytes);
        assert_eq!(text, "Aéÿ");
        assert_eq!(TextEncoding::Latin1.encode(&text), bytes.to_vec());
    }

    #[test]
    fn test_unencodable_characters_become_question_marks() {
        assert_eq!(TextEncoding::Ascii.encode("teplota 25°C"), b"teplota 25?C".to_vec());
        assert_eq!(TextEncoding::Latin1.encode("€"), b"?".to_vec());
    }
}
