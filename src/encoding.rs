//! Encoded byte strings and the rules for reconciling two of them.
//!
//! Text handed to the differ may arrive in different encodings. Before two
//! texts can be compared they are transcoded into one target encoding:
//! the encoding compatible with both if there is one, otherwise a configured
//! default. Characters the target cannot represent are replaced with a
//! replacement glyph.

use error_set::error_set;
use std::fmt;
use std::str::FromStr;

error_set! {
    /// Errors from decoding or naming encodings
    EncodingError := {
        /// The bytes are not valid in their own encoding and no transcoding
        /// took place that could have replaced them
        #[display("invalid byte sequence in {encoding}")]
        InvalidByteSequence { encoding: Encoding },
        /// The encoding name is not recognised
        #[display("unknown encoding '{name}'")]
        UnknownEncoding { name: String },
    }
}

/// The encodings understood by [`EncodedString`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    UsAscii,
    /// Raw bytes; only the ASCII range has a character meaning
    Binary,
    Latin1,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::UsAscii => "US-ASCII",
            Encoding::Binary => "ASCII-8BIT",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
        }
    }

    /// Whether ASCII text has the same bytes in this encoding as in ASCII.
    pub fn is_ascii_compatible(self) -> bool {
        !matches!(self, Encoding::Utf16Le | Encoding::Utf16Be)
    }

    pub fn can_represent(self, c: char) -> bool {
        match self {
            Encoding::Utf8 | Encoding::Utf16Le | Encoding::Utf16Be => true,
            Encoding::UsAscii | Encoding::Binary => c.is_ascii(),
            Encoding::Latin1 => u32::from(c) <= 0xFF,
        }
    }

    /// Encode `text`, substituting `replacement` for unrepresentable characters.
    pub fn encode(self, text: &str, replacement: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len());
        let mut push = |c: char| match self {
            Encoding::Utf8 => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            Encoding::UsAscii | Encoding::Binary | Encoding::Latin1 => out.push(u32::from(c) as u8),
            Encoding::Utf16Le => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
            Encoding::Utf16Be => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
            }
        };
        for c in text.chars() {
            if self.can_represent(c) {
                push(c);
            } else {
                replacement.chars().filter(|r| self.can_represent(*r)).for_each(&mut push);
            }
        }
        out
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "UTF-8" | "UTF8" => Ok(Encoding::Utf8),
            "US-ASCII" | "ASCII" => Ok(Encoding::UsAscii),
            "ASCII-8BIT" | "BINARY" => Ok(Encoding::Binary),
            "ISO-8859-1" | "LATIN1" | "LATIN-1" => Ok(Encoding::Latin1),
            "UTF-16LE" => Ok(Encoding::Utf16Le),
            "UTF-16BE" => Ok(Encoding::Utf16Be),
            _ => Err(EncodingError::UnknownEncoding {
                name: s.to_string(),
            }),
        }
    }
}

/// One decoded unit of an encoded string.
enum Unit {
    Char(char),
    /// Bytes that are not valid in the source encoding
    Invalid,
    /// A valid byte with no character meaning outside its own encoding
    Undefined,
}

/// Bytes tagged with the encoding they are stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedString {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl EncodedString {
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    /// Encode UTF-8 text into `encoding`, replacing what does not map with `?`.
    pub fn from_text(text: &str, encoding: Encoding) -> Self {
        Self::new(encoding.encode(text, "?"), encoding)
    }

    pub fn utf8(text: &str) -> Self {
        Self::new(text.as_bytes(), Encoding::Utf8)
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True for ASCII-compatible strings holding only ASCII bytes.
    pub fn is_ascii_only(&self) -> bool {
        self.encoding.is_ascii_compatible() && self.bytes.is_ascii()
    }

    pub fn is_multiline(&self) -> bool {
        self.units().iter().any(|u| matches!(u, Unit::Char('\n')))
    }

    /// Decode to UTF-8, substituting `replacement` for anything undecodable.
    pub fn to_string_lossy(&self, replacement: &str) -> String {
        let mut out = String::with_capacity(self.bytes.len());
        for unit in self.units() {
            match unit {
                Unit::Char(c) => out.push(c),
                Unit::Invalid | Unit::Undefined => out.push_str(replacement),
            }
        }
        out
    }

    /// Decode into the character repertoire of `target`.
    ///
    /// Characters `target` cannot represent become `replacement`. Invalid
    /// bytes are replaced as well when the string is actually converted;
    /// when it is already in `target` they are reported instead.
    pub fn transcode(&self, target: Encoding, replacement: &str) -> Result<String, EncodingError> {
        let mut out = String::with_capacity(self.bytes.len());
        for unit in self.units() {
            match unit {
                Unit::Char(c) if target.can_represent(c) => out.push(c),
                Unit::Char(_) | Unit::Undefined => out.push_str(replacement),
                Unit::Invalid if self.encoding == target => {
                    return Err(EncodingError::InvalidByteSequence {
                        encoding: self.encoding,
                    });
                }
                Unit::Invalid => out.push_str(replacement),
            }
        }
        Ok(out)
    }

    fn units(&self) -> Vec<Unit> {
        match self.encoding {
            Encoding::Utf8 => {
                let mut units = Vec::with_capacity(self.bytes.len());
                for chunk in self.bytes.utf8_chunks() {
                    units.extend(chunk.valid().chars().map(Unit::Char));
                    if !chunk.invalid().is_empty() {
                        units.push(Unit::Invalid);
                    }
                }
                units
            }
            Encoding::UsAscii => self
                .bytes
                .iter()
                .map(|&b| if b.is_ascii() { Unit::Char(char::from(b)) } else { Unit::Invalid })
                .collect(),
            Encoding::Binary => self
                .bytes
                .iter()
                .map(|&b| if b.is_ascii() { Unit::Char(char::from(b)) } else { Unit::Undefined })
                .collect(),
            Encoding::Latin1 => self.bytes.iter().map(|&b| Unit::Char(char::from(b))).collect(),
            Encoding::Utf16Le | Encoding::Utf16Be => {
                let pairs = self.bytes.chunks_exact(2);
                let trailing = !pairs.remainder().is_empty();
                let code_units = pairs.map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if self.encoding == Encoding::Utf16Le {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    }
                });
                let mut units: Vec<Unit> = char::decode_utf16(code_units)
                    .map(|r| r.map_or(Unit::Invalid, Unit::Char))
                    .collect();
                if trailing {
                    units.push(Unit::Invalid);
                }
                units
            }
        }
    }
}

/// The encoding both strings can be combined in, if any.
///
/// Identical encodings are compatible; an empty string adopts the other
/// side's encoding; between ASCII-compatible encodings an ASCII-only string
/// defers to the other side.
pub fn compatible_encoding(a: &EncodedString, b: &EncodedString) -> Option<Encoding> {
    if a.encoding == b.encoding {
        return Some(a.encoding);
    }
    if b.is_empty() {
        return Some(a.encoding);
    }
    if a.is_empty() {
        return Some(b.encoding);
    }
    if !a.encoding.is_ascii_compatible() || !b.encoding.is_ascii_compatible() {
        return None;
    }
    if b.is_ascii_only() {
        return Some(a.encoding);
    }
    if a.is_ascii_only() {
        return Some(b.encoding);
    }
    None
}

/// The target encoding for combining `a` and `b`.
pub fn pick_encoding(a: &EncodedString, b: &EncodedString, default_external: Encoding) -> Encoding {
    compatible_encoding(a, b).unwrap_or_else(|| {
        tracing::debug!(
            first = %a.encoding,
            second = %b.encoding,
            fallback = %default_external,
            "incompatible encodings, using default external encoding"
        );
        default_external
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn utf16_round_trips_through_transcode() {
        let text = "Tu avec carté {count} itém has\n";
        let encoded = EncodedString::from_text(text, Encoding::Utf16Le);
        assert_eq!(encoded.as_bytes().len(), text.chars().count() * 2);
        assert_eq!(encoded.transcode(Encoding::Utf16Le, "?").unwrap(), text);
        assert!(encoded.is_multiline());
    }

    #[test]
    fn ascii_target_replaces_unmappable_characters() {
        let encoded = EncodedString::utf8("carté\n");
        assert_eq!(encoded.transcode(Encoding::UsAscii, "?").unwrap(), "cart?\n");
        assert_eq!(encoded.transcode(Encoding::UsAscii, "<?>").unwrap(), "cart<?>\n");
    }

    #[test]
    fn invalid_bytes_are_replaced_when_converting() {
        let encoded = EncodedString::new(b"ab\xffc".to_vec(), Encoding::Utf8);
        assert_eq!(encoded.transcode(Encoding::Utf16Le, "?").unwrap(), "ab?c");
    }

    #[test]
    fn invalid_bytes_are_reported_without_conversion() {
        let encoded = EncodedString::new(b"ab\xffc".to_vec(), Encoding::Utf8);
        assert!(matches!(
            encoded.transcode(Encoding::Utf8, "?"),
            Err(EncodingError::InvalidByteSequence {
                encoding: Encoding::Utf8
            })
        ));
    }

    #[test]
    fn binary_high_bytes_are_undefined_everywhere() {
        let encoded = EncodedString::new(b"a\x80".to_vec(), Encoding::Binary);
        assert_eq!(encoded.transcode(Encoding::Binary, "?").unwrap(), "a?");
        assert_eq!(encoded.transcode(Encoding::Utf8, "?").unwrap(), "a?");
    }

    #[test]
    fn ascii_only_string_defers_to_other_encoding() {
        let ascii = EncodedString::from_text("abc\n", Encoding::UsAscii);
        let korean = EncodedString::utf8("강인철\n");
        assert_eq!(compatible_encoding(&korean, &ascii), Some(Encoding::Utf8));
        assert_eq!(compatible_encoding(&ascii, &korean), Some(Encoding::Utf8));
    }

    #[test]
    fn utf16_and_utf8_are_incompatible() {
        let utf16 = EncodedString::from_text("carté\n", Encoding::Utf16Le);
        let utf8 = EncodedString::utf8("carte\n");
        assert_eq!(compatible_encoding(&utf16, &utf8), None);
        assert_eq!(pick_encoding(&utf16, &utf8, Encoding::Utf8), Encoding::Utf8);
    }

    #[test]
    fn non_ascii_strings_in_different_encodings_are_incompatible() {
        let latin = EncodedString::from_text("é", Encoding::Latin1);
        let utf8 = EncodedString::utf8("ü");
        assert_eq!(compatible_encoding(&latin, &utf8), None);
    }

    #[test]
    fn empty_string_adopts_other_encoding() {
        let empty = EncodedString::new(Vec::new(), Encoding::UsAscii);
        let utf16 = EncodedString::from_text("x", Encoding::Utf16Be);
        assert_eq!(compatible_encoding(&empty, &utf16), Some(Encoding::Utf16Be));
    }

    #[test]
    fn parse_encoding_names() {
        assert_eq!("utf-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("binary".parse::<Encoding>().unwrap(), Encoding::Binary);
        assert_eq!("UTF_16LE".parse::<Encoding>().unwrap(), Encoding::Utf16Le);
        assert!(matches!(
            "EBCDIC".parse::<Encoding>(),
            Err(EncodingError::UnknownEncoding { .. })
        ));
    }
}
