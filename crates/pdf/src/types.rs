use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::Serialize;
use thiserror::Error;

/// A decompressed content block, tagged with the byte range of its
/// compressed payload in the raw document.
#[derive(Debug, Clone)]
pub struct DecodedBlock {
    /// Discovery order among successfully inflated blocks.
    pub index: usize,
    pub source: Range<usize>,
    pub data: Vec<u8>,
}

impl DecodedBlock {
    /// Whether the block contains any show-text operator bytes at all.
    pub fn has_text_operators(&self) -> bool {
        self.data.windows(2).any(|w| w == b"Tj" || w == b"TJ")
    }
}

/// A to-Unicode character map: fixed-length byte codes to Unicode text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMap {
    key_length: usize,
    mapping: BTreeMap<Vec<u8>, String>,
}

impl CMap {
    pub fn new(key_length: usize) -> Result<Self, InvalidKeyLength> {
        if key_length == 0 {
            return Err(InvalidKeyLength);
        }
        Ok(CMap {
            key_length,
            mapping: BTreeMap::new(),
        })
    }

    pub fn key_length(&self) -> usize {
        self.key_length
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn get(&self, code: &[u8]) -> Option<&str> {
        self.mapping.get(code).map(String::as_str)
    }

    /// Insert a mapping, replacing any earlier destination for the same code.
    pub fn insert(
        &mut self,
        code: impl Into<Vec<u8>>,
        text: impl Into<String>,
    ) -> Result<(), KeyLengthMismatch> {
        let code = code.into();
        if code.len() != self.key_length {
            return Err(KeyLengthMismatch {
                expected: self.key_length,
                found: code.len(),
            });
        }
        self.mapping.insert(code, text.into());
        Ok(())
    }

    /// Decode a byte string by splitting it into `key_length` codes.
    ///
    /// Returns an empty string when the input is not a whole number of
    /// codes. Unmapped codes contribute nothing.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if bytes.len() % self.key_length != 0 {
            return String::new();
        }
        bytes
            .chunks(self.key_length)
            .filter_map(|code| self.get(code))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &str)> {
        self.mapping.iter().map(|(k, v)| (k.as_slice(), v.as_str()))
    }
}

/// Element kind inside an array operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Literal,
    Hex,
    /// Numbers, names and anything else that is not a string.
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayItem {
    pub kind: ItemKind,
    pub bytes: Vec<u8>,
}

/// One lexical unit of a content stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(Vec<u8>),
    /// Hex string, already converted to raw bytes.
    Hex(Vec<u8>),
    Array(Vec<ArrayItem>),
    /// Operator, number, name or any other bare token.
    Operator(String),
}

/// A decoded, whitespace-normalized piece of text in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub index: usize,
    pub block: usize,
    pub text: String,
}

impl fmt::Display for TextSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Stream,
    CMap,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Stream => write!(f, "stream"),
            Stage::CMap => write!(f, "cmap"),
        }
    }
}

/// Why a piece of the document was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Filter marker without a `stream` / `endstream` pair after it.
    Unterminated,
    /// zlib rejected the payload.
    Inflate(String),
    /// Inflated output grew past [`crate::ScanLimits::max_inflated_bytes`].
    InflateLimit,
    /// `begincmap` region at or above [`crate::ScanLimits::max_cmap_region`].
    OversizedRegion(usize),
    /// `begincmap` without a matching `endcmap`.
    UnclosedRegion,
    /// Region parsed but produced no mapping.
    EmptyCMap,
    /// Mappings dropped because their code length disagreed with the codespace.
    KeyLengthMismatch(usize),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unterminated => write!(f, "no stream/endstream pair"),
            SkipReason::Inflate(e) => write!(f, "inflate failed: {}", e),
            SkipReason::InflateLimit => write!(f, "inflated size over limit"),
            SkipReason::OversizedRegion(n) => write!(f, "cmap region too large ({} bytes)", n),
            SkipReason::UnclosedRegion => write!(f, "begincmap without endcmap"),
            SkipReason::EmptyCMap => write!(f, "cmap region has no mappings"),
            SkipReason::KeyLengthMismatch(n) => {
                write!(f, "{} mappings with off-codespace key length", n)
            }
        }
    }
}

/// A non-fatal skip recorded while scanning a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    /// Byte offset in the raw document, or in the decoded block for regions
    /// found inside one.
    pub offset: usize,
    pub reason: SkipReason,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}@{}] {}", self.stage, self.offset, self.reason)
    }
}

#[derive(Debug, Error)]
#[error("CMap key length must be at least one byte")]
pub struct InvalidKeyLength;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("code is {found} bytes, codespace expects {expected}")]
pub struct KeyLengthMismatch {
    pub expected: usize,
    pub found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmap_rejects_zero_key_length() {
        assert!(CMap::new(0).is_err());
    }

    #[test]
    fn test_cmap_insert_checks_key_length() {
        let mut cmap = CMap::new(2).unwrap();
        assert!(cmap.insert(vec![0x00, 0x31], "1").is_ok());
        assert_eq!(
            cmap.insert(vec![0x31], "1"),
            Err(KeyLengthMismatch {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(cmap.len(), 1);
    }

    #[test]
    fn test_cmap_decode_two_codes() {
        let mut cmap = CMap::new(2).unwrap();
        cmap.insert(vec![0x00, 0x31], "1").unwrap();
        assert_eq!(cmap.decode(&[0x00, 0x31, 0x00, 0x31]), "11");
    }

    #[test]
    fn test_cmap_decode_partial_code_is_empty() {
        let mut cmap = CMap::new(2).unwrap();
        cmap.insert(vec![0x00, 0x31], "1").unwrap();
        assert_eq!(cmap.decode(&[0x00, 0x31, 0x00]), "");
    }

    #[test]
    fn test_cmap_decode_skips_unmapped() {
        let mut cmap = CMap::new(1).unwrap();
        cmap.insert(vec![0x01], "A").unwrap();
        assert_eq!(cmap.decode(&[0x01, 0x02, 0x01]), "AA");
    }

    #[test]
    fn test_block_text_operator_detection() {
        let block = DecodedBlock {
            index: 0,
            source: 0..0,
            data: b"BT (x) Tj ET".to_vec(),
        };
        assert!(block.has_text_operators());

        let block = DecodedBlock {
            index: 1,
            source: 0..0,
            data: b"0 0 m 10 10 l S".to_vec(),
        };
        assert!(!block.has_text_operators());
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic {
            stage: Stage::Stream,
            offset: 42,
            reason: SkipReason::Unterminated,
        };
        assert_eq!(d.to_string(), "[stream@42] no stream/endstream pair");
    }
}
