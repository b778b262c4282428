use std::io::Read;
use std::ops::Range;
use std::sync::OnceLock;

use flate2::read::ZlibDecoder;
use regex::bytes::Regex;

use crate::types::{DecodedBlock, Diagnostic, SkipReason, Stage};

fn filter_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/Filter\s*\[?\s*/FlateDecode").unwrap())
}

fn stream_start() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"stream\r?\n").unwrap())
}

fn stream_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\r?\nendstream").unwrap())
}

// ---------------------------------------------------------------------------
// FlateStreams
// ---------------------------------------------------------------------------

/// Lazy iterator over the Flate-compressed blocks of a raw document.
///
/// Every `/Filter /FlateDecode` marker is paired with the next
/// `stream` … `endstream` payload and inflated. Failures surface as
/// `Err(Diagnostic)` items so the caller can keep going; the iterator itself
/// never stops early on bad data.
pub struct FlateStreams<'a> {
    data: &'a [u8],
    pos: usize,
    next_index: usize,
    max_inflated: usize,
}

impl<'a> FlateStreams<'a> {
    pub fn new(data: &'a [u8], max_inflated: usize) -> Self {
        FlateStreams {
            data,
            pos: 0,
            next_index: 0,
            max_inflated,
        }
    }
}

impl Iterator for FlateStreams<'_> {
    type Item = Result<DecodedBlock, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        let marker = filter_marker().find_at(self.data, self.pos)?;
        self.pos = marker.end();

        let Some(payload) = locate_payload(self.data, marker.end()) else {
            log::debug!("flate marker at {} has no stream body", marker.start());
            return Some(Err(Diagnostic {
                stage: Stage::Stream,
                offset: marker.start(),
                reason: SkipReason::Unterminated,
            }));
        };

        match inflate(&self.data[payload.clone()], self.max_inflated) {
            Ok(data) => {
                let index = self.next_index;
                self.next_index += 1;
                Some(Ok(DecodedBlock {
                    index,
                    source: payload,
                    data,
                }))
            }
            Err(reason) => {
                log::debug!("dropping stream at {}: {}", payload.start, reason);
                Some(Err(Diagnostic {
                    stage: Stage::Stream,
                    offset: payload.start,
                    reason,
                }))
            }
        }
    }
}

/// Find the compressed payload that follows a filter marker ending at `from`.
pub fn locate_payload(data: &[u8], from: usize) -> Option<Range<usize>> {
    let start = stream_start().find_at(data, from)?;
    let end = stream_end().find_at(data, start.end())?;
    Some(start.end()..end.start())
}

/// Inflate a zlib payload, refusing to produce more than `limit` bytes.
pub fn inflate(payload: &[u8], limit: usize) -> Result<Vec<u8>, SkipReason> {
    let mut out = Vec::new();
    ZlibDecoder::new(payload)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| SkipReason::Inflate(e.to_string()))?;

    if out.len() > limit {
        return Err(SkipReason::InflateLimit);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn wrap(obj: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "{} 0 obj\n<< /Length {} /Filter /FlateDecode >>\nstream\n",
            obj,
            payload.len()
        )
        .into_bytes();
        out.extend_from_slice(payload);
        out.extend_from_slice(b"\nendstream\nendobj\n");
        out
    }

    #[test]
    fn test_single_stream_inflates() {
        let doc = wrap(1, &deflate(b"BT (hi) Tj ET"));
        let blocks: Vec<_> = FlateStreams::new(&doc, 1 << 20).collect();

        assert_eq!(blocks.len(), 1);
        let block = blocks[0].as_ref().unwrap();
        assert_eq!(block.index, 0);
        assert_eq!(block.data, b"BT (hi) Tj ET");

        let header = doc.windows(7).position(|w| w == b"stream\n").unwrap() + 7;
        assert_eq!(block.source, header..doc.len() - b"\nendstream\nendobj\n".len());
    }

    #[test]
    fn test_corrupt_stream_is_reported_and_skipped() {
        let mut doc = wrap(1, b"definitely not zlib");
        doc.extend(wrap(2, &deflate(b"second")));

        let items: Vec<_> = FlateStreams::new(&doc, 1 << 20).collect();
        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[0],
            Err(Diagnostic {
                stage: Stage::Stream,
                reason: SkipReason::Inflate(_),
                ..
            })
        ));
        let block = items[1].as_ref().unwrap();
        assert_eq!(block.index, 0);
        assert_eq!(block.data, b"second");
    }

    #[test]
    fn test_marker_without_stream() {
        let doc = b"<< /Filter /FlateDecode >> endobj".to_vec();
        let items: Vec<_> = FlateStreams::new(&doc, 1 << 20).collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(
            &items[0],
            Err(Diagnostic {
                reason: SkipReason::Unterminated,
                ..
            })
        ));
    }

    #[test]
    fn test_crlf_delimiters() {
        let payload = deflate(b"crlf body");
        let mut doc = b"<< /Filter /FlateDecode >>\r\nstream\r\n".to_vec();
        doc.extend_from_slice(&payload);
        doc.extend_from_slice(b"\r\nendstream");

        let blocks: Vec<_> = FlateStreams::new(&doc, 1 << 20)
            .filter_map(Result::ok)
            .collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].data, b"crlf body");
    }

    #[test]
    fn test_filter_array_form() {
        let payload = deflate(b"array filter");
        let mut doc = b"<< /Filter [/FlateDecode] >>\nstream\n".to_vec();
        doc.extend_from_slice(&payload);
        doc.extend_from_slice(b"\nendstream");

        let blocks: Vec<_> = FlateStreams::new(&doc, 1 << 20)
            .filter_map(Result::ok)
            .collect();
        assert_eq!(blocks[0].data, b"array filter");
    }

    #[test]
    fn test_inflate_limit() {
        let payload = deflate(&[b'a'; 4096]);
        assert_eq!(inflate(&payload, 100), Err(SkipReason::InflateLimit));
        assert_eq!(inflate(&payload, 4096).unwrap().len(), 4096);
    }

    #[test]
    fn test_uncompressed_streams_ignored() {
        let doc = b"<< /Length 5 >>\nstream\nhello\nendstream".to_vec();
        assert_eq!(FlateStreams::new(&doc, 1 << 20).count(), 0);
    }
}
