use std::collections::HashSet;
use std::sync::OnceLock;

use regex::bytes::Regex;

use super::hex_to_bytes;
use crate::types::{CMap, DecodedBlock, Diagnostic, SkipReason, Stage};

/// Key length assumed when a map declares no codespace range.
pub const DEFAULT_KEY_LENGTH: usize = 2;

/// Widest `bfrange` (in codes) expanded in increment form.
const MAX_RANGE_SPAN: u32 = 0x1_0000;

const BEGIN: &[u8] = b"begincmap";
const END: &[u8] = b"endcmap";

fn re_codespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"begincodespacerange\s*<([0-9A-Fa-f]{2,})>\s*<([0-9A-Fa-f]{2,})>\s*endcodespacerange",
        )
        .unwrap()
    })
}

fn re_bfchar_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)beginbfchar(.*?)endbfchar").unwrap())
}

fn re_bfrange_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)beginbfrange(.*?)endbfrange").unwrap())
}

fn re_pair() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([0-9A-Fa-f\s]+)>\s*<([0-9A-Fa-f\s]+)>").unwrap())
}

fn re_range_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<([0-9A-Fa-f\s]+)>\s*<([0-9A-Fa-f\s]+)>\s*(\[.*?\]|<[^>]+>)").unwrap()
    })
}

fn re_hex_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([0-9A-Fa-f\s]+)>").unwrap())
}

// ---------------------------------------------------------------------------
// Region discovery
// ---------------------------------------------------------------------------

/// Character maps found in a document plus the regions that were dropped.
#[derive(Debug, Default)]
pub struct CMapScan {
    pub cmaps: Vec<CMap>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Collect every parseable to-Unicode map from the raw bytes and the decoded
/// blocks.
///
/// The raw document contributes every `begincmap` region; each decoded block
/// contributes its first one. Regions of `max_region` bytes or more are
/// ignored, and byte-identical regions are parsed once.
pub fn collect_cmaps(raw: &[u8], blocks: &[DecodedBlock], max_region: usize) -> CMapScan {
    let mut scan = CMapScan::default();
    let mut regions: Vec<(usize, &[u8])> = Vec::new();

    let mut from = 0;
    while let Some(start) = find(raw, BEGIN, from) {
        from = start + BEGIN.len();
        match region_at(raw, start, max_region) {
            Ok(region) => regions.push((start, region)),
            Err(reason) => scan.diagnostics.push(Diagnostic {
                stage: Stage::CMap,
                offset: start,
                reason,
            }),
        }
    }

    for block in blocks {
        let Some(start) = find(&block.data, BEGIN, 0) else {
            continue;
        };
        match region_at(&block.data, start, max_region) {
            Ok(region) => regions.push((start, region)),
            Err(reason) => scan.diagnostics.push(Diagnostic {
                stage: Stage::CMap,
                offset: start,
                reason,
            }),
        }
    }

    let mut seen: HashSet<&[u8]> = HashSet::new();
    for (offset, region) in regions {
        if !seen.insert(region) {
            continue;
        }
        match parse_cmap(region) {
            Ok((cmap, mismatched)) => {
                if mismatched > 0 {
                    scan.diagnostics.push(Diagnostic {
                        stage: Stage::CMap,
                        offset,
                        reason: SkipReason::KeyLengthMismatch(mismatched),
                    });
                }
                scan.cmaps.push(cmap);
            }
            Err(reason) => {
                log::debug!("dropping cmap region at {}: {}", offset, reason);
                scan.diagnostics.push(Diagnostic {
                    stage: Stage::CMap,
                    offset,
                    reason,
                });
            }
        }
    }

    scan
}

fn region_at(data: &[u8], start: usize, max_region: usize) -> Result<&[u8], SkipReason> {
    let end = find(data, END, start).ok_or(SkipReason::UnclosedRegion)? + END.len();
    let region = &data[start..end];
    if region.len() >= max_region {
        return Err(SkipReason::OversizedRegion(region.len()));
    }
    Ok(region)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

// ---------------------------------------------------------------------------
// Region parsing
// ---------------------------------------------------------------------------

/// Parse one `begincmap … endcmap` region.
///
/// On success returns the map and the number of entries dropped because
/// their source code length disagreed with the codespace.
pub fn parse_cmap(region: &[u8]) -> Result<(CMap, usize), SkipReason> {
    let key_length = re_codespace()
        .captures(region)
        .map(|c| c[1].len() / 2)
        .unwrap_or(DEFAULT_KEY_LENGTH);
    let mut cmap = CMap::new(key_length).map_err(|_| SkipReason::EmptyCMap)?;
    let mut mismatched = 0;

    for block in re_bfchar_block().captures_iter(region) {
        for pair in re_pair().captures_iter(&block[1]) {
            let src = hex_to_bytes(&pair[1]);
            if src.is_empty() {
                continue;
            }
            let dst = utf16be_hex(&pair[2]);
            if dst.is_empty() {
                continue;
            }
            if cmap.insert(src, dst).is_err() {
                mismatched += 1;
            }
        }
    }

    for block in re_bfrange_block().captures_iter(region) {
        for entry in re_range_entry().captures_iter(&block[1]) {
            let lo = hex_to_bytes(&entry[1]);
            let hi = hex_to_bytes(&entry[2]);
            if lo.is_empty() || lo.len() != hi.len() || lo.len() > 4 {
                continue;
            }
            let width = lo.len();
            let (lo, hi) = (code_value(&lo), code_value(&hi));
            let rhs = entry[3].trim_ascii();

            let mapped: Vec<(u32, String)> = if rhs.starts_with(b"[") {
                re_hex_token()
                    .captures_iter(rhs)
                    .enumerate()
                    .map(|(off, d)| (lo.saturating_add(off as u32), utf16be_hex(&d[1])))
                    .collect()
            } else {
                let start = utf16be_hex(&rhs[1..rhs.len() - 1]);
                let mut chars = start.chars();
                let (Some(first), None) = (chars.next(), chars.next()) else {
                    continue;
                };
                if hi < lo || hi - lo >= MAX_RANGE_SPAN {
                    continue;
                }
                (lo..=hi)
                    .filter_map(|code| {
                        char::from_u32(first as u32 + (code - lo)).map(|c| (code, c.to_string()))
                    })
                    .collect()
            };

            for (code, text) in mapped {
                let Some(key) = code_bytes(code, width) else {
                    continue;
                };
                if cmap.insert(key, text).is_err() {
                    mismatched += 1;
                }
            }
        }
    }

    if cmap.is_empty() {
        return Err(if mismatched > 0 {
            SkipReason::KeyLengthMismatch(mismatched)
        } else {
            SkipReason::EmptyCMap
        });
    }
    Ok((cmap, mismatched))
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn code_bytes(code: u32, width: usize) -> Option<Vec<u8>> {
    if width < 4 && code >> (8 * width) != 0 {
        return None;
    }
    Some(code.to_be_bytes()[4 - width..].to_vec())
}

/// Decode hex text as UTF-16BE, dropping anything that is not valid.
pub fn utf16be_hex(hex: &[u8]) -> String {
    let bytes = hex_to_bytes(hex);
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units).filter_map(Result::ok).collect()
}
