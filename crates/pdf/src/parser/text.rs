use std::sync::OnceLock;

use regex::bytes::Regex;

use super::hex_to_bytes;
use super::tokenizer::{latin1, Tokenizer};
use crate::render::cleanup::normalize_segment;
use crate::types::{ArrayItem, CMap, DecodedBlock, ItemKind, TextSegment, Token};

/// Tuning knobs for character-map selection and operand replay.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Hex strings sampled per block when scoring candidate maps.
    pub max_samples: usize,
    /// Accepted decoded byte length of a sampled hex string.
    pub sample_bytes: (usize, usize),
    /// Operand stack size that triggers truncation.
    pub stack_limit: usize,
    /// Entries kept after truncation.
    pub stack_keep: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_samples: 200,
            sample_bytes: (2, 40),
            stack_limit: 250,
            stack_keep: 80,
        }
    }
}

fn re_sample() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<([0-9A-Fa-f\s]{4,})>").unwrap())
}

// ---------------------------------------------------------------------------
// CMap selection
// ---------------------------------------------------------------------------

/// Score decoded text by how much it looks like table content.
///
/// Alphanumerics +2, common punctuation and space +1, other whitespace 0,
/// anything else -1.
pub fn score_text(text: &str) -> i64 {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                2
            } else if " .,-/()".contains(c) {
                1
            } else if c.is_whitespace() {
                0
            } else {
                -1
            }
        })
        .sum()
}

/// Collect the hex strings used to score candidate maps for a block.
pub fn sample_hex(data: &[u8], config: &AssemblerConfig) -> Vec<Vec<u8>> {
    let (min, max) = config.sample_bytes;
    re_sample()
        .captures_iter(data)
        .map(|c| hex_to_bytes(&c[1]))
        .filter(|b| (min..=max).contains(&b.len()))
        .take(config.max_samples)
        .collect()
}

/// Pick the map whose decoding of `samples` scores highest.
///
/// Ties go to the earliest map. No map is selected unless the best score is
/// positive.
pub fn select_cmap<'c>(cmaps: &'c [CMap], samples: &[Vec<u8>]) -> Option<&'c CMap> {
    if samples.is_empty() {
        return None;
    }

    let mut best: Option<(&CMap, i64)> = None;
    for cmap in cmaps {
        let score: i64 = samples
            .iter()
            .map(|s| score_text(&cmap.decode(s)))
            .sum();
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((cmap, score));
        }
    }

    best.filter(|(_, score)| *score > 0).map(|(cmap, _)| cmap)
}

// ---------------------------------------------------------------------------
// Operand replay
// ---------------------------------------------------------------------------

/// String-ish operands awaiting a show operator.
///
/// Bare tokens never land here. When the stack grows past `limit` it is cut
/// back to its newest `keep` entries; `keep` never exceeds `limit`.
#[derive(Debug)]
pub struct OperandStack {
    items: Vec<Token>,
    limit: usize,
    keep: usize,
}

impl OperandStack {
    pub fn new(limit: usize, keep: usize) -> Self {
        OperandStack {
            items: Vec::new(),
            limit,
            keep: keep.min(limit),
        }
    }

    pub fn push(&mut self, token: Token) {
        self.items.push(token);
    }

    pub fn pop(&mut self) -> Option<Token> {
        self.items.pop()
    }

    pub fn pop_array(&mut self) -> Option<Vec<ArrayItem>> {
        match self.items.last() {
            Some(Token::Array(_)) => match self.items.pop() {
                Some(Token::Array(items)) => Some(items),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply the truncation safety valve.
    pub fn relieve(&mut self) {
        if self.items.len() > self.limit {
            let cut = self.items.len().saturating_sub(self.keep);
            self.items.drain(..cut);
        }
    }
}

fn decode_string(kind: ItemKind, bytes: &[u8], cmap: Option<&CMap>) -> Option<String> {
    match kind {
        ItemKind::Literal => Some(latin1(bytes)),
        ItemKind::Hex => cmap.map(|c| c.decode(bytes)),
        ItemKind::Bare => None,
    }
}

/// Replay a block's tokens and return the raw strings painted by `Tj`/`TJ`.
pub fn show_strings(data: &[u8], cmap: Option<&CMap>, config: &AssemblerConfig) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = OperandStack::new(config.stack_limit, config.stack_keep);

    for token in Tokenizer::new(data) {
        let op = match token {
            Token::Operator(op) => op,
            operand => {
                stack.push(operand);
                continue;
            }
        };

        match op.as_str() {
            "Tj" if !stack.is_empty() => {
                let shown = match stack.pop() {
                    Some(Token::Literal(bytes)) => decode_string(ItemKind::Literal, &bytes, cmap),
                    Some(Token::Hex(bytes)) => decode_string(ItemKind::Hex, &bytes, cmap),
                    _ => None,
                };
                out.extend(shown);
            }
            "TJ" => match stack.pop_array() {
                Some(items) => {
                    let parts: Vec<String> = items
                        .iter()
                        .filter_map(|item| decode_string(item.kind, &item.bytes, cmap))
                        .collect();
                    if !parts.is_empty() {
                        out.push(parts.concat());
                    }
                }
                None => stack.relieve(),
            },
            _ => stack.relieve(),
        }
    }

    out
}

/// Turn decoded blocks into the ordered text segment sequence.
pub fn assemble(blocks: &[DecodedBlock], cmaps: &[CMap], config: &AssemblerConfig) -> Vec<TextSegment> {
    let mut segments = Vec::new();

    for block in blocks.iter().filter(|b| b.has_text_operators()) {
        let samples = sample_hex(&block.data, config);
        let cmap = select_cmap(cmaps, &samples);
        log::debug!(
            "block {}: {} hex samples, cmap {}",
            block.index,
            samples.len(),
            if cmap.is_some() { "selected" } else { "none" }
        );

        for raw in show_strings(&block.data, cmap, config) {
            let text = normalize_segment(&raw);
            if text.is_empty() {
                continue;
            }
            segments.push(TextSegment {
                index: segments.len(),
                block: block.index,
                text,
            });
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits_cmap() -> CMap {
        let mut cmap = CMap::new(2).unwrap();
        for d in 0..10u8 {
            cmap.insert(vec![0x00, 0x13 + d], char::from(b'0' + d).to_string())
                .unwrap();
        }
        cmap.insert(vec![0x00, 0x03], " ").unwrap();
        cmap.insert(vec![0x00, 0x11], ".").unwrap();
        cmap
    }

    fn junk_cmap() -> CMap {
        let mut cmap = CMap::new(2).unwrap();
        for d in 0..10u8 {
            cmap.insert(vec![0x00, 0x13 + d], "\u{2603}").unwrap();
        }
        cmap
    }

    fn block(data: &[u8]) -> DecodedBlock {
        DecodedBlock {
            index: 0,
            source: 0..0,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_score_text() {
        assert_eq!(score_text("a1"), 4);
        assert_eq!(score_text("0.5"), 5);
        assert_eq!(score_text("\t"), 0);
        assert_eq!(score_text("\u{2603}"), -1);
    }

    #[test]
    fn test_sample_hex_bounds() {
        let config = AssemblerConfig::default();
        let samples = sample_hex(b"<0013> Tj <00> Tj <ab> Tj <0014 0015> Tj", &config);
        assert_eq!(samples, vec![vec![0x00, 0x13], vec![0x00, 0x14, 0x00, 0x15]]);
    }

    #[test]
    fn test_sample_hex_cap() {
        let config = AssemblerConfig {
            max_samples: 2,
            ..AssemblerConfig::default()
        };
        let samples = sample_hex(b"<0013><0014><0015>", &config);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_select_prefers_readable_map() {
        let cmaps = vec![junk_cmap(), digits_cmap()];
        let samples = vec![vec![0x00, 0x13, 0x00, 0x11, 0x00, 0x14]];
        let chosen = select_cmap(&cmaps, &samples).unwrap();
        assert_eq!(chosen.decode(&samples[0]), "0.1");
    }

    #[test]
    fn test_select_none_without_positive_score() {
        let cmaps = vec![junk_cmap()];
        let samples = vec![vec![0x00, 0x13]];
        assert!(select_cmap(&cmaps, &samples).is_none());
        assert!(select_cmap(&cmaps, &[]).is_none());
        assert!(select_cmap(&[], &samples).is_none());
    }

    #[test]
    fn test_select_tie_goes_to_first() {
        let first = digits_cmap();
        let mut second = digits_cmap();
        second.insert(vec![0x7F, 0x7F], "x").unwrap();
        let cmaps = vec![first.clone(), second];
        let chosen = select_cmap(&cmaps, &[vec![0x00, 0x13]]).unwrap();
        assert_eq!(chosen, &first);
    }

    #[test]
    fn test_literal_show_single_segment() {
        let segs = assemble(
            &[block(b"BT /F1 9 Tf 72 700 Td (  Age-   Interval  ) Tj ET")],
            &[],
            &AssemblerConfig::default(),
        );
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "Age- Interval");
    }

    #[test]
    fn test_array_show_ignores_adjustments() {
        let segs = assemble(
            &[block(b"BT [(Ru) -120 (ral)] TJ ET")],
            &[],
            &AssemblerConfig::default(),
        );
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "Rural");
    }

    #[test]
    fn test_hex_show_uses_selected_map() {
        let segs = assemble(
            &[block(b"BT <00130011001400180017> Tj [<0013> 40 <0011001500160017>] TJ ET")],
            &[junk_cmap(), digits_cmap()],
            &AssemblerConfig::default(),
        );
        let texts: Vec<&str> = segs.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["0.154", "0.234"]);
    }

    #[test]
    fn test_hex_without_map_emits_nothing() {
        let segs = assemble(
            &[block(b"BT <0013> Tj (x) Tj ET")],
            &[],
            &AssemblerConfig::default(),
        );
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "x");
    }

    #[test]
    fn test_blank_strings_discarded() {
        let segs = assemble(
            &[block(b"BT (   ) Tj [( ) -20 ( )] TJ (a) Tj ET")],
            &[],
            &AssemblerConfig::default(),
        );
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].index, 0);
    }

    #[test]
    fn test_blocks_without_show_operators_skipped() {
        let segs = assemble(
            &[block(b"(orphan) 0 0 m")],
            &[],
            &AssemblerConfig::default(),
        );
        assert!(segs.is_empty());
    }

    #[test]
    fn test_segment_order_across_blocks() {
        let mut second = block(b"BT (c) Tj ET");
        second.index = 1;
        let segs = assemble(
            &[block(b"BT (a) Tj (b) Tj ET"), second],
            &[],
            &AssemblerConfig::default(),
        );
        let got: Vec<(usize, usize, &str)> =
            segs.iter().map(|s| (s.index, s.block, s.text.as_str())).collect();
        assert_eq!(got, vec![(0, 0, "a"), (1, 0, "b"), (2, 1, "c")]);
    }

    #[test]
    fn test_stack_safety_valve() {
        let mut stack = OperandStack::new(250, 80);
        for i in 0..251 {
            stack.push(Token::Literal(i.to_string().into_bytes()));
        }
        stack.relieve();
        assert_eq!(stack.len(), 80);
        assert_eq!(stack.pop(), Some(Token::Literal(b"250".to_vec())));
    }

    #[test]
    fn test_stack_keep_larger_than_limit() {
        let mut stack = OperandStack::new(10, 80);
        for i in 0..11 {
            stack.push(Token::Literal(i.to_string().into_bytes()));
        }
        stack.relieve();
        assert_eq!(stack.len(), 10);
        assert_eq!(stack.pop(), Some(Token::Literal(b"10".to_vec())));
    }

    #[test]
    fn test_show_strings_with_inverted_stack_bounds() {
        let config = AssemblerConfig {
            stack_limit: 2,
            stack_keep: 5,
            ..AssemblerConfig::default()
        };
        let out = show_strings(b"(a) (b) (c) (d) BT (e) Tj", None, &config);
        assert_eq!(out, vec!["e".to_string()]);
    }

    #[test]
    fn test_tj_with_array_on_top_emits_nothing() {
        let out = show_strings(b"[(a)] Tj", None, &AssemblerConfig::default());
        assert!(out.is_empty());
    }
}
