use super::hex_to_bytes;
use crate::types::{ArrayItem, ItemKind, Token};

fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\r' | b'\x0C' | b' ')
}

fn is_delimiter(b: u8) -> bool {
    is_whitespace(b) || matches!(b, b'[' | b']' | b'(' | b')' | b'<' | b'>' | b'/' | b'{' | b'}' | b'%')
}

/// Single-pass lexer over one decoded content block.
///
/// Dictionary brackets, name slashes and other stray delimiters are skipped;
/// names and numbers come out as [`Token::Operator`] alongside real
/// operators, leaving it to the consumer to tell them apart.
pub struct Tokenizer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Tokenizer { data, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Read a literal string; the cursor sits on the opening `(`.
    fn literal(&mut self) -> Vec<u8> {
        self.pos += 1;
        let mut depth = 1usize;
        let mut out = Vec::new();

        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => self.escape(&mut out),
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                _ => out.push(b),
            }
        }
        out
    }

    fn escape(&mut self, out: &mut Vec<u8>) {
        let Some(b) = self.peek() else {
            return;
        };
        self.pos += 1;
        match b {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'0'..=b'7' => {
                let mut value = (b - b'0') as u32;
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            // Line continuation.
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            other => out.push(other),
        }
    }

    /// Read a hex string; the cursor sits on the opening `<`.
    fn hex(&mut self) -> Vec<u8> {
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'>' {
                break;
            }
            self.pos += 1;
        }
        let bytes = hex_to_bytes(&self.data[start..self.pos]);
        if self.peek() == Some(b'>') {
            self.pos += 1;
        }
        bytes
    }

    fn bare(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    /// Read an array; the cursor sits on the opening `[`.
    fn array(&mut self) -> Vec<ArrayItem> {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace_and_comments();
            let Some(b) = self.peek() else {
                break;
            };
            match b {
                b']' => {
                    self.pos += 1;
                    break;
                }
                b'(' => items.push(ArrayItem {
                    kind: ItemKind::Literal,
                    bytes: self.literal(),
                }),
                b'<' if self.data.get(self.pos + 1) != Some(&b'<') => items.push(ArrayItem {
                    kind: ItemKind::Hex,
                    bytes: self.hex(),
                }),
                _ => {
                    let tok = self.bare();
                    if tok.is_empty() {
                        self.pos += 1;
                    } else {
                        items.push(ArrayItem {
                            kind: ItemKind::Bare,
                            bytes: tok.to_vec(),
                        });
                    }
                }
            }
        }
        items
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace_and_comments();
            let b = self.peek()?;
            match b {
                b'(' => return Some(Token::Literal(self.literal())),
                b'<' if self.data.get(self.pos + 1) == Some(&b'<') => {
                    self.pos += 2;
                }
                b'<' => return Some(Token::Hex(self.hex())),
                b'[' => return Some(Token::Array(self.array())),
                _ => {
                    let tok = self.bare();
                    if tok.is_empty() {
                        self.pos += 1;
                        continue;
                    }
                    return Some(Token::Operator(latin1(tok)));
                }
            }
        }
    }
}

/// Map each byte to the Unicode scalar of the same value.
pub fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &[u8]) -> Vec<Token> {
        Tokenizer::new(src).collect()
    }

    fn op(s: &str) -> Token {
        Token::Operator(s.to_string())
    }

    #[test]
    fn test_literal_show() {
        assert_eq!(
            tokens(b"BT (Hello) Tj ET"),
            vec![op("BT"), Token::Literal(b"Hello".to_vec()), op("Tj"), op("ET")]
        );
    }

    #[test]
    fn test_nested_parentheses() {
        assert_eq!(
            tokens(b"(a (b) c) Tj"),
            vec![Token::Literal(b"a (b) c".to_vec()), op("Tj")]
        );
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            tokens(br"(x\)y\\z\n\101\0)"),
            vec![Token::Literal(b"x)y\\z\nA\0".to_vec())]
        );
    }

    #[test]
    fn test_escaped_line_continuation() {
        assert_eq!(tokens(b"(ab\\\ncd)"), vec![Token::Literal(b"abcd".to_vec())]);
    }

    #[test]
    fn test_unterminated_literal() {
        assert_eq!(tokens(b"(abc"), vec![Token::Literal(b"abc".to_vec())]);
    }

    #[test]
    fn test_hex_string() {
        assert_eq!(
            tokens(b"<00 31 0032> Tj"),
            vec![Token::Hex(vec![0x00, 0x31, 0x00, 0x32]), op("Tj")]
        );
    }

    #[test]
    fn test_dictionary_brackets_skipped() {
        assert_eq!(
            tokens(b"/P << /MCID 0 >> BDC"),
            vec![op("P"), op("MCID"), op("0"), op("BDC")]
        );
    }

    #[test]
    fn test_comment_skipped() {
        assert_eq!(
            tokens(b"% a comment (not a string)\n1 0 0 1 72 700 Tm"),
            vec![op("1"), op("0"), op("0"), op("1"), op("72"), op("700"), op("Tm")]
        );
    }

    #[test]
    fn test_array_with_adjustments() {
        let toks = tokens(b"[(Ab) -250 <0031> (c)] TJ");
        assert_eq!(toks.len(), 2);
        match &toks[0] {
            Token::Array(items) => {
                let kinds: Vec<ItemKind> = items.iter().map(|i| i.kind).collect();
                assert_eq!(
                    kinds,
                    vec![ItemKind::Literal, ItemKind::Bare, ItemKind::Hex, ItemKind::Literal]
                );
                assert_eq!(items[1].bytes, b"-250");
                assert_eq!(items[2].bytes, vec![0x00, 0x31]);
            }
            other => panic!("expected array, got {:?}", other),
        }
        assert_eq!(toks[1], op("TJ"));
    }

    #[test]
    fn test_unclosed_array_ends_at_input() {
        let toks = tokens(b"[(a) 12");
        assert_eq!(toks.len(), 1);
        assert!(matches!(&toks[0], Token::Array(items) if items.len() == 2));
    }

    #[test]
    fn test_latin1_high_bytes() {
        assert_eq!(latin1(&[0x63, 0xE9]), "c\u{00E9}");
    }
}
