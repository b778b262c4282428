pub mod cmap;
pub mod stream;
pub mod text;
pub mod tokenizer;

/// Shared helper: strip whitespace from hex text and convert it to bytes.
///
/// An odd number of digits is padded with a trailing `0`. Any non-hex digit
/// makes the whole string invalid and yields an empty vector.
pub fn hex_to_bytes(hex: &[u8]) -> Vec<u8> {
    let mut digits: Vec<u8> = hex
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 == 1 {
        digits.push(b'0');
    }

    let mut out = Vec::with_capacity(digits.len() / 2);
    for pair in digits.chunks(2) {
        match (hex_val(pair[0]), hex_val(pair[1])) {
            (Some(hi), Some(lo)) => out.push((hi << 4) | lo),
            _ => return Vec::new(),
        }
    }
    out
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_to_bytes_basic() {
        assert_eq!(hex_to_bytes(b"0031"), vec![0x00, 0x31]);
    }

    #[test]
    fn test_hex_to_bytes_whitespace_and_case() {
        assert_eq!(hex_to_bytes(b"00 3a\n4B"), vec![0x00, 0x3A, 0x4B]);
    }

    #[test]
    fn test_hex_to_bytes_odd_length_pads() {
        assert_eq!(hex_to_bytes(b"123"), vec![0x12, 0x30]);
    }

    #[test]
    fn test_hex_to_bytes_invalid_digit() {
        assert!(hex_to_bytes(b"00zz").is_empty());
    }

    #[test]
    fn test_hex_to_bytes_empty() {
        assert!(hex_to_bytes(b"").is_empty());
    }
}
