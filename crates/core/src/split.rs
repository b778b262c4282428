//! Packed-count splitting
//!
//! The first cell of each physical table row carries the survivors `lx` and
//! person-years `nLx` printed back to back with no separator. This module
//! recovers the split point heuristically. It is a known approximation: the
//! source offers no delimiter, so the decode is best-effort, not exact.

use std::ops::RangeInclusive;

/// Tunable bounds for [`split_counts`].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    /// Most digits the first count (`lx`) may take.
    pub max_first_digits: usize,
    /// Largest plausible `lx` (the table radix).
    pub max_first: i64,
    /// Accepted range of `nLx / (n * lx)` when `n` is known.
    pub ratio: RangeInclusive<f64>,
    /// Rounding slack allowed above `n * lx`.
    pub slack: i64,
    /// Largest plausible `nLx` for the open interval.
    pub max_open_second: i64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            max_first_digits: 6,
            max_first: 100_000,
            ratio: 0.2..=1.05,
            slack: 10,
            max_open_second: 1_000_000,
        }
    }
}

/// Split a packed digit run into `(lx, nLx)`.
///
/// Non-digits are ignored. Every first-count length from 1 up to
/// `max_first_digits` (leaving at least one digit for the second count) is
/// tried. With a known interval width `n` the candidate whose ratio
/// `nLx / (n * lx)` is closest to 1.0 wins; for the open interval the
/// longest plausible `lx` wins. Equal scores keep the earliest candidate.
pub fn split_counts(packed: &str, n: Option<u32>, config: &SplitConfig) -> Option<(i64, i64)> {
    let digits: String = packed.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 2 {
        return None;
    }

    let n = n.filter(|&n| n > 0).map(i64::from);
    let max_len = config.max_first_digits.min(digits.len() - 1);
    let mut best: Option<(f64, i64, i64)> = None;

    for len in 1..=max_len {
        let (head, tail) = digits.split_at(len);
        let (Ok(lx), Ok(nlx)) = (head.parse::<i64>(), tail.parse::<i64>()) else {
            continue;
        };
        if lx <= 0 || lx > config.max_first || nlx <= 0 {
            continue;
        }

        let score = match n {
            Some(n) => {
                if nlx > n * lx + config.slack {
                    continue;
                }
                let ratio = nlx as f64 / (n * lx) as f64;
                if !config.ratio.contains(&ratio) {
                    continue;
                }
                1.0 - (1.0 - ratio).abs()
            }
            None => {
                if nlx > config.max_open_second {
                    continue;
                }
                len as f64
            }
        };

        if best.is_none_or(|(top, _, _)| score > top) {
            best = Some((score, lx, nlx));
        }
    }

    best.map(|(_, lx, nlx)| (lx, nlx))
}
