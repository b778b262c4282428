//! Table reconstruction
//!
//! Pure functions that turn the ordered text segments of an SRS abridged
//! life-table document into [`LifeTableRow`]s. The segment stream looks like:
//!
//! ```text
//! India, 2018-22            <- table header
//! Age-Interval              <- header marker
//! ...column headings...
//! Total                     <- residence label
//! 0-10.0308510000097320     <- combined token: interval, nqx, lx, nLx (Total)
//! 69.1                      <- Total ex
//! 0.03012 100000 97412 68.2 <- Male nqx lx nLx ex (one segment each)
//! 0.03166 100000 97218 70.1 <- Female nqx lx nLx ex
//! ...
//! Rural
//! ...
//! ```
//!
//! Rows that cannot be decoded are reported as [`RowDiagnostic`]s and the
//! scan moves on.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::life_table::{central_death_rate, AgeInterval, LifeTableRow, Sex};
use crate::split::{split_counts, SplitConfig};

/// Segments consumed after the combined token of a physical row.
pub const ROW_WINDOW: usize = 9;

/// Layout constants of the table family.
#[derive(Debug, Clone)]
pub struct TableLayout {
    /// Segment that must directly follow a table title.
    pub header_marker: String,
    /// Labels that open a residence subsection.
    pub residence_labels: Vec<String>,
    /// Placeholder printed for an unavailable value.
    pub placeholder: String,
    pub split: SplitConfig,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            header_marker: "Age-Interval".to_string(),
            residence_labels: vec!["Total".into(), "Rural".into(), "Urban".into()],
            placeholder: "...".to_string(),
            split: SplitConfig::default(),
        }
    }
}

impl TableLayout {
    fn is_residence(&self, segment: &str) -> bool {
        self.residence_labels.iter().any(|l| l == segment)
    }
}

fn re_title() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<area>.+),\s*(?P<period>\d{4}-\d{2})$").unwrap())
}

fn re_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\+\s*(.*)$").unwrap())
}

fn re_closed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)-(.*)$").unwrap())
}

fn re_probability() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d\.\d{5})(.*)$").unwrap())
}

fn re_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap())
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Why a physical row was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum RowError {
    /// The combined token matched neither the closed nor the open shape.
    #[error("unrecognized row token")]
    UnmatchedShape,
    /// No split of the packed counts passed the plausibility bounds.
    #[error("no plausible lx/nLx split")]
    NoSplit,
    /// Fewer than [`ROW_WINDOW`] segments followed the combined token.
    #[error("row needs {} value segments, {available} left", ROW_WINDOW)]
    TruncatedWindow { available: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDiagnostic {
    /// Index of the offending segment.
    pub segment: usize,
    pub token: String,
    pub reason: RowError,
}

impl fmt::Display for RowDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[row@{}] {} ({:?})", self.segment, self.reason, self.token)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub rows: Vec<LifeTableRow>,
    pub diagnostics: Vec<RowDiagnostic>,
}

/// The decoded first cell of a physical row (Total columns).
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedToken {
    pub interval: AgeInterval,
    pub nqx: Option<f64>,
    pub lx: i64,
    pub nlx: i64,
}

// ---------------------------------------------------------------------------
// Token parsing
// ---------------------------------------------------------------------------

/// Parse the combined first cell of a row.
///
/// Closed rows look like `"0-10.0308510000097320"`: the end age runs up to
/// the first `0.`, then a 5-decimal probability, then the packed counts.
/// Open rows look like `"85+ ...19979113568"`; the placeholder (or a
/// probability) is optional.
pub fn parse_combined(token: &str, layout: &TableLayout) -> Result<CombinedToken, RowError> {
    let token = token.trim();

    let (interval, rest) = if let Some(caps) = re_open().captures(token) {
        let start = caps[1].parse().map_err(|_| RowError::UnmatchedShape)?;
        (AgeInterval::open(start), caps.get(2).map_or("", |m| m.as_str()))
    } else if let Some(caps) = re_closed().captures(token) {
        let start: u32 = caps[1].parse().map_err(|_| RowError::UnmatchedShape)?;
        let tail = caps.get(2).map_or("", |m| m.as_str());
        let qpos = match tail.find("0.") {
            Some(p) if p > 0 => p,
            _ => return Err(RowError::UnmatchedShape),
        };
        let end = tail[..qpos].trim();
        if !end.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RowError::UnmatchedShape);
        }
        let end: u32 = end.parse().map_err(|_| RowError::UnmatchedShape)?;
        let interval = AgeInterval::closed(start, end).map_err(|_| RowError::UnmatchedShape)?;
        (interval, &tail[qpos..])
    } else {
        return Err(RowError::UnmatchedShape);
    };

    let rest = rest.trim();
    let (nqx, packed) = if let Some(after) = rest.strip_prefix(layout.placeholder.as_str()) {
        (None, after)
    } else if let Some(caps) = re_probability().captures(rest) {
        let q = caps[1].parse().map_err(|_| RowError::UnmatchedShape)?;
        (Some(q), caps.get(2).map_or("", |m| m.as_str()))
    } else if interval.end.is_none() {
        (None, rest)
    } else {
        return Err(RowError::UnmatchedShape);
    };

    let (lx, nlx) =
        split_counts(packed.trim(), interval.width(), &layout.split).ok_or(RowError::NoSplit)?;

    Ok(CombinedToken {
        interval,
        nqx,
        lx,
        nlx,
    })
}

/// Parse a decimal cell; the placeholder or an empty cell is missing.
pub fn parse_float(token: &str, placeholder: &str) -> Option<f64> {
    let t = token.trim();
    if t.is_empty() || t == placeholder {
        return None;
    }
    t.parse()
        .ok()
        .or_else(|| re_number().find(t).and_then(|m| m.as_str().parse().ok()))
}

/// Parse an integer cell, ignoring everything but digits and `-`.
pub fn parse_int(token: &str, placeholder: &str) -> Option<i64> {
    let t = token.trim();
    if t.is_empty() || t == placeholder {
        return None;
    }
    let cleaned: String = t
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    cleaned.parse().ok()
}

// ---------------------------------------------------------------------------
// Table scan
// ---------------------------------------------------------------------------

/// Match a table header at `i`: a `"<area>, <yyyy>-<yy>"` title followed by
/// the header marker.
fn header_at<S: AsRef<str>>(segments: &[S], i: usize, layout: &TableLayout) -> Option<(String, String)> {
    let next = segments.get(i + 1)?.as_ref();
    if next != layout.header_marker {
        return None;
    }
    let caps = re_title().captures(segments[i].as_ref())?;
    Some((caps["area"].trim().to_string(), caps["period"].to_string()))
}

/// Reconstruct every life-table row found in `segments`.
pub fn reconstruct<S: AsRef<str>>(segments: &[S], layout: &TableLayout) -> Reconstruction {
    let seg = move |i: usize| segments[i].as_ref();
    let len = segments.len();
    let mut out = Reconstruction::default();
    let mut i = 0;

    while i + 1 < len {
        let Some((area, period)) = header_at(segments, i, layout) else {
            i += 1;
            continue;
        };
        log::debug!("table '{}' ({}) at segment {}", area, period, i);
        i += 2;

        // Column headings run up to the first residence label.
        while i < len && !layout.is_residence(seg(i)) {
            i += 1;
        }
        if i >= len {
            break;
        }

        while i < len && layout.is_residence(seg(i)) {
            let residence = seg(i).to_string();
            i += 1;

            while i < len {
                if layout.is_residence(seg(i)) || header_at(segments, i, layout).is_some() {
                    break;
                }

                let combined = match parse_combined(seg(i), layout) {
                    Ok(c) => c,
                    Err(reason) => {
                        out.diagnostics.push(RowDiagnostic {
                            segment: i,
                            token: seg(i).to_string(),
                            reason,
                        });
                        i += 1;
                        continue;
                    }
                };

                let token_at = i;
                i += 1;
                if i + ROW_WINDOW > len {
                    out.diagnostics.push(RowDiagnostic {
                        segment: token_at,
                        token: seg(token_at).to_string(),
                        reason: RowError::TruncatedWindow {
                            available: len - i,
                        },
                    });
                    break;
                }

                let window: Vec<&str> = (i..i + ROW_WINDOW).map(seg).collect();
                i += ROW_WINDOW;

                let table = TableKey {
                    area: &area,
                    period: &period,
                    residence: &residence,
                };
                out.rows
                    .extend(physical_row(&table, &combined, &window, &layout.placeholder));
            }
        }
    }

    log::info!(
        "reconstructed {} rows, dropped {} row tokens",
        out.rows.len(),
        out.diagnostics.len()
    );
    out
}

struct TableKey<'a> {
    area: &'a str,
    period: &'a str,
    residence: &'a str,
}

/// Expand one physical row into its Total, Male and Female records.
fn physical_row(
    table: &TableKey<'_>,
    combined: &CombinedToken,
    window: &[&str],
    placeholder: &str,
) -> Vec<LifeTableRow> {
    let float = |k: usize| parse_float(window[k], placeholder);
    let int = |k: usize| parse_int(window[k], placeholder);

    let columns = [
        (Sex::Total, combined.nqx, Some(combined.lx), Some(combined.nlx), float(0)),
        (Sex::Male, float(1), int(2), int(3), float(4)),
        (Sex::Female, float(5), int(6), int(7), float(8)),
    ];

    let interval = combined.interval;
    let n = interval.width();

    columns
        .into_iter()
        .map(|(sex, nqx, lx, nlx, ex)| LifeTableRow {
            area: table.area.to_string(),
            period: table.period.to_string(),
            residence: table.residence.to_string(),
            sex,
            age_interval: interval.to_string(),
            age_start: interval.start,
            age_end: interval.end,
            n,
            nqx,
            lx,
            nlx,
            ex,
            mx: central_death_rate(nqx, n),
            age_mid: interval.midpoint(),
        })
        .collect()
}
