//! Life-table row model
//!
//! Output records of the table reconstructor and the pure derivations that
//! fill their computed columns (`age_mid`, `mx`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    Total,
    Male,
    Female,
}

impl Sex {
    /// Column order of the three sex groups within a physical table row.
    pub const ALL: [Sex; 3] = [Sex::Total, Sex::Male, Sex::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Total => "Total",
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Sex {
    type Err = InvalidSex;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Total" => Ok(Sex::Total),
            "Male" => Ok(Sex::Male),
            "Female" => Ok(Sex::Female),
            _ => Err(InvalidSex(s.to_string())),
        }
    }
}

/// Age span covered by a table row: closed `[start, end)` or open `[start, ∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeInterval {
    pub start: u32,
    pub end: Option<u32>,
}

impl AgeInterval {
    pub fn closed(start: u32, end: u32) -> Result<Self, InvalidAgeInterval> {
        if end <= start {
            return Err(InvalidAgeInterval(format!("{}-{}", start, end)));
        }
        Ok(AgeInterval {
            start,
            end: Some(end),
        })
    }

    pub fn open(start: u32) -> Self {
        AgeInterval { start, end: None }
    }

    /// Interval length `n`; `None` for the open interval.
    pub fn width(&self) -> Option<u32> {
        self.end.map(|end| end - self.start)
    }

    pub fn midpoint(&self) -> Option<f64> {
        self.width().map(|n| self.start as f64 + n as f64 / 2.0)
    }
}

impl fmt::Display for AgeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}+", self.start),
        }
    }
}

impl FromStr for AgeInterval {
    type Err = InvalidAgeInterval;

    /// Parse `"x-y"` or `"x+"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAgeInterval(s.to_string());
        if let Some(start) = s.strip_suffix('+') {
            return start.parse().map(AgeInterval::open).map_err(|_| invalid());
        }
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = start.parse().map_err(|_| invalid())?;
        let end = end.parse().map_err(|_| invalid())?;
        AgeInterval::closed(start, end)
    }
}

/// Central death rate `mx = -ln(1 - nqx) / n`.
///
/// Defined only for `0 < nqx < 1` and a closed interval of positive width.
pub fn central_death_rate(nqx: Option<f64>, n: Option<u32>) -> Option<f64> {
    let (q, n) = (nqx?, n?);
    if n == 0 || q <= 0.0 || q >= 1.0 {
        return None;
    }
    Some(-(1.0 - q).ln() / n as f64)
}

/// One sex-specific line of an abridged life table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeTableRow {
    pub area: String,
    pub period: String,
    pub residence: String,
    pub sex: Sex,
    pub age_interval: String,
    pub age_start: u32,
    pub age_end: Option<u32>,
    pub n: Option<u32>,
    pub nqx: Option<f64>,
    pub lx: Option<i64>,
    #[serde(rename = "nLx")]
    pub nlx: Option<i64>,
    pub ex: Option<f64>,
    pub mx: Option<f64>,
    pub age_mid: Option<f64>,
}

impl LifeTableRow {
    /// Field names in hand-off order.
    pub const HEADER: [&'static str; 14] = [
        "area",
        "period",
        "residence",
        "sex",
        "age_interval",
        "age_start",
        "age_end",
        "n",
        "nqx",
        "lx",
        "nLx",
        "ex",
        "mx",
        "age_mid",
    ];

    /// Field values as text in [`Self::HEADER`] order; missing values are empty.
    ///
    /// Decimal columns always carry a fractional part (`69.0`, not `69`).
    pub fn record(&self) -> [String; 14] {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        fn decimal(v: &Option<f64>) -> String {
            match v {
                Some(x) if x.is_finite() && x.fract() == 0.0 => format!("{:.1}", x),
                Some(x) => x.to_string(),
                None => String::new(),
            }
        }

        [
            self.area.clone(),
            self.period.clone(),
            self.residence.clone(),
            self.sex.to_string(),
            self.age_interval.clone(),
            self.age_start.to_string(),
            opt(&self.age_end),
            opt(&self.n),
            decimal(&self.nqx),
            opt(&self.lx),
            opt(&self.nlx),
            decimal(&self.ex),
            decimal(&self.mx),
            decimal(&self.age_mid),
        ]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid age interval '{0}' (expected 'x-y' with y > x, or 'x+')")]
pub struct InvalidAgeInterval(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid sex '{0}' (expected Total, Male or Female)")]
pub struct InvalidSex(pub String);
