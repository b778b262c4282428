use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::life_table::{LifeTableRow, Sex};

/// Coverage of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionSummary {
    pub rows: usize,
    pub areas: BTreeSet<String>,
    pub residences: BTreeSet<String>,
    pub sexes: BTreeSet<Sex>,
}

pub fn summarize(rows: &[LifeTableRow]) -> ExtractionSummary {
    let mut summary = ExtractionSummary {
        rows: rows.len(),
        ..Default::default()
    };
    for row in rows {
        summary.areas.insert(row.area.clone());
        summary.residences.insert(row.residence.clone());
        summary.sexes.insert(row.sex);
    }
    summary
}

fn join<T: fmt::Display>(items: &BTreeSet<T>) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ExtractionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(f, "Areas ({}): {}", self.areas.len(), join(&self.areas))?;
        writeln!(f, "Residences: {}", join(&self.residences))?;
        write!(f, "Sexes: {}", join(&self.sexes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(area: &str, residence: &str, sex: Sex) -> LifeTableRow {
        LifeTableRow {
            area: area.to_string(),
            period: "2018-22".to_string(),
            residence: residence.to_string(),
            sex,
            age_interval: "0-1".to_string(),
            age_start: 0,
            age_end: Some(1),
            n: Some(1),
            nqx: None,
            lx: None,
            nlx: None,
            ex: None,
            mx: None,
            age_mid: Some(0.5),
        }
    }

    #[test]
    fn test_summarize_counts_distinct_values() {
        let rows = vec![
            row("India", "Total", Sex::Total),
            row("India", "Rural", Sex::Male),
            row("Bihar", "Total", Sex::Female),
            row("Bihar", "Total", Sex::Male),
        ];
        let summary = summarize(&rows);

        assert_eq!(summary.rows, 4);
        assert_eq!(summary.areas.len(), 2);
        assert_eq!(summary.residences.len(), 2);
        assert_eq!(summary.sexes.len(), 3);
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize(&[]), ExtractionSummary::default());
    }

    #[test]
    fn test_display() {
        let summary = summarize(&[row("India", "Urban", Sex::Female), row("Assam", "Urban", Sex::Total)]);
        assert_eq!(
            summary.to_string(),
            "Rows: 2\nAreas (2): Assam, India\nResidences: Urban\nSexes: Total, Female"
        );
    }
}
