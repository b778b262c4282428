use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use prettytable::{Cell, Row};
use srstables_core::{reconstruct, summarize, ExtractionSummary, LifeTableRow, TableLayout};

use crate::prelude::{eprintln, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Csv,
    Json,
    Table,
}

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the SRS abridged life-table PDF
    path: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(short, long, env = "SRS_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, env = "SRS_FORMAT", value_enum, default_value = "csv")]
    format: Format,

    /// Segment that follows every table title
    #[arg(long, default_value = "Age-Interval")]
    header_marker: String,

    /// Residence labels that open a table subsection
    #[arg(long = "residence", value_delimiter = ',', default_value = "Total,Rural,Urban")]
    residences: Vec<String>,

    /// Lowest accepted nLx / (n * lx) ratio when splitting packed counts
    #[arg(long, default_value = "0.2")]
    min_ratio: f64,

    /// Highest accepted nLx / (n * lx) ratio when splitting packed counts
    #[arg(long, default_value = "1.05")]
    max_ratio: f64,

    /// Most digits the lx count may take in a packed cell
    #[arg(long, default_value = "6")]
    max_lx_digits: usize,
}

impl Options {
    fn layout(&self) -> Result<TableLayout> {
        if !(self.min_ratio > 0.0 && self.min_ratio <= self.max_ratio) {
            return Err(Error::InvalidRatio {
                min: self.min_ratio,
                max: self.max_ratio,
            }
            .into());
        }
        if self.residences.iter().all(|r| r.trim().is_empty()) {
            return Err(Error::NoResidenceLabels.into());
        }

        let mut layout = TableLayout {
            header_marker: self.header_marker.clone(),
            residence_labels: self
                .residences
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            ..TableLayout::default()
        };
        layout.split.ratio = self.min_ratio..=self.max_ratio;
        layout.split.max_first_digits = self.max_lx_digits;
        Ok(layout)
    }
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let layout = options.layout()?;
    let document = crate::load_document(&options.path, &global)?;

    let out = reconstruct(&document.segment_texts(), &layout);
    if global.diagnostics {
        for diagnostic in &out.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }

    match &options.output {
        Some(path) => {
            let file = create_output(path)?;
            write_rows(&out.rows, options.format, BufWriter::new(file))
                .wrap_err_with(|| f!("writing {}", path.display()))?;
        }
        None => write_rows(&out.rows, options.format, std::io::stdout().lock())?,
    }

    let summary = summarize(&out.rows);
    eprintln!("{}", format_summary(&summary, options.output.as_deref()));
    if !out.diagnostics.is_empty() && !global.diagnostics {
        eprintln!(
            "{} row tokens skipped (rerun with --diagnostics for details)",
            out.diagnostics.len().to_string().yellow()
        );
    }

    Ok(())
}

fn create_output(path: &Path) -> Result<File> {
    let io_error = |source| Error::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    Ok(File::create(path).map_err(io_error)?)
}

fn write_rows<W: Write>(rows: &[LifeTableRow], format: Format, mut writer: W) -> Result<()> {
    match format {
        // An empty extraction is an empty file, without a header line.
        Format::Csv if rows.is_empty() => {}
        Format::Csv => {
            rows_table(rows).to_csv(&mut writer)?.flush()?;
        }
        Format::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
        }
        Format::Table => {
            let mut table = rows_table(rows);
            table.set_format(*prettytable::format::consts::FORMAT_BOX_CHARS);
            table.print(&mut writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn rows_table(rows: &[LifeTableRow]) -> prettytable::Table {
    let mut table = new_table();
    table.set_titles(Row::new(
        LifeTableRow::HEADER.iter().map(|h| Cell::new(h)).collect(),
    ));
    for row in rows {
        table.add_row(Row::new(row.record().iter().map(|v| Cell::new(v)).collect()));
    }
    table
}

fn format_summary(summary: &ExtractionSummary, output: Option<&Path>) -> String {
    let target = output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    f!(
        "{} {} ({} rows)\n{}",
        "Wrote".bright_green().bold(),
        target,
        summary.rows.to_string().bright_cyan().bold(),
        summary
    )
}
