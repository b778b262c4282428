use std::path::PathBuf;

use prettytable::row;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the PDF file
    path: PathBuf,

    /// Only print segments containing this text
    #[arg(short, long)]
    grep: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let document = crate::load_document(&options.path, &global)?;

    let segments: Vec<&pdf::TextSegment> = document
        .segments()
        .iter()
        .filter(|s| options.grep.as_deref().is_none_or(|g| s.text.contains(g)))
        .collect();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&segments)?);
        return Ok(());
    }

    let mut table = new_table();
    table.set_titles(row!["#", "BLOCK", "TEXT"]);
    for segment in segments {
        table.add_row(row![r->segment.index, r->segment.block, segment.text]);
    }
    table.printstd();

    Ok(())
}
