use std::path::PathBuf;

use prettytable::row;
use serde::Serialize;

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the PDF file
    path: PathBuf,

    /// Number of mappings to show per character map
    #[arg(short, long, default_value = "5")]
    sample: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct CMapInfo {
    index: usize,
    key_length: usize,
    entries: usize,
    sample: Vec<String>,
}

fn describe(index: usize, cmap: &pdf::CMap, sample: usize) -> CMapInfo {
    CMapInfo {
        index,
        key_length: cmap.key_length(),
        entries: cmap.len(),
        sample: cmap
            .iter()
            .take(sample)
            .map(|(code, text)| {
                let hex: String = code.iter().map(|b| f!("{:02X}", b)).collect();
                f!("<{}> {:?}", hex, text)
            })
            .collect(),
    }
}

pub fn run(options: Options, global: crate::Global) -> Result<()> {
    let document = crate::load_document(&options.path, &global)?;

    let infos: Vec<CMapInfo> = document
        .cmaps()
        .iter()
        .enumerate()
        .map(|(i, cmap)| describe(i, cmap, options.sample))
        .collect();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    let mut table = new_table();
    table.set_titles(row!["#", "KEY BYTES", "ENTRIES", "SAMPLE"]);
    for info in infos {
        table.add_row(row![
            r->info.index,
            r->info.key_length,
            r->info.entries,
            info.sample.join("  ")
        ]);
    }
    table.printstd();

    Ok(())
}
