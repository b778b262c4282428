use crate::prelude::{eprintln, *};
use clap::Parser;

mod cmaps;
mod error;
mod extract;
mod prelude;
mod segments;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Extract SRS abridged life tables from their published PDF"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "SRS_VERBOSE", global = true, default_value = "false")]
    verbose: bool,

    /// Print the blocks, character maps and rows that were skipped.
    #[clap(long, global = true)]
    diagnostics: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Reconstruct life-table rows and write them as CSV, JSON or a table
    Extract(crate::extract::Options),

    /// Dump the decoded text segments in reading order
    Segments(crate::segments::Options),

    /// List the character maps found in the document
    Cmaps(crate::cmaps::Options),
}

fn main() -> Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let app = App::parse();

    match app.command {
        SubCommands::Extract(options) => crate::extract::run(options, app.global),
        SubCommands::Segments(options) => crate::segments::run(options, app.global),
        SubCommands::Cmaps(options) => crate::cmaps::run(options, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}

/// Load a document, reporting its skip diagnostics when asked to.
pub fn load_document(path: &std::path::Path, global: &Global) -> Result<pdf::Document> {
    log::debug!("loading {}", path.display());
    let document = pdf::Document::from_path(path)?;

    if global.verbose {
        eprintln!(
            "{}: {} blocks, {} character maps, {} segments",
            path.display(),
            document.blocks().len(),
            document.cmaps().len(),
            document.segments().len()
        );
        for block in document.blocks() {
            eprintln!("  {}", describe_block(block));
        }
    }
    if global.diagnostics {
        for diagnostic in document.diagnostics() {
            eprintln!("{}", diagnostic);
        }
    }

    Ok(document)
}

fn describe_block(block: &pdf::DecodedBlock) -> String {
    f!(
        "block {} @{}..{}: {} -> {} bytes{}",
        block.index,
        block.source.start,
        block.source.end,
        block.source.len(),
        block.data.len(),
        if block.has_text_operators() { ", text" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_block_reports_source_range() {
        let block = pdf::DecodedBlock {
            index: 2,
            source: 120..170,
            data: b"BT (Total) Tj ET".to_vec(),
        };
        assert_eq!(describe_block(&block), "block 2 @120..170: 50 -> 16 bytes, text");
    }
}
