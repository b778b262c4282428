use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod parser;
pub mod render;
pub mod types;

pub use parser::text::AssemblerConfig;
pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Size caps applied while scanning a document.
#[derive(Debug, Clone)]
pub struct ScanLimits {
    /// Largest inflated block; bigger blocks are dropped.
    pub max_inflated_bytes: usize,
    /// `begincmap` regions of this many bytes or more are ignored.
    pub max_cmap_region: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_inflated_bytes: 64 * 1024 * 1024,
            max_cmap_region: 100_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A scanned document holding every intermediate stage of text recovery.
///
/// Constructed via [`Document::from_bytes`] or [`Document::from_path`].
/// Scanning never fails once the bytes are in memory: blocks and character
/// maps that cannot be interpreted are recorded in [`Document::diagnostics`]
/// and left out.
pub struct Document {
    blocks: Vec<DecodedBlock>,
    cmaps: Vec<CMap>,
    segments: Vec<TextSegment>,
    diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Scan in-memory document bytes with default limits.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::with_options(bytes, &ScanLimits::default(), &AssemblerConfig::default())
    }

    /// Read and scan a document from disk. The read is the only fallible step.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| PdfError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn with_options(bytes: &[u8], limits: &ScanLimits, assembler: &AssemblerConfig) -> Self {
        let mut blocks = Vec::new();
        let mut diagnostics = Vec::new();

        for item in parser::stream::FlateStreams::new(bytes, limits.max_inflated_bytes) {
            match item {
                Ok(block) => blocks.push(block),
                Err(diag) => diagnostics.push(diag),
            }
        }

        let scan = parser::cmap::collect_cmaps(bytes, &blocks, limits.max_cmap_region);
        diagnostics.extend(scan.diagnostics);

        let segments = parser::text::assemble(&blocks, &scan.cmaps, assembler);

        log::info!(
            "scanned {} bytes: {} blocks, {} cmaps, {} segments, {} skipped",
            bytes.len(),
            blocks.len(),
            scan.cmaps.len(),
            segments.len(),
            diagnostics.len()
        );

        Document {
            blocks,
            cmaps: scan.cmaps,
            segments,
            diagnostics,
        }
    }

    pub fn blocks(&self) -> &[DecodedBlock] {
        &self.blocks
    }

    pub fn cmaps(&self) -> &[CMap] {
        &self.cmaps
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    /// Segment texts in emission order, ready for table reconstruction.
    pub fn segment_texts(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_segments(self) -> Vec<TextSegment> {
        self.segments
    }
}

// ---------------------------------------------------------------------------
// Convenience free functions
// ---------------------------------------------------------------------------

/// Extract the ordered text segments from document bytes.
pub fn extract_segments(bytes: &[u8]) -> Vec<TextSegment> {
    Document::from_bytes(bytes).into_segments()
}

/// Read a document from disk and extract its ordered text segments.
pub fn read_segments(path: impl AsRef<Path>) -> Result<Vec<TextSegment>, PdfError> {
    Ok(Document::from_path(path)?.into_segments())
}
