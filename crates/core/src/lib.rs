//! Core library for srstables
//!
//! This crate implements the **Functional Core** of srstables: it turns the
//! ordered text segments recovered from an SRS abridged life-table PDF into
//! typed [`LifeTableRow`] records.
//!
//! # Architecture Overview
//!
//! - **`pdf`**: locates and inflates content streams, resolves character maps
//!   and assembles text segments
//! - **`srstables_core`** (this crate): pure reconstruction of table rows from
//!   those segments
//! - **`srstables`**: file I/O, output formats and the command line
//!
//! Nothing in this crate touches the filesystem. Its only side effect is
//! logging through the `log` facade.
//!
//! # Module Organization
//!
//! - [`life_table`]: the output row model and its derived columns
//! - [`split`]: recovery of the `lx`/`nLx` pair from packed digit runs
//! - [`reconstruct`]: the table scan that walks headers, residences and rows
//! - [`summary`]: coverage counts of an extraction
//!
//! # Example Usage
//!
//! ```rust
//! use srstables_core::{reconstruct, TableLayout};
//!
//! let segments = [
//!     "India, 2018-22", "Age-Interval", "Total",
//!     "0-10.0308510000097320",
//!     "69.1", "0.03012", "100000", "97412", "68.2",
//!     "0.03166", "100000", "97218", "70.1",
//! ];
//!
//! let out = reconstruct(&segments, &TableLayout::default());
//! assert_eq!(out.rows.len(), 3);
//! assert_eq!(out.rows[0].lx, Some(100000));
//! ```

pub mod life_table;
pub mod reconstruct;
pub mod split;
pub mod summary;

pub use life_table::{central_death_rate, AgeInterval, LifeTableRow, Sex};
pub use reconstruct::{
    parse_combined, reconstruct, CombinedToken, Reconstruction, RowDiagnostic, RowError,
    TableLayout,
};
pub use split::{split_counts, SplitConfig};
pub use summary::{summarize, ExtractionSummary};
