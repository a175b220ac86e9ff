//! Core patch protocol
//!
//! Pure transformations over in-memory text and anchor maps, no I/O
//! concerns: numbering, parsing, merging, stripping, and line-migration
//! mapping. Everything here is a synchronous function of its explicit
//! inputs and is safe to call concurrently.

mod anchor;
mod document;
mod merge;
mod migration;
mod parse;

pub use anchor::{split_anchored_line, Anchor, AnchorError};
pub use document::{number_lines, strip, AnchorMap};
pub use merge::{merge, MergeNote, MergeOutcome};
pub use migration::{diff_report, map_lines, DiffReport, LineMigration};
pub use parse::{parse_patch, ParseOutcome, SkipReason, SkippedLine};
