//! Line migration between the original and the patched rendering
//!
//! A patch moves lines: every insertion pushes all later lines down by
//! one. The viewer highlighting changed and added lines needs to know,
//! for each original line, where it ended up - two coordinate spaces
//! reconciled by walking the patch in canonical anchor order with a
//! running insertion count.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::document::AnchorMap;
use super::merge::merge;

/// Correspondence between original and final line numbers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineMigration {
    /// Original line number to final line number. Covers every patched
    /// line and every line displaced by an insertion; identity mappings
    /// of untouched lines are omitted.
    pub line_mappings: BTreeMap<u64, u64>,

    /// Original line numbers whose content actually changed
    pub changed_lines: Vec<u64>,

    /// Final line numbers of the entries in `changed_lines`, parallel
    pub changed_lines_fixed: Vec<u64>,

    /// Final line numbers of lines introduced by insertion anchors
    pub added_lines: Vec<u64>,

    /// Reserved. The protocol cannot delete a line - a blanked line is a
    /// content change, reported in `changed_lines` - so this stays empty.
    pub removed_lines: Vec<u64>,
}

impl LineMigration {
    pub fn is_empty(&self) -> bool {
        self.line_mappings.is_empty() && self.added_lines.is_empty()
    }
}

/// Diff payload for a presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub original: String,
    pub fixed: String,
    pub has_changes: bool,
    pub highlight: LineMigration,
}

/// Computes the line migration for `patch` between two plain renderings
///
/// `original` is the pre-merge document, `fixed` the post-merge,
/// anchor-stripped one. Anchors are processed in canonical order so that
/// insertions at a base are counted before any later base is looked at;
/// that running count is what makes the offsets correct. Content
/// comparison is on trimmed lines and restricted to non-suffixed patch
/// anchors.
pub fn map_lines(patch: &AnchorMap, original: &str, fixed: &str) -> LineMigration {
    let original_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();

    let mut migration = LineMigration::default();
    let mut insertions = 0u64;

    for (anchor, _) in patch.iter() {
        if anchor.is_insertion() {
            insertions += 1;
            migration.added_lines.push(anchor.base() + insertions);
        } else {
            let line = anchor.base();
            let fixed_no = line + insertions;
            migration.line_mappings.insert(line, fixed_no);

            let before = trimmed_line(&original_lines, line);
            let after = trimmed_line(&fixed_lines, fixed_no);
            if before != after {
                migration.changed_lines.push(line);
                migration.changed_lines_fixed.push(fixed_no);
            }
        }
    }

    // Unpatched lines past an insertion point moved too; the viewer
    // needs their positions to keep the panes aligned.
    let mut shift = 0u64;
    let mut insertion_bases = patch
        .iter()
        .filter(|(a, _)| a.is_insertion())
        .map(|(a, _)| a.base())
        .peekable();
    for line in 1..=original_lines.len() as u64 {
        while insertion_bases.peek().is_some_and(|b| *b < line) {
            shift += 1;
            insertion_bases.next();
        }
        if shift > 0 {
            migration.line_mappings.entry(line).or_insert(line + shift);
        }
    }

    migration
}

/// Merges, strips, and maps in one step for callers holding the inputs
pub fn diff_report(base: &AnchorMap, patch: &AnchorMap) -> DiffReport {
    let original = base.to_plain_text();
    let fixed = merge(base, patch).merged.to_plain_text();
    let highlight = map_lines(patch, &original, &fixed);
    let has_changes = original != fixed;

    DiffReport {
        original,
        fixed,
        has_changes,
        highlight,
    }
}

fn trimmed_line<'a>(lines: &[&'a str], number: u64) -> &'a str {
    number
        .checked_sub(1)
        .and_then(|idx| lines.get(idx as usize))
        .map_or("", |line| line.trim())
}
