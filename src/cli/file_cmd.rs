//! Stateless file transforms: encode, strip, parse, apply, diff
//!
//! These commands work directly on files and need no workspace; the
//! session commands wrap the same core with persistence.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::domain::{
    diff_report, merge, number_lines, parse_patch, strip, AnchorMap, DiffReport, SkippedLine,
};
use crate::storage::read_source;

use super::output::Output;

/// Numbers the lines of a source file
pub fn encode(output: &Output, file: &Path, out: Option<&Path>) -> Result<()> {
    let source = read_source(file)?;
    emit_text(output, &number_lines(&source), out)
}

/// Removes anchors from an anchored file
pub fn strip_file(output: &Output, file: &Path, out: Option<&Path>) -> Result<()> {
    let text = read_source(file)?;
    emit_text(output, &strip(&text), out)
}

#[derive(Serialize)]
struct ParseReport<'a> {
    patch: &'a AnchorMap,
    skipped: &'a [SkippedLine],
}

/// Extracts an anchored patch from an AI response file
pub fn parse(output: &Output, file: &Path, strict: bool) -> Result<()> {
    let response = read_source(file)?;
    let outcome = parse_patch(&response);

    if strict && !outcome.skipped.is_empty() {
        bail!(
            "response contains {} unparseable line(s); first: '{}'",
            outcome.skipped.len(),
            outcome.skipped[0].line
        );
    }

    report_skipped(output, &outcome.skipped, usize::MAX);

    if output.is_json() {
        output.data(&ParseReport {
            patch: &outcome.patch,
            skipped: &outcome.skipped,
        });
    } else {
        // The flat anchor-to-content object is the persisted patch form.
        output.data(&outcome.patch);
    }
    Ok(())
}

/// Merges a patch file into a numbered file
pub fn apply(
    output: &Output,
    base_file: &Path,
    patch_file: &Path,
    out: Option<&Path>,
) -> Result<()> {
    let base_text = read_source(base_file)?;
    let base = parse_patch(&base_text);
    for skipped in &base.skipped {
        output.warn(&format!(
            "{}: skipped '{}'",
            base_file.display(),
            skipped.line
        ));
    }

    let patch = load_patch(patch_file)?;
    let outcome = merge(&base.patch, &patch);
    for note in &outcome.notes {
        output.warn(&note.to_string());
    }

    emit_text(output, &outcome.merged.to_anchored_text(), out)
}

/// Diffs a source file against its patched form
pub fn diff(output: &Output, source_file: &Path, patch_file: &Path) -> Result<()> {
    let source = read_source(source_file)?;
    let patch = load_patch(patch_file)?;

    let report = diff_report(&AnchorMap::base_map(&source), &patch);
    render_diff(output, &report);
    Ok(())
}

/// Prints a diff report in the selected format
pub fn render_diff(output: &Output, report: &DiffReport) {
    if output.is_json() {
        output.data(report);
        return;
    }

    if !report.has_changes {
        output.success("No changes");
        return;
    }

    for (orig, fixed) in report
        .highlight
        .changed_lines
        .iter()
        .zip(&report.highlight.changed_lines_fixed)
    {
        println!("~ line {} -> {}", orig, fixed);
    }
    for added in &report.highlight.added_lines {
        println!("+ line {}", added);
    }
    output.success(&format!(
        "{} changed, {} added",
        report.highlight.changed_lines.len(),
        report.highlight.added_lines.len()
    ));
}

/// Echoes skipped-line diagnostics, capped at `limit`
pub fn report_skipped(output: &Output, skipped: &[SkippedLine], limit: usize) {
    for entry in skipped.iter().take(limit) {
        output.warn(&format!("skipped ({}): '{}'", entry.reason, entry.line));
    }
    if skipped.len() > limit {
        output.warn(&format!("...and {} more", skipped.len() - limit));
    }
}

fn load_patch(path: &Path) -> Result<AnchorMap> {
    let raw = read_source(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse patch file: {}", path.display()))
}

fn emit_text(output: &Output, text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!("Wrote {}", path.display()));
        }
        None => print!("{}", text),
    }
    Ok(())
}
