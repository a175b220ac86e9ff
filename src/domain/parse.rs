//! Resilient parsing of generator output into patch maps
//!
//! AI responses arrive as prose wrapping zero or more fenced code blocks
//! of anchored lines. Individual lines can be malformed in every way an
//! unreliable generator can produce; none of that may abort the parse.
//! Bad lines become [`SkippedLine`] diagnostics, good lines land in the
//! patch, and a later occurrence of an anchor supersedes an earlier one
//! within the same parse (a regenerated batch replaces its prior lines).
//!
//! The same routine reconstructs a base map from previously numbered
//! text: canonical input simply produces no diagnostics.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::anchor::split_anchored_line;
use super::document::AnchorMap;

/// Matches one fenced block: triple-backtick opener with an optional
/// language tag, non-greedy body, bare triple-backtick closer.
static FENCED_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9+._-]*[ \t]*\r?\n(.*?)```").expect("invalid fence regex")
});

/// Why a line was left out of the patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The line does not begin with digits at all
    NotAnchored,
    /// Leading digits present, but no separator follows the token or
    /// the token itself is unusable (e.g. the base overflows 64 bits)
    BadAnchorToken,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotAnchored => write!(f, "not an anchored line"),
            SkipReason::BadAnchorToken => write!(f, "invalid anchor token"),
        }
    }
}

/// A line the parser could not place, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedLine {
    pub line: String,
    pub reason: SkipReason,
}

/// Result of parsing generator output: the patch plus what was skipped
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub patch: AnchorMap,
    pub skipped: Vec<SkippedLine>,
}

/// Parses anchored lines out of arbitrary text
///
/// Every fenced block in the input is scanned; if the input contains no
/// fence at all, the whole text is treated as one block so a generator
/// that forgot its formatting still gets its lines through. Never fails:
/// malformed lines are returned as diagnostics alongside the patch.
pub fn parse_patch(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    let mut saw_fence = false;
    for caps in FENCED_BLOCK_RE.captures_iter(text) {
        saw_fence = true;
        if let Some(body) = caps.get(1) {
            parse_block(body.as_str(), &mut outcome);
        }
    }

    if !saw_fence {
        parse_block(text, &mut outcome);
    }

    outcome
}

fn parse_block(block: &str, outcome: &mut ParseOutcome) {
    for line in block.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match split_anchored_line(line) {
            Some((anchor, content)) => {
                // Last write wins on duplicate anchors.
                outcome.patch.insert(anchor, content.to_string());
            }
            None => {
                let reason = if line.starts_with(|c: char| c.is_ascii_digit()) {
                    SkipReason::BadAnchorToken
                } else {
                    SkipReason::NotAnchored
                };
                outcome.skipped.push(SkippedLine {
                    line: line.to_string(),
                    reason,
                });
            }
        }
    }
}
