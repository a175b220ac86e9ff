//! Line anchors and the anchored-line grammar
//!
//! Anchor Format:
//! - Original lines: `{base}` (e.g. `42`) - the 1-based line number
//! - Inserted lines: `{base}{suffix}` (e.g. `42a`, `42b`) - lowercase
//!   letters marking lines inserted after `base`, in insertion order
//!
//! Anchors give every logical line a stable identity that survives
//! partial, out-of-order edits: a generator can emit `5a` and `12`
//! in any order across any number of rounds and the document still
//! reassembles deterministically.
//!
//! The total order over anchors (base ascending, then suffix by length
//! and then lexicographically, with the empty suffix first) is the
//! canonical line order of every anchored document. Merging, stripping
//! and diffing all iterate in this order; it is defined exactly once,
//! here, as `Ord`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnchorError {
    #[error("Empty anchor token")]
    Empty,

    #[error("Invalid anchor token: expected digits followed by lowercase letters, got '{0}'")]
    Malformed(String),

    #[error("Anchor base does not fit in 64 bits: '{0}'")]
    BaseOutOfRange(String),
}

/// Stable identity of a logical line
///
/// An empty suffix denotes a line present in the original numbering; a
/// non-empty suffix denotes a line inserted after `base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Anchor {
    base: u64,
    suffix: String,
}

impl Anchor {
    /// Creates the anchor of an original line
    pub fn line(base: u64) -> Self {
        Self {
            base,
            suffix: String::new(),
        }
    }

    /// Creates the anchor of a line inserted after `base`
    ///
    /// The suffix must be non-empty ASCII lowercase; anything else is a
    /// programming error on the caller's side.
    pub fn inserted(base: u64, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        debug_assert!(!suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_lowercase()));
        Self { base, suffix }
    }

    /// Returns the numeric base (the original 1-based line number)
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Returns the insertion suffix (empty for original lines)
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Returns true if this anchor denotes an inserted line
    pub fn is_insertion(&self) -> bool {
        !self.suffix.is_empty()
    }
}

impl Ord for Anchor {
    fn cmp(&self, other: &Self) -> Ordering {
        // Shorter suffixes first, so the empty suffix (the original line)
        // precedes every insertion at the same base and `z` precedes `aa`.
        self.base
            .cmp(&other.base)
            .then_with(|| self.suffix.len().cmp(&other.suffix.len()))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl PartialOrd for Anchor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.suffix)
    }
}

impl FromStr for Anchor {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AnchorError::Empty);
        }

        let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        if digits_end == 0 {
            return Err(AnchorError::Malformed(s.to_string()));
        }

        let suffix = &s[digits_end..];
        if !suffix.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(AnchorError::Malformed(s.to_string()));
        }

        let base = s[..digits_end]
            .parse::<u64>()
            .map_err(|_| AnchorError::BaseOutOfRange(s.to_string()))?;

        Ok(Self {
            base,
            suffix: suffix.to_string(),
        })
    }
}

impl TryFrom<String> for Anchor {
    type Error = AnchorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.to_string()
    }
}

/// Splits a raw line into its anchor and content, if the line is anchored
///
/// Separators are tried in fixed priority order, first match wins:
///
/// 1. `:` optionally followed by a single space (the canonical encoding)
/// 2. a run of spaces or tabs
/// 3. `.` optionally followed by whitespace
/// 4. `)` optionally followed by whitespace
///
/// Generator output is inconsistent, hence the alternatives; the colon is
/// tried first so that digits followed by punctuation used for other
/// purposes are not misparsed. A line with no leading digits, or whose
/// digit run is followed by anything that is neither a suffix letter nor
/// one of the separators above, is not anchored and yields `None`.
pub fn split_anchored_line(line: &str) -> Option<(Anchor, &str)> {
    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits_end == 0 {
        return None;
    }

    let token_end = line[digits_end..]
        .find(|c: char| !c.is_ascii_lowercase())
        .map_or(line.len(), |i| digits_end + i);

    // Bases beyond u64 are treated as not anchored, same as any other
    // token the grammar cannot represent.
    let base = line[..digits_end].parse::<u64>().ok()?;
    let suffix = &line[digits_end..token_end];
    let content = match_separator(&line[token_end..])?;

    Some((
        Anchor {
            base,
            suffix: suffix.to_string(),
        },
        content,
    ))
}

fn match_separator(rest: &str) -> Option<&str> {
    if let Some(after) = rest.strip_prefix(':') {
        return Some(after.strip_prefix(' ').unwrap_or(after));
    }

    let bare = rest.trim_start_matches([' ', '\t']);
    if bare.len() < rest.len() {
        return Some(bare);
    }

    for mark in ['.', ')'] {
        if let Some(after) = rest.strip_prefix(mark) {
            return Some(after.trim_start_matches([' ', '\t']));
        }
    }

    None
}
