//! Overlaying sparse patches onto dense documents
//!
//! The merge is pure: it reads both maps, produces a fresh merged map,
//! and flags anything suspicious as a note rather than failing. Every
//! patch anchor either overwrites its key in the base or is inserted as
//! a new key; no anchor is ever removed or reordered relative to the
//! canonical order.

use std::fmt;

use serde::Serialize;

use super::anchor::Anchor;
use super::document::AnchorMap;

/// Non-fatal observation made during a merge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeNote {
    /// The patch references a base line the document never had; usually
    /// the generator worked from a stale numbering. The line is still
    /// merged, as an insertion without context.
    StaleAnchor { anchor: Anchor },
}

impl fmt::Display for MergeNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeNote::StaleAnchor { anchor } => {
                write!(f, "anchor {} is outside the original line range", anchor)
            }
        }
    }
}

/// Result of merging a patch into a base map
#[derive(Debug)]
pub struct MergeOutcome {
    /// The merged document: dense for original anchors, plus insertions
    pub merged: AnchorMap,

    /// Diagnostics, empty for a clean merge
    pub notes: Vec<MergeNote>,
}

/// Merges `patch` into `base`, returning a fresh map
///
/// An empty patch is the identity transform. A patch entry with empty
/// content blanks the line but keeps its anchor, so downstream line
/// counts and positions hold.
pub fn merge(base: &AnchorMap, patch: &AnchorMap) -> MergeOutcome {
    let mut notes = Vec::new();
    for (anchor, _) in patch.iter() {
        if !base.contains_base(anchor.base()) {
            notes.push(MergeNote::StaleAnchor {
                anchor: anchor.clone(),
            });
        }
    }

    let mut merged = base.clone();
    merged.overlay(patch);

    MergeOutcome { merged, notes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_of(lines: &[&str]) -> AnchorMap {
        let mut source = lines.join("\n");
        source.push('\n');
        AnchorMap::base_map(&source)
    }

    fn patch_of(entries: &[(&str, &str)]) -> AnchorMap {
        let mut patch = AnchorMap::new();
        for (token, content) in entries {
            patch.insert(token.parse().unwrap(), content.to_string());
        }
        patch
    }

    #[test]
    fn empty_patch_is_identity() {
        let base = base_of(&["int a;", "int b;"]);
        let outcome = merge(&base, &AnchorMap::new());

        assert_eq!(outcome.merged, base);
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn overwrites_and_inserts() {
        let base = base_of(&["int a;", "int b;", "int c;"]);
        let patch = patch_of(&[("2", "int bb; // fixed"), ("2a", "int b_new;")]);

        let outcome = merge(&base, &patch);
        assert_eq!(
            outcome.merged.to_anchored_text(),
            "1:int a;\n2:int bb; // fixed\n2a:int b_new;\n3:int c;\n"
        );
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn rendered_order_is_canonical() {
        let base = base_of(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k"]);
        let patch = patch_of(&[("10", "x"), ("10a", "y"), ("10b", "z"), ("11", "w")]);

        let merged = merge(&base, &patch).merged;
        let tokens: Vec<String> = merged.iter().map(|(a, _)| a.to_string()).collect();
        let tail = &tokens[tokens.len() - 4..];
        assert_eq!(tail, ["10", "10a", "10b", "11"]);
    }

    #[test]
    fn blanked_line_keeps_its_anchor() {
        let base = base_of(&["keep", "blank me"]);
        let patch = patch_of(&[("2", "")]);

        let merged = merge(&base, &patch).merged;
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.to_plain_text(), "keep\n\n");
    }

    #[test]
    fn stale_anchor_is_merged_but_noted() {
        let base = base_of(&["only line"]);
        let patch = patch_of(&[("50", "from an old numbering"), ("50a", "and more")]);

        let outcome = merge(&base, &patch);
        assert_eq!(outcome.merged.len(), 3);
        assert_eq!(outcome.notes.len(), 2);
        assert!(matches!(outcome.notes[0], MergeNote::StaleAnchor { .. }));
    }

    #[test]
    fn suffixed_anchor_on_existing_base_is_clean() {
        let base = base_of(&["a", "b"]);
        let patch = patch_of(&[("1a", "inserted")]);

        let outcome = merge(&base, &patch);
        assert!(outcome.notes.is_empty());
    }

    #[test]
    fn merge_does_not_mutate_inputs() {
        let base = base_of(&["a"]);
        let patch = patch_of(&[("1", "changed")]);
        let before = base.clone();

        let _ = merge(&base, &patch);
        assert_eq!(base, before);
    }

    #[test]
    fn merged_document_reparses() {
        let base = base_of(&["int a;", "int b;"]);
        let patch = patch_of(&[("1a", "int mid;")]);

        let merged = merge(&base, &patch).merged;
        let reparsed = crate::domain::parse_patch(&merged.to_anchored_text());
        assert!(reparsed.skipped.is_empty());
        assert_eq!(reparsed.patch, merged);
    }
}
