//! Anchored documents: numbering, stripping, and the anchor map
//!
//! An [`AnchorMap`] is an ordered map from [`Anchor`] to line content.
//! Two flavors share the type: the dense base map produced by numbering
//! a source file (every anchor suffix-free), and the sparse patch map a
//! generator emits (any mix of anchors, large ranges omitted).
//!
//! Backed by a `BTreeMap` keyed on `Anchor`, so iteration order is the
//! canonical anchor order by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::anchor::{split_anchored_line, Anchor};

/// Ordered map from line anchor to line content
///
/// Serializes as a flat JSON object of anchor token to content, the
/// persisted patch representation; insertion order of the source JSON is
/// irrelevant since the canonical order is re-derived on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorMap {
    lines: BTreeMap<Anchor, String>,
}

impl AnchorMap {
    /// Creates an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers every line of a source text, producing the dense base map
    ///
    /// Line `i` (1-based) gets anchor `i`; no suffixes are ever assigned
    /// here. Line terminators are not part of the stored content.
    pub fn base_map(source: &str) -> Self {
        let mut lines = BTreeMap::new();
        for (idx, raw) in source.split_inclusive('\n').enumerate() {
            let (content, _) = split_terminator(raw);
            lines.insert(Anchor::line(idx as u64 + 1), content.to_string());
        }
        Self { lines }
    }

    /// Inserts or replaces a line, returning the previous content if any
    pub fn insert(&mut self, anchor: Anchor, content: String) -> Option<String> {
        self.lines.insert(anchor, content)
    }

    /// Returns the content stored under `anchor`
    pub fn get(&self, anchor: &Anchor) -> Option<&str> {
        self.lines.get(anchor).map(String::as_str)
    }

    /// Returns true if `anchor` is present
    pub fn contains(&self, anchor: &Anchor) -> bool {
        self.lines.contains_key(anchor)
    }

    /// Returns true if the suffix-free anchor for `base` is present
    pub fn contains_base(&self, base: u64) -> bool {
        self.lines.contains_key(&Anchor::line(base))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Iterates entries in canonical anchor order
    pub fn iter(&self) -> impl Iterator<Item = (&Anchor, &str)> + '_ {
        self.lines.iter().map(|(a, c)| (a, c.as_str()))
    }

    /// Overlays `patch` onto this map: every patch entry overwrites or
    /// inserts, nothing is removed
    pub fn overlay(&mut self, patch: &AnchorMap) {
        for (anchor, content) in &patch.lines {
            self.lines.insert(anchor.clone(), content.clone());
        }
    }

    /// Renders `"{anchor}: {content}"` lines, the encoder's format
    pub fn to_numbered_text(&self) -> String {
        self.render(": ")
    }

    /// Renders `"{anchor}:{content}"` lines, the merge output format
    ///
    /// No space after the colon, unlike [`Self::to_numbered_text`]; the
    /// parser accepts both.
    pub fn to_anchored_text(&self) -> String {
        self.render(":")
    }

    /// Renders plain content lines in canonical order, anchors removed
    ///
    /// Empty contents render as empty lines, never dropped, so line
    /// numbers in the rendering stay aligned with the map.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for content in self.lines.values() {
            out.push_str(content);
            out.push('\n');
        }
        out
    }

    fn render(&self, separator: &str) -> String {
        let mut out = String::new();
        for (anchor, content) in &self.lines {
            out.push_str(&anchor.to_string());
            out.push_str(separator);
            out.push_str(content);
            out.push('\n');
        }
        out
    }
}

/// Numbers the lines of a source text: line `i` becomes `"{i}: {content}"`
///
/// One output line per input line, original order, terminators (`\n` or
/// `\r\n`, and the presence or absence of a final newline) preserved
/// exactly, so [`strip`] inverts this for any input.
pub fn number_lines(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + source.len() / 8);
    for (idx, raw) in source.split_inclusive('\n').enumerate() {
        let (content, terminator) = split_terminator(raw);
        out.push_str(&(idx + 1).to_string());
        out.push_str(": ");
        out.push_str(content);
        out.push_str(terminator);
    }
    out
}

/// Removes anchors and separators from anchored text, keeping content
///
/// Input order is preserved, not re-sorted. A line that does not match
/// the anchor grammar passes through unchanged; this guards against
/// non-anchored lines leaking into the stage. An anchored line with
/// empty content becomes an empty output line.
pub fn strip(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for raw in text.split_inclusive('\n') {
        let (line, terminator) = split_terminator(raw);
        match split_anchored_line(line) {
            Some((_, content)) => out.push_str(content),
            None => out.push_str(line),
        }
        out.push_str(terminator);
    }
    out
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(stripped) = line.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = line.strip_suffix('\n') {
        (stripped, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn number_lines_canonical_form() {
        assert_eq!(
            number_lines("int a;\nint b;\nint c;\n"),
            "1: int a;\n2: int b;\n3: int c;\n"
        );
    }

    #[test]
    fn number_lines_renders_empty_line_with_trailing_space() {
        assert_eq!(number_lines("x\n\ny\n"), "1: x\n2: \n3: y\n");
    }

    #[test]
    fn number_lines_preserves_missing_final_newline() {
        assert_eq!(number_lines("a\nb"), "1: a\n2: b");
    }

    #[test]
    fn strip_inverts_numbering() {
        let source = "int a;\n\n    indented\nint c;";
        assert_eq!(strip(&number_lines(source)), source);
    }

    #[test]
    fn strip_keeps_unanchored_lines() {
        assert_eq!(strip("no anchor here\n2: ok\n"), "no anchor here\nok\n");
    }

    #[test]
    fn strip_preserves_blanked_lines() {
        assert_eq!(strip("1: a\n2:\n3: c\n"), "a\n\nc\n");
    }

    #[test]
    fn strip_handles_crlf() {
        assert_eq!(strip("1: a\r\n2: b\r\n"), "a\r\nb\r\n");
    }

    #[test]
    fn base_map_numbers_from_one() {
        let map = AnchorMap::base_map("x\ny\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&Anchor::line(1)), Some("x"));
        assert_eq!(map.get(&Anchor::line(2)), Some("y"));
        assert!(!map.contains_base(3));
    }

    #[test]
    fn renderings_differ_only_in_separator() {
        let mut map = AnchorMap::new();
        map.insert(Anchor::line(1), "a".to_string());
        map.insert(Anchor::inserted(1, "a"), "b".to_string());

        assert_eq!(map.to_numbered_text(), "1: a\n1a: b\n");
        assert_eq!(map.to_anchored_text(), "1:a\n1a:b\n");
        assert_eq!(map.to_plain_text(), "a\nb\n");
    }

    #[test]
    fn render_follows_canonical_order_not_insertion_order() {
        let mut map = AnchorMap::new();
        map.insert(Anchor::line(11), "w".to_string());
        map.insert(Anchor::inserted(10, "b"), "z".to_string());
        map.insert(Anchor::line(10), "x".to_string());
        map.insert(Anchor::inserted(10, "a"), "y".to_string());

        assert_eq!(map.to_anchored_text(), "10:x\n10a:y\n10b:z\n11:w\n");
    }

    #[test]
    fn patch_json_round_trip() {
        let json = r#"{"2a":"int b_new;","2":"int bb;"}"#;
        let map: AnchorMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.get(&Anchor::line(2)), Some("int bb;"));
        assert_eq!(map.get(&Anchor::inserted(2, "a")), Some("int b_new;"));

        let back = serde_json::to_string(&map).unwrap();
        // Canonical order on re-serialization.
        assert_eq!(back, r#"{"2":"int bb;","2a":"int b_new;"}"#);
    }

    #[test]
    fn patch_json_rejects_bad_tokens() {
        assert!(serde_json::from_str::<AnchorMap>(r#"{"2A":"x"}"#).is_err());
    }

    proptest! {
        #[test]
        fn number_then_strip_round_trips(
            lines in prop::collection::vec("[ -~]{0,40}", 0..30),
            trailing in any::<bool>(),
        ) {
            let mut text = lines.join("\n");
            if trailing && !text.is_empty() {
                text.push('\n');
            }
            prop_assert_eq!(strip(&number_lines(&text)), text);
        }
    }
}
