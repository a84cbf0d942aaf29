use std::cmp::Ordering;

/// Replacement of one byte range of a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, replacement: impl Into<String>) -> Self {
        assert!(start <= end, "text edit start must not exceed end");
        Self {
            start,
            end,
            replacement: replacement.into(),
        }
    }

    /// Whether applying this edit would leave `source` as it is.
    pub fn is_noop(&self, source: &str) -> bool {
        source.get(self.start..self.end) == Some(self.replacement.as_str())
    }
}

/// Applies a sequence of edits to `source` and returns the updated text.
///
/// Edits must not overlap; doc comments never do.
pub fn apply_text_edits(source: &str, edits: &[TextEdit]) -> String {
    let mut sorted = edits.to_vec();
    sorted.sort_by(|a, b| match a.start.cmp(&b.start) {
        Ordering::Equal => a.end.cmp(&b.end),
        ordering => ordering,
    });

    let mut result = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in sorted {
        if cursor > edit.start {
            panic!("overlapping edits are not supported");
        }

        result.push_str(&source[cursor..edit.start]);
        result.push_str(&edit.replacement);
        cursor = edit.end;
    }

    result.push_str(&source[cursor..]);
    result
}
