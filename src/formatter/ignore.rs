//! In-source directives that switch formatting off.

const DIRECTIVE: &str = "phpdoc-fmt-ignore";
const FILE_DIRECTIVE: &str = "phpdoc-fmt-ignore-file";

/// Tracks the ignore directives declared in a file.
#[derive(Clone, Debug, Default)]
pub struct IgnoreState {
    ignore_all: bool,
}

impl IgnoreState {
    /// Parses the file-level directive out of the supplied source.
    pub fn from_source(source: &str) -> Self {
        Self {
            ignore_all: source.lines().any(|line| line.contains(FILE_DIRECTIVE)),
        }
    }

    /// Returns `true` if a file-level ignore directive was encountered.
    pub fn ignores_everything(&self) -> bool {
        self.ignore_all
    }

    /// Returns `true` if the doc comment opts out of formatting itself.
    pub fn ignores_comment(&self, comment: &str) -> bool {
        self.ignore_all || comment.contains(DIRECTIVE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_directive_in_any_comment_style() {
        for source in [
            "<?php\n// phpdoc-fmt-ignore-file\n",
            "<?php\n/* phpdoc-fmt-ignore-file */\n",
            "<?php\n# phpdoc-fmt-ignore-file\n",
        ] {
            assert!(IgnoreState::from_source(source).ignores_everything());
        }
    }

    #[test]
    fn comment_directive_does_not_ignore_file() {
        let source = "<?php\n/**\n * phpdoc-fmt-ignore\n * @var int\n */\n$a = 1;\n";
        let state = IgnoreState::from_source(source);
        assert!(!state.ignores_everything());
        assert!(state.ignores_comment("/**\n * phpdoc-fmt-ignore\n * @var int\n */"));
        assert!(!state.ignores_comment("/** @var int */"));
    }

    #[test]
    fn ignored_file_ignores_every_comment() {
        let state = IgnoreState::from_source("// phpdoc-fmt-ignore-file");
        assert!(state.ignores_comment("/** @var int */"));
    }
}
