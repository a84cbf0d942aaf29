use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

const CONFIG_CANDIDATES: [&str; 2] = ["phpdoc_fmt.yaml", "phpdoc_fmt.yml"];

/// Formatting options shared by the comment core and the file driver.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatOptions {
    /// Maximum rendered line length.
    pub print_width: usize,
    /// Overrides `print_width` for doc comments only.
    pub phpdoc_print_width: Option<usize>,
    /// Columns a tab counts for when measuring.
    pub tab_width: usize,
    pub use_tabs: bool,
    /// Explicit indentation unit, wins over `use_tabs`/`tab_width`.
    pub indent: Option<String>,
    /// Word-wrap prose and descriptions at the print width.
    pub wrap_text: bool,
    /// Print `?T` as `null | T`.
    pub expand_null: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            print_width: 80,
            phpdoc_print_width: None,
            tab_width: 4,
            use_tabs: false,
            indent: None,
            wrap_text: false,
            expand_null: false,
        }
    }
}

impl FormatOptions {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let options = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(options)
    }

    pub fn find_config(path: Option<PathBuf>, root: &Path) -> Option<PathBuf> {
        if let Some(path) = path {
            return Some(path);
        }

        CONFIG_CANDIDATES
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|candidate| candidate.is_file())
    }

    /// Width available to doc comments before indentation is subtracted.
    pub fn doc_width(&self) -> usize {
        self.phpdoc_print_width.unwrap_or(self.print_width)
    }

    /// One level of indentation inside a wrapped type.
    pub fn indent_unit(&self) -> String {
        match &self.indent {
            Some(indent) => indent.clone(),
            None if self.use_tabs => "\t".to_string(),
            None => " ".repeat(self.tab_width),
        }
    }

    /// Copy of these options with a different print width.
    pub fn with_print_width(&self, print_width: usize) -> Self {
        Self {
            print_width,
            ..self.clone()
        }
    }

    /// Length of `text` with tabs expanded to `tab_width` columns.
    pub fn display_width(&self, text: &str) -> usize {
        text.chars()
            .map(|c| if c == '\t' { self.tab_width } else { 1 })
            .sum()
    }
}
