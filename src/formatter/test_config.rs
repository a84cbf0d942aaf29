use super::config::FormatOptions;

const DIRECTIVE: &str = "// phpdoc-fmt-test:";

/// Option overrides parsed from special comments at the top of fixture files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConfig {
    pub print_width: Option<usize>,
    pub phpdoc_print_width: Option<usize>,
    pub tab_width: Option<usize>,
    pub use_tabs: Option<bool>,
    pub wrap_text: Option<bool>,
    pub expand_null: Option<bool>,
}

impl TestConfig {
    /// Parse test configuration from source code
    ///
    /// Looks for special comments like:
    /// // phpdoc-fmt-test: print_width=40 wrap_text=true
    pub fn from_source(source: &str) -> Self {
        let mut config = TestConfig::default();

        // Only check first 20 lines
        for line in source.lines().take(20) {
            if let Some(directive) = line.trim().strip_prefix(DIRECTIVE) {
                for setting in directive.split_whitespace() {
                    config.apply_setting(setting);
                }
            }
        }

        config
    }

    fn apply_setting(&mut self, setting: &str) {
        let Some((key, value)) = setting.split_once('=') else {
            return;
        };

        match key {
            "print_width" => self.print_width = value.parse().ok(),
            "phpdoc_print_width" => self.phpdoc_print_width = value.parse().ok(),
            "tab_width" => self.tab_width = value.parse().ok(),
            "use_tabs" => self.use_tabs = value.parse().ok(),
            "wrap_text" => self.wrap_text = value.parse().ok(),
            "expand_null" => self.expand_null = value.parse().ok(),
            _ => {}
        }
    }

    /// Layer these overrides on top of `base`.
    pub fn apply(&self, base: &FormatOptions) -> FormatOptions {
        let mut options = base.clone();
        if let Some(print_width) = self.print_width {
            options.print_width = print_width;
        }
        if self.phpdoc_print_width.is_some() {
            options.phpdoc_print_width = self.phpdoc_print_width;
        }
        if let Some(tab_width) = self.tab_width {
            options.tab_width = tab_width;
        }
        if let Some(use_tabs) = self.use_tabs {
            options.use_tabs = use_tabs;
        }
        if let Some(wrap_text) = self.wrap_text {
            options.wrap_text = wrap_text;
        }
        if let Some(expand_null) = self.expand_null {
            options.expand_null = expand_null;
        }
        options
    }

    /// Check if this is a test file (has test config directives)
    pub fn is_test_file(&self) -> bool {
        *self != TestConfig::default()
    }
}
