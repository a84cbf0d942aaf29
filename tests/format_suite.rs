use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pretty_assertions::assert_eq;

use phpdoc_fmt::formatter::config::FormatOptions;
use phpdoc_fmt::formatter::parser::TreeSitterPhpParser;
use phpdoc_fmt::formatter::test_config::TestConfig;
use phpdoc_fmt::formatter::{Formatter, collect_php_files};

const FIXTURE_DIR: &str = "tests/fixtures";

fn format_fixture(parser: &mut TreeSitterPhpParser, path: &Path, source: String) -> Result<String> {
    let options = TestConfig::from_source(&source).apply(&FormatOptions::default());
    let report = Formatter::new(options).format_source(parser, path, source)?;
    Ok(report.formatted)
}

fn expectation_for(php_file: &Path) -> PathBuf {
    php_file.with_extension("expect")
}

#[test]
fn fixtures_match_expectations() -> Result<()> {
    let mut parser = TreeSitterPhpParser::new()?;
    let php_files = collect_php_files(Path::new(FIXTURE_DIR))?;
    assert!(!php_files.is_empty(), "no fixtures found in {FIXTURE_DIR}");

    for php_file in php_files {
        let expectation = expectation_for(&php_file);
        let source = fs::read_to_string(&php_file)
            .with_context(|| format!("failed to read {}", php_file.display()))?;
        let expected = fs::read_to_string(&expectation)
            .with_context(|| format!("failed to read {}", expectation.display()))?;

        let formatted = format_fixture(&mut parser, &php_file, source)?;
        assert_eq!(
            expected,
            formatted,
            "Formatted output for {} diverged from expectations",
            php_file.display()
        );
    }

    Ok(())
}
