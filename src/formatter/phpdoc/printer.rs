use tracing::trace;

use super::type_printer::{WrapLevel, print_type};
use super::types::{CommentNode, TagNode, TypeNode};
use crate::formatter::config::FormatOptions;

/// Turns parsed comment nodes back into comment body lines.
///
/// Lines carry no comment markers or margin; `options.print_width` is the
/// width available to them.
pub struct CommentPrinter<'a> {
    options: &'a FormatOptions,
    lines: Vec<String>,
}

impl<'a> CommentPrinter<'a> {
    pub fn new(options: &'a FormatOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
        }
    }

    pub fn print(mut self, nodes: &[CommentNode]) -> Vec<String> {
        let mut after_prose = false;
        let mut separated = false;

        for node in nodes {
            match node {
                CommentNode::Text(content) => {
                    self.push_wrapped(content, None);
                    after_prose = !content.trim().is_empty();
                }
                CommentNode::Tag(tag) => {
                    match (&tag.parsed_type, &tag.parse_error) {
                        (Some(ty), _) => {
                            if after_prose && !separated {
                                self.lines.push(String::new());
                                separated = true;
                            }
                            self.print_typed_tag(tag, ty);
                        }
                        (None, Some(_)) => self.push_verbatim(tag),
                        (None, None) => {
                            let text = format!("{} {}", tag.tag, tag.description);
                            self.push_wrapped(&text, None);
                        }
                    }
                    after_prose = false;
                }
            }
        }

        collapse_blank_lines(self.lines)
    }

    fn print_typed_tag(&mut self, tag: &TagNode, ty: &TypeNode) {
        let width = self.options.print_width;
        let (first_word, remainder) = split_first_word(&tag.description);

        let single = print_type(ty, self.options, WrapLevel::Never).concat();
        let head = format!("{} {}", tag.tag, single);
        let min_line = match first_word {
            Some(word) => format!("{head} {word}"),
            None => head.clone(),
        };

        let mut type_lines = if self.options.display_width(&min_line) <= width {
            vec![head]
        } else {
            let lines = self.search_wrap_level(tag, ty);
            let mut type_lines = Vec::with_capacity(lines.len());
            let mut lines = lines.into_iter();
            if let Some(first) = lines.next() {
                type_lines.push(format!("{} {}", tag.tag, first));
            }
            type_lines.extend(lines);
            type_lines
        };

        let mut last = type_lines.pop().unwrap_or_default();
        if let Some(word) = first_word {
            last.push(' ');
            last.push_str(word);
        }
        self.lines.extend(type_lines);
        self.push_wrapped(remainder, Some(last));
    }

    /// Loosest level whose lines fit, falling back to the tightest.
    fn search_wrap_level(&self, tag: &TagNode, ty: &TypeNode) -> Vec<String> {
        let width = self.options.print_width;
        let mut level = WrapLevel::L1;
        loop {
            let lines = print_type(ty, self.options, level);
            let fits = lines.iter().enumerate().all(|(idx, line)| {
                let measured = if idx == 0 {
                    self.options.display_width(&tag.tag) + 1 + self.options.display_width(line)
                } else {
                    self.options.display_width(line)
                };
                measured <= width
            });

            match level.next() {
                Some(next) if !fits => level = next,
                _ => {
                    trace!(tag = %tag.tag, ?level, fits, "chose wrap level");
                    return lines;
                }
            }
        }
    }

    /// `@tag description` exactly as written.
    fn push_verbatim(&mut self, tag: &TagNode) {
        let text = format!("{} {}", tag.tag, tag.description);
        self.lines
            .extend(text.split('\n').map(|line| line.trim_end().to_string()));
    }

    /// Greedy word wrap, one paragraph per input line.
    ///
    /// `initial` seeds the first output line. Leading indentation of an
    /// input line is kept; words are never split. A word starting with `@`
    /// never opens a line, or it would read back as a tag.
    fn push_wrapped(&mut self, text: &str, initial: Option<String>) {
        let width = self.options.print_width;
        let mut initial = initial;

        for text_line in text.split('\n') {
            let mut line = initial.take().unwrap_or_default();
            if line.is_empty() {
                let indent_len = text_line.len() - text_line.trim_start().len();
                line.push_str(&text_line[..indent_len]);
            }

            for word in text_line.split_whitespace() {
                let has_content = !line.trim().is_empty();
                if has_content
                    && self.options.wrap_text
                    && !word.starts_with('@')
                    && self.options.display_width(&line) + 1 + self.options.display_width(word) > width
                {
                    self.lines.push(line.trim_end().to_string());
                    line = String::new();
                }
                if !line.trim().is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
            }

            self.lines.push(line.trim_end().to_string());
        }
    }
}

/// First word of the description's first line, and everything after it.
fn split_first_word(description: &str) -> (Option<&str>, &str) {
    let (first_line, other_lines) = match description.find('\n') {
        Some(idx) => (&description[..idx], &description[idx..]),
        None => (description, ""),
    };

    let trimmed = first_line.trim_start();
    if trimmed.is_empty() {
        return (None, description.trim_start_matches([' ', '\t']));
    }

    let word_len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let word = &trimmed[..word_len];
    let rest_of_line = trimmed[word_len..].trim_start();
    if rest_of_line.is_empty() {
        return (Some(word), other_lines);
    }

    let offset = description.len() - rest_of_line.len() - other_lines.len();
    (Some(word), &description[offset..])
}

fn collapse_blank_lines(lines: Vec<String>) -> Vec<String> {
    let mut collapsed: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && collapsed.last().is_some_and(|prev| prev.trim().is_empty()) {
            continue;
        }
        collapsed.push(if blank { String::new() } else { line });
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::phpdoc::parser::PhpDocParser;

    fn format(comment: &str, options: &FormatOptions) -> Vec<String> {
        CommentPrinter::new(options).print(&PhpDocParser::parse(comment))
    }

    fn width(print_width: usize) -> FormatOptions {
        FormatOptions {
            print_width,
            wrap_text: true,
            ..FormatOptions::default()
        }
    }

    #[test]
    fn splits_first_word() {
        assert_eq!(split_first_word("$param rest of it"), (Some("$param"), "rest of it"));
        assert_eq!(split_first_word("$param"), (Some("$param"), ""));
        assert_eq!(split_first_word("$param\nnext"), (Some("$param"), "\nnext"));
        assert_eq!(split_first_word("$a b\nnext"), (Some("$a"), "b\nnext"));
        assert_eq!(split_first_word(""), (None, ""));
        assert_eq!(split_first_word("\nnext"), (None, "\nnext"));
    }

    #[test]
    fn short_typed_tag_stays_on_one_line() {
        let lines = format("/** @param int|null $id The id */", &width(80));
        assert_eq!(lines, vec!["@param null | int $id The id"]);
    }

    #[test]
    fn wraps_dictionary_entries_to_fit() {
        let comment = "/**\n * @param array{title: string, description: string, body: string|bool} $param\n */";
        let lines = format(comment, &width(40));
        assert_eq!(
            lines,
            vec![
                "@param array{",
                "    title: string,",
                "    description: string,",
                "    body: string | bool",
                "} $param",
            ]
        );
        assert!(lines.iter().all(|line| line.len() <= 40));
    }

    #[test]
    fn wraps_description_after_type() {
        let comment = "/** @param int $count Number of items that will be fetched from the remote store */";
        let lines = format(comment, &width(40));
        assert_eq!(
            lines,
            vec![
                "@param int $count Number of items that",
                "will be fetched from the remote store",
            ]
        );
    }

    #[test]
    fn wraps_prose_greedily() {
        let comment = "/**\n * The quick brown fox jumps over the lazy dog\n */";
        let lines = format(comment, &width(20));
        assert_eq!(lines, vec!["The quick brown fox", "jumps over the lazy", "dog"]);
    }

    #[test]
    fn long_words_get_their_own_line() {
        let comment = "/** See https://example.com/a/very/long/path/to/docs for more */";
        let lines = format(comment, &width(20));
        assert_eq!(
            lines,
            vec!["See", "https://example.com/a/very/long/path/to/docs", "for more"]
        );
    }

    #[test]
    fn leaves_prose_alone_without_wrap_text() {
        let options = FormatOptions {
            print_width: 20,
            ..FormatOptions::default()
        };
        let comment = "/**\n * The quick brown fox jumps over the lazy dog\n */";
        assert_eq!(
            format(comment, &options),
            vec!["The quick brown fox jumps over the lazy dog"]
        );
    }

    #[test]
    fn at_words_stay_on_the_previous_line() {
        let options = width(22);
        let first = format("/** @param int $x Forward @var int|string */", &options);
        assert_eq!(first, vec!["@param int $x Forward @var", "int|string"]);

        let rebuilt = format!("/**\n * {}\n */", first.join("\n * "));
        assert_eq!(format(&rebuilt, &options), first);
    }

    #[test]
    fn separates_prose_from_typed_tags_once() {
        let comment = "/**\n * Summary line.\n * @param int $a\n * @param int $b\n */";
        let lines = format(comment, &width(80));
        assert_eq!(lines, vec!["Summary line.", "", "@param int $a", "@param int $b"]);
    }

    #[test]
    fn collapses_duplicate_blank_lines() {
        let comment = "/**\n * Summary line.\n *\n *\n * @return int\n */";
        let lines = format(comment, &width(80));
        assert_eq!(lines, vec!["Summary line.", "", "@return int"]);
    }

    #[test]
    fn unparseable_type_is_kept_verbatim() {
        let comment = "/**\n * @param array<int   $broken  keep   spacing\n * @param  int|string $ok\n */";
        let lines = format(comment, &width(80));
        assert_eq!(
            lines,
            vec![
                "@param array<int   $broken  keep   spacing",
                "@param int | string $ok",
            ]
        );
    }

    #[test]
    fn untyped_tags_are_wrapped_as_text() {
        let comment = "/** @deprecated 3.0.0 Use processUserDataV2() instead */";
        let lines = format(comment, &width(30));
        assert_eq!(lines, vec!["@deprecated 3.0.0 Use", "processUserDataV2() instead"]);
    }

    #[test]
    fn description_on_following_line_keeps_its_line() {
        let comment = "/**\n * @return int\n *     The number of rows\n */";
        let lines = format(comment, &width(80));
        assert_eq!(lines, vec!["@return int", "    The number of rows"]);
    }

    #[test]
    fn formatting_is_idempotent() {
        let comment = "/**\n * Processes things.\n * @param array{title: string, description: string, body: string|bool} $param The payload to process\n * @throws InvalidArgumentException If X\n * is invalid\n */";
        let options = width(40);
        let first = format(comment, &options);

        let rebuilt = format!(
            "/**\n{}\n */",
            first
                .iter()
                .map(|line| format!(" * {line}").trim_end().to_string())
                .collect::<Vec<_>>()
                .join("\n")
        );
        assert_eq!(format(&rebuilt, &options), first);
    }
}
