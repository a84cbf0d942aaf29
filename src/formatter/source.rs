//! Doc comments inside a parsed PHP file and their rendered replacements.

use tree_sitter::{Node, Point};

use super::config::FormatOptions;
use super::parser::ParsedSource;
use super::phpdoc::{CommentNode, CommentPrinter, PhpDocParser, TypeParseError};

const COMMENT_START: &str = "/**";
const COMMENT_END: &str = "*/";
const LINE_PREFIX: &str = " * ";

/// A `/** ... */` comment located in a source file.
#[derive(Debug, Clone)]
pub struct DocComment<'a> {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start: Point,
    pub text: &'a str,
    /// Whitespace to repeat in front of each continuation line
    pub indent: String,
}

/// Replacement text for a doc comment.
#[derive(Debug, Clone)]
pub struct FormattedComment {
    pub text: String,
    /// Typed tags whose type was left unformatted, with the reason
    pub type_errors: Vec<(String, TypeParseError)>,
}

/// Collect every doc comment of the file in source order.
pub fn collect_doc_comments(parsed: &ParsedSource) -> Vec<DocComment<'_>> {
    let mut comments = Vec::new();
    visit(parsed.tree.root_node(), parsed.source.as_str(), &mut comments);
    comments
}

fn visit<'a>(node: Node, source: &'a str, comments: &mut Vec<DocComment<'a>>) {
    if node.kind() == "comment" {
        if let Some(comment) = doc_comment(node, source) {
            comments.push(comment);
        }
        return;
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            visit(cursor.node(), source, comments);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

fn doc_comment<'a>(node: Node, source: &'a str) -> Option<DocComment<'a>> {
    let start_byte = node.start_byte();
    let end_byte = node.end_byte();
    let text = source.get(start_byte..end_byte)?;
    if !text.starts_with(COMMENT_START) {
        return None;
    }

    let line_start = source[..start_byte].rfind('\n').map_or(0, |idx| idx + 1);
    let prefix = &source[line_start..start_byte];
    let indent = if prefix.chars().all(char::is_whitespace) {
        prefix.to_string()
    } else {
        " ".repeat(prefix.chars().count())
    };

    Some(DocComment {
        start_byte,
        end_byte,
        start: node.start_position(),
        text,
        indent,
    })
}

/// Reformat one doc comment. `None` when there is nothing to print.
pub fn format_doc_comment(comment: &DocComment, options: &FormatOptions) -> Option<FormattedComment> {
    let nodes = PhpDocParser::parse(comment.text);
    let type_errors = nodes
        .iter()
        .filter_map(|node| match node {
            CommentNode::Tag(tag) => tag
                .parse_error
                .as_ref()
                .map(|err| (tag.tag.clone(), err.clone())),
            CommentNode::Text(_) => None,
        })
        .collect();

    let indent_width = options.display_width(&comment.indent);
    let width = options
        .doc_width()
        .saturating_sub(indent_width + LINE_PREFIX.len())
        .max(1);
    let lines = CommentPrinter::new(&options.with_print_width(width)).print(&nodes);
    if lines.is_empty() {
        return None;
    }

    Some(FormattedComment {
        text: render(&lines, comment, options),
        type_errors,
    })
}

fn render(lines: &[String], comment: &DocComment, options: &FormatOptions) -> String {
    let was_multiline = comment.text.contains('\n');
    if let [line] = lines {
        let single = format!("{COMMENT_START} {line} {COMMENT_END}");
        let fits = options.display_width(&comment.indent) + options.display_width(&single)
            <= options.doc_width();
        if !was_multiline && fits {
            return single;
        }
    }

    let mut text = String::from(COMMENT_START);
    for line in lines {
        text.push('\n');
        text.push_str(&comment.indent);
        text.push_str(format!("{LINE_PREFIX}{line}").trim_end());
    }
    text.push('\n');
    text.push_str(&comment.indent);
    text.push(' ');
    text.push_str(COMMENT_END);
    text
}
