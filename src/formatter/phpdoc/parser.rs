use tracing::debug;

use super::type_parser::parse_type;
use super::types::{CommentNode, TagNode};

/// Tags whose description starts with a type expression.
pub const TAGS_WITH_TYPES: [&str; 15] = [
    "method",
    "param",
    "property",
    "property-read",
    "property-write",
    "return",
    "type",
    "throws",
    "var",
    "phpstan-param",
    "phpstan-return",
    "phpstan-var",
    "psalm-param",
    "psalm-return",
    "psalm-var",
];

pub struct PhpDocParser;

impl PhpDocParser {
    /// Tokenize a doc comment and parse the type of every typed tag.
    ///
    /// A type that fails to parse leaves the tag's description untouched
    /// and records the error on the tag.
    pub fn parse(comment: &str) -> Vec<CommentNode> {
        let mut nodes = Self::tokenize(comment);
        for node in &mut nodes {
            if let CommentNode::Tag(tag) = node {
                Self::parse_tag_type(tag);
            }
        }
        nodes
    }

    /// Split a raw comment (delimiters included) into text and tag nodes.
    ///
    /// Lines following a tag belong to that tag until the next tag starts.
    pub fn tokenize(comment: &str) -> Vec<CommentNode> {
        let mut nodes: Vec<CommentNode> = Vec::new();

        for line in Self::extract_lines(comment) {
            if let Some((tag, description)) = Self::split_tag(&line) {
                nodes.push(CommentNode::Tag(TagNode::new(tag, description)));
                continue;
            }

            match nodes.last_mut() {
                Some(CommentNode::Tag(tag)) => {
                    tag.description.push('\n');
                    tag.description.push_str(&line);
                }
                _ => nodes.push(CommentNode::Text(line)),
            }
        }

        nodes
    }

    /// Strip delimiters and margins, returning the body lines.
    fn extract_lines(comment: &str) -> Vec<String> {
        let body = comment.trim();
        let body = body
            .strip_prefix("/**")
            .or_else(|| body.strip_prefix("/*"))
            .unwrap_or(body);
        let body = body.strip_suffix("*/").unwrap_or(body);

        let lines: Vec<String> = body
            .lines()
            .map(|line| {
                let line = Self::strip_margin(line);
                let line = line.strip_prefix(' ').unwrap_or(line);
                line.trim_end().to_string()
            })
            .collect();

        let Some(first) = lines.iter().position(|line| !line.trim().is_empty()) else {
            return Vec::new();
        };
        let last = lines
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .unwrap_or(first);

        lines[first..=last].to_vec()
    }

    /// Drop a leading run of `*` (and the whitespace before it).
    fn strip_margin(line: &str) -> &str {
        let trimmed = line.trim_start();
        if trimmed.starts_with('*') {
            trimmed.trim_start_matches('*')
        } else {
            line
        }
    }

    fn split_tag(line: &str) -> Option<(&str, &str)> {
        let line = line.trim();
        if !line.starts_with('@') {
            return None;
        }

        match line.split_once(char::is_whitespace) {
            Some((tag, description)) => Some((tag, description.trim_start())),
            None => Some((line, "")),
        }
    }

    fn parse_tag_type(tag: &mut TagNode) {
        if !TAGS_WITH_TYPES.contains(&tag.name()) {
            return;
        }

        match parse_type(&tag.description, &tag.tag) {
            Ok(parsed) => {
                let rest = parsed.rest.to_string();
                tag.parsed_type = Some(parsed.node);
                tag.description = rest;
            }
            Err(err) => {
                debug!(tag = %tag.tag, error = %err, "leaving tag type unformatted");
                tag.parse_error = Some(err);
            }
        }
    }
}
