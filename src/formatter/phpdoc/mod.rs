pub mod parser;
pub mod printer;
pub mod type_parser;
pub mod type_printer;
pub mod types;

pub use parser::{PhpDocParser, TAGS_WITH_TYPES};
pub use printer::CommentPrinter;
pub use type_parser::{ParsedType, TypeParseError, parse_type};
pub use type_printer::{WrapLevel, print_type};
pub use types::{
    CallableParameter, CommentNode, ListKind, Quote, TagNode, TupleDictEntry, TypeNode,
};

use crate::formatter::config::FormatOptions;

/// Reformat a raw doc comment into body lines no wider than
/// `options.print_width` where possible.
pub fn format_comment(comment: &str, options: &FormatOptions) -> Vec<String> {
    let nodes = PhpDocParser::parse(comment);
    CommentPrinter::new(options).print(&nodes)
}
