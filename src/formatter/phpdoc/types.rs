use std::fmt;

use super::type_parser::TypeParseError;

/// A type expression parsed out of a PHPDoc tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// Nullable shorthand: ?Type
    Maybe(Box<TypeNode>),

    /// Identifier, scalar or keyword: int, \Foo\Bar, positive-int, $this
    SimpleValue(String),

    /// Generic type: Collection<int, User>
    WithGenerics {
        node: Box<TypeNode>,
        generics: Vec<TypeNode>,
    },

    /// Class constant access: Foo::BAR, self::STATUS_*
    StaticAccess {
        class: Box<TypeNode>,
        member: Box<TypeNode>,
    },

    /// Shaped array: array{name: string, age?: int} or array{int, string}
    TupleDict(Vec<TupleDictEntry>),

    /// Keyed array: array<string, int>
    Record {
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },

    /// Single-argument array or list: array<User>, list<int>
    ArrayList { inner: Box<TypeNode>, name: ListKind },

    /// Array shorthand: User[]
    ArraySquareBracket(Box<TypeNode>),

    /// Union type: int|string|null
    Union(Vec<TypeNode>),

    /// Callable signature: callable(int, string $name): bool
    Callable {
        node: Box<TypeNode>,
        parameters: Vec<CallableParameter>,
        return_type: Box<TypeNode>,
    },

    /// Literal string type: 'asc' or "desc"
    StringLiteral { value: String, quote: Quote },

    /// Grouping: (int|string)[]
    Parentheses(Box<TypeNode>),

    /// Conditional return type: $x is int ? string : bool
    Conditional {
        check: Box<TypeNode>,
        extends: Box<TypeNode>,
        true_type: Box<TypeNode>,
        false_type: Box<TypeNode>,
    },

    /// Bare `...` placeholder
    Spread,

    /// Qualified generic argument: covariant TValue
    ModifierKeyword {
        modifier: Box<TypeNode>,
        target: Box<TypeNode>,
    },
}

impl TypeNode {
    pub fn simple(value: impl Into<String>) -> Self {
        TypeNode::SimpleValue(value.into())
    }

    /// Check if this node is the `null` keyword
    pub fn is_null(&self) -> bool {
        matches!(self, TypeNode::SimpleValue(value) if value.eq_ignore_ascii_case("null"))
    }
}

impl fmt::Display for TypeNode {
    /// Single-line rendering with default options.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = crate::formatter::config::FormatOptions::default();
        let lines = super::type_printer::print_type(
            self,
            &options,
            super::type_printer::WrapLevel::Never,
        );
        f.write_str(&lines.concat())
    }
}

/// One entry of an `array{...}` shape. Positional entries have no key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDictEntry {
    pub key: Option<TypeNode>,
    pub value: TypeNode,
    pub optional: bool,
}

impl TupleDictEntry {
    pub fn keyed(key: TypeNode, value: TypeNode, optional: bool) -> Self {
        Self {
            key: Some(key),
            value,
            optional,
        }
    }

    pub fn positional(value: TypeNode) -> Self {
        Self {
            key: None,
            value,
            optional: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Array,
    List,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Array => "array",
            ListKind::List => "list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl Quote {
    pub fn as_char(self) -> char {
        match self {
            Quote::Single => '\'',
            Quote::Double => '"',
        }
    }
}

/// A callable parameter, optionally named: `int $count`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableParameter {
    pub ty: TypeNode,
    pub name: Option<String>,
}

/// A line of a doc comment after tokenization.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentNode {
    /// Free prose
    Text(String),
    /// `@name description`
    Tag(TagNode),
}

/// A tag line together with its continuation lines.
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    /// Tag name including the leading `@`
    pub tag: String,
    /// Raw description, or the text after the type once `parsed_type` is set
    pub description: String,
    pub parsed_type: Option<TypeNode>,
    /// Set when this is a typed tag whose type failed to parse
    pub parse_error: Option<TypeParseError>,
}

impl TagNode {
    pub fn new(tag: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            description: description.into(),
            parsed_type: None,
            parse_error: None,
        }
    }

    /// Tag name without the leading `@`
    pub fn name(&self) -> &str {
        self.tag.strip_prefix('@').unwrap_or(&self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_detection_ignores_case() {
        assert!(TypeNode::simple("null").is_null());
        assert!(TypeNode::simple("NULL").is_null());
        assert!(!TypeNode::simple("nullable").is_null());
    }

    #[test]
    fn tag_name_strips_marker() {
        let tag = TagNode::new("@phpstan-param", "int $x");
        assert_eq!(tag.name(), "phpstan-param");
    }
}
