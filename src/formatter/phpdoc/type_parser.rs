use thiserror::Error;

use super::types::{CallableParameter, ListKind, Quote, TupleDictEntry, TypeNode};

const EXCERPT_LEN: usize = 25;

/// Failure to parse the type at the start of a tag description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeParseError {
    #[error("unexpected token at offset {offset} at {path}: {excerpt}")]
    UnexpectedToken {
        offset: usize,
        path: String,
        excerpt: String,
    },

    #[error("expected {expected} at offset {offset} at {path}: {excerpt}")]
    ExpectedToken {
        expected: String,
        offset: usize,
        path: String,
        excerpt: String,
    },

    #[error("unterminated string literal at offset {offset} at {path}: {excerpt}")]
    UnterminatedStringLiteral {
        offset: usize,
        path: String,
        excerpt: String,
    },
}

/// Result of parsing a type off the front of a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType<'a> {
    pub node: TypeNode,
    /// Text after the type, without leading spaces or tabs
    pub rest: &'a str,
}

/// Parse the type expression at the start of `text`.
///
/// `location` only labels error paths, e.g. the tag the text came from.
pub fn parse_type<'a>(text: &'a str, location: &'a str) -> Result<ParsedType<'a>, TypeParseError> {
    let mut parser = TypeParser::new(text, location);
    let node = parser.parse_type(true)?;
    let rest = text[parser.end..].trim_start_matches([' ', '\t']);
    Ok(ParsedType { node, rest })
}

/// Recursive descent parser over PHPDoc type syntax.
///
/// Whitespace is skipped before every token. `pos` moves past skipped
/// whitespace while `end` only moves past consumed tokens, so the text
/// following the type keeps its own layout.
struct TypeParser<'a> {
    text: &'a str,
    pos: usize,
    end: usize,
    path: Vec<&'a str>,
}

impl<'a> TypeParser<'a> {
    fn new(text: &'a str, location: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            end: 0,
            path: vec![location],
        }
    }

    fn parse_type(&mut self, consume_union: bool) -> Result<TypeNode, TypeParseError> {
        let mut node = if self.eat("?") {
            TypeNode::Maybe(Box::new(self.nested("maybe", false)?))
        } else {
            let mut node = self.parse_primary()?;
            if self.eat("(") {
                node = self.parse_callable(node, consume_union)?;
            }
            while self.eat("[") {
                self.expect("]")?;
                node = TypeNode::ArraySquareBracket(Box::new(node));
            }
            node
        };

        if consume_union && self.peek("|") {
            let mut types = vec![node];
            while self.eat("|") {
                types.push(self.nested("union", false)?);
            }
            node = TypeNode::Union(types);
        }

        // `is` at the top level of a tag is just the start of the description.
        if consume_union && !self.is_outermost() && self.eat_keyword("is") {
            let extends = self.nested("conditional", true)?;
            self.expect("?")?;
            let true_type = self.nested("conditional-true", true)?;
            self.expect(":")?;
            let false_type = self.nested("conditional-false", true)?;
            node = TypeNode::Conditional {
                check: Box::new(node),
                extends: Box::new(extends),
                true_type: Box::new(true_type),
                false_type: Box::new(false_type),
            };
        }

        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<TypeNode, TypeParseError> {
        if self.eat("...") {
            return Ok(TypeNode::Spread);
        }

        if self.eat("(") {
            let inner = self.nested("parentheses", true)?;
            self.expect(")")?;
            return Ok(TypeNode::Parentheses(Box::new(inner)));
        }

        if self.peek("'") {
            return self.parse_string_literal(Quote::Single);
        }
        if self.peek("\"") {
            return self.parse_string_literal(Quote::Double);
        }

        let Some(ident) = self.eat_identifier() else {
            return Err(self.unexpected());
        };

        match ident {
            "array" if self.eat("{") => return self.parse_tuple_dict(),
            "array" if self.eat("<") => return self.parse_array_generic(),
            "list" if self.eat("<") => {
                let inner = self.nested("list", true)?;
                self.expect(">")?;
                return Ok(TypeNode::ArrayList {
                    inner: Box::new(inner),
                    name: ListKind::List,
                });
            }
            _ => {}
        }

        let mut node = TypeNode::simple(ident);
        if self.eat("<") {
            node = TypeNode::WithGenerics {
                node: Box::new(node),
                generics: self.parse_generics()?,
            };
        }

        if self.eat("::") {
            let member = self.nested("static-access", false)?;
            node = TypeNode::StaticAccess {
                class: Box::new(node),
                member: Box::new(member),
            };
        }

        Ok(node)
    }

    /// `array{...}` after the opening brace.
    fn parse_tuple_dict(&mut self) -> Result<TypeNode, TypeParseError> {
        let mut entries = Vec::new();
        while !self.eat("}") {
            let first = self.nested("array-entry", true)?;
            let optional = self.eat("?");
            if optional || self.peek(":") {
                self.expect(":")?;
                let value = self.nested("array-value", true)?;
                entries.push(TupleDictEntry::keyed(first, value, optional));
            } else {
                entries.push(TupleDictEntry::positional(first));
            }

            if !self.eat(",") {
                self.expect("}")?;
                break;
            }
        }
        Ok(TypeNode::TupleDict(entries))
    }

    /// `array<...>` after the opening angle bracket.
    fn parse_array_generic(&mut self) -> Result<TypeNode, TypeParseError> {
        let first = self.nested("array-generic", true)?;
        if self.eat(",") {
            let value = self.nested("array-generic-value", true)?;
            self.expect(">")?;
            Ok(TypeNode::Record {
                key: Box::new(first),
                value: Box::new(value),
            })
        } else {
            self.expect(">")?;
            Ok(TypeNode::ArrayList {
                inner: Box::new(first),
                name: ListKind::Array,
            })
        }
    }

    /// Generic arguments after `<`, up to and including `>`.
    fn parse_generics(&mut self) -> Result<Vec<TypeNode>, TypeParseError> {
        let mut generics = Vec::new();
        loop {
            let mut generic = self.nested("generic", true)?;
            if matches!(generic, TypeNode::SimpleValue(_)) && !self.peek(",") && !self.peek(">") {
                let target = self.nested("generic", true)?;
                generic = TypeNode::ModifierKeyword {
                    modifier: Box::new(generic),
                    target: Box::new(target),
                };
            }
            generics.push(generic);

            if self.eat(",") {
                if self.eat(">") {
                    break;
                }
                continue;
            }
            self.expect(">")?;
            break;
        }
        Ok(generics)
    }

    /// Parameter list after `(`, then `: ReturnType`.
    fn parse_callable(
        &mut self,
        node: TypeNode,
        consume_union: bool,
    ) -> Result<TypeNode, TypeParseError> {
        let mut parameters = Vec::new();
        while !self.eat(")") {
            let ty = self.nested("parameters", true)?;
            let name = self.eat_parameter_name().map(str::to_string);
            parameters.push(CallableParameter { ty, name });

            if !self.eat(",") {
                self.expect(")")?;
                break;
            }
        }

        self.expect(":")?;
        let return_type = self.nested("return-type", consume_union)?;
        Ok(TypeNode::Callable {
            node: Box::new(node),
            parameters,
            return_type: Box::new(return_type),
        })
    }

    fn parse_string_literal(&mut self, quote: Quote) -> Result<TypeNode, TypeParseError> {
        let text = self.text;
        let start = self.pos;
        let body = &text[start + 1..];
        let mut escaped = false;
        for (idx, ch) in body.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            if ch == '\\' {
                escaped = true;
            } else if ch == quote.as_char() {
                let value = body[..idx].to_string();
                self.advance(idx + 2);
                return Ok(TypeNode::StringLiteral { value, quote });
            }
        }

        Err(TypeParseError::UnterminatedStringLiteral {
            offset: start,
            path: self.path_label(),
            excerpt: self.excerpt(),
        })
    }

    fn nested(&mut self, rule: &'static str, consume_union: bool) -> Result<TypeNode, TypeParseError> {
        self.path.push(rule);
        let result = self.parse_type(consume_union);
        self.path.pop();
        result
    }

    /// Top level of the tag. The return type of a top-level callable is
    /// still the top level: whatever follows it is description.
    fn is_outermost(&self) -> bool {
        self.path[1..].iter().all(|rule| *rule == "return-type")
    }

    fn skip_whitespace(&mut self) {
        let skipped = self.text[self.pos..]
            .bytes()
            .take_while(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
            .count();
        self.pos += skipped;
    }

    fn advance(&mut self, len: usize) {
        self.pos += len;
        self.end = self.pos;
    }

    fn peek(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        self.text[self.pos..].starts_with(token)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.peek(token) {
            self.advance(token.len());
            true
        } else {
            false
        }
    }

    /// Like `eat`, but the keyword must not run into an identifier.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if !self.peek(keyword) {
            return false;
        }
        let next = self.text.as_bytes().get(self.pos + keyword.len()).copied();
        if next.is_some_and(is_identifier_byte) {
            return false;
        }
        self.advance(keyword.len());
        true
    }

    fn expect(&mut self, token: &str) -> Result<(), TypeParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(TypeParseError::ExpectedToken {
                expected: token.to_string(),
                offset: self.pos,
                path: self.path_label(),
                excerpt: self.excerpt(),
            })
        }
    }

    /// Identifier with an optional `$` or `&$` prefix.
    fn eat_identifier(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let text = self.text;
        let rest = &text[self.pos..];
        let prefix = if rest.starts_with("&$") {
            2
        } else if rest.starts_with('$') {
            1
        } else {
            0
        };
        let len = rest.as_bytes()[prefix..]
            .iter()
            .take_while(|b| is_identifier_byte(**b))
            .count();
        if len == 0 {
            return None;
        }

        let ident = &rest[..prefix + len];
        self.advance(prefix + len);
        Some(ident)
    }

    /// `$name`, `&$name` or `...$name` following a callable parameter type.
    fn eat_parameter_name(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let text = self.text;
        let rest = &text[self.pos..];
        let prefix = ["&...$", "...$", "&$", "$"]
            .iter()
            .find(|prefix| rest.starts_with(**prefix))?
            .len();
        let len = rest.as_bytes()[prefix..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_' || **b >= 0x80)
            .count();
        if len == 0 {
            return None;
        }

        let name = &rest[..prefix + len];
        self.advance(prefix + len);
        Some(name)
    }

    fn unexpected(&self) -> TypeParseError {
        TypeParseError::UnexpectedToken {
            offset: self.pos,
            path: self.path_label(),
            excerpt: self.excerpt(),
        }
    }

    fn path_label(&self) -> String {
        self.path.join(".")
    }

    fn excerpt(&self) -> String {
        let excerpt: String = self.text[self.pos..].chars().take(EXCERPT_LEN).collect();
        if excerpt.is_empty() {
            "<eol>".to_string()
        } else {
            excerpt
        }
    }
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'\\' | b'-' | b'_' | b'*') || byte >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> TypeNode {
        parse_type(text, "test").unwrap().node
    }

    fn simple(value: &str) -> TypeNode {
        TypeNode::simple(value)
    }

    #[test]
    fn parses_simple_type_and_rest() {
        let parsed = parse_type("int $value Some description", "@param").unwrap();
        assert_eq!(parsed.node, simple("int"));
        assert_eq!(parsed.rest, "$value Some description");
    }

    #[test]
    fn parses_record_with_tuple_value() {
        let node = parse("array<string, array{bool, ?int}>");
        assert_eq!(
            node,
            TypeNode::Record {
                key: Box::new(simple("string")),
                value: Box::new(TypeNode::TupleDict(vec![
                    TupleDictEntry::positional(simple("bool")),
                    TupleDictEntry::positional(TypeNode::Maybe(Box::new(simple("int")))),
                ])),
            }
        );
    }

    #[test]
    fn parses_dictionary_with_optional_keys() {
        let node = parse("array{title: string, body?: string|bool,}");
        let TypeNode::TupleDict(entries) = node else {
            panic!("expected tuple dict, got {node:?}");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, Some(simple("title")));
        assert!(!entries[0].optional);
        assert!(entries[1].optional);
        assert_eq!(
            entries[1].value,
            TypeNode::Union(vec![simple("string"), simple("bool")])
        );
    }

    #[test]
    fn parses_bare_array_and_list() {
        let parsed = parse_type("array of things", "@return").unwrap();
        assert_eq!(parsed.node, simple("array"));
        assert_eq!(parsed.rest, "of things");

        assert_eq!(parse("list"), simple("list"));
        assert_eq!(
            parse("list<int>"),
            TypeNode::ArrayList {
                inner: Box::new(simple("int")),
                name: ListKind::List,
            }
        );
        assert_eq!(parse("array-key"), simple("array-key"));
    }

    #[test]
    fn flattens_unions() {
        assert_eq!(
            parse("int|string|null"),
            TypeNode::Union(vec![simple("int"), simple("string"), simple("null")])
        );
    }

    #[test]
    fn nullable_prefix_binds_tighter_than_union() {
        assert_eq!(
            parse("?int|string"),
            TypeNode::Union(vec![TypeNode::Maybe(Box::new(simple("int"))), simple("string")])
        );
    }

    #[test]
    fn parses_callable_with_named_parameters() {
        let node = parse("callable(int, string &$name): bool");
        assert_eq!(
            node,
            TypeNode::Callable {
                node: Box::new(simple("callable")),
                parameters: vec![
                    CallableParameter {
                        ty: simple("int"),
                        name: None,
                    },
                    CallableParameter {
                        ty: simple("string"),
                        name: Some("&$name".to_string()),
                    },
                ],
                return_type: Box::new(simple("bool")),
            }
        );
    }

    #[test]
    fn callable_return_type_takes_trailing_union() {
        let node = parse("Closure(): int|string");
        let TypeNode::Callable { return_type, .. } = node else {
            panic!("expected callable");
        };
        assert_eq!(*return_type, TypeNode::Union(vec![simple("int"), simple("string")]));
    }

    #[test]
    fn top_level_callable_return_is_not_conditional() {
        let parsed = parse_type("callable(): void is invoked later", "@return").unwrap();
        assert!(matches!(parsed.node, TypeNode::Callable { .. }));
        assert_eq!(parsed.rest, "is invoked later");

        let nested = parse("(callable(): $x is int ? A : B)");
        let TypeNode::Parentheses(inner) = nested else {
            panic!("expected parentheses");
        };
        let TypeNode::Callable { return_type, .. } = *inner else {
            panic!("expected callable");
        };
        assert!(matches!(*return_type, TypeNode::Conditional { .. }));
    }

    #[test]
    fn untyped_variadic_parameter() {
        let node = parse("callable(...$args): void");
        let TypeNode::Callable { parameters, .. } = node else {
            panic!("expected callable");
        };
        assert_eq!(parameters[0].ty, TypeNode::Spread);
        assert_eq!(parameters[0].name.as_deref(), Some("$args"));
    }

    #[test]
    fn parses_generics_with_modifier_keyword() {
        let node = parse("Collection<covariant TValue, int>");
        assert_eq!(
            node,
            TypeNode::WithGenerics {
                node: Box::new(simple("Collection")),
                generics: vec![
                    TypeNode::ModifierKeyword {
                        modifier: Box::new(simple("covariant")),
                        target: Box::new(simple("TValue")),
                    },
                    simple("int"),
                ],
            }
        );
    }

    #[test]
    fn accepts_trailing_comma_in_generics() {
        let node = parse("Map<string, int,>");
        let TypeNode::WithGenerics { generics, .. } = node else {
            panic!("expected generics");
        };
        assert_eq!(generics, vec![simple("string"), simple("int")]);
    }

    #[test]
    fn parses_static_access_and_square_brackets() {
        assert_eq!(
            parse("self::STATUS_*|int[]"),
            TypeNode::Union(vec![
                TypeNode::StaticAccess {
                    class: Box::new(simple("self")),
                    member: Box::new(simple("STATUS_*")),
                },
                TypeNode::ArraySquareBracket(Box::new(simple("int"))),
            ])
        );
    }

    #[test]
    fn parses_string_literals_with_escapes() {
        assert_eq!(
            parse(r"'it\'s'"),
            TypeNode::StringLiteral {
                value: r"it\'s".to_string(),
                quote: Quote::Single,
            }
        );
        assert_eq!(
            parse(r#""desc""#),
            TypeNode::StringLiteral {
                value: "desc".to_string(),
                quote: Quote::Double,
            }
        );
    }

    #[test]
    fn rejects_unterminated_string_literal() {
        let err = parse_type("'open", "@var").unwrap_err();
        assert!(matches!(
            err,
            TypeParseError::UnterminatedStringLiteral { offset: 0, .. }
        ));
    }

    #[test]
    fn conditional_types_only_parse_when_nested() {
        let node = parse("($value is int ? string : bool)");
        let TypeNode::Parentheses(inner) = node else {
            panic!("expected parentheses");
        };
        assert!(matches!(*inner, TypeNode::Conditional { .. }));

        let parsed = parse_type("Foo is returned", "@return").unwrap();
        assert_eq!(parsed.node, simple("Foo"));
        assert_eq!(parsed.rest, "is returned");
    }

    #[test]
    fn parses_spread_parameters() {
        let node = parse("callable(...): void");
        let TypeNode::Callable { parameters, .. } = node else {
            panic!("expected callable");
        };
        assert_eq!(parameters[0].ty, TypeNode::Spread);
    }

    #[test]
    fn rest_keeps_following_line_break() {
        let parsed = parse_type("int\nMore text", "@return").unwrap();
        assert_eq!(parsed.rest, "\nMore text");
    }

    #[test]
    fn multi_line_types_skip_whitespace() {
        let node = parse("array{\n\ttitle: string,\n\tbody: string\n}");
        let TypeNode::TupleDict(entries) = node else {
            panic!("expected tuple dict");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn reports_expected_token_with_path() {
        let err = parse_type("array<int", "@param").unwrap_err();
        match err {
            TypeParseError::ExpectedToken {
                expected, path, excerpt, ..
            } => {
                assert_eq!(expected, ">");
                assert_eq!(path, "@param");
                assert_eq!(excerpt, "<eol>");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn reports_unexpected_token_inside_nesting() {
        let err = parse_type("Foo<@bar>", "@var").unwrap_err();
        match err {
            TypeParseError::UnexpectedToken { offset, path, .. } => {
                assert_eq!(offset, 4);
                assert_eq!(path, "@var.generic");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
