//! Renders a [`TypeNode`] back to text at a given [`WrapLevel`].
//!
//! Every breakable structure owns break points of one level. A break point
//! becomes a newline plus indentation when the printer's level is at least
//! that high, and a plain separator otherwise. Indentation is tracked the
//! same way at every level so that output stays aligned whichever breaks
//! actually fire.

use super::types::{CallableParameter, TupleDictEntry, TypeNode};
use crate::formatter::config::FormatOptions;

/// Which classes of break points may become real line breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WrapLevel {
    /// Everything on one line
    Never,
    /// Break between dictionary entries
    L1,
    /// Also break between generic arguments
    L2,
    /// Also break positional tuples and conditional clauses
    L3,
}

impl WrapLevel {
    pub const MAX: WrapLevel = WrapLevel::L3;

    pub fn next(self) -> Option<WrapLevel> {
        match self {
            WrapLevel::Never => Some(WrapLevel::L1),
            WrapLevel::L1 => Some(WrapLevel::L2),
            WrapLevel::L2 => Some(WrapLevel::L3),
            WrapLevel::L3 => None,
        }
    }
}

/// Render `node` into one or more lines.
pub fn print_type(node: &TypeNode, options: &FormatOptions, level: WrapLevel) -> Vec<String> {
    let mut printer = TypePrinter::new(options, level);
    printer.print(node);
    printer.finish()
}

struct TypePrinter<'a> {
    options: &'a FormatOptions,
    level: WrapLevel,
    indent_unit: String,
    depth: usize,
    lines: Vec<String>,
    line: String,
}

impl<'a> TypePrinter<'a> {
    fn new(options: &'a FormatOptions, level: WrapLevel) -> Self {
        Self {
            options,
            level,
            indent_unit: options.indent_unit(),
            depth: 0,
            lines: Vec::new(),
            line: String::new(),
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.lines.push(self.line);
        self.lines
    }

    fn text(&mut self, text: &str) {
        self.line.push_str(text);
    }

    fn soft_break(&mut self, level: WrapLevel, separator: &str) {
        if self.level >= level {
            let indent = self.indent_unit.repeat(self.depth);
            let finished = std::mem::replace(&mut self.line, indent);
            self.lines.push(finished);
        } else {
            self.text(separator);
        }
    }

    fn print(&mut self, node: &TypeNode) {
        match node {
            TypeNode::Maybe(inner) => {
                if self.options.expand_null {
                    let null = TypeNode::simple("null");
                    self.print_branches(vec![&null, inner.as_ref()]);
                } else {
                    self.text("?");
                    self.print(inner);
                }
            }
            TypeNode::SimpleValue(value) => self.text(value),
            TypeNode::WithGenerics { node, generics } => {
                self.print(node);
                self.text("<");
                self.print_separated(generics, WrapLevel::L2, |printer, generic| {
                    printer.print(generic)
                });
                self.text(">");
            }
            TypeNode::StaticAccess { class, member } => {
                self.print(class);
                self.text("::");
                self.print(member);
            }
            TypeNode::TupleDict(entries) => self.print_tuple_dict(entries),
            TypeNode::Record { key, value } => {
                self.text("array<");
                self.print(key);
                self.text(", ");
                self.print(value);
                self.text(">");
            }
            TypeNode::ArrayList { inner, name } => {
                self.text(name.as_str());
                self.text("<");
                self.print(inner);
                self.text(">");
            }
            TypeNode::ArraySquareBracket(inner) => {
                self.print(inner);
                self.text("[]");
            }
            TypeNode::Union(types) => self.print_union(types),
            TypeNode::Callable {
                node,
                parameters,
                return_type,
            } => {
                self.print(node);
                self.text("(");
                for (idx, parameter) in parameters.iter().enumerate() {
                    if idx > 0 {
                        self.text(", ");
                    }
                    self.print_parameter(parameter);
                }
                self.text("): ");
                self.print(return_type);
            }
            TypeNode::StringLiteral { value, quote } => {
                let quote = quote.as_char();
                self.line.push(quote);
                self.line.push_str(value);
                self.line.push(quote);
            }
            TypeNode::Parentheses(inner) => {
                self.text("(");
                self.print(inner);
                self.text(")");
            }
            TypeNode::Conditional {
                check,
                extends,
                true_type,
                false_type,
            } => {
                self.print(check);
                self.depth += 1;
                self.soft_break(WrapLevel::L3, " ");
                self.text("is ");
                self.print(extends);
                self.soft_break(WrapLevel::L3, " ");
                self.text("? ");
                self.print(true_type);
                self.soft_break(WrapLevel::L3, " ");
                self.text(": ");
                self.print(false_type);
                self.depth -= 1;
            }
            TypeNode::Spread => self.text("..."),
            TypeNode::ModifierKeyword { modifier, target } => {
                self.print(modifier);
                self.text(" ");
                self.print(target);
            }
        }
    }

    fn print_parameter(&mut self, parameter: &CallableParameter) {
        self.print(&parameter.ty);
        if let Some(name) = &parameter.name {
            // `...$args` is an untyped variadic, not a spread followed by a name
            if parameter.ty != TypeNode::Spread {
                self.text(" ");
            }
            self.text(name);
        }
    }

    /// `array{...}`: dictionaries break at L1, tuples only at L3.
    fn print_tuple_dict(&mut self, entries: &[TupleDictEntry]) {
        if entries.is_empty() {
            self.text("array{}");
            return;
        }

        let is_dictionary = entries.iter().all(|entry| entry.key.is_some());
        let level = if is_dictionary {
            WrapLevel::L1
        } else {
            WrapLevel::L3
        };

        self.text("array{");
        self.print_separated(entries, level, |printer, entry| {
            if let Some(key) = &entry.key {
                printer.print(key);
                if entry.optional {
                    printer.text("?");
                }
                printer.text(": ");
            }
            printer.print(&entry.value);
        });
        self.text("}");
    }

    /// Print `items` as an indented, comma separated block whose breaks
    /// belong to `level`.
    fn print_separated<T>(
        &mut self,
        items: &[T],
        level: WrapLevel,
        mut print_item: impl FnMut(&mut Self, &T),
    ) {
        self.depth += 1;
        self.soft_break(level, "");
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.text(",");
                self.soft_break(level, " ");
            }
            print_item(self, item);
        }
        self.depth -= 1;
        self.soft_break(level, "");
    }

    fn print_union(&mut self, types: &[TypeNode]) {
        let null = TypeNode::simple("null");
        let mut branches = Vec::with_capacity(types.len());
        for ty in types {
            match ty {
                TypeNode::Maybe(inner) if self.options.expand_null => {
                    branches.push(&null);
                    branches.push(inner.as_ref());
                }
                other => branches.push(other),
            }
        }
        self.print_branches(branches);
    }

    /// `A | B | ...` with `null` branches moved to the front, collapsed to
    /// one when `expand_null` is on.
    fn print_branches(&mut self, branches: Vec<&TypeNode>) {
        let (nulls, others): (Vec<&TypeNode>, Vec<&TypeNode>) =
            branches.into_iter().partition(|branch| branch.is_null());

        let keep = if self.options.expand_null { 1 } else { nulls.len() };
        let ordered = nulls.into_iter().take(keep).chain(others);
        for (idx, branch) in ordered.enumerate() {
            if idx > 0 {
                self.text(" | ");
            }
            self.print(branch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::phpdoc::type_parser::parse_type;

    fn options() -> FormatOptions {
        FormatOptions::default()
    }

    fn render(text: &str, options: &FormatOptions, level: WrapLevel) -> Vec<String> {
        let parsed = parse_type(text, "test").unwrap();
        print_type(&parsed.node, options, level)
    }

    fn render_line(text: &str) -> String {
        render(text, &options(), WrapLevel::Never).concat()
    }

    #[test]
    fn prints_record_of_tuple_on_one_line() {
        assert_eq!(
            render_line("array<string, array{bool, ?int}>"),
            "array<string, array{bool, ?int}>"
        );
    }

    #[test]
    fn never_level_keeps_everything_on_one_line() {
        let lines = render(
            "array{title: string, body: Collection<int, string>}",
            &options(),
            WrapLevel::Never,
        );
        assert_eq!(lines, vec!["array{title: string, body: Collection<int, string>}"]);
    }

    #[test]
    fn level_one_breaks_dictionary_entries_only() {
        let lines = render(
            "array{title: string, tags: Collection<int, string>}",
            &options(),
            WrapLevel::L1,
        );
        assert_eq!(
            lines,
            vec![
                "array{",
                "    title: string,",
                "    tags: Collection<int, string>",
                "}",
            ]
        );
    }

    #[test]
    fn level_two_breaks_generics_with_nested_indentation() {
        let lines = render(
            "array{tags: Collection<int, string>}",
            &options(),
            WrapLevel::L2,
        );
        assert_eq!(
            lines,
            vec![
                "array{",
                "    tags: Collection<",
                "        int,",
                "        string",
                "    >",
                "}",
            ]
        );
    }

    #[test]
    fn tuples_break_only_at_level_three() {
        let options = options();
        assert_eq!(
            render("array{int, string}", &options, WrapLevel::L2),
            vec!["array{int, string}"]
        );
        assert_eq!(
            render("array{int, string}", &options, WrapLevel::L3),
            vec!["array{", "    int,", "    string", "}"]
        );
    }

    #[test]
    fn conditional_breaks_at_level_three() {
        let options = options();
        assert_eq!(
            render("($x is int ? string : bool)", &options, WrapLevel::L2),
            vec!["($x is int ? string : bool)"]
        );
        assert_eq!(
            render("($x is int ? string : bool)", &options, WrapLevel::L3),
            vec!["($x", "    is int", "    ? string", "    : bool)"]
        );
    }

    #[test]
    fn records_never_break() {
        assert_eq!(
            render("array<string, int>", &options(), WrapLevel::L3),
            vec!["array<string, int>"]
        );
    }

    #[test]
    fn null_branches_print_first() {
        assert_eq!(render_line("string|null|int"), "null | string | int");
    }

    #[test]
    fn duplicate_nulls_are_kept_without_expand_null() {
        assert_eq!(render_line("int|null|null"), "null | null | int");

        let options = FormatOptions {
            expand_null: true,
            ..FormatOptions::default()
        };
        assert_eq!(
            render("int|null|null", &options, WrapLevel::Never),
            vec!["null | int"]
        );
    }

    #[test]
    fn untyped_variadic_parameter_keeps_its_dots() {
        assert_eq!(render_line("callable(...$args): void"), "callable(...$args): void");
        assert_eq!(render_line("callable(...): void"), "callable(...): void");
        assert_eq!(
            render_line(&render_line("callable(...$args): void")),
            "callable(...$args): void"
        );
    }

    #[test]
    fn expand_null_rewrites_nullable_shorthand() {
        let options = FormatOptions {
            expand_null: true,
            ..FormatOptions::default()
        };
        assert_eq!(
            render("?DateTimeInterface", &options, WrapLevel::Never),
            vec!["null | DateTimeInterface"]
        );
        assert_eq!(
            render("int|?string", &options, WrapLevel::Never),
            vec!["null | int | string"]
        );
        assert_eq!(
            render("null|?string", &options, WrapLevel::Never),
            vec!["null | string"]
        );
    }

    #[test]
    fn nullable_shorthand_is_kept_by_default() {
        assert_eq!(render_line("?DateTimeInterface"), "?DateTimeInterface");
    }

    #[test]
    fn prints_callables_and_literals() {
        assert_eq!(
            render_line("callable(mixed, int ...$rest):mixed"),
            "callable(mixed, int ...$rest): mixed"
        );
        assert_eq!(render_line("'a'|\"b\""), "'a' | \"b\"");
        assert_eq!(render_line("(int|string)[]"), "(int | string)[]");
        assert_eq!(render_line("Foo::BAR"), "Foo::BAR");
        assert_eq!(render_line("array{}"), "array{}");
        assert_eq!(render_line("array{a?:int}"), "array{a?: int}");
    }

    #[test]
    fn uses_tabs_when_requested() {
        let options = FormatOptions {
            use_tabs: true,
            ..FormatOptions::default()
        };
        assert_eq!(
            render("array{a: int}", &options, WrapLevel::L1),
            vec!["array{", "\ta: int", "}"]
        );
    }

    #[test]
    fn reparsing_printed_output_is_a_fixed_point() {
        let options = options();
        let source = "array{filters: array<int, array{field: string, value: mixed}>, limit: positive-int|null}";
        for level in [WrapLevel::Never, WrapLevel::L1, WrapLevel::L2, WrapLevel::L3] {
            let first = parse_type(source, "test").unwrap().node;
            let printed = print_type(&first, &options, level).join("\n");
            let second = parse_type(&printed, "test").unwrap().node;
            assert_eq!(print_type(&second, &options, level).join("\n"), printed);
        }
    }

    #[test]
    fn wrap_levels_are_ordered() {
        assert!(WrapLevel::Never < WrapLevel::L1);
        assert!(WrapLevel::L2 < WrapLevel::L3);
        assert_eq!(WrapLevel::L2.next(), Some(WrapLevel::L3));
        assert_eq!(WrapLevel::MAX.next(), None);
    }
}
