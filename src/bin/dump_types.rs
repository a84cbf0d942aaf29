use std::path::Path;

use anyhow::{Context, Result};
use phpdoc_fmt::formatter::parser::{PhpParser, TreeSitterPhpParser};
use phpdoc_fmt::formatter::phpdoc::{CommentNode, PhpDocParser, TypeNode};
use phpdoc_fmt::formatter::source::collect_doc_comments;

fn print_type(node: &TypeNode, label: &str, indent: usize) {
    let pad = indent * 2;
    match node {
        TypeNode::SimpleValue(name) => println!("{:pad$}{label}SimpleValue {name:?}", ""),
        TypeNode::Spread => println!("{:pad$}{label}Spread", ""),
        TypeNode::StringLiteral { value, quote } => {
            println!("{:pad$}{label}StringLiteral {value:?} ({})", "", quote.as_char())
        }
        TypeNode::Maybe(inner) => {
            println!("{:pad$}{label}Maybe", "");
            print_type(inner, "", indent + 1);
        }
        TypeNode::Parentheses(inner) => {
            println!("{:pad$}{label}Parentheses", "");
            print_type(inner, "", indent + 1);
        }
        TypeNode::ArraySquareBracket(inner) => {
            println!("{:pad$}{label}ArraySquareBracket", "");
            print_type(inner, "", indent + 1);
        }
        TypeNode::WithGenerics { node, generics } => {
            println!("{:pad$}{label}WithGenerics", "");
            print_type(node, "node: ", indent + 1);
            for generic in generics {
                print_type(generic, "generic: ", indent + 1);
            }
        }
        TypeNode::StaticAccess { class, member } => {
            println!("{:pad$}{label}StaticAccess", "");
            print_type(class, "class: ", indent + 1);
            print_type(member, "member: ", indent + 1);
        }
        TypeNode::TupleDict(entries) => {
            println!("{:pad$}{label}TupleDict", "");
            for entry in entries {
                let marker = if entry.optional { "entry?: " } else { "entry: " };
                match &entry.key {
                    Some(key) => {
                        print_type(key, "key: ", indent + 1);
                        print_type(&entry.value, marker, indent + 2);
                    }
                    None => print_type(&entry.value, marker, indent + 1),
                }
            }
        }
        TypeNode::Record { key, value } => {
            println!("{:pad$}{label}Record", "");
            print_type(key, "key: ", indent + 1);
            print_type(value, "value: ", indent + 1);
        }
        TypeNode::ArrayList { inner, name } => {
            println!("{:pad$}{label}ArrayList {}", "", name.as_str());
            print_type(inner, "", indent + 1);
        }
        TypeNode::Union(branches) => {
            println!("{:pad$}{label}Union", "");
            for branch in branches {
                print_type(branch, "", indent + 1);
            }
        }
        TypeNode::Callable {
            node,
            parameters,
            return_type,
        } => {
            println!("{:pad$}{label}Callable", "");
            print_type(node, "node: ", indent + 1);
            for parameter in parameters {
                let label = match &parameter.name {
                    Some(name) => format!("param {name}: "),
                    None => "param: ".to_string(),
                };
                print_type(&parameter.ty, &label, indent + 1);
            }
            print_type(return_type, "return: ", indent + 1);
        }
        TypeNode::Conditional {
            check,
            extends,
            true_type,
            false_type,
        } => {
            println!("{:pad$}{label}Conditional", "");
            print_type(check, "check: ", indent + 1);
            print_type(extends, "is: ", indent + 1);
            print_type(true_type, "then: ", indent + 1);
            print_type(false_type, "else: ", indent + 1);
        }
        TypeNode::ModifierKeyword { modifier, target } => {
            println!("{:pad$}{label}ModifierKeyword", "");
            print_type(modifier, "modifier: ", indent + 1);
            print_type(target, "target: ", indent + 1);
        }
    }
}

fn main() -> Result<()> {
    let path = std::env::args().nth(1).context("path argument missing")?;

    let mut parser = TreeSitterPhpParser::new()?;
    let parsed = parser.parse_file(Path::new(&path))?;

    for comment in collect_doc_comments(&parsed) {
        println!(
            "comment at {}:{}",
            comment.start.row + 1,
            comment.start.column + 1
        );
        for node in PhpDocParser::parse(comment.text) {
            match node {
                CommentNode::Text(text) => println!("  Text {text:?}"),
                CommentNode::Tag(tag) => {
                    println!("  Tag {} {:?}", tag.tag, tag.description);
                    if let Some(ty) = &tag.parsed_type {
                        print_type(ty, "", 2);
                    }
                    if let Some(err) = &tag.parse_error {
                        println!("    error: {err}");
                    }
                }
            }
        }
    }

    Ok(())
}
