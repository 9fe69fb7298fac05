//! Source templates.
//!
//! Two syntaxes exist and each has its own parser; a template is always
//! parsed by exactly the parser its [`TemplateFormatVersion`] names.
//!
//! **V1** supports plain substitution only:
//!
//! ```text
//! {Front} ({Back})      field references
//! {{ and }}             literal braces
//! ```
//!
//! **V2** adds filters and conditionals:
//!
//! ```text
//! {Front|strip_html|trim}
//! {#if Hint}{Hint}{#else}{Front}{/if}
//! ```
//!
//! Under V1, `{Front|upper}` refers to a field literally named `Front|upper`.

use crate::error::TemplateError;
use crate::record::RecordFields;
use crate::text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Selects the template syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormatVersion {
    #[default]
    V1,
    V2,
}

impl fmt::Display for TemplateFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V2 => f.write_str("v2"),
        }
    }
}

/// A V2 field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Upper,
    Lower,
    Trim,
    StripHtml,
    FirstLine,
}

impl Filter {
    fn parse(name: &str) -> Result<Self, TemplateError> {
        match name {
            "upper" => Ok(Self::Upper),
            "lower" => Ok(Self::Lower),
            "trim" => Ok(Self::Trim),
            "strip_html" => Ok(Self::StripHtml),
            "first_line" => Ok(Self::FirstLine),
            other => Err(TemplateError::UnknownFilter(other.to_string())),
        }
    }

    fn apply(self, value: &str) -> String {
        match self {
            Self::Upper => value.to_uppercase(),
            Self::Lower => value.to_lowercase(),
            Self::Trim => value.trim().to_string(),
            Self::StripHtml => text::strip_html(value),
            Self::FirstLine => text::first_line(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Field { name: String, filters: Vec<Filter> },
    If {
        field: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// A parsed template, ready to render against any number of records.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    version: TemplateFormatVersion,
    nodes: Vec<Node>,
}

impl Template {
    /// Parses `source` with the parser for `version`.
    pub fn parse(source: &str, version: TemplateFormatVersion) -> Result<Self, TemplateError> {
        let nodes = match version {
            TemplateFormatVersion::V1 => parse_v1(source)?,
            TemplateFormatVersion::V2 => parse_v2(source)?,
        };
        Ok(Self { version, nodes })
    }

    pub fn version(&self) -> TemplateFormatVersion {
        self.version
    }

    /// Every field name the template reads, in either branch of a
    /// conditional.
    pub fn referenced_fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        collect_fields(&self.nodes, &mut fields);
        fields
    }

    /// Renders the template against a record's fields.
    ///
    /// Every referenced field must exist on the record, including fields in
    /// branches that are not taken.
    pub fn render(&self, fields: &RecordFields) -> Result<String, TemplateError> {
        if let Some(missing) = self
            .referenced_fields()
            .into_iter()
            .find(|name| !fields.contains_key(*name))
        {
            return Err(TemplateError::UndefinedField(missing.to_string()));
        }
        let mut out = String::new();
        render_nodes(&self.nodes, fields, &mut out);
        Ok(out)
    }
}

fn collect_fields<'a>(nodes: &'a [Node], fields: &mut BTreeSet<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Field { name, .. } => {
                fields.insert(name.as_str());
            }
            Node::If {
                field,
                then,
                otherwise,
            } => {
                fields.insert(field.as_str());
                collect_fields(then, fields);
                collect_fields(otherwise, fields);
            }
        }
    }
}

fn render_nodes(nodes: &[Node], fields: &RecordFields, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Field { name, filters } => {
                let value = fields.get(name).map(String::as_str).unwrap_or_default();
                let value = filters
                    .iter()
                    .fold(value.to_string(), |acc, filter| filter.apply(&acc));
                out.push_str(&value);
            }
            Node::If {
                field,
                then,
                otherwise,
            } => {
                let truthy = fields.get(field).is_some_and(|v| !v.trim().is_empty());
                render_nodes(if truthy { then } else { otherwise }, fields, out);
            }
        }
    }
}

/// A lexical piece of template source: literal text, or the inside of a
/// `{...}` tag with the byte offset of its opening brace.
enum Token<'a> {
    Text(String),
    Tag { body: &'a str, offset: usize },
}

/// Splits template source into text and tags, resolving `{{`/`}}` escapes.
/// Shared by both parsers; only the interpretation of tag bodies differs.
fn tokenize(source: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                text.push('{');
                i += 2;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                text.push('}');
                i += 2;
            }
            b'{' => {
                let rest = &source[i + 1..];
                let end = rest.find('}').ok_or(TemplateError::Unterminated(i))?;
                let body = &rest[..end];
                if body.contains('{') {
                    return Err(TemplateError::Unterminated(i));
                }
                if !text.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut text)));
                }
                tokens.push(Token::Tag { body, offset: i });
                i += end + 2;
            }
            b'}' => return Err(TemplateError::UnmatchedClose(i)),
            _ => {
                let ch_len = source[i..].chars().next().map_or(1, char::len_utf8);
                text.push_str(&source[i..i + ch_len]);
                i += ch_len;
            }
        }
    }

    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
    Ok(tokens)
}

fn parse_v1(source: &str) -> Result<Vec<Node>, TemplateError> {
    tokenize(source)?
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => Ok(Node::Text(text)),
            Token::Tag { body, offset } => {
                let name = body.trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyField(offset));
                }
                Ok(Node::Field {
                    name: name.to_string(),
                    filters: Vec::new(),
                })
            }
        })
        .collect()
}

/// An `{#if}` block being filled in while parsing V2.
struct OpenIf {
    field: String,
    offset: usize,
    then: Vec<Node>,
    otherwise: Vec<Node>,
    in_else: bool,
}

fn push_node(root: &mut Vec<Node>, stack: &mut [OpenIf], node: Node) {
    match stack.last_mut() {
        Some(open) if open.in_else => open.otherwise.push(node),
        Some(open) => open.then.push(node),
        None => root.push(node),
    }
}

fn parse_v2(source: &str) -> Result<Vec<Node>, TemplateError> {
    let mut root = Vec::new();
    let mut stack: Vec<OpenIf> = Vec::new();

    for token in tokenize(source)? {
        let (body, offset) = match token {
            Token::Text(text) => {
                push_node(&mut root, &mut stack, Node::Text(text));
                continue;
            }
            Token::Tag { body, offset } => (body.trim(), offset),
        };

        if let Some(field) = body.strip_prefix("#if ") {
            let field = field.trim();
            if field.is_empty() {
                return Err(TemplateError::EmptyField(offset));
            }
            stack.push(OpenIf {
                field: field.to_string(),
                offset,
                then: Vec::new(),
                otherwise: Vec::new(),
                in_else: false,
            });
        } else if body == "#else" {
            match stack.last_mut() {
                Some(open) if !open.in_else => open.in_else = true,
                _ => {
                    return Err(TemplateError::UnexpectedTag {
                        tag: "{#else}".to_string(),
                        offset,
                    })
                }
            }
        } else if body == "/if" {
            let Some(open) = stack.pop() else {
                return Err(TemplateError::UnexpectedTag {
                    tag: "{/if}".to_string(),
                    offset,
                });
            };
            let node = Node::If {
                field: open.field,
                then: open.then,
                otherwise: open.otherwise,
            };
            push_node(&mut root, &mut stack, node);
        } else if body.starts_with('#') || body.starts_with('/') {
            return Err(TemplateError::UnexpectedTag {
                tag: format!("{{{body}}}"),
                offset,
            });
        } else {
            let mut parts = body.split('|').map(str::trim);
            let name = parts.next().unwrap_or_default();
            if name.is_empty() {
                return Err(TemplateError::EmptyField(offset));
            }
            let filters = parts.map(Filter::parse).collect::<Result<Vec<_>, _>>()?;
            let node = Node::Field {
                name: name.to_string(),
                filters,
            };
            push_node(&mut root, &mut stack, node);
        }
    }

    if let Some(open) = stack.first() {
        return Err(TemplateError::UnclosedIf(open.offset));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> RecordFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn render(source: &str, version: TemplateFormatVersion, record: &RecordFields) -> String {
        Template::parse(source, version)
            .expect("template should parse")
            .render(record)
            .expect("template should render")
    }

    #[test]
    fn v1_substitutes_fields() {
        let record = fields(&[("Front", "chat"), ("Back", "cat")]);
        assert_eq!(
            render("{Front} means {Back}", TemplateFormatVersion::V1, &record),
            "chat means cat"
        );
    }

    #[test]
    fn v1_escaped_braces() {
        let record = fields(&[("Front", "x")]);
        assert_eq!(
            render("{{literal}} {Front}", TemplateFormatVersion::V1, &record),
            "{literal} x"
        );
    }

    #[test]
    fn v1_does_not_understand_filters() {
        let record = fields(&[("Front", "chat")]);
        let template = Template::parse("{Front|upper}", TemplateFormatVersion::V1).unwrap();
        assert_eq!(
            template.render(&record),
            Err(TemplateError::UndefinedField("Front|upper".to_string()))
        );
    }

    #[test]
    fn v1_conditional_is_a_field_reference() {
        let template = Template::parse("{#if Front}", TemplateFormatVersion::V1).unwrap();
        assert!(template.referenced_fields().contains("#if Front"));
    }

    #[test]
    fn v2_applies_filters_left_to_right() {
        let record = fields(&[("Front", "  <b>Chat</b>  ")]);
        assert_eq!(
            render("{Front|strip_html|trim|upper}", TemplateFormatVersion::V2, &record),
            "CHAT"
        );
    }

    #[test]
    fn v2_first_line() {
        for front in ["one<br>two", "one<br />two", "<div>one</div><div>two</div>"] {
            let record = fields(&[("Front", front)]);
            assert_eq!(
                render("{Front|first_line}", TemplateFormatVersion::V2, &record),
                "one",
                "{front}"
            );
        }
    }

    #[test]
    fn v2_conditional_branches() {
        let template = "{#if Hint}{Hint}{#else}{Front}{/if}!";
        let with_hint = fields(&[("Front", "chat"), ("Hint", "a pet")]);
        let blank_hint = fields(&[("Front", "chat"), ("Hint", "  ")]);
        assert_eq!(render(template, TemplateFormatVersion::V2, &with_hint), "a pet!");
        assert_eq!(render(template, TemplateFormatVersion::V2, &blank_hint), "chat!");
    }

    #[test]
    fn v2_nested_conditionals() {
        let template = "{#if A}a{#if B}b{/if}{/if}";
        let record = fields(&[("A", "1"), ("B", "")]);
        assert_eq!(render(template, TemplateFormatVersion::V2, &record), "a");
    }

    #[test]
    fn v2_rejects_unknown_filter() {
        assert_eq!(
            Template::parse("{Front|shout}", TemplateFormatVersion::V2),
            Err(TemplateError::UnknownFilter("shout".to_string()))
        );
    }

    #[test]
    fn v2_rejects_unbalanced_blocks() {
        assert_eq!(
            Template::parse("{#if A}x", TemplateFormatVersion::V2),
            Err(TemplateError::UnclosedIf(0))
        );
        assert!(matches!(
            Template::parse("x{/if}", TemplateFormatVersion::V2),
            Err(TemplateError::UnexpectedTag { offset: 1, .. })
        ));
        assert!(matches!(
            Template::parse("{#if A}{#else}{#else}{/if}", TemplateFormatVersion::V2),
            Err(TemplateError::UnexpectedTag { .. })
        ));
    }

    #[test]
    fn undefined_field_in_untaken_branch_is_an_error() {
        let template =
            Template::parse("{#if A}{A}{#else}{Missing}{/if}", TemplateFormatVersion::V2).unwrap();
        let record = fields(&[("A", "yes")]);
        assert_eq!(
            template.render(&record),
            Err(TemplateError::UndefinedField("Missing".to_string()))
        );
    }

    #[test]
    fn syntax_errors() {
        for version in [TemplateFormatVersion::V1, TemplateFormatVersion::V2] {
            assert_eq!(
                Template::parse("abc {Front", version),
                Err(TemplateError::Unterminated(4))
            );
            assert_eq!(
                Template::parse("a } b", version),
                Err(TemplateError::UnmatchedClose(2))
            );
            assert_eq!(
                Template::parse("{ }", version),
                Err(TemplateError::EmptyField(0))
            );
        }
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let record = fields(&[("Front", "猫")]);
        assert_eq!(
            render("«{Front}» ok", TemplateFormatVersion::V1, &record),
            "«猫» ok"
        );
    }
}
