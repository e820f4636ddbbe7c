//! `{% ... %}` annotations embedded in Markdown text.
//!
//! Three shapes are recognised:
//!
//! - tag openers: `{% hint kind="tip" %}`, self-closing with a trailing slash:
//!   `{% emoji symbol="🎉" alt="party" /%}`
//! - closing tags: `{% /hint %}`
//! - bare attribute lists: `{% #custom-id .wide %}`
//!
//! Attribute values are double-quoted strings, numbers, or `true`/`false`.
//! `#x` is shorthand for `id="x"` and `.x` appends `x` to `class`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub type Attributes = BTreeMap<String, AttributeValue>;

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl AttributeValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Boolean(_) => "Boolean",
            AttributeValue::Number(_) => "Number",
            AttributeValue::String(_) => "String",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A tag invocation such as `{% well heading="Docs" %}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagInvocation {
    pub name: String,
    pub attributes: Attributes,
    /// Written with `/%}`.
    pub self_closing: bool,
    /// A matching `{% /name %}` was found and the tag body became its children.
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Open(TagInvocation),
    Close(String),
    Attributes(Attributes),
}

/// A piece of text split around annotations.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'a> {
    Text(&'a str),
    Annotation {
        /// The full `{% ... %}` text.
        raw: &'a str,
        /// The text between the delimiters.
        inner: &'a str,
    },
    /// A `{%` with no closing `%}` on the same line of text.
    Unterminated(&'a str),
}

/// Split `text` into plain text and annotation segments.
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(found) = text[pos..].find("{%") {
        let start = pos + found;
        if start > pos {
            out.push(Segment::Text(&text[pos..start]));
        }

        match find_close(&text[start + 2..]) {
            Some(close) => {
                let inner_end = start + 2 + close;
                out.push(Segment::Annotation {
                    raw: &text[start..inner_end + 2],
                    inner: &text[start + 2..inner_end],
                });
                pos = inner_end + 2;
            }
            None => {
                out.push(Segment::Unterminated(&text[start..]));
                return out;
            }
        }
    }

    if pos < text.len() {
        out.push(Segment::Text(&text[pos..]));
    }
    out
}

/// Offset of the `%}` terminator, skipping over quoted strings.
fn find_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if in_string => i += 1,
            b'"' => in_string = !in_string,
            b'%' if !in_string && bytes.get(i + 1) == Some(&b'}') => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Parse the inside of a `{% ... %}` annotation.
pub fn parse_annotation(inner: &str) -> Result<Annotation, String> {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return Err("empty annotation".to_string());
    }

    if let Some(rest) = trimmed.strip_prefix('/') {
        let name = rest.trim();
        if !is_identifier(name) {
            return Err(format!("invalid closing tag name \"{}\"", name));
        }
        return Ok(Annotation::Close(name.to_string()));
    }

    let (body, self_closing) = match trimmed.strip_suffix('/') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };

    let mut cursor = Cursor::new(body);
    let mut name: Option<String> = None;
    let mut attributes = Attributes::new();

    loop {
        cursor.skip_whitespace();
        let Some(c) = cursor.peek() else {
            break;
        };

        match c {
            '#' => {
                cursor.bump();
                let id = cursor.identifier();
                if id.is_empty() {
                    return Err("expected an id after '#'".to_string());
                }
                attributes.insert("id".to_string(), AttributeValue::String(id.to_string()));
            }
            '.' => {
                cursor.bump();
                let class = cursor.identifier();
                if class.is_empty() {
                    return Err("expected a class name after '.'".to_string());
                }
                let merged = match attributes.get("class").and_then(AttributeValue::as_str) {
                    Some(existing) => format!("{} {}", existing, class),
                    None => class.to_string(),
                };
                attributes.insert("class".to_string(), AttributeValue::String(merged));
            }
            _ => {
                let ident = cursor.identifier();
                if ident.is_empty() {
                    return Err(format!("unexpected character '{}' in annotation", c));
                }
                if cursor.eat('=') {
                    let value = cursor.value()?;
                    attributes.insert(ident.to_string(), value);
                } else if name.is_none() && attributes.is_empty() {
                    name = Some(ident.to_string());
                } else {
                    return Err(format!("attribute \"{}\" is missing a value", ident));
                }
            }
        }
    }

    match name {
        Some(name) => Ok(Annotation::Open(TagInvocation {
            name,
            attributes,
            self_closing,
            closed: false,
        })),
        None if self_closing => Err("self-closing annotation has no tag name".to_string()),
        None => Ok(Annotation::Attributes(attributes)),
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_identifier_char)
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn value(&mut self) -> Result<AttributeValue, String> {
        match self.peek() {
            Some('"') => {
                self.bump();
                let mut out = String::new();
                loop {
                    match self.bump() {
                        Some('"') => return Ok(AttributeValue::String(out)),
                        Some('\\') => match self.bump() {
                            Some('n') => out.push('\n'),
                            Some(c) => out.push(c),
                            None => return Err("unterminated string".to_string()),
                        },
                        Some(c) => out.push(c),
                        None => return Err("unterminated string".to_string()),
                    }
                }
            }
            Some(_) => {
                let start = self.pos;
                while self.peek().is_some_and(|c| !c.is_whitespace()) {
                    self.bump();
                }
                let word = &self.src[start..self.pos];
                match word {
                    "true" => Ok(AttributeValue::Boolean(true)),
                    "false" => Ok(AttributeValue::Boolean(false)),
                    _ => match word.parse::<f64>() {
                        Ok(number) if number.is_finite() => Ok(AttributeValue::Number(number)),
                        _ => Err(format!("invalid attribute value \"{}\"", word)),
                    },
                }
            }
            None => Err("expected an attribute value".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn string(s: &str) -> AttributeValue {
        AttributeValue::String(s.to_string())
    }

    #[test]
    fn segments_split_text_and_annotations() {
        assert_eq!(
            segments("Intro {% #intro %}"),
            vec![
                Segment::Text("Intro "),
                Segment::Annotation {
                    raw: "{% #intro %}",
                    inner: " #intro ",
                },
            ]
        );
        assert_eq!(segments("plain"), vec![Segment::Text("plain")]);
        assert_eq!(
            segments("a {% b"),
            vec![Segment::Text("a "), Segment::Unterminated("{% b")]
        );
    }

    #[test]
    fn terminator_inside_string_is_ignored() {
        let segs = segments(r#"{% well heading="50%} off" %}!"#);
        assert_eq!(
            segs,
            vec![
                Segment::Annotation {
                    raw: r#"{% well heading="50%} off" %}"#,
                    inner: r#" well heading="50%} off" "#,
                },
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn parses_tag_with_typed_attributes() {
        let Ok(Annotation::Open(tag)) =
            parse_annotation(r#" well heading="Read more" count=3 open=true "#)
        else {
            panic!("expected an opening tag");
        };
        assert_eq!(tag.name, "well");
        assert!(!tag.self_closing);
        assert_eq!(tag.attributes.get("heading"), Some(&string("Read more")));
        assert_eq!(tag.attributes.get("count"), Some(&AttributeValue::Number(3.0)));
        assert_eq!(tag.attributes.get("open"), Some(&AttributeValue::Boolean(true)));
    }

    #[test]
    fn parses_self_closing_and_closing() {
        let Ok(Annotation::Open(tag)) =
            parse_annotation(r#" emoji symbol="🎉" alt="party" /"#)
        else {
            panic!("expected an opening tag");
        };
        assert!(tag.self_closing);
        assert_eq!(tag.attributes.len(), 2);

        assert_eq!(
            parse_annotation(" /hint "),
            Ok(Annotation::Close("hint".to_string()))
        );
    }

    #[test]
    fn parses_shorthand_attributes() {
        let Ok(Annotation::Attributes(attrs)) = parse_annotation(" #some-id .a .b ") else {
            panic!("expected attributes");
        };
        assert_eq!(attrs.get("id"), Some(&string("some-id")));
        assert_eq!(attrs.get("class"), Some(&string("a b")));
    }

    #[test]
    fn shorthand_id_on_tag() {
        let Ok(Annotation::Open(tag)) = parse_annotation(" details #more ") else {
            panic!("expected an opening tag");
        };
        assert_eq!(tag.name, "details");
        assert_eq!(tag.attributes.get("id"), Some(&string("more")));
    }

    #[test]
    fn rejects_malformed_annotations() {
        assert!(parse_annotation("   ").is_err());
        assert!(parse_annotation("tag other").is_err());
        assert!(parse_annotation("tag x=").is_err());
        assert!(parse_annotation(r#"tag x="open"#).is_err());
        assert!(parse_annotation("tag x=abc").is_err());
        assert!(parse_annotation("#").is_err());
        assert!(parse_annotation("/ bad name").is_err());
        assert!(parse_annotation(" #id /").is_err());
    }

    #[test]
    fn numbers_must_be_finite() {
        for word in ["inf", "-infinity", "NaN", "1e999"] {
            let inner = format!("tag size={}", word);
            assert!(parse_annotation(&inner).is_err(), "{} accepted", word);
        }
        assert!(parse_annotation("tag size=-2.5e3").is_ok());
    }

    #[test]
    fn escaped_quotes_in_strings() {
        let Ok(Annotation::Open(tag)) = parse_annotation(r#"well heading="say \"hi\"""#) else {
            panic!("expected an opening tag");
        };
        assert_eq!(tag.attributes.get("heading"), Some(&string("say \"hi\"")));
    }
}
