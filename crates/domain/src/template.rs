//! Message templates: `"User {UserId} logged in from {@Client}"`.
//!
//! Holes are `{Name}`, optionally prefixed with `@` (destructure) or `$`
//! (stringify), followed by `,alignment` and/or `:format`. `{{` and `}}`
//! are literal braces. Anything that does not parse as a hole is text.

use crate::value::{LogValue, ScalarValue};
use std::fmt::Write as _;

/// One parsed piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    /// Literal text (braces already unescaped).
    Text(String),
    /// A property hole.
    Property(PropertyToken),
}

/// A `{...}` hole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyToken {
    /// Property name.
    pub name: String,
    /// Raw source text, including braces.
    pub raw: String,
    /// Format string after `:`.
    pub format: Option<String>,
    /// Alignment after `,`; negative means left-aligned.
    pub alignment: Option<i32>,
}

impl PropertyToken {
    /// Render this hole on its own, alignment applied. `literal` renders
    /// strings unquoted. A missing property renders the raw hole text.
    #[must_use]
    pub fn render(&self, properties: &[(String, LogValue)], literal: bool) -> String {
        let Some((_, value)) = properties.iter().find(|(name, _)| *name == self.name) else {
            return self.raw.clone();
        };
        let mut rendered = String::new();
        render_value(&mut rendered, value, literal);
        align(rendered, self.alignment)
    }
}

/// A parsed message template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: String,
    tokens: Vec<TemplateToken>,
}

impl MessageTemplate {
    /// Parse template text. Parsing never fails; malformed holes become text.
    #[must_use]
    pub fn parse(text: impl Into<String>) -> Self {
        let text = text.into();
        let tokens = tokenize(&text);
        Self { text, tokens }
    }

    /// The raw template text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed tokens in order.
    #[must_use]
    pub fn tokens(&self) -> &[TemplateToken] {
        &self.tokens
    }

    /// Render against ordered properties. Missing properties render as their raw hole.
    #[must_use]
    pub fn render(&self, properties: &[(String, LogValue)]) -> String {
        let mut output = String::with_capacity(self.text.len());
        for token in &self.tokens {
            match token {
                TemplateToken::Text(text) => output.push_str(text),
                TemplateToken::Property(hole) => {
                    let literal = hole.format.as_deref() == Some("l");
                    output.push_str(&hole.render(properties, literal));
                },
            }
        }
        output
    }
}

fn tokenize(text: &str) -> Vec<TemplateToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("{{").or_else(|| rest.strip_prefix("}}")) {
            literal.push(ch);
            rest = after;
            continue;
        }
        if ch == '{'
            && let Some(end) = rest.find('}')
            && let (Some(raw), Some(after)) = (rest.get(..=end), rest.get(end + 1..))
            && let Some(hole) = parse_hole(raw)
        {
            if !literal.is_empty() {
                tokens.push(TemplateToken::Text(std::mem::take(&mut literal)));
            }
            tokens.push(TemplateToken::Property(hole));
            rest = after;
            continue;
        }
        literal.push(ch);
        rest = rest.get(ch.len_utf8()..).unwrap_or_default();
    }

    if !literal.is_empty() {
        tokens.push(TemplateToken::Text(literal));
    }
    tokens
}

fn parse_hole(raw: &str) -> Option<PropertyToken> {
    let inner = raw.strip_prefix('{')?.strip_suffix('}')?;
    if inner.contains('{') {
        return None;
    }
    let inner = inner.strip_prefix(['@', '$']).unwrap_or(inner);
    let (head, format) = match inner.split_once(':') {
        Some((head, format)) => (head, Some(format.to_owned())),
        None => (inner, None),
    };
    let (name, alignment) = match head.split_once(',') {
        Some((name, alignment)) => (name, Some(alignment.trim().parse::<i32>().ok()?)),
        None => (head, None),
    };
    let valid_name = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.');
    valid_name.then(|| PropertyToken {
        name: name.to_owned(),
        raw: raw.to_owned(),
        format,
        alignment,
    })
}

/// Widest padding a hole may request.
const MAX_ALIGNMENT: usize = 4096;

fn align(rendered: String, alignment: Option<i32>) -> String {
    let Some(alignment) = alignment else {
        return rendered;
    };
    let width = usize::try_from(alignment.unsigned_abs())
        .unwrap_or(usize::MAX)
        .min(MAX_ALIGNMENT);
    if alignment < 0 {
        format!("{rendered:<width$}")
    } else {
        format!("{rendered:>width$}")
    }
}

fn render_value(output: &mut String, value: &LogValue, literal: bool) {
    match value {
        LogValue::Scalar(scalar) => render_scalar(output, scalar, literal),
        LogValue::Structure {
            type_tag,
            properties,
        } => {
            if let Some(tag) = type_tag {
                output.push_str(tag);
                output.push(' ');
            }
            output.push_str("{ ");
            for (index, (name, value)) in properties.iter().enumerate() {
                if index > 0 {
                    output.push_str(", ");
                }
                output.push_str(name);
                output.push_str(": ");
                render_value(output, value, false);
            }
            output.push_str(" }");
        },
        LogValue::Dictionary(entries) => {
            output.push('[');
            for (index, (key, value)) in entries.iter().enumerate() {
                if index > 0 {
                    output.push_str(", ");
                }
                output.push('(');
                render_scalar(output, key, false);
                output.push_str(": ");
                render_value(output, value, false);
                output.push(')');
            }
            output.push(']');
        },
        LogValue::Sequence(elements) => {
            output.push('[');
            for (index, element) in elements.iter().enumerate() {
                if index > 0 {
                    output.push_str(", ");
                }
                render_value(output, element, false);
            }
            output.push(']');
        },
    }
}

fn render_scalar(output: &mut String, scalar: &ScalarValue, literal: bool) {
    match scalar {
        ScalarValue::String(text) if !literal => {
            let _ = write!(output, "{text:?}");
        },
        other => {
            let _ = write!(output, "{other}");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: &[(&str, LogValue)]) -> Vec<(String, LogValue)> {
        entries
            .iter()
            .map(|(name, value)| ((*name).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn renders_scalars_with_quoted_strings() {
        let template = MessageTemplate::parse("User {UserId} said {Text}");
        let rendered = template.render(&props(&[
            ("UserId", LogValue::from(42)),
            ("Text", LogValue::from("hi")),
        ]));
        assert_eq!(rendered, "User 42 said \"hi\"");
    }

    #[test]
    fn literal_format_drops_quotes() {
        let template = MessageTemplate::parse("{Name:l}!");
        assert_eq!(template.render(&props(&[("Name", LogValue::from("x"))])), "x!");
    }

    #[test]
    fn alignment_width_is_capped() {
        let template = MessageTemplate::parse("{X,2000000000}|{X,-2000000000}");
        let rendered = template.render(&props(&[("X", LogValue::from(1))]));
        assert_eq!(rendered.len(), MAX_ALIGNMENT * 2 + 1);
        assert!(rendered.starts_with(' '));
        assert!(rendered.ends_with(' '));
    }

    #[test]
    fn single_holes_render_with_alignment() -> Result<(), String> {
        let template = MessageTemplate::parse("{Name,6:x}");
        let Some(TemplateToken::Property(hole)) = template.tokens().first() else {
            return Err("expected a hole".to_owned());
        };
        let properties = props(&[("Name", LogValue::from("bob"))]);
        assert_eq!(hole.render(&properties, true), "   bob");
        assert_eq!(hole.render(&properties, false), " \"bob\"");
        assert_eq!(hole.render(&[], true), "{Name,6:x}");
        Ok(())
    }

    #[test]
    fn missing_properties_render_raw_hole() {
        let template = MessageTemplate::parse("Hello {Who}");
        assert_eq!(template.render(&[]), "Hello {Who}");
    }

    #[test]
    fn escaped_braces_and_malformed_holes_are_text() {
        let template = MessageTemplate::parse("{{literal}} {not closed");
        assert_eq!(template.render(&[]), "{literal} {not closed");
        assert!(
            template
                .tokens()
                .iter()
                .all(|token| matches!(token, TemplateToken::Text(_)))
        );
    }

    #[test]
    fn destructured_structures_and_alignment() {
        let template = MessageTemplate::parse("[{Level,-5}] {@Order}");
        let order = LogValue::structure(
            Some("Order"),
            [("Id", LogValue::from(7)), ("Tags", LogValue::sequence([LogValue::from("a")]))],
        );
        let rendered = template.render(&props(&[("Level", LogValue::from(1)), ("Order", order)]));
        assert_eq!(rendered, "[1    ] Order { Id: 7, Tags: [\"a\"] }");
    }

    #[test]
    fn dictionaries_render_as_pairs() {
        let template = MessageTemplate::parse("{Map}");
        let map = LogValue::dictionary([("a", LogValue::from(1))]);
        assert_eq!(template.render(&props(&[("Map", map)])), "[(\"a\": 1)]");
    }
}
