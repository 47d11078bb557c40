//! Template expansion
//!
//! Rendering runs three passes over the template text, each on the output of
//! the previous one:
//!
//! 1. every top-level key of the data replaces its `{{key}}` placeholder
//!    anywhere in the string, block bodies included;
//! 2. conditional blocks are kept or dropped;
//! 3. repetition blocks are expanded once per item.
//!
//! Because pass 1 is global, a top-level key shadows an item key of the same
//! name inside repetition blocks.

use serde_json::Value;

use super::lexer::{tokenize, BlockKind, Span};
use crate::value::{is_present_and_truthy, placeholder_text, Context};

/// One piece of a template as seen by a single block pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'s> {
    /// Text outside any block of the scanned kind
    Literal(&'s str),
    /// A block of the scanned kind with its identifier and inner content
    Block {
        name: &'s str,
        body: &'s str,
        span: Span,
    },
}

/// Split a template into a flat sequence of literals and blocks of `kind`.
///
/// An opener is matched with the first closer of the same kind that follows
/// it. Blocks do not nest: an inner opener of the same kind ends up inside the
/// body and its closer is left behind as literal text.
pub fn segments(source: &str, kind: BlockKind) -> Vec<Segment<'_>> {
    let tokens = tokenize(source);
    let mut out = Vec::new();
    let mut cursor = 0;
    let mut i = 0;

    while i < tokens.len() {
        let (token, open) = &tokens[i];
        if let Some(name) = token.opens(kind) {
            let close = tokens[i + 1..]
                .iter()
                .position(|(t, _)| t.closes(kind))
                .map(|offset| i + 1 + offset);

            let Some(j) = close else {
                // No closer anywhere after this opener, so none of the
                // remaining openers can match either.
                break;
            };

            let close = &tokens[j].1;
            if cursor < open.start {
                out.push(Segment::Literal(&source[cursor..open.start]));
            }
            out.push(Segment::Block {
                name,
                body: &source[open.end..close.start],
                span: open.start..close.end,
            });
            cursor = close.end;
            i = j + 1;
            continue;
        }
        i += 1;
    }

    if cursor < source.len() {
        out.push(Segment::Literal(&source[cursor..]));
    }
    out
}

/// Render a template against a data context.
///
/// Rendering is pure and never fails: unknown placeholders are left in place,
/// blocks whose data is missing or of the wrong shape expand to nothing.
pub fn render(template: &str, data: &Context) -> String {
    let substituted = substitute(template, data);
    let conditionals = expand_conditionals(&substituted, data);
    expand_repetitions(&conditionals, data)
}

/// Replace `{{key}}` for every key of `data`, in key order.
fn substitute(template: &str, data: &Context) -> String {
    let mut result = template.to_string();
    for (key, value) in data {
        let placeholder = format!("{{{{{}}}}}", key);
        if result.contains(&placeholder) {
            result = result.replace(&placeholder, &placeholder_text(value));
        }
    }
    result
}

fn expand_conditionals(source: &str, data: &Context) -> String {
    let mut out = String::with_capacity(source.len());
    for segment in segments(source, BlockKind::Conditional) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Block { name, body, .. } => {
                if is_present_and_truthy(data.get(name)) {
                    out.push_str(body);
                }
            }
        }
    }
    out
}

fn expand_repetitions(source: &str, data: &Context) -> String {
    let mut out = String::with_capacity(source.len());
    for segment in segments(source, BlockKind::Repetition) {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Block { name, body, .. } => {
                if let Some(Value::Array(items)) = data.get(name) {
                    for item in items {
                        out.push_str(&expand_item(body, item));
                    }
                }
            }
        }
    }
    out
}

/// Expand one repetition body for one item. Only mapping items contribute
/// substitutions; any other item yields the body unchanged.
fn expand_item(body: &str, item: &Value) -> String {
    match item {
        Value::Object(fields) => substitute(body, fields),
        _ => body.to_string(),
    }
}
