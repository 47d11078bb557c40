//! Template lint: flags block tags the flat scan will not pair the way an
//! author probably expects
//!
//! Linting is advisory only. Rendering treats every flagged construct as
//! literal text or flat-scanned content regardless of what lint reports.

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};

use super::lexer::{tokenize, BlockKind, Span, Token};

/// Category of a lint warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Opener with no closer after it
    Unclosed,
    /// Closer with no open block before it
    StrayClose,
    /// Opener inside an open block of the same kind
    Nested,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::Unclosed => write!(f, "unclosed"),
            WarningKind::StrayClose => write!(f, "stray-close"),
            WarningKind::Nested => write!(f, "nested"),
        }
    }
}

/// A single lint finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateWarning {
    pub kind: WarningKind,
    pub block: BlockKind,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for TemplateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {:?}: {}", self.kind, self.span, self.message)
    }
}

impl TemplateWarning {
    /// Format the warning with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Warning, filename, self.span.start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, self.span.clone()))
                    .with_message(format!("{} {} tag", self.kind, self.block))
                    .with_color(Color::Yellow),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Check a template's block tags, returning warnings in source order
pub fn lint(source: &str) -> Vec<TemplateWarning> {
    let tokens = tokenize(source);
    let mut warnings = Vec::new();

    for kind in [BlockKind::Conditional, BlockKind::Repetition] {
        let mut open: Option<(&str, Span)> = None;
        for (token, span) in &tokens {
            if let Some(name) = token.opens(kind) {
                match &open {
                    Some((outer, _)) => warnings.push(TemplateWarning {
                        kind: WarningKind::Nested,
                        block: kind,
                        span: span.clone(),
                        message: format!(
                            "'{}' block '{}' inside '{}' does not nest; the first closer ends '{}'",
                            kind, name, outer, outer
                        ),
                    }),
                    None => open = Some((name, span.clone())),
                }
            } else if token.closes(kind) {
                if open.take().is_none() {
                    warnings.push(TemplateWarning {
                        kind: WarningKind::StrayClose,
                        block: kind,
                        span: span.clone(),
                        message: format!("closing tag for '{}' without an open block", kind),
                    });
                }
            }
        }

        if let Some((name, span)) = open {
            warnings.push(TemplateWarning {
                kind: WarningKind::Unclosed,
                block: kind,
                span,
                message: format!("'{}' block '{}' is never closed and renders literally", kind, name),
            });
        }
    }

    warnings.sort_by_key(|w| w.span.start);
    warnings
}

/// Variables referenced by `{{name}}` placeholders, in first-use order
pub fn placeholders(source: &str) -> Vec<&str> {
    let mut names = Vec::new();
    for (token, _) in tokenize(source) {
        if let Token::Variable(name) = token {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}
