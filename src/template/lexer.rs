//! Lexer for the placeholder language using logos
//!
//! Every byte of a template belongs to exactly one token: tags are recognised
//! wherever they start, everything else is literal text. Text runs stop at each
//! `{` so a tag can never be swallowed by the run before it.

use logos::{Lexer, Logos};

/// Byte range in template source
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'s> {
    // Block tags
    #[regex(r"\{\{#if\s+[A-Za-z0-9_]+\}\}", block_name)]
    IfOpen(&'s str),
    #[token("{{/if}}")]
    IfClose,
    #[regex(r"\{\{#each\s+[A-Za-z0-9_]+\}\}", block_name)]
    EachOpen(&'s str),
    #[token("{{/each}}")]
    EachClose,

    // Placeholders
    #[regex(r"\{\{[A-Za-z0-9_]+\}\}", variable_name)]
    Variable(&'s str),

    // Literal text
    #[regex(r"[^{]+")]
    Text,
    #[token("{")]
    Brace,
}

fn block_name<'s>(lex: &mut Lexer<'s, Token<'s>>) -> &'s str {
    let tag = lex.slice();
    tag[..tag.len() - 2]
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
}

fn variable_name<'s>(lex: &mut Lexer<'s, Token<'s>>) -> &'s str {
    let tag = lex.slice();
    &tag[2..tag.len() - 2]
}

/// The two kinds of block the language knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// `{{#if name}}...{{/if}}`
    Conditional,
    /// `{{#each name}}...{{/each}}`
    Repetition,
}

impl BlockKind {
    /// Tag keyword used in the opener
    pub fn keyword(self) -> &'static str {
        match self {
            BlockKind::Conditional => "if",
            BlockKind::Repetition => "each",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.keyword())
    }
}

impl<'s> Token<'s> {
    /// Identifier of the block this token opens, if it opens one of `kind`
    pub fn opens(&self, kind: BlockKind) -> Option<&'s str> {
        match (self, kind) {
            (Token::IfOpen(name), BlockKind::Conditional) => Some(name),
            (Token::EachOpen(name), BlockKind::Repetition) => Some(name),
            _ => None,
        }
    }

    /// Whether this token closes a block of `kind`
    pub fn closes(&self, kind: BlockKind) -> bool {
        matches!(
            (self, kind),
            (Token::IfClose, BlockKind::Conditional) | (Token::EachClose, BlockKind::Repetition)
        )
    }
}

/// Tokenize a template into tokens with their byte spans.
///
/// Bytes logos cannot classify are reported as `Text`; in practice every
/// input lexes cleanly because the two text patterns cover all bytes.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Span)> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| (result.unwrap_or(Token::Text), span))
        .collect()
}
