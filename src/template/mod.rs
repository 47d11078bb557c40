//! Template engine for fragment markup
//!
//! Templates are plain strings with three kinds of tag:
//!
//! ```text
//! <h1>{{title}}</h1>
//! {{#if showNav}}<nav>...</nav>{{/if}}
//! {{#each navItems}}<a href="{{url}}">{{label}}</a>{{/each}}
//! ```
//!
//! Blocks of the same kind do not nest. See [`render`] for the exact
//! expansion order.

mod fetch;
mod lexer;
mod lint;
mod registry;
mod render;

pub use fetch::{HttpFetcher, TemplateFetcher};
pub use lexer::{tokenize, BlockKind, Span, Token};
pub use lint::{lint, placeholders, TemplateWarning, WarningKind};
pub use registry::{CompiledTemplate, TemplateEngine, TemplateError};
pub use render::{render, segments, Segment};
