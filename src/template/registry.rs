//! Named template registry and compiled-template cache

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::fetch::{HttpFetcher, TemplateFetcher};
use super::render::render;
use crate::value::Context;

/// Errors that can occur during template operations
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template not found in registry
    #[error("template not found: {name}")]
    NotFound { name: String },

    /// Remote template could not be fetched
    #[error("error fetching template {locator}: {message}")]
    Fetch { locator: String, message: String },
}

/// A render function bound to one template string.
///
/// Clones share the same source; compiling the same text twice through a
/// [`TemplateEngine`] hands out clones of one cached value.
#[derive(Clone)]
pub struct CompiledTemplate {
    source: Arc<str>,
}

impl CompiledTemplate {
    fn new(source: &str) -> Self {
        Self {
            source: Arc::from(source),
        }
    }

    /// Render the bound template with `data`; same result as [`render`]
    pub fn render(&self, data: &Context) -> String {
        render(&self.source, data)
    }

    /// The template text this function is bound to
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether two compiled templates are the same cached function
    pub fn same_as(&self, other: &CompiledTemplate) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("source", &self.source)
            .finish()
    }
}

/// Template engine: a registry of named templates plus a cache of compiled
/// render functions keyed by template text.
pub struct TemplateEngine {
    templates: HashMap<String, String>,
    cache: HashMap<String, CompiledTemplate>,
    /// Sources starting with this prefix are fetched instead of stored
    remote_prefix: String,
    fetcher: Box<dyn TemplateFetcher>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .field("remote_prefix", &self.remote_prefix)
            .finish()
    }
}

impl TemplateEngine {
    /// Create an empty engine fetching remote templates over HTTP
    pub fn new() -> Self {
        Self::with_fetcher(HttpFetcher::new())
    }

    /// Create an empty engine with a custom fetcher for remote templates
    pub fn with_fetcher(fetcher: impl TemplateFetcher + 'static) -> Self {
        Self {
            templates: HashMap::new(),
            cache: HashMap::new(),
            remote_prefix: "http".to_string(),
            fetcher: Box::new(fetcher),
        }
    }

    /// Set the prefix that marks a source as a remote locator
    pub fn with_remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefix = prefix.into();
        self
    }

    /// Register a template under `name`, replacing any previous one.
    ///
    /// A remote locator is fetched first and the fetched text is stored;
    /// anything else is stored verbatim. Returns the stored text.
    pub async fn register_template(
        &mut self,
        name: &str,
        source: &str,
    ) -> Result<String, TemplateError> {
        let text = if source.starts_with(&self.remote_prefix) {
            self.fetcher.fetch(source).await?
        } else {
            source.to_string()
        };

        tracing::debug!(template = %name, bytes = text.len(), "registered template");
        self.templates.insert(name.to_string(), text.clone());
        Ok(text)
    }

    /// Get a registered template's text
    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(|s| s.as_str())
    }

    /// Check if a template exists
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Get all template names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(|s| s.as_str())
    }

    /// Render an arbitrary template string
    pub fn render(&self, template: &str, data: &Context) -> String {
        render(template, data)
    }

    /// Render a registered template.
    ///
    /// An unknown name is logged and renders as the empty string.
    pub fn render_named(&self, name: &str, data: &Context) -> String {
        match self.templates.get(name) {
            Some(template) => render(template, data),
            None => {
                tracing::error!(template = %name, "{}", TemplateError::NotFound { name: name.to_string() });
                String::new()
            }
        }
    }

    /// Compile a template into a reusable render function.
    ///
    /// Cached by the literal template text. The cache only saves the wrapper;
    /// every call still scans the text.
    pub fn compile(&mut self, template: &str) -> CompiledTemplate {
        if let Some(compiled) = self.cache.get(template) {
            return compiled.clone();
        }

        let compiled = CompiledTemplate::new(template);
        self.cache.insert(template.to_string(), compiled.clone());
        compiled
    }

    /// Number of distinct compiled templates held in the cache
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every registered template and compiled function
    pub fn reset(&mut self) {
        self.templates.clear();
        self.cache.clear();
    }
}
