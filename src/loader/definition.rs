//! Fragment definitions

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::CallbackError;
use crate::page::ElementId;
use crate::value::Context;

/// Callback run right after a fragment root is mounted
pub type InitFn = Rc<dyn Fn(ElementId, &Context) -> Result<(), CallbackError>>;

/// Callback run for each fragment root just before it is removed
pub type DestroyFn = Rc<dyn Fn(ElementId) -> Result<(), CallbackError>>;

/// Everything needed to mount a fragment: markup, resources, default data
/// and lifecycle callbacks.
///
/// The name is assigned when the definition is registered.
#[derive(Clone, Default)]
pub struct FragmentDefinition {
    pub(crate) name: String,
    template: String,
    styles: Vec<String>,
    scripts: Vec<String>,
    default_data: Context,
    on_init: Option<InitFn>,
    on_destroy: Option<DestroyFn>,
}

impl fmt::Debug for FragmentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FragmentDefinition")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("styles", &self.styles)
            .field("scripts", &self.scripts)
            .field("default_data", &self.default_data)
            .field("on_init", &self.on_init.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

impl FragmentDefinition {
    /// Create a definition with the given template and nothing else
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ..Self::default()
        }
    }

    /// Add a stylesheet locator
    pub fn with_style(mut self, url: impl Into<String>) -> Self {
        self.styles.push(url.into());
        self
    }

    /// Add several stylesheet locators, in order
    pub fn with_styles<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Add a script locator
    pub fn with_script(mut self, url: impl Into<String>) -> Self {
        self.scripts.push(url.into());
        self
    }

    /// Add several script locators, in order
    pub fn with_scripts<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripts.extend(urls.into_iter().map(Into::into));
        self
    }

    /// Replace the default data
    pub fn with_default_data(mut self, data: Context) -> Self {
        self.default_data = data;
        self
    }

    /// Set one default data entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.default_data.insert(key.into(), value.into());
        self
    }

    /// Set the callback run after mounting
    pub fn on_init<F>(mut self, callback: F) -> Self
    where
        F: Fn(ElementId, &Context) -> Result<(), CallbackError> + 'static,
    {
        self.on_init = Some(Rc::new(callback));
        self
    }

    /// Set the callback run before each root is removed
    pub fn on_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(ElementId) -> Result<(), CallbackError> + 'static,
    {
        self.on_destroy = Some(Rc::new(callback));
        self
    }

    /// Name the definition was registered under; empty before registration
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn styles(&self) -> &[String] {
        &self.styles
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn default_data(&self) -> &Context {
        &self.default_data
    }

    /// Defaults overlaid with `data`; caller keys win, top level only
    pub fn merged_data(&self, data: Context) -> Context {
        let mut merged = self.default_data.clone();
        for (key, value) in data {
            merged.insert(key, value);
        }
        merged
    }

    pub(crate) fn init(&self, root: ElementId, data: &Context) -> Result<(), CallbackError> {
        match &self.on_init {
            Some(callback) => callback(root, data),
            None => Ok(()),
        }
    }

    pub(crate) fn destroy(&self, root: ElementId) -> Result<(), CallbackError> {
        match &self.on_destroy {
            Some(callback) => callback(root),
            None => Ok(()),
        }
    }
}
