//! Fragment Composer - compose pages from reusable markup fragments
//!
//! This library provides a small placeholder template engine and a lifecycle
//! manager that loads named fragments (template, styles, scripts, default data
//! and callbacks) into a page and removes them again.
//!
//! # Example
//!
//! ```rust
//! use fragment_composer::{render, Context};
//! use serde_json::json;
//!
//! let data: Context = json!({"name": "World"}).as_object().cloned().unwrap();
//! assert_eq!(render("Hello {{name}}!", &data), "Hello World!");
//! ```

pub mod error;
pub mod loader;
pub mod manifest;
pub mod page;
pub mod template;
pub mod value;

pub use error::CallbackError;
pub use loader::{
    hook_fn, FragmentDefinition, FragmentLoader, Hook, HookContext, HookStage, LifecycleError,
    LoaderConfig,
};
pub use manifest::{Manifest, ManifestError, MountSpec};
pub use page::{ElementId, MemoryPage, Page, PageError, ResourceKind};
pub use template::{lint, render, CompiledTemplate, TemplateEngine, TemplateError};
pub use value::Context;

use std::path::Path;

use thiserror::Error;

/// Errors that can occur while composing a page from a manifest
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The manifest could not be read or is invalid
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Page regions could not be created
    #[error("page error: {0}")]
    Page(#[from] PageError),

    /// A lifecycle failure escaped a load
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Result of composing a page
#[derive(Debug)]
pub struct Composition {
    /// Serialised page after every mount was attempted
    pub html: String,
    /// Fragment names marked loaded, in load order
    pub loaded: Vec<String>,
    /// Mounts whose load reported failure
    pub failed: Vec<MountSpec>,
}

impl Composition {
    /// Whether every mount succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Compose a page from a manifest file
pub async fn compose_file(path: &Path) -> Result<Composition, ComposeError> {
    let manifest = Manifest::from_file(path)?;
    compose(&manifest).await
}

/// Compose a page from a parsed manifest.
///
/// Builds a [`MemoryPage`] with one `<div id=...>` per region, registers the
/// manifest's fragments and loads each mount in order. A failed mount is
/// recorded and composition carries on with the next one.
pub async fn compose(manifest: &Manifest) -> Result<Composition, ComposeError> {
    let page = MemoryPage::new();
    for region in &manifest.page.regions {
        page.append_element(page.body(), "div", Some(region))?;
    }

    let loader = FragmentLoader::with_config(page, manifest.config.clone());
    manifest.register_all(&loader);

    let mut failed = Vec::new();
    for mount in &manifest.mounts {
        let ok = loader
            .load(&mount.fragment, &mount.target, mount.data.clone())
            .await?;
        if !ok {
            tracing::warn!(fragment = %mount.fragment, target = %mount.target, "mount failed");
            failed.push(mount.clone());
        }
    }

    Ok(Composition {
        html: loader.page().to_html(),
        loaded: loader.list_loaded(),
        failed,
    })
}
