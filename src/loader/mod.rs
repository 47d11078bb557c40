//! Fragment lifecycle manager
//!
//! Holds the registry of fragment definitions and drives loading and
//! unloading against a [`Page`]:
//!
//! ```text
//! load:   beforeLoad hooks
//!         ┌─ failure boundary ──────────────────────────────────────┐
//!         │ resolve target → styles → scripts → merge data → render │
//!         │ → mount root → on_init → mark loaded → afterLoad hooks   │
//!         └──────────────────────────────────────────────────────────┘
//! unload: beforeUnload hooks → on_destroy + remove every tagged root
//!         → clear loaded flag → afterUnload hooks
//! ```
//!
//! Failures inside the boundary are logged and turn into `Ok(false)`; nothing
//! already done is undone. A failing `beforeLoad` hook, and any failure during
//! unload, is returned to the caller as a [`LifecycleError`].
//!
//! Only one "loaded" flag is kept per name. Loading a fragment twice mounts
//! two roots; unloading removes every root tagged with the name.

mod config;
mod definition;
mod error;
mod hooks;

pub use config::LoaderConfig;
pub use definition::{DestroyFn, FragmentDefinition, InitFn};
pub use error::{LifecycleError, LoadError};
pub use hooks::{hook_fn, FnHook, Hook, HookContext, HookStage, UnknownStage};

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::try_join_all;
use tracing::{debug, error, info, trace};

use crate::error::CallbackError;
use crate::page::{ElementId, Page, PageError, ResourceKind};
use crate::template::render;
use crate::value::Context;
use hooks::HookPipeline;

/// Registry of fragment definitions plus the load/unload state machine.
///
/// All state lives behind `RefCell`s and no borrow is held across an await,
/// so overlapping loads and unloads on one thread interleave freely.
pub struct FragmentLoader<P: Page> {
    page: P,
    config: LoaderConfig,
    fragments: RefCell<HashMap<String, Rc<FragmentDefinition>>>,
    loaded: RefCell<Vec<String>>,
    hooks: RefCell<HookPipeline>,
}

impl<P: Page> FragmentLoader<P> {
    /// Create a loader over `page` with the default configuration
    pub fn new(page: P) -> Self {
        Self::with_config(page, LoaderConfig::default())
    }

    /// Create a loader over `page` with a custom configuration
    pub fn with_config(page: P, config: LoaderConfig) -> Self {
        Self {
            page,
            config,
            fragments: RefCell::new(HashMap::new()),
            loaded: RefCell::new(Vec::new()),
            hooks: RefCell::new(HookPipeline::default()),
        }
    }

    /// The page fragments are mounted into
    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Register a definition under `name`, replacing any previous one
    pub fn register(&self, name: &str, mut definition: FragmentDefinition) {
        definition.name = name.to_string();
        let replaced = self
            .fragments
            .borrow_mut()
            .insert(name.to_string(), Rc::new(definition))
            .is_some();
        debug!(fragment = %name, replaced, "registered fragment");
    }

    /// Check if a fragment is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.fragments.borrow().contains_key(name)
    }

    /// Get a registered definition
    pub fn definition(&self, name: &str) -> Option<Rc<FragmentDefinition>> {
        self.fragments.borrow().get(name).cloned()
    }

    /// Names of all registered fragments, sorted
    pub fn registered(&self) -> Vec<String> {
        let mut names: Vec<String> = self.fragments.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Append a hook to the stage called `stage`.
    ///
    /// Stage names are `beforeLoad`, `afterLoad`, `beforeUnload` and
    /// `afterUnload`; any other name is ignored.
    pub fn add_hook(&self, stage: &str, hook: impl Hook + 'static) {
        match stage.parse::<HookStage>() {
            Ok(stage) => self.add_stage_hook(stage, hook),
            Err(e) => trace!(error = %e, "ignoring hook"),
        }
    }

    /// Append a hook to a stage
    pub fn add_stage_hook(&self, stage: HookStage, hook: impl Hook + 'static) {
        self.hooks.borrow_mut().push(stage, Rc::new(hook));
    }

    /// Number of hooks registered for a stage
    pub fn hook_count(&self, stage: HookStage) -> usize {
        self.hooks.borrow().len(stage)
    }

    /// Whether at least one load of `name` succeeded since it was last unloaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.borrow().iter().any(|n| n == name)
    }

    /// Loaded fragment names in the order they were first marked loaded
    pub fn list_loaded(&self) -> Vec<String> {
        self.loaded.borrow().clone()
    }

    /// Forget every definition, hook and loaded flag. The page is untouched.
    pub fn reset(&self) {
        self.fragments.borrow_mut().clear();
        self.loaded.borrow_mut().clear();
        self.hooks.borrow_mut().clear();
    }

    /// Load fragment `name` into the element `target` resolves to.
    ///
    /// Returns `Ok(true)` once the root is mounted and every hook ran,
    /// `Ok(false)` for an unknown fragment or any failure after the
    /// `beforeLoad` hooks. Only a failing `beforeLoad` hook yields `Err`.
    pub async fn load(
        &self,
        name: &str,
        target: &str,
        data: Context,
    ) -> Result<bool, LifecycleError> {
        let Some(definition) = self.definition(name) else {
            error!(fragment = %name, "fragment not found");
            return Ok(false);
        };

        let mut ctx = HookContext::before_load(name, data);
        self.run_hooks(HookStage::BeforeLoad, &mut ctx)
            .await
            .map_err(|source| LifecycleError::Hook {
                stage: HookStage::BeforeLoad,
                fragment: name.to_string(),
                source,
            })?;
        let data = ctx.data.unwrap_or_default();

        match self.mount(&definition, target, data).await {
            Ok(root) => {
                info!(fragment = %name, %target, %root, "fragment loaded");
                Ok(true)
            }
            Err(e) => {
                error!(fragment = %name, %target, error = %e, "error loading fragment");
                Ok(false)
            }
        }
    }

    /// Unload every mounted root of fragment `name`.
    ///
    /// Returns `Ok(false)` without running hooks for an unknown fragment and
    /// `Ok(true)` otherwise, even when nothing was mounted.
    pub async fn unload(&self, name: &str) -> Result<bool, LifecycleError> {
        let Some(definition) = self.definition(name) else {
            debug!(fragment = %name, "unload of unregistered fragment");
            return Ok(false);
        };

        let hook_error = |stage: HookStage| {
            move |source: CallbackError| LifecycleError::Hook {
                stage,
                fragment: name.to_string(),
                source,
            }
        };
        let page_error = |source: PageError| LifecycleError::Page {
            fragment: name.to_string(),
            source,
        };

        let mut ctx = HookContext::unload(name);
        self.run_hooks(HookStage::BeforeUnload, &mut ctx)
            .await
            .map_err(hook_error(HookStage::BeforeUnload))?;

        let roots = self.page.query_attribute(&self.config.marker_attribute, name);
        for root in &roots {
            definition
                .destroy(*root)
                .map_err(|source| LifecycleError::Destroy {
                    fragment: name.to_string(),
                    source,
                })?;
            self.page.remove(*root).map_err(page_error)?;
        }

        self.loaded.borrow_mut().retain(|n| n != name);

        let mut ctx = HookContext::unload(name);
        self.run_hooks(HookStage::AfterUnload, &mut ctx)
            .await
            .map_err(hook_error(HookStage::AfterUnload))?;

        info!(fragment = %name, roots = roots.len(), "fragment unloaded");
        Ok(true)
    }

    /// Everything after the `beforeLoad` hooks; any error here is the
    /// load's failure boundary.
    async fn mount(
        &self,
        definition: &FragmentDefinition,
        target: &str,
        data: Context,
    ) -> Result<ElementId, LoadError> {
        let name = definition.name();
        let mount_point = self
            .page
            .resolve(target)
            .ok_or_else(|| LoadError::MountNotFound {
                locator: target.to_string(),
            })?;

        self.load_resources(ResourceKind::Style, definition.styles())
            .await?;
        self.load_resources(ResourceKind::Script, definition.scripts())
            .await?;

        let merged = definition.merged_data(data);
        let markup = render(definition.template(), &merged);

        let root = self.page.create_element(&self.config.container_tag);
        if let Some(class) = &self.config.container_class {
            self.page.add_class(root, class)?;
        }
        self.page
            .set_attribute(root, &self.config.marker_attribute, name)?;
        self.page.set_inner_html(root, &markup)?;
        self.page.append_child(mount_point, root)?;

        definition.init(root, &merged).map_err(LoadError::Init)?;
        self.mark_loaded(name);

        let mut ctx = HookContext::after_load(name, root);
        self.run_hooks(HookStage::AfterLoad, &mut ctx)
            .await
            .map_err(LoadError::AfterLoad)?;

        Ok(root)
    }

    /// Load one phase of resources concurrently; the first failure wins
    async fn load_resources(&self, kind: ResourceKind, urls: &[String]) -> Result<(), PageError> {
        if urls.is_empty() {
            return Ok(());
        }
        debug!(%kind, count = urls.len(), "loading resources");
        try_join_all(urls.iter().map(|url| self.page.load_resource(kind, url))).await?;
        Ok(())
    }

    fn mark_loaded(&self, name: &str) {
        let mut loaded = self.loaded.borrow_mut();
        if !loaded.iter().any(|n| n == name) {
            loaded.push(name.to_string());
        }
    }

    /// Run a stage's hooks one at a time.
    ///
    /// The list is re-read before each hook, so a hook appended while the
    /// stage is running still runs in this pass.
    async fn run_hooks(&self, stage: HookStage, ctx: &mut HookContext) -> Result<(), CallbackError> {
        let mut index = 0;
        loop {
            let hook = self.hooks.borrow().get(stage, index);
            let Some(hook) = hook else {
                return Ok(());
            };
            trace!(%stage, index, fragment = %ctx.name, "running hook");
            hook.call(ctx).await?;
            index += 1;
        }
    }
}

impl<P: Page + std::fmt::Debug> std::fmt::Debug for FragmentLoader<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentLoader")
            .field("page", &self.page)
            .field("config", &self.config)
            .field("fragments", &self.registered())
            .field("loaded", &self.loaded.borrow())
            .finish()
    }
}
