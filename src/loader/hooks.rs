//! Lifecycle hook pipeline
//!
//! Four fixed stages, each an append-only list of hooks run one after another.
//! A hook sees the [`HookContext`] left by the hooks before it.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::CallbackError;
use crate::page::ElementId;
use crate::value::Context;

/// Points in the load/unload sequence where hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    BeforeLoad,
    AfterLoad,
    BeforeUnload,
    AfterUnload,
}

impl HookStage {
    pub const ALL: [HookStage; 4] = [
        HookStage::BeforeLoad,
        HookStage::AfterLoad,
        HookStage::BeforeUnload,
        HookStage::AfterUnload,
    ];

    /// Stage name as used by [`FragmentLoader::add_hook`](super::FragmentLoader::add_hook)
    pub fn as_str(self) -> &'static str {
        match self {
            HookStage::BeforeLoad => "beforeLoad",
            HookStage::AfterLoad => "afterLoad",
            HookStage::BeforeUnload => "beforeUnload",
            HookStage::AfterUnload => "afterUnload",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a stage name that is not one of the four stages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for HookStage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HookStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Value handed along a stage's hooks.
///
/// `beforeLoad` gets the name and caller data, `afterLoad` the name and the
/// new root, the unload stages only the name. Changes a `beforeLoad` hook
/// makes to `data` are what the load goes on to merge and render.
#[derive(Debug, Clone, PartialEq)]
pub struct HookContext {
    pub name: String,
    pub data: Option<Context>,
    pub element: Option<ElementId>,
}

impl HookContext {
    pub(crate) fn before_load(name: &str, data: Context) -> Self {
        Self {
            name: name.to_string(),
            data: Some(data),
            element: None,
        }
    }

    pub(crate) fn after_load(name: &str, element: ElementId) -> Self {
        Self {
            name: name.to_string(),
            data: None,
            element: Some(element),
        }
    }

    pub(crate) fn unload(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data: None,
            element: None,
        }
    }
}

/// A callback attached to a hook stage
#[async_trait(?Send)]
pub trait Hook {
    async fn call(&self, ctx: &mut HookContext) -> Result<(), CallbackError>;
}

/// Hook wrapping a synchronous closure; see [`hook_fn`]
pub struct FnHook<F>(F);

#[async_trait(?Send)]
impl<F> Hook for FnHook<F>
where
    F: Fn(&mut HookContext) -> Result<(), CallbackError>,
{
    async fn call(&self, ctx: &mut HookContext) -> Result<(), CallbackError> {
        (self.0)(ctx)
    }
}

/// Turn a synchronous closure into a [`Hook`]
pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: Fn(&mut HookContext) -> Result<(), CallbackError>,
{
    FnHook(f)
}

/// Ordered hook lists for every stage
#[derive(Default)]
pub(crate) struct HookPipeline {
    stages: HashMap<HookStage, Vec<Rc<dyn Hook>>>,
}

impl HookPipeline {
    pub(crate) fn push(&mut self, stage: HookStage, hook: Rc<dyn Hook>) {
        self.stages.entry(stage).or_default().push(hook);
    }

    pub(crate) fn get(&self, stage: HookStage, index: usize) -> Option<Rc<dyn Hook>> {
        self.stages.get(&stage).and_then(|hooks| hooks.get(index)).cloned()
    }

    pub(crate) fn len(&self, stage: HookStage) -> usize {
        self.stages.get(&stage).map_or(0, Vec::len)
    }

    pub(crate) fn clear(&mut self) {
        self.stages.clear();
    }
}
