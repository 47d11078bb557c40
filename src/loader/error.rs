//! Error types for the fragment lifecycle

use thiserror::Error;

use super::hooks::HookStage;
use crate::error::CallbackError;
use crate::page::PageError;

/// Why a load gave up inside its failure boundary.
///
/// These never reach the caller of [`load`](super::FragmentLoader::load);
/// they are logged and the load reports `false`.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The target locator matched nothing
    #[error("target element \"{locator}\" not found")]
    MountNotFound { locator: String },

    /// A resource failed to load or the page rejected an operation
    #[error(transparent)]
    Page(#[from] PageError),

    /// The fragment's init callback failed
    #[error("init callback failed: {0}")]
    Init(CallbackError),

    /// An afterLoad hook failed
    #[error("afterLoad hook failed: {0}")]
    AfterLoad(CallbackError),
}

/// Failures that escape a lifecycle operation to its caller.
///
/// For `load` this is only a failing `beforeLoad` hook. `unload` has no
/// failure boundary, so any of its hooks, an `on_destroy` callback, or the
/// page refusing a removal ends up here.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A hook in `stage` failed
    #[error("{stage} hook failed for fragment '{fragment}': {source}")]
    Hook {
        stage: HookStage,
        fragment: String,
        source: CallbackError,
    },

    /// A destroy callback failed
    #[error("destroy callback failed for fragment '{fragment}': {source}")]
    Destroy {
        fragment: String,
        source: CallbackError,
    },

    /// The page could not remove a root
    #[error("page error while unloading '{fragment}': {source}")]
    Page { fragment: String, source: PageError },
}

impl LifecycleError {
    /// Stage of the failing hook, if a hook failed
    pub fn stage(&self) -> Option<HookStage> {
        match self {
            LifecycleError::Hook { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
