//! Page-mutation boundary
//!
//! The lifecycle manager never touches a document directly. The hosting
//! environment supplies a [`Page`] that resolves locators, loads style and
//! script resources, and creates, tags, inserts and removes elements.

mod memory;

pub use memory::{MemoryPage, ResourceEvent, ResourcePhase};

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Handle to an element owned by a [`Page`].
///
/// The number is whatever the page uses to find the element again; the
/// loader only copies handles around and hands them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// The page's own index for this element
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for ElementId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// External resource categories a fragment can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Style,
    Script,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Style => write!(f, "style"),
            ResourceKind::Script => write!(f, "script"),
        }
    }
}

/// Errors reported by a page implementation
#[derive(Debug, Error)]
pub enum PageError {
    /// A style or script resource failed to load
    #[error("failed to load {kind} resource '{url}'")]
    ResourceFailed { kind: ResourceKind, url: String },

    /// The handle does not refer to a live element
    #[error("unknown element {0}")]
    UnknownElement(ElementId),
}

/// The page operations the lifecycle manager consumes.
///
/// Implementations run on a single cooperative thread, so futures need not be
/// `Send`.
#[async_trait(?Send)]
pub trait Page {
    /// Resolve a locator to a mount point
    fn resolve(&self, locator: &str) -> Option<ElementId>;

    /// Attach and load an external resource, completing when it has loaded
    async fn load_resource(&self, kind: ResourceKind, url: &str) -> Result<(), PageError>;

    /// Create a detached element
    fn create_element(&self, tag: &str) -> ElementId;

    /// Add a class to an element
    fn add_class(&self, element: ElementId, class: &str) -> Result<(), PageError>;

    /// Set an attribute on an element
    fn set_attribute(&self, element: ElementId, name: &str, value: &str)
        -> Result<(), PageError>;

    /// Replace an element's content with markup
    fn set_inner_html(&self, element: ElementId, html: &str) -> Result<(), PageError>;

    /// Append `child` as the last child of `parent`
    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), PageError>;

    /// Every attached element whose attribute `name` equals `value`, in
    /// document order
    fn query_attribute(&self, name: &str, value: &str) -> Vec<ElementId>;

    /// Detach an element from the page
    fn remove(&self, element: ElementId) -> Result<(), PageError>;
}
