//! In-memory page used by the CLI and tests
//!
//! Elements form a tree under a document root holding `<head>` and `<body>`.
//! Markup assigned with `set_inner_html` is stored as opaque text: it is
//! serialised back out but never parsed into child elements.

use std::cell::RefCell;
use std::collections::HashSet;

use async_trait::async_trait;

use super::{ElementId, Page, PageError, ResourceKind};

/// Stage of a resource load as recorded by [`MemoryPage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePhase {
    Started,
    Finished,
    Failed,
}

/// One entry in the resource activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEvent {
    pub kind: ResourceKind,
    pub url: String,
    pub phase: ResourcePhase,
}

#[derive(Debug)]
struct Node {
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    inner_html: String,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            attributes: Vec::new(),
            inner_html: String::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

const DOCUMENT: ElementId = ElementId(0);
const VOID_TAGS: &[&str] = &["link", "meta", "br", "hr", "img", "input"];

/// A page kept entirely in memory
#[derive(Debug)]
pub struct MemoryPage {
    nodes: RefCell<Vec<Node>>,
    head: ElementId,
    body: ElementId,
    failing: RefCell<HashSet<String>>,
    events: RefCell<Vec<ResourceEvent>>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Create an empty document with `<head>` and `<body>`
    pub fn new() -> Self {
        let mut nodes = vec![Node::new("html"), Node::new("head"), Node::new("body")];
        let head = ElementId(1);
        let body = ElementId(2);
        nodes[0].children = vec![head, body];
        nodes[1].parent = Some(DOCUMENT);
        nodes[2].parent = Some(DOCUMENT);

        Self {
            nodes: RefCell::new(nodes),
            head,
            body,
            failing: RefCell::new(HashSet::new()),
            events: RefCell::new(Vec::new()),
        }
    }

    /// The `<head>` element
    pub fn head(&self) -> ElementId {
        self.head
    }

    /// The `<body>` element
    pub fn body(&self) -> ElementId {
        self.body
    }

    /// Create an element, optionally with an `id`, and append it to `parent`
    pub fn append_element(
        &self,
        parent: ElementId,
        tag: &str,
        id: Option<&str>,
    ) -> Result<ElementId, PageError> {
        let element = self.create_element(tag);
        if let Some(id) = id {
            self.set_attribute(element, "id", id)?;
        }
        self.append_child(parent, element)?;
        Ok(element)
    }

    /// Make every future load of `url` fail
    pub fn fail_resource(&self, url: impl Into<String>) {
        self.failing.borrow_mut().insert(url.into());
    }

    /// Resource activity in the order it happened
    pub fn events(&self) -> Vec<ResourceEvent> {
        self.events.borrow().clone()
    }

    /// URLs of resource elements of `kind` currently attached to the page
    pub fn resources(&self, kind: ResourceKind) -> Vec<String> {
        let (tag, attr) = resource_element(kind);
        let nodes = self.nodes.borrow();
        let urls = document_order(&nodes)
            .into_iter()
            .filter(|id| nodes[id.0].tag == tag)
            .filter_map(|id| nodes[id.0].attribute(attr).map(str::to_string))
            .collect();
        urls
    }

    /// Whether an element is reachable from the document
    pub fn is_attached(&self, element: ElementId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(element);
        while let Some(id) = current {
            if id == DOCUMENT {
                return true;
            }
            current = nodes.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    /// Children of an element
    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.nodes
            .borrow()
            .get(element.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Markup set on an element with `set_inner_html`
    pub fn inner_html(&self, element: ElementId) -> Option<String> {
        self.nodes.borrow().get(element.0).map(|n| n.inner_html.clone())
    }

    /// Read an attribute; `class` reads the class list
    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        let nodes = self.nodes.borrow();
        let node = nodes.get(element.0)?;
        if name == "class" {
            return (!node.classes.is_empty()).then(|| node.classes.join(" "));
        }
        node.attribute(name).map(str::to_string)
    }

    /// Serialise one element and its subtree
    pub fn outer_html(&self, element: ElementId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        if element.0 < nodes.len() {
            write_element(&nodes, element, &mut out);
        }
        out
    }

    /// Serialise the whole document
    pub fn to_html(&self) -> String {
        format!("<!DOCTYPE html>\n{}", self.outer_html(DOCUMENT))
    }

    fn check(&self, element: ElementId) -> Result<(), PageError> {
        if element.0 < self.nodes.borrow().len() {
            Ok(())
        } else {
            Err(PageError::UnknownElement(element))
        }
    }

    fn record(&self, kind: ResourceKind, url: &str, phase: ResourcePhase) {
        self.events.borrow_mut().push(ResourceEvent {
            kind,
            url: url.to_string(),
            phase,
        });
    }

    fn matches(node: &Node, locator: &str) -> bool {
        if let Some(id) = locator.strip_prefix('#') {
            return node.attribute("id") == Some(id);
        }
        if let Some(class) = locator.strip_prefix('.') {
            return node.classes.iter().any(|c| c == class);
        }
        if let Some(inner) = locator.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            return match inner.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim_matches(|c| c == '"' || c == '\'');
                    node.attribute(name.trim()) == Some(value)
                }
                None => node.attribute(inner.trim()).is_some(),
            };
        }
        node.tag.eq_ignore_ascii_case(locator)
    }
}

fn resource_element(kind: ResourceKind) -> (&'static str, &'static str) {
    match kind {
        ResourceKind::Style => ("link", "href"),
        ResourceKind::Script => ("script", "src"),
    }
}

/// Attached elements in document order, excluding the document root
fn document_order(nodes: &[Node]) -> Vec<ElementId> {
    let mut out = Vec::new();
    let mut stack: Vec<ElementId> = nodes[DOCUMENT.0].children.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        out.push(id);
        stack.extend(nodes[id.0].children.iter().rev().copied());
    }
    out
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

fn write_element(nodes: &[Node], id: ElementId, out: &mut String) {
    let node = &nodes[id.0];
    out.push('<');
    out.push_str(&node.tag);
    if !node.classes.is_empty() {
        out.push_str(&format!(" class=\"{}\"", escape_attribute(&node.classes.join(" "))));
    }
    for (name, value) in &node.attributes {
        out.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
    }
    out.push('>');

    if VOID_TAGS.contains(&node.tag.as_str()) {
        return;
    }

    out.push_str(&node.inner_html);
    for child in &node.children {
        write_element(nodes, *child, out);
    }
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}

#[async_trait(?Send)]
impl Page for MemoryPage {
    fn resolve(&self, locator: &str) -> Option<ElementId> {
        let locator = locator.trim();
        if locator.is_empty() {
            return None;
        }
        let nodes = self.nodes.borrow();
        let found = document_order(&nodes)
            .into_iter()
            .find(|id| Self::matches(&nodes[id.0], locator));
        found
    }

    async fn load_resource(&self, kind: ResourceKind, url: &str) -> Result<(), PageError> {
        let (tag, attr) = resource_element(kind);
        let element = self.create_element(tag);
        if kind == ResourceKind::Style {
            self.set_attribute(element, "rel", "stylesheet")?;
        }
        self.set_attribute(element, attr, url)?;
        let parent = match kind {
            ResourceKind::Style => self.head,
            ResourceKind::Script => self.body,
        };
        self.append_child(parent, element)?;
        self.record(kind, url, ResourcePhase::Started);

        tokio::task::yield_now().await;

        if self.failing.borrow().contains(url) {
            self.record(kind, url, ResourcePhase::Failed);
            return Err(PageError::ResourceFailed {
                kind,
                url: url.to_string(),
            });
        }
        self.record(kind, url, ResourcePhase::Finished);
        Ok(())
    }

    fn create_element(&self, tag: &str) -> ElementId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node::new(tag));
        ElementId(nodes.len() - 1)
    }

    fn add_class(&self, element: ElementId, class: &str) -> Result<(), PageError> {
        self.check(element)?;
        let mut nodes = self.nodes.borrow_mut();
        let classes = &mut nodes[element.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        Ok(())
    }

    fn set_attribute(
        &self,
        element: ElementId,
        name: &str,
        value: &str,
    ) -> Result<(), PageError> {
        self.check(element)?;
        let mut nodes = self.nodes.borrow_mut();
        let attributes = &mut nodes[element.0].attributes;
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn set_inner_html(&self, element: ElementId, html: &str) -> Result<(), PageError> {
        self.check(element)?;
        let mut nodes = self.nodes.borrow_mut();
        let node = &mut nodes[element.0];
        node.inner_html = html.to_string();
        node.children.clear();
        Ok(())
    }

    fn append_child(&self, parent: ElementId, child: ElementId) -> Result<(), PageError> {
        self.check(parent)?;
        self.check(child)?;
        let mut nodes = self.nodes.borrow_mut();
        if let Some(old) = nodes[child.0].parent.take() {
            nodes[old.0].children.retain(|c| *c != child);
        }
        nodes[parent.0].children.push(child);
        nodes[child.0].parent = Some(parent);
        Ok(())
    }

    fn query_attribute(&self, name: &str, value: &str) -> Vec<ElementId> {
        let nodes = self.nodes.borrow();
        let matching = document_order(&nodes)
            .into_iter()
            .filter(|id| nodes[id.0].attribute(name) == Some(value))
            .collect();
        matching
    }

    fn remove(&self, element: ElementId) -> Result<(), PageError> {
        self.check(element)?;
        let mut nodes = self.nodes.borrow_mut();
        if let Some(parent) = nodes[element.0].parent.take() {
            nodes[parent.0].children.retain(|c| *c != element);
        }
        Ok(())
    }
}
