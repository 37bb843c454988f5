//! Host tree - the real display tree the engine renders into.
//!
//! The engine never owns the display; it owns a description of it (the
//! virtual tree) and keeps this host tree synchronized with that
//! description. Host nodes are deliberately thin: elements with attributes,
//! listeners and ordered children, plus text leaves. There is no layout, no
//! styling and no paint here.
//!
//! Identity matters more than content: reconciliation guarantees are stated
//! in terms of *which* host nodes survive an update, so `HostNode::ptr_eq`
//! is part of the public contract.

pub(crate) mod markup;

pub use markup::{markup_of, markup_of_node};

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::types::{EventCallback, HostEvent};

// =============================================================================
// Event-Name Recognition
// =============================================================================

/// Map an attribute key to the host event it names, if any.
///
/// The recognition table is the conventional `on*` prefix: `onclick` names
/// the `click` event. Listener-typed attribute values are always registered
/// as listeners; this mapping only decides the event name they register
/// under (an unprefixed key registers under its own name).
pub fn event_name(attr: &str) -> Option<&str> {
    let rest = attr.strip_prefix("on")?;
    if rest.is_empty() { None } else { Some(rest) }
}

// =============================================================================
// Host Element
// =============================================================================

struct ElementInner {
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    listeners: RefCell<IndexMap<String, EventCallback>>,
    children: RefCell<Vec<HostNode>>,
}

/// An element in the host tree.
///
/// Cheap to clone; clones share identity (`ptr_eq`).
#[derive(Clone)]
pub struct HostElement {
    inner: Rc<ElementInner>,
}

impl std::fmt::Debug for HostElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostElement")
            .field("tag", &self.inner.tag)
            .field("identity", &self.identity())
            .finish()
    }
}

impl HostElement {
    /// Create an element with no attributes or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                tag: tag.into(),
                attributes: RefCell::new(IndexMap::new()),
                listeners: RefCell::new(IndexMap::new()),
                children: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Tag name.
    pub fn tag(&self) -> String {
        self.inner.tag.clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &HostElement) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stable identity key while the element is alive.
    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    // -------------------------------------------------------------------------
    // Attributes & listeners
    // -------------------------------------------------------------------------

    /// Set a serialized attribute.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .attributes
            .borrow_mut()
            .insert(name.into(), value.into());
    }

    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.attributes.borrow().get(name).cloned()
    }

    /// Remove an attribute. No-op if absent.
    pub fn remove_attribute(&self, name: &str) {
        self.inner.attributes.borrow_mut().shift_remove(name);
    }

    /// Snapshot of attributes in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.inner
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Register (or replace) a listener for an event name.
    pub fn set_listener(&self, event: impl Into<String>, callback: EventCallback) {
        self.inner
            .listeners
            .borrow_mut()
            .insert(event.into(), callback);
    }

    /// Remove a listener. No-op if absent.
    pub fn remove_listener(&self, event: &str) {
        self.inner.listeners.borrow_mut().shift_remove(event);
    }

    /// Drop all listeners.
    pub fn clear_listeners(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    /// Dispatch an event to the listener registered under its name.
    ///
    /// Returns true if a listener fired. The callback is cloned out first so
    /// it may freely mutate this element.
    pub fn dispatch(&self, event: &HostEvent) -> bool {
        let callback = self.inner.listeners.borrow().get(&event.name).cloned();
        match callback {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Children
    // -------------------------------------------------------------------------

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    /// Child at `index`.
    pub fn child(&self, index: usize) -> Option<HostNode> {
        self.inner.children.borrow().get(index).cloned()
    }

    /// Snapshot of children in order.
    pub fn children(&self) -> Vec<HostNode> {
        self.inner.children.borrow().clone()
    }

    /// Append a child at the end.
    pub fn append_child(&self, child: HostNode) {
        self.inner.children.borrow_mut().push(child);
    }

    /// Insert a child before the child currently at `index`.
    ///
    /// An index at or past the end appends.
    pub fn insert_child(&self, index: usize, child: HostNode) {
        let mut children = self.inner.children.borrow_mut();
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Remove and return the child at `index`, if any.
    pub fn remove_child(&self, index: usize) -> Option<HostNode> {
        let mut children = self.inner.children.borrow_mut();
        if index < children.len() {
            Some(children.remove(index))
        } else {
            None
        }
    }

    /// Remove all children.
    pub fn clear_children(&self) {
        self.inner.children.borrow_mut().clear();
    }

    /// Sibling index of `node` among this element's children, by identity.
    pub fn index_of(&self, node: &HostNode) -> Option<usize> {
        self.inner
            .children
            .borrow()
            .iter()
            .position(|child| child.ptr_eq(node))
    }
}

// =============================================================================
// Host Text
// =============================================================================

struct TextInner {
    value: RefCell<String>,
}

/// A text leaf in the host tree.
#[derive(Clone)]
pub struct HostText {
    inner: Rc<TextInner>,
}

impl HostText {
    /// Create a text leaf.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(TextInner {
                value: RefCell::new(value.into()),
            }),
        }
    }

    /// Current text value.
    pub fn value(&self) -> String {
        self.inner.value.borrow().clone()
    }

    /// Replace the text value.
    pub fn set_value(&self, value: impl Into<String>) {
        *self.inner.value.borrow_mut() = value.into();
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &HostText) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// =============================================================================
// Host Node
// =============================================================================

/// Either kind of host-tree node.
#[derive(Clone)]
pub enum HostNode {
    Element(HostElement),
    Text(HostText),
}

impl HostNode {
    /// Identity comparison across kinds.
    pub fn ptr_eq(&self, other: &HostNode) -> bool {
        match (self, other) {
            (HostNode::Element(a), HostNode::Element(b)) => a.ptr_eq(b),
            (HostNode::Text(a), HostNode::Text(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Element view, if this is an element.
    pub fn as_element(&self) -> Option<&HostElement> {
        match self {
            HostNode::Element(element) => Some(element),
            HostNode::Text(_) => None,
        }
    }

    /// Text view, if this is a text leaf.
    pub fn as_text(&self) -> Option<&HostText> {
        match self {
            HostNode::Text(text) => Some(text),
            HostNode::Element(_) => None,
        }
    }

    /// Concatenated text content of the subtree.
    pub fn text_content(&self) -> String {
        match self {
            HostNode::Text(text) => text.value(),
            HostNode::Element(element) => element
                .children()
                .iter()
                .map(HostNode::text_content)
                .collect(),
        }
    }
}

impl From<HostElement> for HostNode {
    fn from(element: HostElement) -> Self {
        HostNode::Element(element)
    }
}

impl From<HostText> for HostNode {
    fn from(text: HostText) -> Self {
        HostNode::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_event_name_table() {
        assert_eq!(event_name("onclick"), Some("click"));
        assert_eq!(event_name("oninput"), Some("input"));
        assert_eq!(event_name("on"), None);
        assert_eq!(event_name("class"), None);
    }

    #[test]
    fn test_children_insert_order() {
        let parent = HostElement::new("div");
        let a = HostText::new("a");
        let b = HostText::new("b");
        let c = HostText::new("c");

        parent.append_child(a.clone().into());
        parent.append_child(c.clone().into());
        parent.insert_child(1, b.clone().into());

        assert_eq!(parent.child_count(), 3);
        assert_eq!(
            HostNode::Element(parent.clone()).text_content(),
            "abc".to_string()
        );
        assert_eq!(parent.index_of(&b.into()), Some(1));
    }

    #[test]
    fn test_insert_past_end_appends() {
        let parent = HostElement::new("div");
        parent.insert_child(10, HostText::new("x").into());
        assert_eq!(parent.child_count(), 1);
    }

    #[test]
    fn test_remove_child() {
        let parent = HostElement::new("div");
        let a = HostText::new("a");
        parent.append_child(a.clone().into());

        let removed = parent.remove_child(0).unwrap();
        assert!(removed.ptr_eq(&a.into()));
        assert_eq!(parent.child_count(), 0);
        assert!(parent.remove_child(0).is_none());
    }

    #[test]
    fn test_identity_not_content() {
        let a = HostText::new("same");
        let b = HostText::new("same");
        assert!(!HostNode::from(a.clone()).ptr_eq(&b.into()));
        assert!(HostNode::from(a.clone()).ptr_eq(&a.into()));
    }

    #[test]
    fn test_dispatch() {
        let element = HostElement::new("button");
        let fired = Rc::new(Cell::new(0u32));

        let fired_clone = fired.clone();
        element.set_listener("click", Rc::new(move |_event| {
            fired_clone.set(fired_clone.get() + 1);
        }));

        assert!(element.dispatch(&HostEvent::new("click")));
        assert!(!element.dispatch(&HostEvent::new("keydown")));
        assert_eq!(fired.get(), 1);
    }
}
