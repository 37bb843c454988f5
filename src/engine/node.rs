//! Virtual node - the tree node type everything else operates on.
//!
//! A node is exactly one of four shapes, discriminated by a closed tagged
//! union: Component, Fragment, Text, Element. Shape is fixed at
//! construction; the only fields that change afterwards are the host fields
//! populated during materialization, the component's render slot, and the
//! link/cache fields below.
//!
//! # Links
//!
//! Two distinct parent relations exist and are never overloaded:
//!
//! - `structural_parent` - the node that owns this node in its `children`
//!   sequence (child does not own parent; parents are Weak).
//! - `render_owner` - set on the root of a component's render output,
//!   pointing back at the component node. For host-tree purposes a render
//!   output's logical parent is the component's parent, not the component
//!   node itself, and the upward walk follows this link first.
//!
//! # Root element cache
//!
//! `root_element` is the nearest strict-ancestor host element usable as an
//! insertion target, resolved lazily and cached. Assigning a structural
//! parent propagates the child's current cached root upward once (if the
//! parent has none) and then invalidates the child's cache so it is
//! recomputed from the new position.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::component::ComponentInstance;
use crate::host::{HostElement, HostNode};
use crate::types::{AttrValue, NodeId};

// =============================================================================
// Render Slot
// =============================================================================

/// Render output of a component node.
///
/// Distinguishes "never rendered" from "rendered to nothing": the first is
/// an error to traverse, the second is a legitimate empty output.
#[derive(Clone)]
pub enum RenderSlot {
    /// `render()` has never been invoked for this node.
    NotRendered,
    /// `render()` ran and produced no output.
    Empty,
    /// `render()` produced a tree.
    Rendered(VNode),
}

impl RenderSlot {
    /// Whether `render()` has run at least once.
    pub fn is_rendered(&self) -> bool {
        !matches!(self, RenderSlot::NotRendered)
    }

    /// The rendered tree, if there is one.
    pub fn tree(&self) -> Option<VNode> {
        match self {
            RenderSlot::Rendered(node) => Some(node.clone()),
            _ => None,
        }
    }
}

// =============================================================================
// Per-Shape Cells
// =============================================================================

/// Component-shaped node payload.
pub struct ComponentCell {
    instance: Rc<ComponentInstance>,
    render_node: RefCell<RenderSlot>,
}

impl ComponentCell {
    pub(crate) fn new(instance: Rc<ComponentInstance>) -> Self {
        Self {
            instance,
            render_node: RefCell::new(RenderSlot::NotRendered),
        }
    }

    /// The component instance held by this node.
    pub fn instance(&self) -> &Rc<ComponentInstance> {
        &self.instance
    }

    /// Current render slot.
    pub fn render_slot(&self) -> RenderSlot {
        self.render_node.borrow().clone()
    }

    pub(crate) fn set_render_slot(&self, slot: RenderSlot) {
        *self.render_node.borrow_mut() = slot;
    }
}

/// Text-shaped node payload.
///
/// The host node is constructed at virtual-node creation time: a host text
/// leaf for scalar literals, an inline host element for non-scalar literal
/// content. `literal` keeps the serialized form used for content comparison.
pub struct TextCell {
    host: RefCell<HostNode>,
    literal: String,
}

impl TextCell {
    pub(crate) fn new(host: HostNode, literal: String) -> Self {
        Self {
            host: RefCell::new(host),
            literal,
        }
    }

    /// The pre-constructed host node.
    pub fn host(&self) -> HostNode {
        self.host.borrow().clone()
    }

    /// Take over a previous generation's host node so identity is
    /// preserved across a remount.
    pub(crate) fn adopt_host(&self, host: HostNode) {
        *self.host.borrow_mut() = host;
    }

    /// Serialized literal content.
    pub fn literal(&self) -> &str {
        &self.literal
    }
}

/// Element-shaped node payload.
pub struct ElementCell {
    tag: String,
    attributes: RefCell<IndexMap<String, AttrValue>>,
    host: RefCell<Option<HostElement>>,
}

impl ElementCell {
    pub(crate) fn new(tag: String, attributes: IndexMap<String, AttrValue>) -> Self {
        Self {
            tag,
            attributes: RefCell::new(attributes),
            host: RefCell::new(None),
        }
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Host element, once materialized.
    pub fn host(&self) -> Option<HostElement> {
        self.host.borrow().clone()
    }

    pub(crate) fn set_host(&self, host: HostElement) {
        *self.host.borrow_mut() = Some(host);
    }

    pub(crate) fn adopt_host(&self, host: Option<HostElement>) {
        *self.host.borrow_mut() = host;
    }

    /// Snapshot of the attribute map in insertion order.
    pub fn attributes(&self) -> Vec<(String, AttrValue)> {
        self.attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub(crate) fn replace_attributes(&self, attributes: IndexMap<String, AttrValue>) {
        *self.attributes.borrow_mut() = attributes;
    }

    pub(crate) fn attribute_map(&self) -> IndexMap<String, AttrValue> {
        self.attributes.borrow().clone()
    }
}

// =============================================================================
// Node Kind
// =============================================================================

/// The four node shapes.
pub enum NodeKind {
    Component(ComponentCell),
    Fragment,
    Text(TextCell),
    Element(ElementCell),
}

impl NodeKind {
    /// Shape name, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Component(_) => "component",
            NodeKind::Fragment => "fragment",
            NodeKind::Text(_) => "text",
            NodeKind::Element(_) => "element",
        }
    }

    /// Discriminant index used for shape comparison during the diff.
    pub(crate) fn shape(&self) -> u8 {
        match self {
            NodeKind::Component(_) => 0,
            NodeKind::Fragment => 1,
            NodeKind::Text(_) => 2,
            NodeKind::Element(_) => 3,
        }
    }
}

// =============================================================================
// Virtual Node
// =============================================================================

struct VNodeInner {
    id: NodeId,
    kind: NodeKind,
    structural_parent: RefCell<Weak<VNodeInner>>,
    render_owner: RefCell<Weak<VNodeInner>>,
    children: RefCell<Vec<VNode>>,
    should_update: Cell<bool>,
    root_element: RefCell<Option<HostElement>>,
}

/// A virtual-tree node. Cheap to clone; clones share identity.
#[derive(Clone)]
pub struct VNode {
    inner: Rc<VNodeInner>,
}

impl VNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            inner: Rc::new(VNodeInner {
                id,
                kind,
                structural_parent: RefCell::new(Weak::new()),
                render_owner: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                should_update: Cell::new(false),
                root_element: RefCell::new(None),
            }),
        }
    }

    /// Unique id of this node.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Shape and payload.
    pub fn kind(&self) -> &NodeKind {
        &self.inner.kind
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Component payload, if this node is component-shaped.
    pub fn as_component(&self) -> Option<&ComponentCell> {
        match &self.inner.kind {
            NodeKind::Component(cell) => Some(cell),
            _ => None,
        }
    }

    /// Element payload, if this node is element-shaped.
    pub fn as_element(&self) -> Option<&ElementCell> {
        match &self.inner.kind {
            NodeKind::Element(cell) => Some(cell),
            _ => None,
        }
    }

    /// Text payload, if this node is text-shaped.
    pub fn as_text(&self) -> Option<&TextCell> {
        match &self.inner.kind {
            NodeKind::Text(cell) => Some(cell),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Children
    // -------------------------------------------------------------------------

    /// Snapshot of the owned children, in order.
    pub fn children(&self) -> Vec<VNode> {
        self.inner.children.borrow().clone()
    }

    /// Number of owned children.
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub(crate) fn set_children(&self, children: Vec<VNode>) {
        for child in &children {
            child.set_structural_parent(self);
        }
        *self.inner.children.borrow_mut() = children;
    }

    // -------------------------------------------------------------------------
    // Parent links
    // -------------------------------------------------------------------------

    /// Structural parent, if still alive.
    pub fn structural_parent(&self) -> Option<VNode> {
        self.inner
            .structural_parent
            .borrow()
            .upgrade()
            .map(|inner| VNode { inner })
    }

    /// The component node whose render output this node roots, if any.
    pub fn render_owner(&self) -> Option<VNode> {
        self.inner
            .render_owner
            .borrow()
            .upgrade()
            .map(|inner| VNode { inner })
    }

    /// Assign the structural parent.
    ///
    /// Side effect: the child's current cached root propagates upward once
    /// (if the parent has no cache yet), then the child's own cache is
    /// invalidated so it resolves from the new position.
    pub(crate) fn set_structural_parent(&self, parent: &VNode) {
        if let Some(root) = self.inner.root_element.borrow().clone() {
            let mut parent_root = parent.inner.root_element.borrow_mut();
            if parent_root.is_none() {
                *parent_root = Some(root);
            }
        }
        *self.inner.structural_parent.borrow_mut() = Rc::downgrade(&parent.inner);
        self.invalidate_root();
    }

    /// Mark this node as the render output of `owner`.
    pub(crate) fn set_render_owner(&self, owner: &VNode) {
        *self.inner.render_owner.borrow_mut() = Rc::downgrade(&owner.inner);
    }

    /// The parent used by upward host-tree walks: the render owner when this
    /// node is a render output root, the structural parent otherwise.
    pub fn effective_parent(&self) -> Option<VNode> {
        self.render_owner().or_else(|| self.structural_parent())
    }

    // -------------------------------------------------------------------------
    // Root element
    // -------------------------------------------------------------------------

    fn cached_root(&self) -> Option<HostElement> {
        self.inner.root_element.borrow().clone()
    }

    /// Seed the cached root directly. Used by the mount entry point for the
    /// tree root, whose insertion target is the container itself.
    pub(crate) fn set_cached_root(&self, element: HostElement) {
        *self.inner.root_element.borrow_mut() = Some(element);
    }

    /// Drop the cached root so the next resolution walks the links again.
    pub(crate) fn invalidate_root(&self) {
        *self.inner.root_element.borrow_mut() = None;
    }

    /// Resolve the nearest strict-ancestor host element usable as an
    /// insertion target. Returns None when the node is not mounted under a
    /// materialized element or a seeded container.
    pub fn root_element(&self) -> Option<HostElement> {
        if let Some(cached) = self.cached_root() {
            return Some(cached);
        }
        let mut cursor = self.effective_parent();
        while let Some(node) = cursor {
            if let NodeKind::Element(cell) = node.kind() {
                // An unmaterialized ancestor element cannot serve as an
                // insertion target; do not walk past it.
                return cell.host().inspect(|host| {
                    *self.inner.root_element.borrow_mut() = Some(host.clone());
                });
            }
            if let Some(cached) = node.cached_root() {
                *self.inner.root_element.borrow_mut() = Some(cached.clone());
                return Some(cached);
            }
            cursor = node.effective_parent();
        }
        None
    }

    // -------------------------------------------------------------------------
    // Diff mark
    // -------------------------------------------------------------------------

    /// Diff-pass mark. Meaningful only between a mark and an update walk.
    pub fn should_update(&self) -> bool {
        self.inner.should_update.get()
    }

    pub(crate) fn set_should_update(&self, value: bool) {
        self.inner.should_update.set(value);
    }

    pub(crate) fn downgrade(&self) -> WeakVNode {
        WeakVNode {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inner.kind.name(), self.inner.id)
    }
}

/// Weak handle to a virtual node.
#[derive(Clone)]
pub struct WeakVNode {
    inner: Weak<VNodeInner>,
}

impl WeakVNode {
    /// Empty handle that never upgrades.
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }

    /// Upgrade to a strong handle, if the node is still alive.
    pub fn upgrade(&self) -> Option<VNode> {
        self.inner.upgrade().map(|inner| VNode { inner })
    }
}

impl Default for WeakVNode {
    fn default() -> Self {
        Self::new()
    }
}
