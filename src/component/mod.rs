//! Component - the user-extensible unit of the virtual tree.
//!
//! User code implements [`Component`] (behavior: initial state, lifecycle
//! wiring, `render`). The engine holds one [`ComponentInstance`] per
//! component node: props, reactive state, the six lifecycle channels and
//! the back-reference to the owning node. Splitting behavior from instance
//! keeps the user surface small while the framework owns all plumbing.
//!
//! # Example
//!
//! ```ignore
//! use spark_view::{Component, Engine, RenderContext, VNode};
//! use serde_json::{json, Value};
//!
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn initial_state(&self) -> Value {
//!         json!({ "count": 0 })
//!     }
//!
//!     fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
//!         let count = cx.state().get("count");
//!         Some(cx.text(json!(format!("count: {count}"))))
//!     }
//! }
//! ```

mod lifecycle;
mod state;

pub use lifecycle::LifecycleChannels;
pub use state::ReactiveState;

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::engine::{Engine, VNode, WeakVNode};
use crate::error::EngineError;
use crate::types::{AttrValue, NodeId};

// =============================================================================
// Props
// =============================================================================

/// Read-only component props: named values plus the children sequence.
///
/// The children sequence is always present; the constructor takes it
/// unconditionally, so "props without children" is unrepresentable.
pub struct Props {
    values: IndexMap<String, Value>,
    children: Vec<VNode>,
}

impl Props {
    /// Build props from named values and the children sequence.
    pub fn new(values: IndexMap<String, Value>, children: Vec<VNode>) -> Self {
        Self { values, children }
    }

    /// Empty props with no children.
    pub fn empty() -> Self {
        Self::new(IndexMap::new(), Vec::new())
    }

    /// Named value, if present.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All named values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// The children sequence.
    pub fn children(&self) -> &[VNode] {
        &self.children
    }
}

/// Split a raw attribute map into component props.
///
/// Listener attributes have no meaning on a component boundary and are
/// dropped with a trace; plain values become named props.
pub(crate) fn props_from_attrs(
    attrs: IndexMap<String, AttrValue>,
    children: Vec<VNode>,
) -> Props {
    let mut values = IndexMap::new();
    for (name, attr) in attrs {
        match attr {
            AttrValue::Value(value) => {
                values.insert(name, value);
            }
            AttrValue::Listener(_) => {
                tracing::trace!(attr = %name, "listener attribute dropped on component boundary");
            }
        }
    }
    Props::new(values, children)
}

// =============================================================================
// Component Behavior
// =============================================================================

/// User-implemented component behavior.
pub trait Component: 'static {
    /// Initial state for a fresh instance. Defaults to an empty object.
    fn initial_state(&self) -> Value {
        Value::Object(Map::new())
    }

    /// Subscribe to lifecycle channels. Runs once during instance
    /// construction, before `initialization` fires.
    fn wire(&self, channels: &LifecycleChannels) {
        let _ = channels;
    }

    /// Produce the render output, or `None` to render nothing.
    fn render(&self, cx: &RenderContext<'_>) -> Option<VNode>;
}

/// Everything a `render()` implementation may reach: props, state, and the
/// node factory.
pub struct RenderContext<'a> {
    engine: &'a Engine,
    props: &'a Props,
    state: &'a ReactiveState,
}

impl<'a> RenderContext<'a> {
    /// Component props.
    pub fn props(&self) -> &Props {
        self.props
    }

    /// Component state.
    pub fn state(&self) -> &ReactiveState {
        self.state
    }

    /// The engine, for anything the shorthands below don't cover.
    pub fn engine(&self) -> &Engine {
        self.engine
    }

    /// Build an element node.
    pub fn element(
        &self,
        tag: impl Into<String>,
        attrs: IndexMap<String, AttrValue>,
        children: Vec<VNode>,
    ) -> VNode {
        self.engine.element(tag, attrs, children)
    }

    /// Build a text node.
    pub fn text(&self, value: impl Into<Value>) -> VNode {
        self.engine.text(value)
    }

    /// Build a fragment node.
    pub fn fragment(&self, children: Vec<VNode>) -> VNode {
        self.engine.fragment(children)
    }

    /// Build a nested component node.
    pub fn component<C: Component>(
        &self,
        behavior: C,
        attrs: IndexMap<String, AttrValue>,
        children: Vec<VNode>,
    ) -> VNode {
        self.engine.component(behavior, attrs, children)
    }
}

// =============================================================================
// Component Instance
// =============================================================================

/// Framework-held unit backing a component node: props, state, channels,
/// behavior, and the owner backlink.
pub struct ComponentInstance {
    behavior: Box<dyn Component>,
    constructor: TypeId,
    props: Props,
    state: ReactiveState,
    channels: LifecycleChannels,
    owner: RefCell<WeakVNode>,
    unmounted: Cell<bool>,
}

impl ComponentInstance {
    /// Construct an instance and run the constructor-time lifecycle:
    /// `wire` hook, then `initialization`, then `props_changed`.
    pub(crate) fn new(behavior: Box<dyn Component>, constructor: TypeId, props: Props) -> Rc<Self> {
        let state = ReactiveState::new(behavior.initial_state());
        let channels = LifecycleChannels::new();
        behavior.wire(&channels);

        let instance = Rc::new(Self {
            behavior,
            constructor,
            props,
            state,
            channels,
            owner: RefCell::new(WeakVNode::new()),
            unmounted: Cell::new(false),
        });

        instance.channels.initialization.emit(&());
        instance.channels.props_changed.emit(&());
        instance
    }

    /// Constructor identity, used by the diff to decide whether two
    /// generations hold "the same" component.
    pub fn constructor(&self) -> TypeId {
        self.constructor
    }

    /// Component props.
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Component state.
    pub fn state(&self) -> &ReactiveState {
        &self.state
    }

    /// Lifecycle channels.
    pub fn channels(&self) -> &LifecycleChannels {
        &self.channels
    }

    /// The owning component node, if attached and alive.
    pub fn owner(&self) -> Option<VNode> {
        self.owner.borrow().upgrade()
    }

    pub(crate) fn set_owner(&self, node: &VNode) {
        *self.owner.borrow_mut() = node.downgrade();
    }

    /// Invoke `render()`, bracketed by `before_render`/`after_render`.
    pub(crate) fn invoke_render(&self, engine: &Engine) -> Option<VNode> {
        self.channels.before_render.emit(&());
        let output = self.behavior.render(&RenderContext {
            engine,
            props: &self.props,
            state: &self.state,
        });
        self.channels.after_render.emit(&());
        output
    }

    pub(crate) fn emit_mounted(&self) {
        self.channels.mounted.emit(&());
    }

    /// Tear the instance down: emit `unmounted` exactly once, unsubscribe
    /// every listener registered through the component, disarm the state
    /// trigger. Idempotent.
    pub(crate) fn unmount(&self) {
        if self.unmounted.replace(true) {
            return;
        }
        self.channels.unmounted.emit(&());
        self.channels.clear_all();
        self.state.clear_trigger();
    }

    /// Whether teardown already ran.
    pub fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    /// Arm the state trigger to re-render the owning node through `engine`.
    pub(crate) fn arm_trigger(self: &Rc<Self>, engine: &Engine, node: &VNode) {
        let engine = engine.clone();
        let weak = node.downgrade();
        let id = node.id();
        self.state.install_trigger(Rc::new(move || match weak.upgrade() {
            Some(node) => crate::reconcile::rerender(&engine, &node),
            None => Err(EngineError::OwnerGone(id)),
        }));
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let owner: Option<NodeId> = self.owner().map(|node| node.id());
        f.debug_struct("ComponentInstance")
            .field("owner", &owner)
            .field("unmounted", &self.unmounted.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Probe;

    impl Component for Probe {
        fn initial_state(&self) -> Value {
            json!({ "ready": false })
        }

        fn render(&self, _cx: &RenderContext<'_>) -> Option<VNode> {
            None
        }
    }

    #[test]
    fn test_constructor_lifecycle_order() {
        use std::cell::RefCell;

        struct Wired {
            log: Rc<RefCell<Vec<&'static str>>>,
        }

        impl Component for Wired {
            fn wire(&self, channels: &LifecycleChannels) {
                let log = self.log.clone();
                let _ = channels
                    .initialization
                    .subscribe(move |_| log.borrow_mut().push("initialization"));
                let log = self.log.clone();
                let _ = channels
                    .props_changed
                    .subscribe(move |_| log.borrow_mut().push("props_changed"));
            }

            fn render(&self, _cx: &RenderContext<'_>) -> Option<VNode> {
                None
            }
        }

        let log = Rc::new(RefCell::new(Vec::new()));
        let _instance = ComponentInstance::new(
            Box::new(Wired { log: log.clone() }),
            TypeId::of::<Wired>(),
            Props::empty(),
        );
        assert_eq!(*log.borrow(), vec!["initialization", "props_changed"]);
    }

    #[test]
    fn test_initial_state_flows_into_reactive_state() {
        let instance =
            ComponentInstance::new(Box::new(Probe), TypeId::of::<Probe>(), Props::empty());
        assert_eq!(instance.state().get("ready"), json!(false));
    }

    #[test]
    fn test_unmount_is_idempotent() {
        let count = Rc::new(Cell::new(0u32));

        struct OnUnmount {
            count: Rc<Cell<u32>>,
        }

        impl Component for OnUnmount {
            fn wire(&self, channels: &LifecycleChannels) {
                let count = self.count.clone();
                let _ = channels
                    .unmounted
                    .subscribe(move |_| count.set(count.get() + 1));
            }

            fn render(&self, _cx: &RenderContext<'_>) -> Option<VNode> {
                None
            }
        }

        let instance = ComponentInstance::new(
            Box::new(OnUnmount {
                count: count.clone(),
            }),
            TypeId::of::<OnUnmount>(),
            Props::empty(),
        );

        instance.unmount();
        instance.unmount();
        assert_eq!(count.get(), 1);
        assert!(instance.is_unmounted());
    }

    #[test]
    fn test_props_values_and_children() {
        let mut values = IndexMap::new();
        values.insert("title".to_string(), json!("hello"));
        let props = Props::new(values, Vec::new());

        assert_eq!(props.value("title"), Some(&json!("hello")));
        assert!(props.value("missing").is_none());
        assert!(props.children().is_empty());
    }
}
