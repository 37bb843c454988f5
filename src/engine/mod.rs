//! Engine - process-scoped state and the mount entry point.
//!
//! One [`Engine`] instance owns everything that would otherwise be ambient
//! global state: the monotonic virtual-node id counter and the
//! container->tree registry. The handle is cheap to clone and everything
//! runs on a single logical thread of control, so interior mutability is
//! plain `Cell`/`RefCell`.
//!
//! # Mounting
//!
//! `mount` is the fresh-vs-reconcile decision point: a container seen for
//! the first time gets a straight materialize + mount; a container that
//! already holds a generation gets the full-tree diff, which carries live
//! component state across and patches only the differing host nodes.
//!
//! # Example
//!
//! ```ignore
//! use spark_view::{Engine, HostElement, attr_map};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let container = HostElement::new("app");
//!
//! let tree = engine.element(
//!     "div",
//!     attr_map(vec![("class", "greeting")]),
//!     vec![engine.text(json!("hello"))],
//! );
//! engine.mount(&container, tree)?;
//! ```

mod factory;
mod node;

pub use factory::attr_map;
pub use node::{ComponentCell, ElementCell, NodeKind, RenderSlot, TextCell, VNode, WeakVNode};

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::error::EngineError;
use crate::host::HostElement;
use crate::pipeline::{create_elements, host_range, mount_dom};
use crate::reconcile;
use crate::types::NodeId;

struct MountedTree {
    // Kept alive so the registry key (container identity) stays stable.
    #[allow(dead_code)]
    container: HostElement,
    root: VNode,
}

struct EngineInner {
    next_node_id: Cell<u64>,
    containers: RefCell<HashMap<usize, MountedTree>>,
}

/// Engine handle. Clones share the same process-scoped state.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl Engine {
    /// Create an engine with an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EngineInner {
                next_node_id: Cell::new(0),
                containers: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Allocate the next virtual-node id. Monotonic, never reused.
    pub(crate) fn next_id(&self) -> NodeId {
        let id = self.inner.next_node_id.get();
        self.inner.next_node_id.set(id + 1);
        NodeId(id)
    }

    /// Mount a virtual tree into a container.
    ///
    /// First mount into a container materializes and mounts fresh; a
    /// remount reconciles against the previous generation. Either way the
    /// registry ends up mapping the container to `node` (replaced, not
    /// appended).
    pub fn mount(&self, container: &HostElement, node: VNode) -> Result<(), EngineError> {
        let key = container.identity();
        let previous = self.inner.containers.borrow_mut().remove(&key);

        match previous {
            None => {
                debug!(container = %container.tag(), node = ?node, "fresh mount");
                node.set_cached_root(container.clone());
                create_elements(self, &node);
                mount_dom(&node, container, None, &mut 0)?;
            }
            Some(entry) => {
                debug!(container = %container.tag(), node = ?node, "remount, reconciling");
                reconcile::reconcile(self, &entry.root, &node, container)?;
            }
        }

        self.inner.containers.borrow_mut().insert(
            key,
            MountedTree {
                container: container.clone(),
                root: node,
            },
        );
        Ok(())
    }

    /// Unmount whatever is mounted in the container: remove its host
    /// nodes, tear down its components, drop the registry entry. A
    /// container with no generation is a no-op.
    pub fn unmount(&self, container: &HostElement) -> Result<(), EngineError> {
        let entry = self.inner.containers.borrow_mut().remove(&container.identity());
        let Some(entry) = entry else {
            return Ok(());
        };
        debug!(container = %container.tag(), "unmount");

        if let Some(range) = host_range(&entry.root)? {
            reconcile::remove_range(container, range);
        }
        reconcile::teardown(&entry.root);
        Ok(())
    }

    /// The tree root most recently mounted into the container, if any.
    pub fn mounted_root(&self, container: &HostElement) -> Option<VNode> {
        self.inner
            .containers
            .borrow()
            .get(&container.identity())
            .map(|entry| entry.root.clone())
    }

    /// Whether the container currently holds a generation.
    pub fn is_mounted(&self, container: &HostElement) -> bool {
        self.inner
            .containers
            .borrow()
            .contains_key(&container.identity())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::{Value, json};
    use std::cell::RefCell as StdRefCell;

    use crate::component::{Component, LifecycleChannels, RenderContext};
    use crate::host::{HostNode, markup_of_node};

    /// Renders `<span>count: N</span>` from its own state.
    struct Counter;

    impl Component for Counter {
        fn initial_state(&self) -> Value {
            json!({ "count": 0, "label": "x" })
        }

        fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
            let count = cx.state().get("count");
            Some(cx.element(
                "span",
                IndexMap::new(),
                vec![cx.text(json!(format!("count: {count}")))],
            ))
        }
    }

    /// Renders a fragment of two text leaves.
    struct Pair;

    impl Component for Pair {
        fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
            Some(cx.fragment(vec![cx.text(json!("a")), cx.text(json!("b"))]))
        }
    }

    /// Renders a constant, ignoring its state entirely.
    struct Constant;

    impl Component for Constant {
        fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
            Some(cx.element(
                "span",
                IndexMap::new(),
                vec![cx.text(json!("fixed"))],
            ))
        }
    }

    fn contents(container: &HostElement) -> Vec<String> {
        container
            .children()
            .iter()
            .map(HostNode::text_content)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Scenario A: fresh element mount
    // -------------------------------------------------------------------------

    #[test]
    fn test_mount_element_with_text() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let tree = engine.element("div", IndexMap::new(), vec![engine.text(json!("hi"))]);

        engine.mount(&container, tree).unwrap();

        assert_eq!(container.child_count(), 1);
        let child = container.child(0).unwrap();
        assert_eq!(markup_of_node(&child), "<div>hi</div>");
        assert!(engine.is_mounted(&container));
    }

    // -------------------------------------------------------------------------
    // Scenario B: component rendering a fragment
    // -------------------------------------------------------------------------

    #[test]
    fn test_mount_component_with_fragment_output() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let tree = engine.component(Pair, IndexMap::new(), vec![]);

        engine.mount(&container, tree).unwrap();

        assert_eq!(container.child_count(), 2);
        assert_eq!(contents(&container), vec!["a", "b"]);
    }

    // -------------------------------------------------------------------------
    // Fragment flattening
    // -------------------------------------------------------------------------

    #[test]
    fn test_fragment_flattening_regardless_of_nesting() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let tree = engine.fragment(vec![
            engine.text(json!("1")),
            engine.fragment(vec![
                engine.text(json!("2")),
                engine.component(Pair, IndexMap::new(), vec![]),
            ]),
            engine.text(json!("3")),
        ]);

        engine.mount(&container, tree).unwrap();

        // Five leaves, five host nodes, document order.
        assert_eq!(contents(&container), vec!["1", "2", "a", "b", "3"]);
    }

    // -------------------------------------------------------------------------
    // Range correctness
    // -------------------------------------------------------------------------

    #[test]
    fn test_host_range_of_mounted_nodes() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let fragment = engine.fragment(vec![engine.text(json!("x")), engine.text(json!("y"))]);
        let tree = engine.fragment(vec![
            engine.text(json!("a")),
            fragment.clone(),
            engine.text(json!("b")),
        ]);

        engine.mount(&container, tree.clone()).unwrap();

        assert_eq!(
            host_range(&fragment).unwrap(),
            Some(crate::pipeline::HostRange { start: 1, end: 2 })
        );
        assert_eq!(
            host_range(&tree).unwrap(),
            Some(crate::pipeline::HostRange { start: 0, end: 3 })
        );

        // Removing exactly that range leaves no trace of the node.
        let range = host_range(&fragment).unwrap().unwrap();
        crate::reconcile::remove_range(&container, range);
        assert_eq!(contents(&container), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_fragment_has_no_range() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let empty = engine.fragment(vec![]);
        let tree = engine.fragment(vec![engine.text(json!("a")), empty.clone()]);

        engine.mount(&container, tree).unwrap();
        assert_eq!(host_range(&empty).unwrap(), None);
    }

    // -------------------------------------------------------------------------
    // Scenario C: state-triggered re-render scope
    // -------------------------------------------------------------------------

    #[test]
    fn test_state_write_rerenders_only_that_component() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let counter = engine.component(Counter, IndexMap::new(), vec![]);
        let constant = engine.component(Constant, IndexMap::new(), vec![]);
        let tree = engine.element(
            "div",
            IndexMap::new(),
            vec![counter.clone(), constant.clone()],
        );

        engine.mount(&container, tree).unwrap();

        let div = container.child(0).unwrap();
        let div = div.as_element().unwrap();
        assert_eq!(div.child(0).unwrap().text_content(), "count: 0");
        let sibling_before = div.child(1).unwrap();

        counter
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("count", json!(1))
            .unwrap();

        assert_eq!(div.child(0).unwrap().text_content(), "count: 1");
        // The sibling's host node is referentially untouched.
        assert!(div.child(1).unwrap().ptr_eq(&sibling_before));
        assert_eq!(div.child_count(), 2);
    }

    #[test]
    fn test_rerender_is_synchronous() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let counter = engine.component(Counter, IndexMap::new(), vec![]);
        engine.mount(&container, counter.clone()).unwrap();

        let state = counter.as_component().unwrap().instance().state();
        state.set("count", json!(1)).unwrap();
        // The write observes its own effect before returning control.
        assert_eq!(contents(&container), vec!["count: 1"]);
        state.set("count", json!(2)).unwrap();
        assert_eq!(contents(&container), vec!["count: 2"]);
    }

    #[test]
    fn test_identical_write_does_not_rerender() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let counter = engine.component(Counter, IndexMap::new(), vec![]);
        engine.mount(&container, counter.clone()).unwrap();

        let host_before = container.child(0).unwrap();
        counter
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("count", json!(0))
            .unwrap();
        // Same value, same host node: no re-render happened.
        assert!(container.child(0).unwrap().ptr_eq(&host_before));
    }

    #[test]
    fn test_idempotent_rerender_keeps_count_and_content() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let constant = engine.component(Constant, IndexMap::new(), vec![]);
        engine.mount(&container, constant.clone()).unwrap();

        let markup_before = markup_of_node(&container.child(0).unwrap());
        // The write changes state the render never reads: output is
        // unchanged, host count and content identical.
        constant
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("unused", json!(1))
            .unwrap();

        assert_eq!(container.child_count(), 1);
        assert_eq!(markup_of_node(&container.child(0).unwrap()), markup_before);
    }

    #[test]
    fn test_rerender_before_first_render_is_noop() {
        let engine = Engine::new();
        let counter = engine.component(Counter, IndexMap::new(), vec![]);

        // Not mounted, never rendered: the write lands in state but there
        // is nothing to patch.
        counter
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("count", json!(7))
            .unwrap();
        assert_eq!(
            counter.as_component().unwrap().instance().state().get("count"),
            json!(7)
        );
    }

    // -------------------------------------------------------------------------
    // Scenario D + hot reload: remount reconciliation
    // -------------------------------------------------------------------------

    #[test]
    fn test_remount_replaces_only_changed_leaf() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let first = engine.element(
            "div",
            IndexMap::new(),
            vec![engine.text(json!("x")), engine.text(json!("same"))],
        );
        engine.mount(&container, first).unwrap();

        let div_before = container.child(0).unwrap();
        let sibling_before = div_before.as_element().unwrap().child(1).unwrap();

        let second = engine.element(
            "div",
            IndexMap::new(),
            vec![engine.text(json!("y")), engine.text(json!("same"))],
        );
        engine.mount(&container, second.clone()).unwrap();

        // The div host survived (adopted), the changed leaf was replaced,
        // the sibling leaf is referentially untouched.
        let div_after = container.child(0).unwrap();
        assert!(div_after.ptr_eq(&div_before));
        let div_after = div_after.as_element().unwrap();
        assert_eq!(div_after.child(0).unwrap().text_content(), "y");
        assert!(div_after.child(1).unwrap().ptr_eq(&sibling_before));

        // Registry entry was replaced, not appended.
        assert!(engine.mounted_root(&container).unwrap().ptr_eq(&second));
    }

    #[test]
    fn test_remount_carries_live_state_over() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let first = engine.component(Counter, IndexMap::new(), vec![]);
        engine.mount(&container, first.clone()).unwrap();

        first
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("count", json!(5))
            .unwrap();
        assert_eq!(contents(&container), vec!["count: 5"]);

        // Hot reload: same constructor, brand-new instance.
        let second = engine.component(Counter, IndexMap::new(), vec![]);
        engine.mount(&container, second.clone()).unwrap();

        let instance = second.as_component().unwrap().instance().clone();
        // Deep-merge of old state over the new initial state.
        assert_eq!(
            instance.state().snapshot(),
            json!({ "count": 5, "label": "x" })
        );
        assert_eq!(contents(&container), vec!["count: 5"]);

        // The carried state stays live: writes re-render the new tree.
        instance.state().set("count", json!(6)).unwrap();
        assert_eq!(contents(&container), vec!["count: 6"]);
    }

    #[test]
    fn test_remount_with_structural_change_reinitializes() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        engine
            .mount(
                &container,
                engine.element("div", IndexMap::new(), vec![engine.text(json!("old"))]),
            )
            .unwrap();

        let fragment = engine.fragment(vec![engine.text(json!("a")), engine.text(json!("b"))]);
        engine.mount(&container, fragment).unwrap();

        assert_eq!(contents(&container), vec!["a", "b"]);
    }

    #[test]
    fn test_remount_keeps_foreign_siblings_in_container() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        // A host child the engine never owned.
        container.append_child(crate::host::HostText::new("foreign").into());

        engine
            .mount(&container, engine.text(json!("ours")))
            .unwrap();
        assert_eq!(contents(&container), vec!["foreign", "ours"]);

        engine
            .mount(&container, engine.text(json!("replaced")))
            .unwrap();
        assert_eq!(contents(&container), vec!["foreign", "replaced"]);
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_lifecycle_emission_order() {
        let log: Rc<StdRefCell<Vec<&'static str>>> = Rc::new(StdRefCell::new(Vec::new()));

        struct Observed {
            log: Rc<StdRefCell<Vec<&'static str>>>,
        }

        impl Component for Observed {
            fn wire(&self, channels: &LifecycleChannels) {
                let pairs: [(&'static str, &crate::events::Emitter<()>); 6] = [
                    ("initialization", &channels.initialization),
                    ("props_changed", &channels.props_changed),
                    ("before_render", &channels.before_render),
                    ("after_render", &channels.after_render),
                    ("mounted", &channels.mounted),
                    ("unmounted", &channels.unmounted),
                ];
                for (name, channel) in pairs {
                    let log = self.log.clone();
                    let _ = channel.subscribe(move |_| log.borrow_mut().push(name));
                }
            }

            fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
                Some(cx.text(json!("observed")))
            }
        }

        let engine = Engine::new();
        let container = HostElement::new("root");
        let node = engine.component(Observed { log: log.clone() }, IndexMap::new(), vec![]);
        engine.mount(&container, node).unwrap();
        engine.unmount(&container).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "initialization",
                "props_changed",
                "before_render",
                "after_render",
                "mounted",
                "unmounted",
            ]
        );
    }

    #[test]
    fn test_unmount_clears_container_and_registry() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        engine
            .mount(
                &container,
                engine.component(Pair, IndexMap::new(), vec![]),
            )
            .unwrap();
        assert_eq!(container.child_count(), 2);

        engine.unmount(&container).unwrap();
        assert_eq!(container.child_count(), 0);
        assert!(!engine.is_mounted(&container));

        // Unmounting again is a no-op.
        engine.unmount(&container).unwrap();
    }

    #[test]
    fn test_nested_component_unmounts_when_parent_rerenders_it_away() {
        use std::cell::Cell;

        thread_local! {
            static UNMOUNTS: Cell<u32> = const { Cell::new(0) };
        }

        struct Leaf;
        impl Component for Leaf {
            fn wire(&self, channels: &LifecycleChannels) {
                let _ = channels
                    .unmounted
                    .subscribe(|_| UNMOUNTS.with(|c| c.set(c.get() + 1)));
            }
            fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
                Some(cx.text(json!("leaf")))
            }
        }

        struct Parent;
        impl Component for Parent {
            fn initial_state(&self) -> Value {
                json!({ "show": true })
            }
            fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
                if cx.state().get("show") == json!(true) {
                    Some(cx.fragment(vec![cx.component(Leaf, IndexMap::new(), vec![])]))
                } else {
                    Some(cx.text(json!("empty")))
                }
            }
        }

        let engine = Engine::new();
        let container = HostElement::new("root");
        let parent = engine.component(Parent, IndexMap::new(), vec![]);
        engine.mount(&container, parent.clone()).unwrap();
        assert_eq!(UNMOUNTS.with(Cell::get), 0);

        parent
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("show", json!(false))
            .unwrap();

        // The discarded output's component emitted `unmounted` exactly once.
        assert_eq!(UNMOUNTS.with(Cell::get), 1);
        assert_eq!(contents(&container), vec!["empty"]);
    }

    #[test]
    fn test_component_rendering_nothing_then_something() {
        struct Toggle;
        impl Component for Toggle {
            fn initial_state(&self) -> Value {
                json!({ "show": false })
            }
            fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
                if cx.state().get("show") == json!(true) {
                    Some(cx.text(json!("visible")))
                } else {
                    None
                }
            }
        }

        let engine = Engine::new();
        let container = HostElement::new("root");
        let toggle = engine.component(Toggle, IndexMap::new(), vec![]);
        engine.mount(&container, toggle.clone()).unwrap();

        // Rendered to nothing: mounted, but no host output.
        assert_eq!(container.child_count(), 0);
        assert_eq!(host_range(&toggle).unwrap(), None);

        toggle
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("show", json!(true))
            .unwrap();
        assert_eq!(contents(&container), vec!["visible"]);
    }

    #[test]
    fn test_component_children_flow_through_render_output() {
        struct Wrapper;
        impl Component for Wrapper {
            fn render(&self, cx: &RenderContext<'_>) -> Option<VNode> {
                Some(cx.element("div", IndexMap::new(), cx.props().children().to_vec()))
            }
        }

        let engine = Engine::new();
        let container = HostElement::new("root");
        let node = engine.component(
            Wrapper,
            IndexMap::new(),
            vec![engine.text(json!("inner"))],
        );
        engine.mount(&container, node).unwrap();

        assert_eq!(markup_of_node(&container.child(0).unwrap()), "<div>inner</div>");
    }

    #[test]
    fn test_clobbered_host_tree_fails_the_write() {
        let engine = Engine::new();
        let container = HostElement::new("root");
        let counter = engine.component(Counter, IndexMap::new(), vec![]);
        engine.mount(&container, counter.clone()).unwrap();

        // Someone else emptied the container behind the engine's back; the
        // next re-render cannot locate its host child and the invariant
        // violation propagates to the state write.
        container.clear_children();
        let err = counter
            .as_component()
            .unwrap()
            .instance()
            .state()
            .set("count", json!(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::HostChildNotFound(_)));
    }

    // -------------------------------------------------------------------------
    // Multiple containers
    // -------------------------------------------------------------------------

    #[test]
    fn test_containers_are_independent() {
        let engine = Engine::new();
        let left = HostElement::new("left");
        let right = HostElement::new("right");

        engine.mount(&left, engine.text(json!("L"))).unwrap();
        engine.mount(&right, engine.text(json!("R"))).unwrap();

        assert_eq!(contents(&left), vec!["L"]);
        assert_eq!(contents(&right), vec!["R"]);
        assert!(engine.is_mounted(&left));
        assert!(engine.is_mounted(&right));
    }
}
