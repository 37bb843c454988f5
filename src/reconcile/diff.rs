//! Full-tree diff - the remount path.
//!
//! When a tree is mounted into a container that already holds a previous
//! generation, the engine does not blindly replace: it walks both trees in
//! lock-step, carries live component state across, and patches only the
//! differing parts of the host tree.
//!
//! Two passes:
//!
//! 1. [`mark_nodes_to_be_updated`] classifies each pair and leaves a
//!    `should_update` mark on changed subtrees, signalling "changed" upward.
//!    Same-constructor component pairs deep-assign the previous state onto
//!    the new instance *before* its first render, so hot-reload remounts
//!    keep live state even though the instance is new.
//! 2. [`update_nodes`] consumes the marks: unmarked pairs adopt the
//!    previous host representation untouched (host identity is part of the
//!    contract); marked pairs are spliced out and rebuilt in place; a
//!    marked tree root re-initializes the whole container.
//!
//! Content comparison uses the deterministic virtual serialization below:
//! listeners have no textual form, which is why attribute maps are
//! refreshed even when markup matches.

use tracing::debug;

use crate::engine::{Engine, NodeKind, RenderSlot, VNode};
use crate::error::EngineError;
use crate::host::HostElement;
use crate::host::markup::{escape_text, render_attrs};
use crate::pipeline::materialize::{
    attr_string, create_elements, ensure_rendered, refresh_host_attributes,
};
use crate::pipeline::range::host_range;
use crate::types::AttrValue;

use super::{flatten_host_nodes, previous_range, remove_range, splice, teardown};

// =============================================================================
// Mark Pass
// =============================================================================

/// Walk both generations in lock-step and mark changed subtrees.
///
/// Returns the change signal for the pair: `true` when this subtree
/// contains any difference. Structural mismatches (different shape,
/// different child count, a component gaining or losing its render output)
/// mark both nodes and stop descending - the whole subtree is replaced.
pub fn mark_nodes_to_be_updated(
    engine: &Engine,
    previous: &VNode,
    current: &VNode,
) -> Result<bool, EngineError> {
    if previous.kind().shape() != current.kind().shape()
        || previous.child_count() != current.child_count()
    {
        previous.set_should_update(true);
        current.set_should_update(true);
        return Ok(true);
    }

    let changed = match (previous.kind(), current.kind()) {
        (NodeKind::Component(prev), NodeKind::Component(cur)) => {
            if prev.instance().constructor() == cur.instance().constructor() {
                // Live state survives the remount: previous values are
                // deep-assigned before the new instance's first render.
                cur.instance()
                    .state()
                    .deep_assign(&prev.instance().state().snapshot());
            }
            ensure_rendered(engine, current, cur);

            match (prev.render_slot(), cur.render_slot()) {
                (RenderSlot::NotRendered, _) => {
                    return Err(EngineError::NotRendered(previous.id()));
                }
                (RenderSlot::Empty, RenderSlot::Empty) => false,
                (RenderSlot::Rendered(prev_tree), RenderSlot::Rendered(cur_tree)) => {
                    mark_nodes_to_be_updated(engine, &prev_tree, &cur_tree)?
                }
                // Gaining or losing render output is a structural mismatch.
                _ => true,
            }
        }
        (NodeKind::Fragment, NodeKind::Fragment) => {
            let mut changed = false;
            for (prev_child, cur_child) in previous.children().iter().zip(current.children()) {
                changed |= mark_nodes_to_be_updated(engine, prev_child, &cur_child)?;
            }
            changed
        }
        (NodeKind::Text(prev), NodeKind::Text(cur)) => prev.literal() != cur.literal(),
        (NodeKind::Element(prev), NodeKind::Element(cur)) => {
            // Children first: nested component pairs transfer state and
            // render before any serialization looks at their output.
            let mut child_changed = false;
            for (prev_child, cur_child) in previous.children().iter().zip(current.children()) {
                child_changed |= mark_nodes_to_be_updated(engine, prev_child, &cur_child)?;
            }
            let changed = child_changed
                || serialize_vnode(engine, previous)? != serialize_vnode(engine, current)?;
            if !changed {
                let cur_attrs = cur.attribute_map();
                if attrs_differ(&prev.attribute_map(), &cur_attrs) {
                    // Identical markup can still hide handler changes.
                    debug!(node = ?previous, "refreshing attribute map on unchanged element");
                    if let Some(host) = prev.host() {
                        refresh_host_attributes(&host, cur_attrs.clone());
                    }
                    prev.replace_attributes(cur_attrs);
                }
            }
            changed
        }
        // Shape equality was checked above.
        _ => unreachable!("virtual node pair with matching shapes"),
    };

    previous.set_should_update(changed);
    current.set_should_update(changed);
    Ok(changed)
}

fn attrs_differ(
    previous: &indexmap::IndexMap<String, AttrValue>,
    current: &indexmap::IndexMap<String, AttrValue>,
) -> bool {
    if previous.len() != current.len() {
        return true;
    }
    for (name, prev_value) in previous {
        let Some(cur_value) = current.get(name) else {
            return true;
        };
        let same = match (prev_value, cur_value) {
            (AttrValue::Value(a), AttrValue::Value(b)) => a == b,
            (AttrValue::Listener(a), AttrValue::Listener(b)) => std::rc::Rc::ptr_eq(a, b),
            _ => false,
        };
        if !same {
            return true;
        }
    }
    false
}

// =============================================================================
// Update Pass
// =============================================================================

/// Walk the marked tree and patch the host tree.
///
/// Unmarked pairs are skipped: the current node adopts the previous host
/// representation untouched. Marked pairs descend while the mark pass kept
/// refining below them (some descendant pair is marked) and are replaced at
/// the frontier where refinement stopped: structural mismatches, changed
/// leaves, and elements whose own content changed. A frontier at the tree
/// root re-initializes the whole container.
pub(crate) fn update_nodes(
    engine: &Engine,
    previous: &VNode,
    current: &VNode,
    container: &HostElement,
    is_root: bool,
) -> Result<(), EngineError> {
    if previous.should_update() {
        let structural = previous.kind().shape() != current.kind().shape()
            || previous.child_count() != current.child_count();

        if !structural {
            match (previous.kind(), current.kind()) {
                (NodeKind::Component(prev), NodeKind::Component(cur)) => {
                    // Both rendered: the render pair carries the mark; a
                    // slot transition falls through to replacement.
                    if let (RenderSlot::Rendered(prev_tree), RenderSlot::Rendered(cur_tree)) =
                        (prev.render_slot(), cur.render_slot())
                    {
                        update_nodes(engine, &prev_tree, &cur_tree, container, is_root)?;
                        cur.instance().emit_mounted();
                        clear_marks(previous, current);
                        return Ok(());
                    }
                }
                (NodeKind::Fragment, NodeKind::Fragment) => {
                    // A fragment's mark is the union of its children's;
                    // the marked ones replace themselves below.
                    for (prev_child, cur_child) in
                        previous.children().iter().zip(current.children())
                    {
                        update_nodes(engine, prev_child, &cur_child, container, false)?;
                    }
                    clear_marks(previous, current);
                    return Ok(());
                }
                (NodeKind::Element(prev), NodeKind::Element(cur)) => {
                    let refining = previous.children().iter().any(VNode::should_update);
                    if refining {
                        // The difference sits further down: keep the host
                        // element, patch its attributes in place, descend.
                        cur.adopt_host(prev.host());
                        let cur_attrs = cur.attribute_map();
                        if attrs_differ(&prev.attribute_map(), &cur_attrs) {
                            if let Some(host) = prev.host() {
                                refresh_host_attributes(&host, cur_attrs);
                            }
                        }
                        for (prev_child, cur_child) in
                            previous.children().iter().zip(current.children())
                        {
                            update_nodes(engine, prev_child, &cur_child, container, false)?;
                        }
                        clear_marks(previous, current);
                        return Ok(());
                    }
                }
                // Text leaves are always a frontier.
                _ => {}
            }
        }

        if is_root {
            reinitialize(engine, previous, current, container)?;
        } else {
            replace_node(engine, previous, current)?;
        }
        clear_marks(previous, current);
        return Ok(());
    }

    match (previous.kind(), current.kind()) {
        (NodeKind::Component(prev), NodeKind::Component(cur)) => {
            if let (RenderSlot::Rendered(prev_tree), RenderSlot::Rendered(cur_tree)) =
                (prev.render_slot(), cur.render_slot())
            {
                update_nodes(engine, &prev_tree, &cur_tree, container, false)?;
            }
            // A new instance took over live output.
            cur.instance().emit_mounted();
        }
        (NodeKind::Fragment, NodeKind::Fragment) => {
            for (prev_child, cur_child) in previous.children().iter().zip(current.children()) {
                update_nodes(engine, prev_child, &cur_child, container, false)?;
            }
        }
        (NodeKind::Text(prev), NodeKind::Text(cur)) => {
            cur.adopt_host(prev.host());
        }
        (NodeKind::Element(prev), NodeKind::Element(cur)) => {
            cur.adopt_host(prev.host());
            for (prev_child, cur_child) in previous.children().iter().zip(current.children()) {
                update_nodes(engine, prev_child, &cur_child, container, false)?;
            }
        }
        // Unmarked pairs always share a shape; a mismatch would have been
        // marked structural in the mark pass.
        _ => {}
    }
    Ok(())
}

fn clear_marks(previous: &VNode, current: &VNode) {
    previous.set_should_update(false);
    current.set_should_update(false);
}

/// Replace a marked non-root pair: vacate the previous node's positions,
/// tear it down, and splice the freshly materialized current subtree in at
/// the same starting position.
fn replace_node(engine: &Engine, previous: &VNode, current: &VNode) -> Result<(), EngineError> {
    let ancestor = previous
        .root_element()
        .ok_or_else(|| EngineError::PreviousRootMissing(previous.id()))?;
    let range = host_range(previous)?;
    debug!(previous = ?previous, current = ?current, ?range, "replacing subtree");

    if let Some(range) = range {
        remove_range(&ancestor, range);
    }
    teardown(previous);

    create_elements(engine, current);
    let hosts = flatten_host_nodes(current)?;
    splice(&ancestor, range.map(|r| r.start), hosts);
    Ok(())
}

/// A marked tree root: throw the previous generation away and mount the
/// new tree fresh at the same position in the container.
fn reinitialize(
    engine: &Engine,
    previous: &VNode,
    current: &VNode,
    container: &HostElement,
) -> Result<(), EngineError> {
    debug!(previous = ?previous, current = ?current, "whole-container re-initialize");
    let range = previous_range(previous)?;
    teardown(previous);
    if let Some(range) = range {
        remove_range(container, range);
    }

    create_elements(engine, current);
    let hosts = flatten_host_nodes(current)?;
    splice(container, range.map(|r| r.start), hosts);
    Ok(())
}

// =============================================================================
// Virtual Serialization
// =============================================================================

/// Deterministic serialization of a virtual subtree, used for content
/// comparison. Matches the host markup format: lexical attribute order,
/// the same escaping, listeners omitted.
pub(crate) fn serialize_vnode(engine: &Engine, node: &VNode) -> Result<String, EngineError> {
    let mut out = String::new();
    write_vnode(engine, node, &mut out)?;
    Ok(out)
}

fn write_vnode(engine: &Engine, node: &VNode, out: &mut String) -> Result<(), EngineError> {
    match node.kind() {
        NodeKind::Component(cell) => {
            // A fresh generation may reach serialization unrendered when
            // its pair never aligned; render it here so comparison sees
            // real output.
            ensure_rendered(engine, node, cell);
            if let Some(tree) = cell.render_slot().tree() {
                write_vnode(engine, &tree, out)?;
            }
            Ok(())
        }
        NodeKind::Fragment => {
            for child in node.children() {
                write_vnode(engine, &child, out)?;
            }
            Ok(())
        }
        NodeKind::Text(cell) => {
            out.push_str(&escape_text(cell.literal()));
            Ok(())
        }
        NodeKind::Element(cell) => {
            let tag = cell.tag().to_string();
            out.push('<');
            out.push_str(&tag);
            let mut attrs: Vec<(String, String)> = cell
                .attributes()
                .into_iter()
                .filter_map(|(name, value)| match value {
                    AttrValue::Value(value) => attr_string(&value).map(|s| (name, s)),
                    AttrValue::Listener(_) => None,
                })
                .collect();
            render_attrs(&mut attrs, out);
            out.push('>');
            for child in node.children() {
                write_vnode(engine, &child, out)?;
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
            Ok(())
        }
    }
}
