//! Mounter - inserts materialized host nodes into the host tree.
//!
//! `mount_dom` flattens a virtual subtree to its host nodes and inserts
//! them into the target element at the correct positions. Components
//! delegate to their render output, fragments delegate to each child in
//! order, and element/text nodes insert their own host node. The traversal
//! is depth-first pre-order: after an element's host is inserted, its
//! children are mounted into *it*, not into the original target.
//!
//! # Insertion counter
//!
//! Positioned insertion shares one counter across a whole fragment
//! flattening pass: the n-th host node lands at `index + n` without any
//! index recomputation between insertions. Callers start a pass with a
//! fresh `0`.

use crate::engine::{NodeKind, RenderSlot, VNode};
use crate::error::EngineError;
use crate::host::{HostElement, HostNode};

/// Insert the node's flattened host representation into `target`.
///
/// With `index`, host nodes are inserted before the child currently at
/// `index + *counter`, incrementing the shared counter per insertion;
/// without, they are appended. Component nodes emit `mounted` once their
/// output is in place.
pub fn mount_dom(
    node: &VNode,
    target: &HostElement,
    index: Option<usize>,
    counter: &mut usize,
) -> Result<(), EngineError> {
    match node.kind() {
        NodeKind::Component(cell) => {
            match cell.render_slot() {
                RenderSlot::NotRendered => return Err(EngineError::NotRendered(node.id())),
                RenderSlot::Empty => {}
                RenderSlot::Rendered(tree) => mount_dom(&tree, target, index, counter)?,
            }
            cell.instance().emit_mounted();
            Ok(())
        }
        NodeKind::Fragment => {
            // Children share the same index/counter so successive children
            // land at increasing positions.
            for child in node.children() {
                mount_dom(&child, target, index, counter)?;
            }
            Ok(())
        }
        NodeKind::Text(cell) => {
            insert(target, cell.host(), index, counter);
            Ok(())
        }
        NodeKind::Element(cell) => {
            let host = cell
                .host()
                .ok_or_else(|| EngineError::NotMaterialized(node.id()))?;
            insert(target, HostNode::Element(host.clone()), index, counter);
            let mut inner = 0;
            for child in node.children() {
                mount_dom(&child, &host, None, &mut inner)?;
            }
            Ok(())
        }
    }
}

fn insert(target: &HostElement, host: HostNode, index: Option<usize>, counter: &mut usize) {
    match index {
        Some(base) => {
            target.insert_child(base + *counter, host);
            *counter += 1;
        }
        None => target.append_child(host),
    }
}

/// Resolve a virtual insert target to the host element insertions go into:
/// an element node's own host, or the nearest ancestor element otherwise.
pub fn insert_target(target: &VNode) -> Result<HostElement, EngineError> {
    if let Some(cell) = target.as_element() {
        return cell
            .host()
            .ok_or_else(|| EngineError::NotMaterialized(target.id()));
    }
    target
        .root_element()
        .ok_or_else(|| EngineError::MissingRootElement(target.id()))
}
