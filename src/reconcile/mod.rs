//! Reconciler - the two update algorithms.
//!
//! - [`rerender`] - targeted re-render of one component's subtree,
//!   triggered synchronously by a state mutation.
//! - [`diff`] - full-tree diff-and-replace for remount scenarios
//!   (hot-reload style updates), preserving live state and untouched host
//!   nodes across generations.
//!
//! Both share the same splice discipline: resolve the host range, remove in
//! reverse so indices stay stable, rebuild, insert the flattened host nodes
//! back starting at the range's start.

pub mod diff;
pub mod rerender;

pub use diff::mark_nodes_to_be_updated;
pub use rerender::rerender;

use tracing::debug;

use crate::engine::{Engine, NodeKind, RenderSlot, VNode};
use crate::error::EngineError;
use crate::host::{HostElement, HostNode};
use crate::pipeline::mount::mount_dom;
use crate::pipeline::range::{HostRange, host_range};

/// Reconcile a previous generation against a new tree mounted into the same
/// container. Called by the mount entry point when the container already
/// holds a generation.
pub(crate) fn reconcile(
    engine: &Engine,
    previous: &VNode,
    current: &VNode,
    container: &HostElement,
) -> Result<(), EngineError> {
    let changed = mark_nodes_to_be_updated(engine, previous, current)?;
    debug!(previous = ?previous, current = ?current, changed, "reconciling remount");

    // The new generation takes over the container as its insertion root.
    current.set_cached_root(container.clone());
    diff::update_nodes(engine, previous, current, container, true)?;

    // Previous instances not already torn down by a replacement go now;
    // teardown never touches host nodes, so adopted hosts are safe.
    teardown(previous);
    Ok(())
}

/// Emit `unmounted` (exactly once per instance) across a discarded subtree
/// and disarm its state triggers. Host nodes are deliberately untouched:
/// they may have been adopted by a newer generation.
pub(crate) fn teardown(node: &VNode) {
    if let Some(cell) = node.as_component() {
        cell.instance().unmount();
        if let Some(tree) = cell.render_slot().tree() {
            teardown(&tree);
        }
    }
    for child in node.children() {
        teardown(&child);
    }
}

/// Flatten a materialized subtree into the ordered list of host nodes that
/// must be spliced into the ancestor. Nested components and fragments are
/// recursed through; an element contributes its own host after its
/// descendants are eagerly mounted into it.
pub(crate) fn flatten_host_nodes(node: &VNode) -> Result<Vec<HostNode>, EngineError> {
    match node.kind() {
        NodeKind::Component(cell) => {
            let hosts = match cell.render_slot() {
                RenderSlot::NotRendered => return Err(EngineError::NotRendered(node.id())),
                RenderSlot::Empty => Vec::new(),
                RenderSlot::Rendered(tree) => flatten_host_nodes(&tree)?,
            };
            cell.instance().emit_mounted();
            Ok(hosts)
        }
        NodeKind::Fragment => {
            let mut hosts = Vec::new();
            for child in node.children() {
                hosts.extend(flatten_host_nodes(&child)?);
            }
            Ok(hosts)
        }
        NodeKind::Text(cell) => Ok(vec![cell.host()]),
        NodeKind::Element(cell) => {
            let host = cell
                .host()
                .ok_or_else(|| EngineError::NotMaterialized(node.id()))?;
            let mut counter = 0;
            for child in node.children() {
                mount_dom(&child, &host, None, &mut counter)?;
            }
            Ok(vec![HostNode::Element(host)])
        }
    }
}

/// Remove an inclusive range of host children, in reverse order so indices
/// stay stable.
pub(crate) fn remove_range(ancestor: &HostElement, range: HostRange) {
    for index in (range.start..=range.end).rev() {
        ancestor.remove_child(index);
    }
}

/// Insert flattened host nodes starting at `start`, or append when there is
/// no anchor position.
pub(crate) fn splice(ancestor: &HostElement, start: Option<usize>, hosts: Vec<HostNode>) {
    match start {
        Some(start) => {
            for (offset, host) in hosts.into_iter().enumerate() {
                ancestor.insert_child(start + offset, host);
            }
        }
        None => {
            for host in hosts {
                ancestor.append_child(host);
            }
        }
    }
}

/// Resolve a previous node's range, or fail with the reconciliation-side
/// error when its root element is gone.
pub(crate) fn previous_range(previous: &VNode) -> Result<Option<HostRange>, EngineError> {
    if previous.root_element().is_none() {
        return Err(EngineError::PreviousRootMissing(previous.id()));
    }
    host_range(previous)
}
