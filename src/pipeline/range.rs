//! Index resolver - which host-tree sibling positions a node occupies.
//!
//! Both update paths (targeted re-render and the full-tree diff) must know
//! exactly which children of the ancestor host element belong to a virtual
//! node before they remove or insert anything. The resolver answers with an
//! inclusive `[start, end]` interval; `None` means the node currently
//! contributes no host nodes at all (empty fragment, component rendered to
//! nothing).

use crate::engine::{NodeKind, RenderSlot, VNode};
use crate::error::EngineError;
use crate::host::HostNode;

/// Inclusive sibling-position interval within the ancestor host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRange {
    pub start: usize,
    pub end: usize,
}

impl HostRange {
    /// Single-position range.
    pub fn at(index: usize) -> Self {
        Self {
            start: index,
            end: index,
        }
    }

    /// Smallest range covering both.
    ///
    /// A fragment's children may sit discontiguously after moves; the
    /// merged span deliberately covers everything in between.
    pub fn merge(self, other: HostRange) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Ranges are never empty; this exists for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Resolve the inclusive range of sibling positions the node's rendered
/// output occupies within its nearest ancestor host element.
///
/// Errors are fatal consistency violations: a component traversed before
/// its first render, a node with no resolvable ancestor element, or a host
/// node missing from its purported siblings.
pub fn host_range(node: &VNode) -> Result<Option<HostRange>, EngineError> {
    match node.kind() {
        NodeKind::Component(cell) => match cell.render_slot() {
            RenderSlot::NotRendered => Err(EngineError::NotRendered(node.id())),
            RenderSlot::Empty => Ok(None),
            RenderSlot::Rendered(tree) => host_range(&tree),
        },
        NodeKind::Fragment => {
            let mut merged: Option<HostRange> = None;
            for child in node.children() {
                // Each child resolves independently; the union covers them.
                if let Some(range) = host_range(&child)? {
                    merged = Some(match merged {
                        Some(current) => current.merge(range),
                        None => range,
                    });
                }
            }
            Ok(merged)
        }
        NodeKind::Text(cell) => locate(node, &cell.host()),
        NodeKind::Element(cell) => {
            let host = cell
                .host()
                .ok_or_else(|| EngineError::NotMaterialized(node.id()))?;
            locate(node, &HostNode::Element(host))
        }
    }
}

fn locate(node: &VNode, host: &HostNode) -> Result<Option<HostRange>, EngineError> {
    let ancestor = node
        .root_element()
        .ok_or_else(|| EngineError::MissingRootElement(node.id()))?;
    let index = ancestor
        .index_of(host)
        .ok_or_else(|| EngineError::HostChildNotFound(node.id()))?;
    Ok(Some(HostRange::at(index)))
}
