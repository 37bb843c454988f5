//! Targeted re-render - the state-triggered update path.
//!
//! A state write on a live component re-renders exactly that component's
//! subtree, synchronously, before the write returns to its caller. The
//! ancestor host element is patched in place: the old output's positions
//! are vacated (reverse order, stable indices) and the new output's host
//! nodes land at the same starting position, so siblings are never touched.

use tracing::debug;

use crate::engine::{Engine, RenderSlot, VNode};
use crate::error::EngineError;
use crate::pipeline::materialize::create_elements;

use super::{flatten_host_nodes, remove_range, splice, teardown};

/// Re-render a component node in place.
///
/// No-op when the component has never rendered (nothing is mounted, so
/// there is nothing to patch). All other failure modes are fatal
/// precondition violations and are not retried.
pub fn rerender(engine: &Engine, node: &VNode) -> Result<(), EngineError> {
    let Some(cell) = node.as_component() else {
        // Triggers are only armed on component nodes; a non-component here
        // means the caller re-rendered by hand, which has nothing to do.
        return Ok(());
    };

    let old_slot = cell.render_slot();
    if !old_slot.is_rendered() {
        return Ok(());
    }

    let ancestor = node
        .root_element()
        .ok_or_else(|| EngineError::MissingRootElement(node.id()))?;

    // Resolve positions from the old output before anything moves.
    let range = crate::pipeline::range::host_range(node)?;
    debug!(node = ?node, ?range, "targeted re-render");

    if let Some(range) = range {
        remove_range(&ancestor, range);
    }

    // Render the replacement, then retire the old output; nested
    // components of the old generation emit `unmounted` here.
    let output = cell.instance().invoke_render(engine);
    if let RenderSlot::Rendered(old_tree) = &old_slot {
        teardown(old_tree);
    }
    let slot = match output {
        Some(tree) => {
            tree.set_render_owner(node);
            RenderSlot::Rendered(tree)
        }
        None => RenderSlot::Empty,
    };
    cell.set_render_slot(slot.clone());

    if let RenderSlot::Rendered(tree) = slot {
        create_elements(engine, &tree);
        let hosts = flatten_host_nodes(&tree)?;
        // An empty previous output leaves no anchor; append in that case.
        splice(&ancestor, range.map(|r| r.start), hosts);
    }

    Ok(())
}
