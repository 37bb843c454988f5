//! Materializer - gives every virtual node its host representation.
//!
//! `create_elements` walks a subtree and ensures every node owns a host
//! node: components render (once) and recurse into their output, fragments
//! recurse, text nodes carry their host from construction, elements get a
//! host element with the attribute map applied. Materialization only
//! *creates*; nothing is inserted into the host tree here (that is the
//! mounter's job).

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::engine::{ComponentCell, Engine, NodeKind, RenderSlot, VNode};
use crate::host::{HostElement, event_name};
use crate::types::AttrValue;

/// Recursively ensure every node in the subtree owns a host node.
pub fn create_elements(engine: &Engine, node: &VNode) {
    match node.kind() {
        NodeKind::Component(cell) => {
            ensure_rendered(engine, node, cell);
            if let Some(tree) = cell.render_slot().tree() {
                create_elements(engine, &tree);
            }
        }
        NodeKind::Fragment => {
            for child in node.children() {
                create_elements(engine, &child);
            }
        }
        // Host text/inline node already constructed at virtual-node
        // creation time.
        NodeKind::Text(_) => {}
        NodeKind::Element(cell) => {
            if cell.host().is_none() {
                let host = HostElement::new(cell.tag());
                apply_attributes(&host, cell.attribute_map());
                cell.set_host(host);
            }
            for child in node.children() {
                create_elements(engine, &child);
            }
        }
    }
}

/// Render a component node if it never rendered, storing the output and
/// preserving the rendered-to-nothing distinction.
pub(crate) fn ensure_rendered(engine: &Engine, node: &VNode, cell: &ComponentCell) {
    if cell.render_slot().is_rendered() {
        return;
    }
    match cell.instance().invoke_render(engine) {
        Some(tree) => {
            tree.set_render_owner(node);
            cell.set_render_slot(RenderSlot::Rendered(tree));
        }
        None => cell.set_render_slot(RenderSlot::Empty),
    }
}

/// Serialized attribute form of a plain value, or `None` for values that
/// have no attribute representation (objects, arrays).
pub(crate) fn attr_string(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) | Value::Array(_) => None,
        Value::Null => Some(String::new()),
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Apply an attribute map to a host element.
///
/// Listener values are registered as host event listeners under the mapped
/// event name (the `on*` table; an unprefixed key registers under its own
/// name). All other non-object values are serialized to attribute strings.
pub(crate) fn apply_attributes(host: &HostElement, attrs: IndexMap<String, AttrValue>) {
    for (name, value) in attrs {
        match value {
            AttrValue::Listener(callback) => {
                let event = event_name(&name).unwrap_or(&name);
                host.set_listener(event, callback);
            }
            AttrValue::Value(value) => match attr_string(&value) {
                Some(serialized) => host.set_attribute(name, serialized),
                None => {
                    trace!(attr = %name, "non-scalar attribute value skipped");
                }
            },
        }
    }
}

/// Re-apply an attribute map to an already-materialized host element,
/// dropping anything the new map no longer mentions. Used by the diff when
/// attribute maps differ but serialized content does not (handler-identity
/// changes are invisible to markup).
pub(crate) fn refresh_host_attributes(host: &HostElement, attrs: IndexMap<String, AttrValue>) {
    host.clear_listeners();
    for (name, _) in host.attributes() {
        host.remove_attribute(&name);
    }
    apply_attributes(host, attrs);
}
