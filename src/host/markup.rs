//! Deterministic markup serialization for host trees.
//!
//! Output ordering is stable and platform-independent: child traversal
//! follows tree order and attributes are emitted in lexical name order, so
//! two trees with the same content always serialize identically. Listeners
//! are not serialized; they have no textual representation, which is exactly
//! why the reconciler refreshes attribute maps even when markup matches.

use super::{HostElement, HostNode};

/// Escape text content (`&`, `<`, `>`).
pub(crate) fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value (text escapes plus `"`).
pub(crate) fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render an attribute list in lexical name order.
pub(crate) fn render_attrs(attrs: &mut Vec<(String, String)>, out: &mut String) {
    attrs.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, value) in attrs.iter() {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
}

/// Outer markup of a host element, children included.
pub fn markup_of(element: &HostElement) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

/// Markup of either host node kind.
pub fn markup_of_node(node: &HostNode) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &HostNode, out: &mut String) {
    match node {
        HostNode::Element(element) => write_element(element, out),
        HostNode::Text(text) => out.push_str(&escape_text(&text.value())),
    }
}

fn write_element(element: &HostElement, out: &mut String) {
    let tag = element.tag();
    out.push('<');
    out.push_str(&tag);
    let mut attrs = element.attributes();
    render_attrs(&mut attrs, out);
    out.push('>');
    for child in element.children() {
        write_node(&child, out);
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}
