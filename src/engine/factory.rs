//! Node factory - the thin builders trees are constructed with.
//!
//! The declarative layer (templating, macros, plain code) hands the core
//! already-built virtual trees; these are the builders it uses. Text hosts
//! are constructed here, at virtual-node creation time: a host text leaf
//! for scalar literals, an inline host element wrapping the serialized
//! value for non-scalar literal content.

use std::any::TypeId;

use indexmap::IndexMap;
use serde_json::Value;

use crate::component::{Component, ComponentInstance, props_from_attrs};
use crate::host::{HostElement, HostNode, HostText};
use crate::types::AttrValue;

use super::Engine;
use super::node::{ComponentCell, ElementCell, NodeKind, TextCell, VNode};

impl Engine {
    /// Build an element node. The host element is created later, by
    /// materialization.
    pub fn element(
        &self,
        tag: impl Into<String>,
        attrs: IndexMap<String, AttrValue>,
        children: Vec<VNode>,
    ) -> VNode {
        let node = VNode::new(
            self.next_id(),
            NodeKind::Element(ElementCell::new(tag.into(), attrs)),
        );
        node.set_children(children);
        node
    }

    /// Build a text node wrapping a literal value.
    pub fn text(&self, value: impl Into<Value>) -> VNode {
        let value = value.into();
        let (host, literal) = match &value {
            Value::String(text) => (HostNode::Text(HostText::new(text.clone())), text.clone()),
            Value::Object(_) | Value::Array(_) => {
                // Non-scalar literal content gets an inline host element.
                let serialized = value.to_string();
                let inline = HostElement::new("span");
                inline.append_child(HostText::new(serialized.clone()).into());
                (HostNode::Element(inline), serialized)
            }
            Value::Null => (HostNode::Text(HostText::new("")), String::new()),
            other => {
                let serialized = other.to_string();
                (HostNode::Text(HostText::new(serialized.clone())), serialized)
            }
        };
        VNode::new(self.next_id(), NodeKind::Text(TextCell::new(host, literal)))
    }

    /// Build a fragment node: a transparent grouping with no host
    /// representation of its own.
    pub fn fragment(&self, children: Vec<VNode>) -> VNode {
        let node = VNode::new(self.next_id(), NodeKind::Fragment);
        node.set_children(children);
        node
    }

    /// Build a component node from user behavior, attributes and children.
    ///
    /// Plain attribute values become props; the children sequence is always
    /// part of the props. The instance is constructed here (running the
    /// constructor-time lifecycle) and armed so state writes re-render this
    /// node.
    pub fn component<C: Component>(
        &self,
        behavior: C,
        attrs: IndexMap<String, AttrValue>,
        children: Vec<VNode>,
    ) -> VNode {
        let props = props_from_attrs(attrs, children.clone());
        let instance = ComponentInstance::new(Box::new(behavior), TypeId::of::<C>(), props);

        let node = VNode::new(
            self.next_id(),
            NodeKind::Component(ComponentCell::new(instance.clone())),
        );
        node.set_children(children);
        instance.set_owner(&node);
        instance.arm_trigger(self, &node);
        node
    }
}

/// Build an attribute map from pairs, preserving order.
pub fn attr_map<N: Into<String>, V: Into<AttrValue>>(
    pairs: impl IntoIterator<Item = (N, V)>,
) -> IndexMap<String, AttrValue> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}
