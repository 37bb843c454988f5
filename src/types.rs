//! Core types for spark-view.
//!
//! These types define the foundation that everything builds on.
//! They flow through the whole mount/reconcile pipeline and define what the
//! host tree and the virtual tree agree on.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

// =============================================================================
// Node Identity
// =============================================================================

/// Unique identifier of a virtual node.
///
/// Allocated from the engine's monotonic counter; never reused for the
/// lifetime of the engine. Identity across tree generations is never decided
/// by this id (the diff compares constructor identity instead), so the only
/// contract is uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by subscriptions.
///
/// Call this to unsubscribe. Calling it twice is harmless: the underlying
/// removal is idempotent and the closure consumes itself.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Host Events
// =============================================================================

/// Event delivered to host-element listeners.
///
/// The engine does not define an event taxonomy; `name` is whatever the
/// dispatching side used, `detail` is an arbitrary payload.
#[derive(Clone, Debug)]
pub struct HostEvent {
    /// Event name as registered ("click", "input", ...).
    pub name: String,
    /// Arbitrary payload attached by the dispatcher.
    pub detail: Value,
}

impl HostEvent {
    /// Create an event with an empty payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    /// Create an event carrying a payload.
    pub fn with_detail(name: impl Into<String>, detail: Value) -> Self {
        Self {
            name: name.into(),
            detail,
        }
    }
}

/// Host event callback (Rc for shared ownership in closures).
///
/// Using Rc<dyn Fn> instead of Box<dyn Fn> allows cloning callbacks into
/// closures without ownership issues, the same way component callbacks are
/// shared everywhere else in the engine.
pub type EventCallback = Rc<dyn Fn(&HostEvent)>;

// =============================================================================
// Attribute Values
// =============================================================================

/// Value bound to an element attribute in the virtual tree.
///
/// Listener values are registered as host event listeners during
/// materialization; plain values are serialized to attribute strings.
#[derive(Clone)]
pub enum AttrValue {
    /// Plain attribute value, serialized to a string on the host element.
    Value(Value),
    /// Event listener, registered on the host element under the mapped
    /// event name instead of being serialized.
    Listener(EventCallback),
}

impl AttrValue {
    /// Whether this is a listener binding.
    pub fn is_listener(&self) -> bool {
        matches!(self, AttrValue::Listener(_))
    }

    /// Wrap a callback as a listener attribute.
    pub fn listener(callback: impl Fn(&HostEvent) + 'static) -> Self {
        AttrValue::Listener(Rc::new(callback))
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Value(v) => write!(f, "Value({v})"),
            AttrValue::Listener(_) => write!(f, "Listener(..)"),
        }
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        AttrValue::Value(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Value(Value::String(value.to_string()))
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Value(Value::String(value))
    }
}
