//! Reactive component state.
//!
//! State is a `serde_json::Value` tree behind a path-based `get`/`set`
//! surface (`"user.name"` addresses a nested field). Writes at any depth
//! synchronously trigger the owning component's re-render unless the new
//! value equals the old one. Intermediate objects are created on first
//! write to a nested path, so nested state needs no pre-declaration.
//!
//! Two observation surfaces exist:
//!
//! - the re-render trigger, a direct callback installed when the instance
//!   is attached to its node. A direct call (rather than a signal/effect
//!   hop) keeps the failure path honest: an invariant violation raised by
//!   the re-render propagates out of [`ReactiveState::set`] as a `Result`.
//! - a spark-signals revision counter bumped on every accepted write, so
//!   application code can hang `effect`s and `derived`s off component state.
//!
//! ```ignore
//! use spark_signals::effect;
//!
//! let revision = state.revision();
//! let stop = effect(move || {
//!     let _ = revision.get(); // re-runs on every accepted write
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Map, Value};
use spark_signals::{Signal, signal};

use crate::error::EngineError;

/// Re-render trigger installed by the engine when the component is attached
/// to its node.
pub(crate) type RerenderTrigger = Rc<dyn Fn() -> Result<(), EngineError>>;

/// Path-addressed reactive state owned by a component instance.
pub struct ReactiveState {
    values: RefCell<Value>,
    revision: Signal<u64>,
    trigger: RefCell<Option<RerenderTrigger>>,
}

impl ReactiveState {
    /// Wrap an initial value tree. A non-object initial value is replaced
    /// by an empty object: paths need an object root.
    pub(crate) fn new(initial: Value) -> Self {
        let values = match initial {
            Value::Object(map) => Value::Object(map),
            _ => Value::Object(Map::new()),
        };
        Self {
            values: RefCell::new(values),
            revision: signal(0u64),
            trigger: RefCell::new(None),
        }
    }

    /// Read the value at `path`. Missing paths read as `Null`.
    pub fn get(&self, path: &str) -> Value {
        let values = self.values.borrow();
        let mut cursor = &*values;
        for segment in path.split('.') {
            match cursor.get(segment) {
                Some(next) => cursor = next,
                None => return Value::Null,
            }
        }
        cursor.clone()
    }

    /// Write `value` at `path`, creating intermediate objects as needed.
    ///
    /// Writing a value equal to the current one is a no-op: no revision
    /// bump, no re-render. An accepted write synchronously re-renders the
    /// owning component before this call returns; any invariant violation
    /// raised by that re-render is the caller's.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<(), EngineError> {
        let value = value.into();
        {
            let mut values = self.values.borrow_mut();
            let mut cursor = &mut *values;
            let mut segments = path.split('.').peekable();
            while let Some(segment) = segments.next() {
                if !cursor.is_object() {
                    // First nested write through a non-object: wrap.
                    *cursor = Value::Object(Map::new());
                }
                let map = cursor.as_object_mut().unwrap();
                if segments.peek().is_none() {
                    if map.get(segment) == Some(&value) {
                        return Ok(());
                    }
                    map.insert(segment.to_string(), value);
                    break;
                }
                cursor = map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
            }
        }

        self.revision.set(self.revision.get() + 1);

        let trigger = self.trigger.borrow().clone();
        match trigger {
            Some(trigger) => trigger(),
            None => Ok(()),
        }
    }

    /// Deep clone of the whole value tree.
    pub fn snapshot(&self) -> Value {
        self.values.borrow().clone()
    }

    /// Revision counter, bumped on every accepted write.
    ///
    /// This is the spark-signals integration point: read it inside an
    /// `effect` or `derived` to react to state changes.
    pub fn revision(&self) -> Signal<u64> {
        self.revision.clone()
    }

    /// Deep-assign a previous generation's values onto this state.
    ///
    /// Objects merge recursively, previous values winning; everything else
    /// overwrites. Does not trigger a re-render: this runs before the
    /// owning component's first render (hot-reload state carry-over).
    pub(crate) fn deep_assign(&self, previous: &Value) {
        let mut values = self.values.borrow_mut();
        merge(&mut values, previous);
    }

    pub(crate) fn install_trigger(&self, trigger: RerenderTrigger) {
        *self.trigger.borrow_mut() = Some(trigger);
    }

    /// Disarm the re-render trigger. Later writes still mutate the value
    /// tree and bump the revision, but no longer reach a dead component.
    pub(crate) fn clear_trigger(&self) {
        self.trigger.borrow_mut().take();
    }
}

fn merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}
