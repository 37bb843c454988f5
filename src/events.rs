//! Emitter - pub/sub primitive for lifecycle channels.
//!
//! A minimal synchronous listener registry. The component lifecycle channels
//! are built on this; nothing in the engine assumes more than:
//!
//! - `subscribe(f)` returns a cleanup closure
//! - `subscribe_once(f)` fires at most once
//! - unsubscription is idempotent
//! - listeners are notified in registration order
//!
//! Emission snapshots the listener list first, so a listener may subscribe
//! or unsubscribe (including itself) without poisoning the dispatch in
//! progress.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::types::Cleanup;

struct Entry<T> {
    id: u64,
    once: bool,
    callback: Rc<dyn Fn(&T)>,
}

struct EmitterInner<T> {
    listeners: RefCell<Vec<Entry<T>>>,
    next_id: Cell<u64>,
}

/// Synchronous pub/sub channel.
pub struct Emitter<T> {
    inner: Rc<EmitterInner<T>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Emitter<T> {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(EmitterInner {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    fn register(&self, once: bool, callback: Rc<dyn Fn(&T)>) -> Cleanup {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .listeners
            .borrow_mut()
            .push(Entry { id, once, callback });

        let inner = self.inner.clone();
        Box::new(move || {
            // Idempotent by construction: a second removal finds nothing.
            inner.listeners.borrow_mut().retain(|entry| entry.id != id);
        })
    }

    /// Subscribe to every emission. Returns a cleanup that unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Cleanup {
        self.register(false, Rc::new(callback))
    }

    /// Subscribe for a single emission ("fire once" mode).
    ///
    /// The listener is removed before it is invoked, so a re-entrant emit
    /// from inside the callback cannot fire it twice.
    pub fn subscribe_once(&self, callback: impl Fn(&T) + 'static) -> Cleanup {
        self.register(true, Rc::new(callback))
    }

    /// Emit a value to all current listeners, in registration order.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<(u64, bool, Rc<dyn Fn(&T)>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|entry| (entry.id, entry.once, entry.callback.clone()))
            .collect();

        for (id, once, callback) in snapshot {
            if once {
                self.inner.listeners.borrow_mut().retain(|e| e.id != id);
            }
            callback(value);
        }
    }

    /// Remove all listeners.
    pub fn clear(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
