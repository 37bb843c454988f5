//! # spark-view
//!
//! Reactive virtual-tree rendering engine for Rust.
//!
//! Components describe UI declaratively; the engine keeps a real display
//! tree (the "host tree") synchronized with that description as state
//! changes over time.
//!
//! ## Architecture
//!
//! The pipeline is synchronous end to end:
//!
//! ```text
//! component tree -> createElements -> mountDOM -> host tree
//!                        ^               |
//!                        '-- state write (targeted re-render)
//! ```
//!
//! A state write on a live component re-renders exactly that component's
//! subtree before the write returns. Remounting a container that already
//! holds a generation goes through the reconciler instead: live component
//! state is carried across and only the differing host nodes are touched
//! (hot-reload style updates).
//!
//! ## Modules
//!
//! - [`types`] - Core types (NodeId, AttrValue, host events)
//! - [`engine`] - Engine handle, virtual-node model, node factory
//! - [`component`] - Component contract, reactive state, lifecycle channels
//! - [`host`] - In-memory host tree (elements, text, listeners, markup)
//! - [`pipeline`] - Materializer, mounter, index resolver
//! - [`reconcile`] - Targeted re-render and the full-tree diff

pub mod component;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod pipeline;
pub mod reconcile;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use engine::{
    ComponentCell, ElementCell, Engine, NodeKind, RenderSlot, TextCell, VNode, WeakVNode, attr_map,
};

pub use component::{
    Component, ComponentInstance, LifecycleChannels, Props, ReactiveState, RenderContext,
};

pub use error::EngineError;

pub use events::Emitter;

pub use host::{HostElement, HostNode, HostText, event_name, markup_of, markup_of_node};

pub use pipeline::{HostRange, create_elements, host_range, insert_target, mount_dom};

pub use reconcile::{mark_nodes_to_be_updated, rerender};
