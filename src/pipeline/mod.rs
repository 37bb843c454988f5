//! Materialize/mount pipeline.
//!
//! The path a virtual tree takes on its way into the host tree:
//!
//! ```text
//! virtual tree -> create_elements -> mount_dom -> host tree
//!                      |                 |
//!                  host nodes        positions (host_range)
//! ```
//!
//! - [`materialize`] - create host nodes for a subtree
//! - [`mount`] - insert host nodes at the correct positions
//! - [`range`] - resolve which positions a node currently occupies

pub mod materialize;
pub mod mount;
pub mod range;

pub use materialize::create_elements;
pub use mount::{insert_target, mount_dom};
pub use range::{HostRange, host_range};
