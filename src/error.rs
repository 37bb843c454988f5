//! Engine error types.
//!
//! Every variant is a programmer-error invariant violation, not a
//! recoverable runtime condition. Nothing here is caught or retried
//! internally: errors are raised at the point of detection with the
//! offending node attached and propagate to whoever called the mount or
//! re-render entry point. A failed materialize/mount leaves the host tree in
//! whatever partial state the traversal reached.

use thiserror::Error;

use crate::types::NodeId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No ancestor host element exists above the node; it is not mounted
    /// anywhere an insertion target could be resolved from.
    #[error("no root host element above node {0}")]
    MissingRootElement(NodeId),

    /// A component node was traversed as if it had host representation
    /// before its first render.
    #[error("component node {0} traversed before first render")]
    NotRendered(NodeId),

    /// The node's host node could not be located among its purported
    /// siblings in the ancestor host element.
    #[error("host child for node {0} not found in its ancestor element")]
    HostChildNotFound(NodeId),

    /// An element node was traversed as if it had a host element before
    /// materialization assigned one.
    #[error("element node {0} traversed before materialization")]
    NotMaterialized(NodeId),

    /// The previous generation's tree root lost its root element between
    /// mount and reconciliation.
    #[error("previous tree root {0} has no root element")]
    PreviousRootMissing(NodeId),

    /// A component vanished from its owning node mid-operation. Only
    /// reachable if a caller keeps a state handle alive past teardown and
    /// the owning node has been dropped.
    #[error("owning component node for {0} is gone")]
    OwnerGone(NodeId),
}
