//! Error types for dock tree operations.

use thiserror::Error;

use crate::node::DockableKey;
use crate::tree::InvariantCode;

/// Why a structural operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOperationReason {
    #[error("dockable is already owned by {owner}")]
    AlreadyOwned { owner: DockableKey },
    #[error("dockable is not a member of {container}")]
    NotAMember { container: DockableKey },
    #[error("target is not a dock")]
    NotADock,
    #[error("target is not the root dock")]
    NotARoot,
    #[error("tree already has a root dock")]
    SecondRoot,
    #[error("the root dock cannot be moved or removed")]
    RootImmovable,
    #[error("insertion would make a dock contain itself")]
    WouldCreateCycle,
    #[error("index {index} out of range for {len} dockables")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("dockable does not allow closing")]
    CannotClose,
    #[error("dockable does not allow pinning")]
    CannotPin,
    #[error("dockable does not allow floating")]
    CannotFloat,
    #[error("owner does not allow closing its last dockable")]
    LastDockableProtected,
    #[error("dockable is not pinned")]
    NotPinned,
    #[error("dockable is still attached to {owner}")]
    StillAttached { owner: DockableKey },
    #[error("no floating window hosts this layout")]
    WindowNotFound,
}

/// Errors raised by [`crate::DockTree`] and [`crate::Factory`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DockError {
    #[error("dockable key must be non-zero")]
    ZeroKey,
    #[error("dockable key overflow after {current}")]
    KeyOverflow { current: DockableKey },
    #[error("unknown dockable {key}")]
    UnknownDockable { key: DockableKey },
    #[error("invalid operation on {key}: {reason}")]
    InvalidOperation {
        key: DockableKey,
        reason: InvalidOperationReason,
    },
    #[error("tree invariant violated ({code:?}) at {node:?}: {message}")]
    Invariant {
        code: InvariantCode,
        node: Option<DockableKey>,
        message: String,
    },
}

impl DockError {
    pub(crate) const fn invalid(key: DockableKey, reason: InvalidOperationReason) -> Self {
        Self::InvalidOperation { key, reason }
    }

    /// Return the refusal reason when this is an `InvalidOperation`.
    #[must_use]
    pub const fn reason(&self) -> Option<&InvalidOperationReason> {
        match self {
            Self::InvalidOperation { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
