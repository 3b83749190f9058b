//! Rejection reasons for tree and render-attachment operations
//!
//! None of these abort anything: the operation is skipped, the reason is
//! logged, and the caller gets it back as an `Err`.

use crate::types::NodeId;
use thiserror::Error;

/// Why a structural mutation of a child list was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("child list is locked for iteration")]
    ChildrenLocked,

    #[error("another structural mutation is already in progress")]
    MutationInProgress,

    #[error("node {child:?} is already attached to parent {parent:?}")]
    AlreadyParented { child: NodeId, parent: NodeId },

    #[error("node {0:?} is not a child of this node")]
    NotAChild(NodeId),

    #[error("attaching node {0:?} would create a cycle")]
    WouldCycle(NodeId),
}

/// Why a render attachment operation was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render attachment index {index} is out of range ({len} attachments)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no LOD data set on mesh")]
    NoLodData,

    #[error("LOD level {level} is not valid, mesh has {levels} levels")]
    InvalidLodLevel { level: usize, levels: usize },
}
