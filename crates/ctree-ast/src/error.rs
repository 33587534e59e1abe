//! Structural errors

use ctree_types::Type;
use thiserror::Error;

use crate::{NodeId, Op};

pub type Result<T> = std::result::Result<T, StructuralError>;

/// A malformed tree or an illegal mutation. Every variant names the node
/// kind and id involved.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralError {
    #[error("node {id} does not exist in this tree")]
    UnknownNode { id: NodeId },

    #[error("{kind} {id} has no parent")]
    NoParent { kind: String, id: NodeId },

    #[error("{kind} {id} does not occupy a list slot")]
    NotInList { kind: String, id: NodeId },

    #[error("{kind} {id} has no child slot `{field}`")]
    NoSuchField {
        kind: String,
        id: NodeId,
        field: String,
    },

    #[error("slot `{field}` of {kind} {id} cannot hold that value")]
    SlotMismatch {
        kind: String,
        id: NodeId,
        field: String,
    },

    #[error("assigning {child} under {kind} {id} would create a cycle")]
    Cycle {
        kind: String,
        id: NodeId,
        child: NodeId,
    },

    #[error("{kind} {id} is already held by {parent}")]
    AlreadyAttached {
        kind: String,
        id: NodeId,
        parent: NodeId,
    },

    #[error("expected {expected}, found {kind} {id}")]
    WrongKind {
        expected: &'static str,
        kind: String,
        id: NodeId,
    },

    #[error("{kind} {id} carries no type annotation")]
    NotTypeable { kind: String, id: NodeId },

    #[error("symbol `{name}` ({id}) is declared `{from}`; refusing to retype it as `{to}`")]
    Retyped {
        name: String,
        id: NodeId,
        from: Type,
        to: Type,
    },

    #[error("{kind} {id} is reachable more than once")]
    Shared { kind: String, id: NodeId },

    #[error("{kind} {id} has a stale parent reference")]
    ParentMismatch { kind: String, id: NodeId },

    #[error("operator `{op}` is not valid on {kind} {id}")]
    InvalidOp { op: Op, kind: String, id: NodeId },

    #[error("{kind} {id} cannot appear at this position")]
    Misplaced { kind: String, id: NodeId },
}
