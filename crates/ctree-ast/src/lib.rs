//! ctree AST - The IR tree for C-like code generation
//!
//! Nodes live in a [`Tree`] arena and refer to their children by
//! [`NodeId`]. The tree records each node's parent so passes can look
//! upward, replace a node in place, or insert siblings into a block.

mod op;
mod node;
mod tree;
mod error;
mod validate;
pub mod build;

pub use op::*;
pub use node::{Child, Node, NodeId, Slot};
pub use tree::*;
pub use error::*;
pub use validate::*;
pub use build::TEMP_PREFIX;
