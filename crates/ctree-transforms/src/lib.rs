//! ctree Transforms - Tree-rewriting passes
//!
//! [`DeclarationFiller`] infers the types of locals from their first
//! assignment; [`ConstantFold`] simplifies literal arithmetic.

mod scope;
mod typing;
mod declaration_filler;
mod constant_fold;

pub use scope::*;
pub use typing::*;
pub use declaration_filler::*;
pub use constant_fold::*;

use ctree_ast::{NodeId, StructuralError};
use ctree_types::RegistryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, InferenceError>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("symbol `{name}` is read before any assignment gives it a type")]
    UnboundSymbol { name: String },

    #[error("cannot infer a type for `{name}` ({id}) from its first assignment")]
    Uninferable { name: String, id: NodeId },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}
