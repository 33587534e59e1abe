//! ctree Codegen - C source generation
//!
//! Renders an IR tree to C text with minimal parenthesization. Extension
//! node kinds render through [`RenderRules`].

mod precedence;
mod generator;
mod rules;

pub use precedence::*;
pub use generator::*;
pub use rules::*;

use ctree_ast::{NodeId, StructuralError, Tree};
use ctree_types::{RegistryError, TypeRegistry};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodegenError>;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("no render rule registered for node kind `{kind}` ({id})")]
    NoRenderRule { kind: String, id: NodeId },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Structural(#[from] StructuralError),
}

/// Render the subtree at `root` with no extension rules
pub fn render(tree: &Tree, root: NodeId, registry: &TypeRegistry) -> Result<String> {
    let rules = RenderRules::new();
    CodeGenerator::new(tree, registry, &rules).render(root)
}
