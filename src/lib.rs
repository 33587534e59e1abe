//! ctree - A C-target IR toolkit
//!
//! This is the root workspace crate that provides integration tests.
//! The actual implementation is in the workspace member crates.

// Re-export main crates for convenience
pub use ctree_ast as ast;
pub use ctree_codegen as codegen;
pub use ctree_jit as jit;
pub use ctree_transforms as transforms;
pub use ctree_types as types;
