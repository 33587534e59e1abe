//! ctree Types - Target-language types and the type registry
//!
//! This crate defines the closed set of C types the toolkit can emit,
//! the host values that can appear as literals, the open registry that
//! maps host values to types and types to their C spelling, and the
//! usual arithmetic conversions used by expression typing.

mod ty;
mod value;
mod registry;
mod arith;

pub use ty::*;
pub use value::*;
pub use registry::*;
pub use arith::*;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Lookup failures in the type registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no type recognizer registered for value class `{class}` (value: {value})")]
    UnrecognizedValue { class: &'static str, value: String },

    #[error("no spelling registered for type `{ty}`")]
    UnspelledType { ty: String },
}
