//! Error types for compilation and linking

use std::io;
use std::path::PathBuf;

use ctree_ast::StructuralError;
use ctree_codegen::CodegenError;
use ctree_transforms::InferenceError;
use ctree_types::{RegistryError, Type, Value};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, JitError>;

#[derive(Debug, Error)]
pub enum JitError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed configuration file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid compilation unit name `{name}`")]
    InvalidUnitName { name: String },

    #[error("failed to launch compiler `{cc}`: {source}")]
    CompilerLaunch {
        cc: String,
        #[source]
        source: io::Error,
    },

    #[error("two files of one project are both named `{name}`")]
    DuplicateUnit { name: String },

    #[error("compiler failed ({status}): {command}\n{stderr}")]
    CompilerFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("compiler reported success but produced no artifact at {path}")]
    MissingArtifact { path: PathBuf },

    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("symbol `{name}` not found in any linked unit")]
    SymbolNotFound { name: String },

    #[error("`{ty}` is not a function type")]
    NotAFunction { ty: Type },

    #[error("`{name}` takes {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("too many {class} arguments: at most {max} are supported")]
    TooManyArguments { class: &'static str, max: usize },

    #[error("type `{ty}` cannot cross the call boundary")]
    UnsupportedType { ty: Type },

    #[error("argument {index} ({value:?}) cannot be passed as `{ty}`")]
    UnconvertibleValue { index: usize, value: Value, ty: Type },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}
