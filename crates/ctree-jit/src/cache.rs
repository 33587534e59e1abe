//! Hash-gated compilation of rendered units
//!
//! Each unit `<name>` owns three files in the build directory:
//! `<name>.c`, the artifact `<name>.so` (`.dylib` on macOS) and the marker
//! `<name>.c.sha` holding the SHA-256 of the trimmed source text.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::{Compiler, JitError, Result, ARTIFACT_EXTENSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutcome {
    /// The compiler ran
    Compiled,
    /// The marker matched and the artifact was already on disk
    Reused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledUnit {
    pub name: String,
    pub source: PathBuf,
    pub artifact: PathBuf,
    pub hash: String,
    pub outcome: CompileOutcome,
}

/// SHA-256 hex digest of `text` with surrounding whitespace removed
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct CompilationCache<C> {
    dir: PathBuf,
    compiler: C,
}

impl<C: Compiler> CompilationCache<C> {
    pub fn new(dir: impl Into<PathBuf>, compiler: C) -> Self {
        Self {
            dir: dir.into(),
            compiler,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Ensure an artifact for `text` exists under `name`, compiling only
    /// when the text changed since the last successful compile or the
    /// artifact is gone.
    pub fn materialize(&self, name: &str, text: &str) -> Result<CompiledUnit> {
        check_unit_name(name)?;
        let source = self.dir.join(format!("{}.c", name));
        let artifact = self.dir.join(format!("{}.{}", name, ARTIFACT_EXTENSION));
        let marker = self.dir.join(format!("{}.c.sha", name));
        let hash = content_hash(text);

        let recorded = match fs::read_to_string(&marker) {
            Ok(recorded) => Some(recorded),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        if recorded.as_deref().map(str::trim) == Some(hash.as_str()) && artifact.exists() {
            debug!(unit = name, %hash, "unit unchanged, reusing artifact");
            return Ok(CompiledUnit {
                name: name.to_string(),
                source,
                artifact,
                hash,
                outcome: CompileOutcome::Reused,
            });
        }

        // nothing on disk may vouch for the old artifact once the source changes
        remove_if_exists(&marker)?;
        remove_if_exists(&artifact)?;
        fs::write(&source, format!("{}\n", text.trim_end()))?;

        info!(unit = name, %hash, "compiling unit");
        self.compiler.compile(&source, &artifact)?;
        fs::write(&marker, &hash)?;

        Ok(CompiledUnit {
            name: name.to_string(),
            source,
            artifact,
            hash,
            outcome: CompileOutcome::Compiled,
        })
    }
}

fn check_unit_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if valid {
        Ok(())
    } else {
        Err(JitError::InvalidUnitName {
            name: name.to_string(),
        })
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
