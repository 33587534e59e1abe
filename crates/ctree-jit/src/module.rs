//! Linking compiled units into one namespace

use std::ffi::c_void;
use std::fs;
use std::path::{Path, PathBuf};

use ctree_types::Type;
use libloading::Library;
use tracing::debug;

use crate::{Callable, CompiledUnit, JitError, Result};

/// The loaded artifacts of a project.
///
/// Units are loaded with global symbol visibility so a unit may call
/// functions defined in an earlier one. Each artifact is opened through a
/// path keyed by its source hash: the dynamic loader hands back an already
/// open image for a path it has seen, so a rebuilt unit must never reuse
/// the path of the image a live module still holds.
pub struct Module {
    units: Vec<(String, Library)>,
}

impl Module {
    pub fn link(units: &[CompiledUnit]) -> Result<Self> {
        let mut loaded = Vec::with_capacity(units.len());
        for unit in units {
            let path = pinned_artifact(unit)?;
            let library = load(&path)?;
            debug!(unit = %unit.name, artifact = %path.display(), "loaded unit");
            loaded.push((unit.name.clone(), library));
        }
        Ok(Self { units: loaded })
    }

    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.iter().map(|(name, _)| name.as_str())
    }

    /// Resolve `name` in the first unit that defines it.
    ///
    /// # Safety
    ///
    /// `ty` must be the function's real C signature; calls marshal
    /// arguments according to it.
    pub unsafe fn get_callable(&self, name: &str, ty: &Type) -> Result<Callable<'_>> {
        for (unit, library) in &self.units {
            if let Ok(symbol) = library.get::<*const c_void>(name.as_bytes()) {
                debug!(%unit, symbol = name, "resolved symbol");
                return Callable::new(name, *symbol, ty);
            }
        }
        Err(JitError::SymbolNotFound {
            name: name.to_string(),
        })
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.unit_names()).finish()
    }
}

/// `<dir>/<name>.<hash prefix>.<ext>`, linked to the freshly compiled
/// artifact on first use
fn pinned_artifact(unit: &CompiledUnit) -> Result<PathBuf> {
    if !unit.artifact.is_file() {
        return Err(JitError::MissingArtifact {
            path: unit.artifact.clone(),
        });
    }
    if unit.hash.is_empty() {
        return Ok(unit.artifact.clone());
    }

    let prefix = &unit.hash[..unit.hash.len().min(16)];
    let mut file_name = format!("{}.{prefix}", unit.name);
    if let Some(ext) = unit.artifact.extension() {
        file_name.push('.');
        file_name.push_str(&ext.to_string_lossy());
    }
    let pinned = unit.artifact.with_file_name(file_name);
    if !pinned.exists() && fs::hard_link(&unit.artifact, &pinned).is_err() {
        fs::copy(&unit.artifact, &pinned)?;
    }
    Ok(pinned)
}

#[cfg(unix)]
fn load(path: &Path) -> Result<Library> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};

    // SAFETY: artifacts are plain C units with no initializers of their own
    let library = unsafe { UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_GLOBAL) }.map_err(|source| {
        JitError::Load {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(library.into())
}

#[cfg(not(unix))]
fn load(path: &Path) -> Result<Library> {
    // SAFETY: as above
    unsafe { Library::new(path) }.map_err(|source| JitError::Load {
        path: path.to_path_buf(),
        source,
    })
}
