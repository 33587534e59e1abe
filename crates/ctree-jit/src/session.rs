//! Build directories

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::info;

use crate::{JitConfig, Result};

enum SessionDir {
    Temporary(TempDir),
    Persistent(PathBuf),
}

/// The directory compilation units are written to.
///
/// A temporary directory is removed when the session is dropped, on
/// success and error paths alike.
pub struct BuildSession {
    dir: SessionDir,
}

impl BuildSession {
    /// A fresh temporary directory. With `preserve` it is left on disk.
    pub fn temporary(preserve: bool) -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("ctree-").tempdir()?;
        if preserve {
            let path = dir.into_path();
            info!(path = %path.display(), "preserving build directory");
            return Ok(Self {
                dir: SessionDir::Persistent(path),
            });
        }
        Ok(Self {
            dir: SessionDir::Temporary(dir),
        })
    }

    /// A directory that outlives the session, created if needed
    pub fn persistent(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self {
            dir: SessionDir::Persistent(path),
        })
    }

    pub fn from_config(config: &JitConfig) -> Result<Self> {
        match config.build_dir() {
            Some(path) => Self::persistent(path),
            None => Self::temporary(config.preserve_src_dir),
        }
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            SessionDir::Temporary(dir) => dir.path(),
            SessionDir::Persistent(path) => path,
        }
    }

    /// Whether the directory is removed on drop
    pub fn is_temporary(&self) -> bool {
        matches!(self.dir, SessionDir::Temporary(_))
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("path", &self.path())
            .field("temporary", &self.is_temporary())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_dir_is_removed() {
        let session = BuildSession::temporary(false).unwrap();
        let path = session.path().to_path_buf();
        assert!(path.is_dir());
        drop(session);
        assert!(!path.exists());
    }

    #[test]
    fn test_preserved_dir_survives() {
        let session = BuildSession::temporary(true).unwrap();
        let path = session.path().to_path_buf();
        assert!(!session.is_temporary());
        drop(session);
        assert!(path.is_dir());
        fs::remove_dir_all(path).unwrap();
    }

    #[test]
    fn test_config_selects_persistent_dir() {
        let scratch = tempfile::tempdir().unwrap();
        let config = JitConfig {
            compile_path: Some(scratch.path().join("build")),
            ..JitConfig::default()
        };
        let session = BuildSession::from_config(&config).unwrap();
        assert_eq!(session.path(), scratch.path().join("build"));
        assert!(session.path().is_dir());

        let uncached = JitConfig {
            cache: false,
            ..config
        };
        assert!(BuildSession::from_config(&uncached).unwrap().is_temporary());
    }
}
