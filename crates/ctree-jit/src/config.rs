//! JIT configuration
//!
//! Settings come from built-in defaults, then `$HOME/.ctree.json`, then
//! `./.ctree.json`, then `CTREE_*` environment variables. Each file only
//! needs the keys it overrides.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::{JitError, Result};

pub const CONFIG_FILE: &str = ".ctree.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitConfig {
    /// C compiler executable
    pub cc: String,
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// Persistent build directory; artifacts survive between runs
    pub compile_path: Option<PathBuf>,
    /// When false the persistent directory is ignored
    pub cache: bool,
    /// Keep temporary build directories for inspection
    pub preserve_src_dir: bool,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            cc: "cc".to_string(),
            cflags: vec!["-O2".to_string(), "-fPIC".to_string()],
            ldflags: vec!["-lm".to_string()],
            compile_path: None,
            cache: true,
            preserve_src_dir: false,
        }
    }
}

impl JitConfig {
    /// Load from the standard locations and the process environment
    pub fn load() -> Result<Self> {
        let mut paths = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(home).join(CONFIG_FILE));
        }
        paths.push(PathBuf::from(CONFIG_FILE));

        let mut config = Self::load_from(&paths)?;
        config.apply_env(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Layer the given files over the defaults, later files winning per key.
    /// Missing files are skipped.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default()).map_err(|source| JitError::Config {
            path: PathBuf::new(),
            source,
        })?;

        for path in paths {
            let Some(layer) = read_layer(path)? else {
                continue;
            };
            debug!(path = %path.display(), "loaded configuration");
            if let (Json::Object(base), Json::Object(layer)) = (&mut merged, layer) {
                base.extend(layer);
            }
        }

        serde_json::from_value(merged).map_err(|source| JitError::Config {
            path: paths.last().cloned().unwrap_or_default(),
            source,
        })
    }

    /// Apply `CTREE_CC`, `CTREE_CFLAGS`, `CTREE_LDFLAGS` and
    /// `CTREE_COMPILE_PATH`. Flag lists are whitespace separated.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cc) = var("CTREE_CC") {
            self.cc = cc;
        }
        if let Some(flags) = var("CTREE_CFLAGS") {
            self.cflags = split_flags(&flags);
        }
        if let Some(flags) = var("CTREE_LDFLAGS") {
            self.ldflags = split_flags(&flags);
        }
        if let Some(path) = var("CTREE_COMPILE_PATH") {
            self.compile_path = Some(PathBuf::from(path));
        }
    }

    /// The persistent build directory, if caching across runs is enabled
    pub fn build_dir(&self) -> Option<&Path> {
        if self.cache {
            self.compile_path.as_deref()
        } else {
            None
        }
    }
}

fn read_layer(path: &Path) -> Result<Option<Json>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let layer: Json = serde_json::from_str(&text).map_err(|source| JitError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    // type-check the layer on its own so errors name this file
    serde_json::from_value::<JitConfig>(layer.clone()).map_err(|source| JitError::Config {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(layer))
}

fn split_flags(flags: &str) -> Vec<String> {
    flags.split_whitespace().map(str::to_string).collect()
}
