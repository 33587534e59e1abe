//! External C compiler invocation

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::{JitConfig, JitError, Result};

/// File extension of dynamically loadable artifacts on this platform
pub const ARTIFACT_EXTENSION: &str = if cfg!(target_os = "macos") {
    "dylib"
} else if cfg!(windows) {
    "dll"
} else {
    "so"
};

/// Turns one C source file into a loadable artifact
pub trait Compiler {
    fn compile(&self, source: &Path, artifact: &Path) -> Result<()>;
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, source: &Path, artifact: &Path) -> Result<()> {
        (**self).compile(source, artifact)
    }
}

impl<C: Compiler + ?Sized> Compiler for Box<C> {
    fn compile(&self, source: &Path, artifact: &Path) -> Result<()> {
        (**self).compile(source, artifact)
    }
}

/// Runs `<cc> -shared <cflags> -o <artifact> <source> <ldflags>`
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    cc: String,
    cflags: Vec<String>,
    ldflags: Vec<String>,
}

impl CommandCompiler {
    pub fn new(cc: impl Into<String>, cflags: Vec<String>, ldflags: Vec<String>) -> Self {
        Self {
            cc: cc.into(),
            cflags,
            ldflags,
        }
    }

    pub fn from_config(config: &JitConfig) -> Self {
        Self::new(config.cc.clone(), config.cflags.clone(), config.ldflags.clone())
    }

    pub fn command(&self, source: &Path, artifact: &Path) -> Command {
        let mut cmd = Command::new(&self.cc);
        cmd.arg("-shared")
            .args(&self.cflags)
            .arg("-o")
            .arg(artifact)
            .arg(source)
            .args(&self.ldflags);
        cmd
    }
}

impl Compiler for CommandCompiler {
    fn compile(&self, source: &Path, artifact: &Path) -> Result<()> {
        let mut cmd = self.command(source, artifact);
        let command = format!("{:?}", cmd);
        info!(%command, "invoking C compiler");

        let output = cmd.output().map_err(|source| JitError::CompilerLaunch {
            cc: self.cc.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(JitError::CompilerFailed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        if !artifact.exists() {
            return Err(JitError::MissingArtifact {
                path: artifact.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// The first of `cc`, `gcc`, `clang` that runs
pub fn detect_compiler() -> Option<String> {
    ["cc", "gcc", "clang"]
        .into_iter()
        .find(|cc| Command::new(cc).arg("--version").output().is_ok_and(|o| o.status.success()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_order() {
        let compiler = CommandCompiler::new(
            "cc",
            vec!["-O2".into(), "-fPIC".into()],
            vec!["-lm".into()],
        );
        let cmd = compiler.command(Path::new("unit.c"), Path::new("unit.so"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(cmd.get_program(), "cc");
        assert_eq!(args, vec!["-shared", "-O2", "-fPIC", "-o", "unit.so", "unit.c", "-lm"]);
    }

    #[test]
    fn test_missing_compiler_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = CommandCompiler::new("ctree-no-such-compiler", vec![], vec![]);
        let err = compiler
            .compile(&dir.path().join("a.c"), &dir.path().join("a.so"))
            .unwrap_err();
        assert!(matches!(err, JitError::CompilerLaunch { ref cc, .. } if cc == "ctree-no-such-compiler"));
    }

    #[test]
    fn test_compiler_diagnostics_are_attached() {
        let Some(cc) = detect_compiler() else {
            eprintln!("skipping: no C compiler found");
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.c");
        std::fs::write(&source, "int broken( {\n").unwrap();

        let compiler = CommandCompiler::new(cc, vec!["-fPIC".into()], vec![]);
        match compiler.compile(&source, &dir.path().join("broken.so")) {
            Err(JitError::CompilerFailed { stderr, .. }) => assert!(stderr.contains("broken")),
            other => panic!("expected compiler failure, got {:?}", other),
        }
    }
}
