//! ctree JIT - Compile rendered units and call into them
//!
//! [`Jit::build`] runs the whole pipeline on a project tree: validation,
//! declaration filling for every file, rendering, hash-gated compilation
//! through an external C compiler, and dynamic linking into a [`Module`].

mod error;
mod config;
mod session;
mod compiler;
mod cache;
mod module;
mod callable;

pub use error::*;
pub use config::*;
pub use session::*;
pub use compiler::*;
pub use cache::*;
pub use module::*;
pub use callable::*;

use std::collections::HashSet;
use std::path::Path;

use ctree_ast::{Node, NodeId, StructuralError, Tree};
use ctree_codegen::{CodeGenerator, RenderRules};
use ctree_transforms::DeclarationFiller;
use ctree_types::TypeRegistry;
use tracing::info;

/// Everything needed to turn project trees into callable code
pub struct Jit<C = CommandCompiler> {
    registry: TypeRegistry,
    rules: RenderRules,
    cache: CompilationCache<C>,
    // dropped after the cache that writes into it
    session: BuildSession,
}

impl Jit<CommandCompiler> {
    /// A JIT configured from the standard config files and environment
    pub fn from_env() -> Result<Self> {
        Self::new(&JitConfig::load()?)
    }

    pub fn new(config: &JitConfig) -> Result<Self> {
        Self::with_compiler(config, CommandCompiler::from_config(config))
    }
}

impl<C: Compiler> Jit<C> {
    pub fn with_compiler(config: &JitConfig, compiler: C) -> Result<Self> {
        let session = BuildSession::from_config(config)?;
        info!(dir = %session.path().display(), temporary = session.is_temporary(), "build session started");
        Ok(Self {
            registry: TypeRegistry::new(),
            rules: RenderRules::new(),
            cache: CompilationCache::new(session.path(), compiler),
            session,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn rules_mut(&mut self) -> &mut RenderRules {
        &mut self.rules
    }

    pub fn compiler(&self) -> &C {
        self.cache.compiler()
    }

    pub fn build_dir(&self) -> &Path {
        self.session.path()
    }

    /// Validate, fill declarations and materialize every file of
    /// `project`, which may be a `Project` or a single `File`
    pub fn compile(&self, tree: &mut Tree, project: NodeId) -> Result<Vec<CompiledUnit>> {
        ctree_ast::validate(tree, project)?;
        let files = project_files(tree, project)?;

        let mut filler = DeclarationFiller::new(&self.registry);
        for &file in &files {
            filler.fill(tree, file)?;
        }

        let generator = CodeGenerator::new(tree, &self.registry, &self.rules);
        let mut units = Vec::with_capacity(files.len());
        for file in files {
            let name = unit_name(tree, file)?;
            let text = generator.render(file)?;
            units.push(self.cache.materialize(name, &text)?);
        }
        Ok(units)
    }

    /// [`compile`](Self::compile) and link the results
    pub fn build(&self, tree: &mut Tree, project: NodeId) -> Result<Module> {
        let units = self.compile(tree, project)?;
        Module::link(&units)
    }
}

/// The files of `root`, each one a `File` with a name no other file uses
fn project_files(tree: &Tree, root: NodeId) -> Result<Vec<NodeId>> {
    let files = match tree.node(root)? {
        Node::Project { files } => files.clone(),
        Node::File { .. } => vec![root],
        other => {
            return Err(StructuralError::WrongKind {
                expected: "Project",
                kind: other.kind_name().to_string(),
                id: root,
            }
            .into())
        }
    };

    let mut names = HashSet::new();
    for &file in &files {
        let name = unit_name(tree, file)?;
        if !names.insert(name) {
            return Err(JitError::DuplicateUnit {
                name: name.to_string(),
            });
        }
    }
    Ok(files)
}

fn unit_name(tree: &Tree, file: NodeId) -> Result<&str> {
    match tree.node(file)? {
        Node::File { name, .. } => Ok(name),
        other => Err(StructuralError::WrongKind {
            expected: "File",
            kind: other.kind_name().to_string(),
            id: file,
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctree_ast::build::*;
    use ctree_types::Type;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::fs;

    #[derive(Default)]
    struct RecordingCompiler {
        sources: RefCell<Vec<String>>,
    }

    impl Compiler for RecordingCompiler {
        fn compile(&self, source: &Path, artifact: &Path) -> Result<()> {
            self.sources.borrow_mut().push(fs::read_to_string(source)?);
            fs::write(artifact, b"")?;
            Ok(())
        }
    }

    fn temp_config() -> JitConfig {
        JitConfig {
            cache: false,
            ..JitConfig::default()
        }
    }

    #[test]
    fn test_compile_fills_and_renders_each_file() {
        let jit = Jit::with_compiler(&temp_config(), RecordingCompiler::default()).unwrap();

        let mut t = Tree::new();
        let x = sym(&mut t, "x");
        let one = constant(&mut t, 1);
        let init = assign(&mut t, x, one);
        let xr = sym(&mut t, "x");
        let r = ret(&mut t, Some(xr));
        let f = function(&mut t, Type::Long, "one", &[], vec![init, r]);
        let file = file(&mut t, "one", vec![f]);
        let project = project(&mut t, vec![file]);

        let units = jit.compile(&mut t, project).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].name, "one");
        assert_eq!(units[0].outcome, CompileOutcome::Compiled);
        assert!(units[0].source.starts_with(jit.build_dir()));
        assert_eq!(
            jit.compiler().sources.borrow()[0],
            "// <file: one.c>\nlong one() {\n    long x = 1;\n    return x;\n}\n"
        );

        let again = jit.compile(&mut t, project).unwrap();
        assert_eq!(again[0].outcome, CompileOutcome::Reused);
        assert_eq!(jit.compiler().sources.borrow().len(), 1);
    }

    #[test]
    fn test_non_project_root_is_rejected() {
        let jit = Jit::with_compiler(&temp_config(), RecordingCompiler::default()).unwrap();
        let mut t = Tree::new();
        let b = block(&mut t, vec![]);
        assert!(matches!(
            jit.compile(&mut t, b),
            Err(JitError::Structural(StructuralError::WrongKind { .. }))
        ));
    }

    #[test]
    fn test_project_of_non_files_is_rejected() {
        let jit = Jit::with_compiler(&temp_config(), RecordingCompiler::default()).unwrap();
        let mut t = Tree::new();
        let f = function(&mut t, Type::Int, "loose", &[], vec![]);
        let project = project(&mut t, vec![f]);
        assert!(matches!(
            jit.compile(&mut t, project),
            Err(JitError::Structural(StructuralError::WrongKind { expected: "File", .. }))
        ));
        assert!(jit.compiler().sources.borrow().is_empty());
    }

    #[test]
    fn test_duplicate_file_names_are_rejected() {
        let jit = Jit::with_compiler(&temp_config(), RecordingCompiler::default()).unwrap();
        let mut t = Tree::new();
        let mut files = Vec::new();
        for value in [1, 2] {
            let c = constant(&mut t, value);
            let r = ret(&mut t, Some(c));
            let f = function(&mut t, Type::Int, &format!("f{value}"), &[], vec![r]);
            files.push(file(&mut t, "a", vec![f]));
        }
        let project = project(&mut t, files);

        match jit.compile(&mut t, project) {
            Err(JitError::DuplicateUnit { name }) => assert_eq!(name, "a"),
            other => panic!("expected a duplicate unit error, got {other:?}"),
        }
        assert!(jit.compiler().sources.borrow().is_empty());
        assert!(!jit.build_dir().join("a.c").exists());
    }

    #[test]
    fn test_inference_errors_surface() {
        let jit = Jit::with_compiler(&temp_config(), RecordingCompiler::default()).unwrap();
        let mut t = Tree::new();
        let y = sym(&mut t, "y");
        let q = sym(&mut t, "q");
        let e = assign(&mut t, y, q);
        let f = function(&mut t, Type::Void, "f", &[], vec![e]);
        let file = file(&mut t, "f", vec![f]);
        assert!(matches!(jit.compile(&mut t, file), Err(JitError::Inference(_))));
        assert!(jit.compiler().sources.borrow().is_empty());
    }
}
