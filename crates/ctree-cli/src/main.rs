//! ctree CLI - Render, check and compile JSON-serialized IR trees

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ctree_ast::{validate, NodeId, Tree};
use ctree_codegen::render;
use ctree_jit::{CompileOutcome, Jit, JitConfig};
use ctree_transforms::DeclarationFiller;
use ctree_types::TypeRegistry;

#[derive(Parser)]
#[command(name = "ctree")]
#[command(about = "C-target IR toolkit", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the generated C for a tree
    Render {
        /// Tree as JSON
        file: PathBuf,
        /// Node to render (defaults to the root of the last node)
        #[arg(short, long)]
        root: Option<u32>,
        /// Infer local declarations before rendering
        #[arg(short, long)]
        fill: bool,
    },
    /// Validate that a tree is well formed
    Check {
        /// Tree(s) as JSON
        files: Vec<PathBuf>,
    },
    /// Compile every file of a project to a shared library
    Compile {
        /// Tree as JSON
        file: PathBuf,
        /// Project or file node to compile
        #[arg(short, long)]
        root: Option<u32>,
        /// Build directory (kept between runs)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { file, root, fill } => cmd_render(&file, root, fill),
        Commands::Check { files } => cmd_check(&files),
        Commands::Compile { file, root, out_dir } => cmd_compile(&file, root, out_dir),
    }
}

fn load_tree(file: &Path) -> Result<Tree, String> {
    let text = fs::read_to_string(file).map_err(|e| format!("Error reading {}: {}", file.display(), e))?;
    let tree: Tree =
        serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {}", file.display(), e))?;
    debug!(file = %file.display(), nodes = tree.len(), "loaded tree");
    Ok(tree)
}

fn pick_root(tree: &Tree, root: Option<u32>) -> Result<NodeId, String> {
    match root {
        Some(id) => {
            let id = NodeId(id);
            tree.get(id).map(|_| id).ok_or_else(|| format!("No node {}", id))
        }
        None if tree.is_empty() => Err("Tree is empty".to_string()),
        None => Ok(tree.get_root(NodeId(tree.len() as u32 - 1))),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn cmd_render(file: &Path, root: Option<u32>, fill: bool) {
    let mut tree = load_tree(file).unwrap_or_else(|e| fail(e));
    let root = pick_root(&tree, root).unwrap_or_else(|e| fail(e));
    let registry = TypeRegistry::new();

    if let Err(e) = validate(&tree, root) {
        fail(format!("✗ {} - {}", file.display(), e));
    }
    if fill {
        if let Err(e) = DeclarationFiller::new(&registry).fill(&mut tree, root) {
            fail(format!("✗ {} - {}", file.display(), e));
        }
    }
    match render(&tree, root, &registry) {
        Ok(code) => println!("{}", code),
        Err(e) => fail(format!("✗ {} - {}", file.display(), e)),
    }
}

fn cmd_check(files: &[PathBuf]) {
    let mut all_ok = true;

    for file in files {
        let result = load_tree(file).and_then(|tree| {
            let root = pick_root(&tree, None)?;
            validate(&tree, root).map_err(|e| e.to_string())?;
            Ok(tree.walk(root).count())
        });
        match result {
            Ok(count) => println!("✓ {} - {} nodes", file.display(), count),
            Err(e) => {
                eprintln!("✗ {} - {}", file.display(), e);
                all_ok = false;
            }
        }
    }

    if !all_ok {
        process::exit(1);
    }
}

fn cmd_compile(file: &Path, root: Option<u32>, out_dir: Option<PathBuf>) {
    let mut tree = load_tree(file).unwrap_or_else(|e| fail(e));
    let root = pick_root(&tree, root).unwrap_or_else(|e| fail(e));

    let mut config = JitConfig::load().unwrap_or_else(|e| fail(e));
    if let Some(dir) = out_dir {
        config.compile_path = Some(dir);
        config.cache = true;
    }
    let jit = Jit::new(&config).unwrap_or_else(|e| fail(e));

    match jit.compile(&mut tree, root) {
        Ok(units) => {
            for unit in units {
                let outcome = match unit.outcome {
                    CompileOutcome::Compiled => "compiled",
                    CompileOutcome::Reused => "reused",
                };
                println!("✓ {} - {} ({})", unit.name, unit.artifact.display(), outcome);
            }
            if config.build_dir().is_none() {
                eprintln!("note: build directory is temporary; pass --out-dir to keep artifacts");
            }
        }
        Err(e) => fail(format!("✗ {} - {}", file.display(), e)),
    }
}
