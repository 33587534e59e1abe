use std::cell::Cell;
use std::fs;
use std::path::Path;

use ctree::ast::build::*;
use ctree::ast::{NodeId, Tree};
use ctree::jit::{Compiler, Result};
use ctree::types::Type;

/// Stands in for a C compiler: writes a placeholder artifact and counts
/// invocations
#[derive(Default)]
pub struct CountingCompiler {
    runs: Cell<usize>,
}

impl CountingCompiler {
    pub fn runs(&self) -> usize {
        self.runs.get()
    }
}

impl Compiler for CountingCompiler {
    fn compile(&self, _source: &Path, artifact: &Path) -> Result<()> {
        self.runs.set(self.runs.get() + 1);
        fs::write(artifact, b"placeholder")?;
        Ok(())
    }
}

/// The real C compiler, if one is installed
pub fn host_compiler() -> Option<String> {
    let cc = ctree::jit::detect_compiler();
    if cc.is_none() {
        eprintln!("skipping: no C compiler found");
    }
    cc
}

pub fn host_fib(n: i64) -> i64 {
    if n < 2 {
        n
    } else {
        host_fib(n - 1) + host_fib(n - 2)
    }
}

/// `int fib(int n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }`
pub fn fib_function(tree: &mut Tree) -> NodeId {
    let n = sym(tree, "n");
    let two = constant(tree, 2);
    let cond = lt(tree, n, two);
    let n = sym(tree, "n");
    let base = ret(tree, Some(n));
    let guard = if_then(tree, cond, vec![base], None);

    let recurse = |tree: &mut Tree, k: i64| {
        let n = sym(tree, "n");
        let k = constant(tree, k);
        let arg = sub(tree, n, k);
        call(tree, "fib", vec![arg])
    };
    let left = recurse(tree, 1);
    let right = recurse(tree, 2);
    let sum = add(tree, left, right);
    let result = ret(tree, Some(sum));

    function(tree, Type::Int, "fib", &[("n", Type::Int)], vec![guard, result])
}

/// A project with one file holding `fib`
pub fn fib_project(tree: &mut Tree) -> NodeId {
    let fib = fib_function(tree);
    let file = file(tree, "fib", vec![fib]);
    project(tree, vec![file])
}

/// A project whose single file holds `int answer() { return value; }`
pub fn answer_project(tree: &mut Tree, value: i64) -> NodeId {
    let value = constant(tree, value);
    let body = ret(tree, Some(value));
    let answer = function(tree, Type::Int, "answer", &[], vec![body]);
    let file = file(tree, "answer", vec![answer]);
    project(tree, vec![file])
}
