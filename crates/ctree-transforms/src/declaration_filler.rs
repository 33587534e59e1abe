//! Declaration filling
//!
//! Frontends produce trees where only function signatures carry types.
//! This pass types every local from its first assignment so the code
//! generator can emit it as a declaration:
//!
//! ```text
//! a = 0;          =>   long a = 0;
//! k = "hello";    =>   char* k = "hello";
//! ```
//!
//! The first binding of a name is authoritative. Later assignments never
//! retype it, even across branches that would disagree; there is no
//! unification.

use ctree_ast::{Node, NodeId, Op, Tree, TEMP_PREFIX};
use ctree_types::{Type, TypeRegistry};
use tracing::debug;

use crate::{ExprTyper, InferenceError, Result, ScopeStack};

/// Built-ins whose result type is the type of their first argument
const POLYMORPHIC_BUILTINS: [&str; 2] = ["fmax", "fmin"];

pub struct DeclarationFiller<'a> {
    registry: &'a TypeRegistry,
    scopes: ScopeStack,
}

impl<'a> DeclarationFiller<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            scopes: ScopeStack::new(),
        }
    }

    /// Fill declarations under `root`. Function names bound at the top
    /// level stay bound for later calls on the same filler, so the files
    /// of a project can be filled one after another.
    pub fn fill(&mut self, tree: &mut Tree, root: NodeId) -> Result<()> {
        self.visit(tree, root)
    }

    /// The bindings currently in scope
    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    fn visit(&mut self, tree: &mut Tree, id: NodeId) -> Result<()> {
        let node = tree.node(id)?.clone();
        match node {
            Node::FunctionDecl {
                return_type,
                name,
                params,
                defn,
                ..
            } => {
                // bound in the enclosing scope so recursive calls resolve
                self.scopes.bind(&name, return_type);
                self.scopes.push();
                let result = self.visit_function(tree, &params, defn);
                self.scopes.pop();
                result?;
            }
            Node::SymbolRef {
                name, ty: Some(ty), ..
            } => {
                self.scopes.bind(&name, ty);
            }
            Node::FunctionCall { func, args, ty } => {
                for &arg in &args {
                    self.visit(tree, arg)?;
                }
                if ty.is_none() {
                    if let Some(ty) = self.call_type(tree, func, &args)? {
                        tree.set_type(id, ty)?;
                    }
                }
            }
            Node::BinaryOp {
                left,
                op: Op::Assign,
                right,
            } => self.visit_assign(tree, left, right)?,
            other => {
                for child in other.children() {
                    self.visit(tree, child)?;
                }
            }
        }
        Ok(())
    }

    fn visit_function(&mut self, tree: &mut Tree, params: &[NodeId], defn: Option<NodeId>) -> Result<()> {
        for &param in params {
            self.visit(tree, param)?;
        }
        if let Some(defn) = defn {
            self.visit(tree, defn)?;
        }
        Ok(())
    }

    fn call_type(&self, tree: &Tree, func: NodeId, args: &[NodeId]) -> Result<Option<Type>> {
        let Some(name) = tree.node(func)?.symbol_name() else {
            return Ok(None);
        };
        if let Some(ty) = self.scopes.lookup(name) {
            return Ok(Some(ty.clone()));
        }
        match args.first() {
            Some(&first) if POLYMORPHIC_BUILTINS.contains(&name) => self.typer(tree).type_of(first),
            _ => Ok(None),
        }
    }

    fn visit_assign(&mut self, tree: &mut Tree, left: NodeId, right: NodeId) -> Result<()> {
        self.visit(tree, left)?;
        self.visit(tree, right)?;

        // typed declarations were bound above; `a[i] = ...` and `*p = ...`
        // declare nothing
        let name = match tree.node(left)? {
            Node::SymbolRef { name, ty: None, .. } => name.clone(),
            _ => return Ok(()),
        };
        if self.scopes.is_bound(&name) {
            return Ok(());
        }

        let inferred = match name.strip_prefix(TEMP_PREFIX).and_then(|n| self.scopes.lookup(n)) {
            Some(ty) => Some(ty.clone()),
            None => self.typer(tree).type_of(right)?,
        };
        let Some(ty) = inferred else {
            return Err(self.explain_failure(tree, &name, left, right));
        };

        debug!(symbol = %name, ty = %ty, "inferred declaration");
        tree.set_type(left, ty.clone())?;
        self.scopes.bind(&name, ty);
        Ok(())
    }

    /// An unbound name read on the right side is reported by name;
    /// otherwise the assignment itself is uninferable
    fn explain_failure(&self, tree: &Tree, name: &str, left: NodeId, right: NodeId) -> InferenceError {
        let unbound = tree.find_all(right, |n| matches!(n, Node::SymbolRef { ty: None, .. }))
            .find(|&id| {
                let is_callee = tree
                    .parent(id)
                    .and_then(|p| tree.get(p))
                    .is_some_and(|p| matches!(p, Node::FunctionCall { func, .. } if *func == id));
                let sym = tree[id].symbol_name().unwrap_or_default();
                !is_callee && !sym.starts_with(TEMP_PREFIX) && !self.scopes.is_bound(sym)
            });
        match unbound.and_then(|id| tree[id].symbol_name()) {
            Some(sym) => InferenceError::UnboundSymbol {
                name: sym.to_string(),
            },
            None => InferenceError::Uninferable {
                name: name.to_string(),
                id: left,
            },
        }
    }

    fn typer<'t>(&'t self, tree: &'t Tree) -> ExprTyper<'t> {
        ExprTyper::new(tree, self.registry, &self.scopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctree_ast::build::*;
    use ctree_codegen::render;
    use pretty_assertions::assert_eq;

    fn fill(tree: &mut Tree, root: NodeId) -> Result<()> {
        let registry = TypeRegistry::new();
        DeclarationFiller::new(&registry).fill(tree, root)
    }

    fn text(tree: &Tree, root: NodeId) -> String {
        render(tree, root, &TypeRegistry::new()).unwrap()
    }

    #[test]
    fn test_first_assignment_declares() {
        let mut t = Tree::new();
        let a = sym(&mut t, "a");
        let zero = constant(&mut t, 0);
        let s0 = assign(&mut t, a, zero);
        let a2 = sym(&mut t, "a");
        let five = constant(&mut t, 5);
        let s1 = assign(&mut t, a2, five);
        let k = sym(&mut t, "k");
        let hello = string(&mut t, "hello");
        let s2 = assign(&mut t, k, hello);
        let body = block(&mut t, vec![s0, s1, s2]);

        fill(&mut t, body).unwrap();
        assert_eq!(
            text(&t, body),
            "{\n    long a = 0;\n    a = 5;\n    char* k = \"hello\";\n}"
        );
    }

    #[test]
    fn test_parameters_are_in_scope() {
        let mut t = Tree::new();
        let y = sym(&mut t, "y");
        let x = sym(&mut t, "x");
        let s = assign(&mut t, y, x);
        let f = function(&mut t, Type::Void, "g", &[("x", Type::Float)], vec![s]);
        fill(&mut t, f).unwrap();
        assert_eq!(text(&t, f), "void g(float x) {\n    float y = x;\n}");
    }

    #[test]
    fn test_unbound_read_is_reported() {
        let mut t = Tree::new();
        let y = sym(&mut t, "y");
        let q = sym(&mut t, "q");
        let one = constant(&mut t, 1);
        let sum = add(&mut t, q, one);
        let s = assign(&mut t, y, sum);
        let f = function(&mut t, Type::Void, "h", &[], vec![s]);
        let err = fill(&mut t, f).unwrap_err();
        assert!(matches!(err, InferenceError::UnboundSymbol { ref name } if name == "q"));
    }

    #[test]
    fn test_unknown_callee_is_uninferable() {
        let mut t = Tree::new();
        let y = sym(&mut t, "y");
        let c = call(&mut t, "mystery", vec![]);
        let s = assign(&mut t, y, c);
        let err = fill(&mut t, s).unwrap_err();
        assert!(matches!(err, InferenceError::Uninferable { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_calls_take_return_types() {
        let mut t = Tree::new();
        let n = sym(&mut t, "n");
        let one = constant(&mut t, 1);
        let arg = sub(&mut t, n, one);
        let rec = call(&mut t, "count", vec![arg]);
        let r = ret(&mut t, Some(rec));
        let f = function(&mut t, Type::UInt, "count", &[("n", Type::Int)], vec![r]);
        fill(&mut t, f).unwrap();
        let c = t.find(f, |n| matches!(n, Node::FunctionCall { .. })).unwrap();
        assert_eq!(t[c].annotated_type(), Some(&Type::UInt));
    }

    #[test]
    fn test_fmax_takes_first_argument_type() {
        let mut t = Tree::new();
        let a = sym(&mut t, "a");
        let three = constant(&mut t, 3.0);
        let s0 = assign(&mut t, a, three);
        let a2 = sym(&mut t, "a");
        let zero = constant(&mut t, 0.0);
        let m = call(&mut t, "fmax", vec![a2, zero]);
        let stmts = multi_assign(&mut t, [("c", m)]);
        let c = sym(&mut t, "c");
        let r = ret(&mut t, Some(c));
        let mut body = vec![s0];
        body.extend(stmts);
        body.push(r);
        let f = function(&mut t, Type::Double, "func", &[], body);

        fill(&mut t, f).unwrap();
        assert_eq!(
            text(&t, f),
            "double func() {\n    double a = 3.0;\n    double ____temp__c = fmax(a, 0.0);\n    double c = ____temp__c;\n    return c;\n}"
        );
    }
}
