//! Expression typing

use ctree_ast::{Node, NodeId, Op, Tree};
use ctree_types::{integer_promote, is_integer, usual_arithmetic_conversion, Type, TypeRegistry};

use crate::{Result, ScopeStack};

/// Computes the static type of an expression from literals, annotations
/// and the bindings in scope. `None` means the type cannot be known
/// without more context (an unbound name, an unknown callee, a member
/// access).
pub struct ExprTyper<'a> {
    tree: &'a Tree,
    registry: &'a TypeRegistry,
    scopes: &'a ScopeStack,
}

impl<'a> ExprTyper<'a> {
    pub fn new(tree: &'a Tree, registry: &'a TypeRegistry, scopes: &'a ScopeStack) -> Self {
        Self {
            tree,
            registry,
            scopes,
        }
    }

    pub fn type_of(&self, id: NodeId) -> Result<Option<Type>> {
        let ty = match self.tree.node(id)? {
            Node::Constant { value } => Some(self.registry.recognize(value)?),
            Node::String { .. } => Some(Type::ptr(Type::Char)),
            Node::SymbolRef { name, ty, .. } => ty.clone().or_else(|| self.scopes.lookup(name).cloned()),
            Node::Cast { ty, .. } => Some(ty.clone()),
            Node::FunctionCall { func, ty, .. } => match ty {
                Some(ty) => Some(ty.clone()),
                None => self.callee_type(*func),
            },
            Node::UnaryOp { op, arg } => {
                let arg = self.type_of(*arg)?;
                match op {
                    Op::Not => Some(Type::Int),
                    Op::SizeOf => Some(Type::ULong),
                    Op::Ref => arg.map(Type::ptr),
                    Op::Deref => arg.and_then(|t| t.pointee().cloned()),
                    _ => arg,
                }
            }
            Node::BinaryOp { left, op, right } => self.binary(*left, *op, *right)?,
            Node::AugAssign { target, .. } => self.type_of(*target)?,
            Node::TernaryOp { then, elze, .. } => {
                let then = self.type_of(*then)?;
                let elze = self.type_of(*elze)?;
                match (then, elze) {
                    (Some(t), Some(e)) => usual_arithmetic_conversion(&t, &e).or(Some(t)),
                    (t, e) => t.or(e),
                }
            }
            _ => None,
        };
        Ok(ty)
    }

    fn callee_type(&self, func: NodeId) -> Option<Type> {
        let name = self.tree.get(func)?.symbol_name()?;
        self.scopes.lookup(name).cloned()
    }

    fn binary(&self, left: NodeId, op: Op, right: NodeId) -> Result<Option<Type>> {
        if op.is_boolean() {
            return Ok(Some(Type::Int));
        }
        match op {
            Op::Assign => return self.type_of(left),
            Op::Comma => return self.type_of(right),
            Op::Dot | Op::Arrow => return Ok(None),
            _ => {}
        }

        let (Some(l), Some(r)) = (self.type_of(left)?, self.type_of(right)?) else {
            return Ok(None);
        };
        let ty = match op {
            Op::ArrayRef => l.pointee().cloned(),
            _ if op.is_shift() => Some(integer_promote(&l)),
            Op::Add | Op::Sub if l.is_pointer() && is_integer(&r) => Some(l),
            Op::Add if r.is_pointer() && is_integer(&l) => Some(r),
            Op::Sub if l.is_pointer() && r.is_pointer() => Some(Type::Long),
            _ => usual_arithmetic_conversion(&l, &r),
        };
        Ok(ty)
    }
}
