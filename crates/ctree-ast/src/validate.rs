//! Well-formed IR check

use std::collections::HashSet;

use crate::{Node, NodeId, Result, StructuralError, Tree};

/// Check the subtree under `root`: every id resolves, no node is reachable
/// twice, parent links match the slots holding each node, every operator
/// suits its node's arity, operands are expressions, parameters are
/// symbols, and containers sit where they belong.
pub fn validate(tree: &Tree, root: NodeId) -> Result<()> {
    tree.node(root)?;
    let mut seen = HashSet::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            return Err(StructuralError::Shared {
                kind: tree.kind(id),
                id,
            });
        }
        let node = tree.node(id)?;
        check_node(tree, id, node, root)?;

        for child in node.children() {
            tree.node(child)?;
            if tree.parent(child) != Some(id) {
                return Err(StructuralError::ParentMismatch {
                    kind: tree.kind(child),
                    id: child,
                });
            }
            stack.push(child);
        }
    }
    Ok(())
}

fn check_node(tree: &Tree, id: NodeId, node: &Node, root: NodeId) -> Result<()> {
    let invalid_op = |op| StructuralError::InvalidOp {
        op,
        kind: node.kind_name().to_string(),
        id,
    };

    match node {
        Node::Project { .. } if id != root => return Err(misplaced(node, id)),
        Node::Project { files } => {
            for &file in files {
                let file_node = tree.node(file)?;
                if !matches!(file_node, Node::File { .. }) {
                    return Err(StructuralError::WrongKind {
                        expected: "File",
                        kind: file_node.kind_name().to_string(),
                        id: file,
                    });
                }
            }
        }
        Node::File { .. } if id != root => {
            let under_project = tree
                .parent(id)
                .and_then(|p| tree.get(p))
                .is_some_and(|p| matches!(p, Node::Project { .. }));
            if !under_project {
                return Err(misplaced(node, id));
            }
        }
        Node::UnaryOp { op, arg } => {
            if !op.is_unary() {
                return Err(invalid_op(*op));
            }
            expect_expression(tree, *arg)?;
        }
        Node::BinaryOp { left, op, right } => {
            if !op.is_binary() {
                return Err(invalid_op(*op));
            }
            expect_expression(tree, *left)?;
            expect_expression(tree, *right)?;
        }
        Node::AugAssign { target, op, value } => {
            if !op.is_augmentable() {
                return Err(invalid_op(*op));
            }
            expect_expression(tree, *target)?;
            expect_expression(tree, *value)?;
        }
        Node::TernaryOp { cond, then, elze } => {
            for operand in [cond, then, elze] {
                expect_expression(tree, *operand)?;
            }
        }
        Node::Cast { value, .. } => expect_expression(tree, *value)?,
        Node::FunctionCall { func, args, .. } => {
            expect_expression(tree, *func)?;
            for arg in args {
                expect_expression(tree, *arg)?;
            }
        }
        Node::FunctionDecl { params, .. } => {
            for &param in params {
                let param_node = tree.node(param)?;
                if !matches!(param_node, Node::SymbolRef { .. }) {
                    return Err(StructuralError::WrongKind {
                        expected: "SymbolRef",
                        kind: param_node.kind_name().to_string(),
                        id: param,
                    });
                }
            }
        }
        _ => {}
    }

    if id != root {
        for child in node.children() {
            if let Some(Node::Project { .. }) = tree.get(child) {
                return Err(misplaced(&tree[child], child));
            }
        }
    }
    Ok(())
}

fn expect_expression(tree: &Tree, id: NodeId) -> Result<()> {
    let node = tree.node(id)?;
    if node.is_expression() || matches!(node, Node::Custom { .. }) {
        Ok(())
    } else {
        Err(StructuralError::WrongKind {
            expected: "expression",
            kind: node.kind_name().to_string(),
            id,
        })
    }
}

fn misplaced(node: &Node, id: NodeId) -> StructuralError {
    StructuralError::Misplaced {
        kind: node.kind_name().to_string(),
        id,
    }
}
