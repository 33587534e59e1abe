//! Shorthand constructors
//!
//! Each helper adds one node (plus any leaf it needs) to the tree and
//! returns its id.

use ctree_types::{Type, Value};

use crate::{Node, NodeId, Op, Tree};

/// Prefix marking the rotation temporaries produced by [`multi_assign`]
pub const TEMP_PREFIX: &str = "____temp__";

pub fn sym(tree: &mut Tree, name: &str) -> NodeId {
    tree.add(Node::symbol(name))
}

pub fn typed_sym(tree: &mut Tree, name: &str, ty: Type) -> NodeId {
    tree.add(Node::typed_symbol(name, ty))
}

pub fn constant(tree: &mut Tree, value: impl Into<Value>) -> NodeId {
    tree.add(Node::constant(value))
}

pub fn string(tree: &mut Tree, value: &str) -> NodeId {
    tree.add(Node::String {
        value: value.to_string(),
    })
}

pub fn unary(tree: &mut Tree, op: Op, arg: NodeId) -> NodeId {
    tree.add(Node::UnaryOp { op, arg })
}

pub fn binary(tree: &mut Tree, left: NodeId, op: Op, right: NodeId) -> NodeId {
    tree.add(Node::BinaryOp { left, op, right })
}

pub fn aug_assign(tree: &mut Tree, target: NodeId, op: Op, value: NodeId) -> NodeId {
    tree.add(Node::AugAssign { target, op, value })
}

macro_rules! unary_builders {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(tree: &mut Tree, arg: NodeId) -> NodeId {
                unary(tree, Op::$op, arg)
            }
        )*
    };
}

macro_rules! binary_builders {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(tree: &mut Tree, left: NodeId, right: NodeId) -> NodeId {
                binary(tree, left, Op::$op, right)
            }
        )*
    };
}

macro_rules! aug_builders {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(tree: &mut Tree, target: NodeId, value: NodeId) -> NodeId {
                aug_assign(tree, target, Op::$op, value)
            }
        )*
    };
}

unary_builders! {
    pre_inc => PreInc,
    pre_dec => PreDec,
    post_inc => PostInc,
    post_dec => PostDec,
    address_of => Ref,
    deref => Deref,
    size_of => SizeOf,
    plus => Plus,
    neg => Neg,
    not => Not,
    bit_not => BitNot,
}

binary_builders! {
    add => Add,
    sub => Sub,
    mul => Mul,
    div => Div,
    modulo => Mod,
    bit_shl => BitShL,
    bit_shr => BitShR,
    lt => Lt,
    lte => LtE,
    gt => Gt,
    gte => GtE,
    eq => Eq,
    not_eq => NotEq,
    bit_and => BitAnd,
    bit_xor => BitXor,
    bit_or => BitOr,
    and => And,
    or => Or,
    assign => Assign,
    comma => Comma,
    dot => Dot,
    arrow => Arrow,
    array_ref => ArrayRef,
}

aug_builders! {
    add_assign => Add,
    sub_assign => Sub,
    mul_assign => Mul,
    div_assign => Div,
    mod_assign => Mod,
    bit_and_assign => BitAnd,
    bit_or_assign => BitOr,
    bit_xor_assign => BitXor,
    bit_shl_assign => BitShL,
    bit_shr_assign => BitShR,
}

pub fn ternary(tree: &mut Tree, cond: NodeId, then: NodeId, elze: NodeId) -> NodeId {
    tree.add(Node::TernaryOp { cond, then, elze })
}

pub fn cast(tree: &mut Tree, ty: Type, value: NodeId) -> NodeId {
    tree.add(Node::Cast { ty, value })
}

/// `name(args)`
pub fn call(tree: &mut Tree, name: &str, args: Vec<NodeId>) -> NodeId {
    let func = sym(tree, name);
    tree.add(Node::FunctionCall {
        func,
        args,
        ty: None,
    })
}

pub fn block(tree: &mut Tree, body: Vec<NodeId>) -> NodeId {
    tree.add(Node::Block { body })
}

pub fn ret(tree: &mut Tree, value: Option<NodeId>) -> NodeId {
    tree.add(Node::Return { value })
}

pub fn if_then(tree: &mut Tree, cond: NodeId, then: Vec<NodeId>, elze: Option<Vec<NodeId>>) -> NodeId {
    let then = block(tree, then);
    let elze = elze.map(|body| block(tree, body));
    tree.add(Node::If { cond, then, elze })
}

pub fn while_loop(tree: &mut Tree, cond: NodeId, body: Vec<NodeId>) -> NodeId {
    let body = block(tree, body);
    tree.add(Node::While { cond, body })
}

pub fn for_loop(
    tree: &mut Tree,
    init: Option<NodeId>,
    test: Option<NodeId>,
    incr: Option<NodeId>,
    body: Vec<NodeId>,
) -> NodeId {
    let body = block(tree, body);
    tree.add(Node::For {
        init,
        test,
        incr,
        body,
    })
}

/// A function definition with typed parameters `(name, type)`
pub fn function(
    tree: &mut Tree,
    return_type: Type,
    name: &str,
    params: &[(&str, Type)],
    body: Vec<NodeId>,
) -> NodeId {
    let params = params
        .iter()
        .map(|(param, ty)| typed_sym(tree, param, ty.clone()))
        .collect();
    let defn = block(tree, body);
    tree.add(Node::FunctionDecl {
        return_type,
        name: name.to_string(),
        params,
        defn: Some(defn),
        is_static: false,
        is_inline: false,
    })
}

pub fn file(tree: &mut Tree, name: &str, body: Vec<NodeId>) -> NodeId {
    tree.add(Node::File {
        name: name.to_string(),
        body,
    })
}

pub fn project(tree: &mut Tree, files: Vec<NodeId>) -> NodeId {
    tree.add(Node::Project { files })
}

/// Lower the parallel assignment `a, b = x, y` into
/// `____temp__a = x; ____temp__b = y; a = ____temp__a; b = ____temp__b`,
/// returning the statements in order
pub fn multi_assign<S: AsRef<str>>(
    tree: &mut Tree,
    pairs: impl IntoIterator<Item = (S, NodeId)>,
) -> Vec<NodeId> {
    let mut stores = Vec::new();
    let mut loads = Vec::new();
    for (target, value) in pairs {
        let target = target.as_ref();
        let temp_name = format!("{}{}", TEMP_PREFIX, target);

        let temp = sym(tree, &temp_name);
        stores.push(assign(tree, temp, value));

        let dest = sym(tree, target);
        let temp = sym(tree, &temp_name);
        loads.push(assign(tree, dest, temp));
    }
    stores.extend(loads);
    stores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_assign_rotates_through_temps() {
        let mut tree = Tree::new();
        let b = sym(&mut tree, "b");
        let a = sym(&mut tree, "a");
        let b2 = sym(&mut tree, "b");
        let sum = add(&mut tree, a, b2);
        let stmts = multi_assign(&mut tree, [("a", b), ("b", sum)]);
        assert_eq!(stmts.len(), 4);

        let targets: Vec<&str> = stmts
            .iter()
            .map(|&s| match &tree[s] {
                Node::BinaryOp { left, op: Op::Assign, .. } => tree[*left].symbol_name().unwrap_or(""),
                _ => "",
            })
            .collect();
        assert_eq!(targets, vec!["____temp__a", "____temp__b", "a", "b"]);
    }

    #[test]
    fn test_function_builder() {
        let mut tree = Tree::new();
        let n = sym(&mut tree, "n");
        let body = ret(&mut tree, Some(n));
        let f = function(&mut tree, Type::Int, "id", &[("n", Type::Int)], vec![body]);
        match &tree[f] {
            Node::FunctionDecl { params, defn, .. } => {
                assert_eq!(params.len(), 1);
                assert_eq!(tree.parent(params[0]), Some(f));
                assert!(defn.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
