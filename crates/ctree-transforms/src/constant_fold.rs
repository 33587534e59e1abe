//! Constant folding

use std::cmp::Ordering;

use ctree_ast::{Node, NodeId, Op, Tree};
use ctree_types::Value;

/// Folds arithmetic on literal operands and the additive/multiplicative
/// identities (`x + 0`, `x * 1`, `x * 0`, `0 - x`, ...).
#[derive(Debug, Default)]
pub struct ConstantFold;

impl ConstantFold {
    pub fn new() -> Self {
        Self
    }

    /// Fold the subtree at `root`, rewriting it in place. Returns the node
    /// that now stands at `root`'s position, which differs from `root`
    /// when the root itself folded.
    pub fn fold(&self, tree: &mut Tree, root: NodeId) -> ctree_ast::Result<NodeId> {
        let children = tree.node(root)?.children();
        for child in children {
            self.fold(tree, child)?;
        }

        let Node::BinaryOp { left, op, right } = tree.node(root)?.clone() else {
            return Ok(root);
        };
        let Some(replacement) = self.fold_binary(tree, left, op, right) else {
            return Ok(root);
        };
        if tree.parent(root).is_some() {
            tree.replace(root, replacement)?;
            return Ok(replacement);
        }
        // a folded root hands back a parentless copy of the surviving operand
        if tree.parent(replacement) == Some(root) {
            return tree.clone_subtree(replacement);
        }
        Ok(replacement)
    }

    fn fold_binary(&self, tree: &mut Tree, left: NodeId, op: Op, right: NodeId) -> Option<NodeId> {
        let l = literal_value(tree, left);
        let r = literal_value(tree, right);

        if let (Some(l), Some(r)) = (l, r) {
            let value = evaluate(l, op, r)?;
            return Some(tree.add(Node::Constant { value }));
        }

        let is_zero = |v: Option<Value>| v.is_some_and(|v| v.is_zero());
        let is_one = |v: Option<Value>| v.is_some_and(|v| v.is_one());
        match op {
            Op::Add if is_zero(l) => Some(right),
            Op::Add if is_zero(r) => Some(left),
            Op::Sub if is_zero(r) => Some(left),
            Op::Sub if is_zero(l) => Some(tree.add(Node::UnaryOp {
                op: Op::Neg,
                arg: right,
            })),
            Op::Mul if is_one(l) => Some(right),
            Op::Mul if is_one(r) => Some(left),
            Op::Mul if is_zero(l) => Some(left),
            Op::Mul if is_zero(r) => Some(right),
            _ => None,
        }
    }
}

fn literal_value(tree: &Tree, id: NodeId) -> Option<Value> {
    match tree.get(id)? {
        Node::Constant { value } => Some(*value),
        _ => None,
    }
}

/// Evaluate `l op r` with C semantics, or `None` when the result is not a
/// plain literal (overflow, division by zero, mixed signedness)
fn evaluate(l: Value, op: Op, r: Value) -> Option<Value> {
    if op.is_boolean() && !matches!(op, Op::And | Op::Or) {
        let order = compare(l, r)?;
        let truth = match op {
            Op::Lt => order.is_lt(),
            Op::LtE => order.is_le(),
            Op::Gt => order.is_gt(),
            Op::GtE => order.is_ge(),
            Op::Eq => order.is_eq(),
            Op::NotEq => order.is_ne(),
            _ => return None,
        };
        return Some(Value::Int(truth as i64));
    }

    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            let v = match op {
                Op::Add => a.checked_add(b),
                Op::Sub => a.checked_sub(b),
                Op::Mul => a.checked_mul(b),
                Op::Div => a.checked_div(b),
                Op::Mod => a.checked_rem(b),
                _ => None,
            };
            v.map(Value::Int)
        }
        (Value::UInt(a), Value::UInt(b)) => {
            let v = match op {
                Op::Add => a.checked_add(b),
                Op::Sub => a.checked_sub(b),
                Op::Mul => a.checked_mul(b),
                Op::Div => a.checked_div(b),
                Op::Mod => a.checked_rem(b),
                _ => None,
            };
            v.map(Value::UInt)
        }
        (Value::Float(a), Value::Float(b)) => {
            floating(a as f64, op, b as f64).map(|v| Value::Float(v as f32))
        }
        (a, b) if is_floating(a) || is_floating(b) => {
            if matches!(a, Value::UInt(_) | Value::Char(_) | Value::Bool(_))
                || matches!(b, Value::UInt(_) | Value::Char(_) | Value::Bool(_))
            {
                return None;
            }
            floating(a.as_f64(), op, b.as_f64()).map(Value::Double)
        }
        _ => None,
    }
}

/// Order two literals the way C would, or `None` where the usual
/// arithmetic conversions would change a value (signed against unsigned)
/// or the operands are not numbers of one class
fn compare(l: Value, r: Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(&b)),
        (Value::UInt(a), Value::UInt(b)) => Some(a.cmp(&b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(&b),
        (a, b) if is_floating(a) || is_floating(b) => {
            if !matches!(a, Value::Int(_) | Value::Float(_) | Value::Double(_))
                || !matches!(b, Value::Int(_) | Value::Float(_) | Value::Double(_))
            {
                return None;
            }
            a.as_f64().partial_cmp(&b.as_f64())
        }
        _ => None,
    }
}

fn is_floating(v: Value) -> bool {
    matches!(v, Value::Float(_) | Value::Double(_))
}

fn floating(a: f64, op: Op, b: f64) -> Option<f64> {
    match op {
        Op::Add => Some(a + b),
        Op::Sub => Some(a - b),
        Op::Mul => Some(a * b),
        Op::Div if b != 0.0 => Some(a / b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctree_ast::build::*;
    use ctree_codegen::render;
    use ctree_types::TypeRegistry;

    fn fold_text(tree: &mut Tree, root: NodeId) -> String {
        let root = ConstantFold::new().fold(tree, root).unwrap();
        render(tree, root, &TypeRegistry::new()).unwrap()
    }

    #[test]
    fn test_add_zero() {
        let mut t = Tree::new();
        let a = sym(&mut t, "a");
        let zero = constant(&mut t, 0);
        let e = add(&mut t, a, zero);
        assert_eq!(fold_text(&mut t, e), "a");

        let mut t = Tree::new();
        let zero = constant(&mut t, 0);
        let a = sym(&mut t, "a");
        let e = add(&mut t, zero, a);
        assert_eq!(fold_text(&mut t, e), "a");
    }

    #[test]
    fn test_arithmetic_on_constants() {
        let cases = [(Op::Add, "30"), (Op::Sub, "10"), (Op::Mul, "200"), (Op::Div, "2"), (Op::Lt, "0")];
        for (op, expected) in cases {
            let mut t = Tree::new();
            let l = constant(&mut t, 20);
            let r = constant(&mut t, 10);
            let e = binary(&mut t, l, op, r);
            assert_eq!(fold_text(&mut t, e), expected, "{:?}", op);
        }
    }

    #[test]
    fn test_comparisons_fold_exactly() {
        let mut t = Tree::new();
        let l = constant(&mut t, i64::MAX);
        let r = constant(&mut t, i64::MAX - 1);
        let e = gt(&mut t, l, r);
        assert_eq!(fold_text(&mut t, e), "1");

        let mut t = Tree::new();
        let l = constant(&mut t, Value::UInt(u64::MAX));
        let r = constant(&mut t, Value::UInt(u64::MAX - 1));
        let e = binary(&mut t, l, Op::Eq, r);
        assert_eq!(fold_text(&mut t, e), "0");

        let mut t = Tree::new();
        let l = constant(&mut t, 2);
        let r = constant(&mut t, Value::Double(2.5));
        let e = binary(&mut t, l, Op::Lt, r);
        assert_eq!(fold_text(&mut t, e), "1");
    }

    #[test]
    fn test_signed_unsigned_comparison_is_left_alone() {
        // C converts -1 to UINT64_MAX here, so the comparison is false
        let mut t = Tree::new();
        let l = constant(&mut t, -1);
        let r = constant(&mut t, Value::UInt(1));
        let e = binary(&mut t, l, Op::Lt, r);
        assert_eq!(fold_text(&mut t, e), "-1 < 1u");
    }

    #[test]
    fn test_sub_identities() {
        let mut t = Tree::new();
        let a = sym(&mut t, "a");
        let zero = constant(&mut t, 0);
        let e = sub(&mut t, a, zero);
        assert_eq!(fold_text(&mut t, e), "a");

        let mut t = Tree::new();
        let zero = constant(&mut t, 0);
        let a = sym(&mut t, "a");
        let e = sub(&mut t, zero, a);
        assert_eq!(fold_text(&mut t, e), "- a");
    }

    #[test]
    fn test_mul_identities() {
        let mut t = Tree::new();
        let zero = constant(&mut t, 0);
        let b = sym(&mut t, "b");
        let e = mul(&mut t, zero, b);
        assert_eq!(fold_text(&mut t, e), "0");

        let mut t = Tree::new();
        let b = sym(&mut t, "b");
        let one = constant(&mut t, 1);
        let e = mul(&mut t, b, one);
        assert_eq!(fold_text(&mut t, e), "b");
    }

    #[test]
    fn test_no_folding() {
        for op in [Op::Add, Op::Sub, Op::Mul, Op::Div] {
            let mut t = Tree::new();
            let a = sym(&mut t, "a");
            let b = sym(&mut t, "b");
            let e = binary(&mut t, a, op, b);
            assert_eq!(ConstantFold::new().fold(&mut t, e).unwrap(), e);
        }
    }

    #[test]
    fn test_division_by_zero_is_left_alone() {
        let mut t = Tree::new();
        let l = constant(&mut t, 1);
        let r = constant(&mut t, 0);
        let e = div(&mut t, l, r);
        assert_eq!(fold_text(&mut t, e), "1 / 0");
    }

    #[test]
    fn test_recursive_fold() {
        let mut t = Tree::new();
        let c = sym(&mut t, "c");
        let two = constant(&mut t, 2);
        let minus_two = constant(&mut t, -2);
        let inner = add(&mut t, two, minus_two);
        let b = sym(&mut t, "b");
        let sum = add(&mut t, inner, b);
        let e = assign(&mut t, c, sum);
        assert_eq!(fold_text(&mut t, e), "c = b");
    }

    #[test]
    fn test_mixed_floating() {
        let mut t = Tree::new();
        let l = constant(&mut t, 1);
        let r = constant(&mut t, 0.5);
        let e = add(&mut t, l, r);
        assert_eq!(fold_text(&mut t, e), "1.5");
    }
}
