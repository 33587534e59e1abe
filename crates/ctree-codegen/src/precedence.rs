//! Operator precedence and associativity
//!
//! Classes follow the C operator table. Variants are declared from the
//! loosest to the tightest binding so the derived ordering reads
//! naturally: `Multiplicative > Additive`.

use ctree_ast::{Node, Op};
use ctree_types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrecedenceClass {
    Comma,
    Assignment,
    Ternary,
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Prefix,
    Postfix,
}

/// Indexed by `PrecedenceClass as usize`
static ASSOCIATIVITY: [Associativity; 15] = [
    Associativity::Left,  // Comma
    Associativity::Right, // Assignment
    Associativity::Right, // Ternary
    Associativity::Left,  // LogicalOr
    Associativity::Left,  // LogicalAnd
    Associativity::Left,  // BitOr
    Associativity::Left,  // BitXor
    Associativity::Left,  // BitAnd
    Associativity::Left,  // Equality
    Associativity::Left,  // Relational
    Associativity::Left,  // Shift
    Associativity::Left,  // Additive
    Associativity::Left,  // Multiplicative
    Associativity::Right, // Prefix
    Associativity::Left,  // Postfix
];

impl PrecedenceClass {
    pub fn associativity(self) -> Associativity {
        ASSOCIATIVITY[self as usize]
    }

    pub fn is_left_associative(self) -> bool {
        self.associativity() == Associativity::Left
    }
}

pub fn op_class(op: Op) -> PrecedenceClass {
    use PrecedenceClass::*;
    match op {
        Op::PostInc | Op::PostDec | Op::Dot | Op::Arrow | Op::ArrayRef => Postfix,
        Op::PreInc
        | Op::PreDec
        | Op::Ref
        | Op::Deref
        | Op::SizeOf
        | Op::Plus
        | Op::Neg
        | Op::Not
        | Op::BitNot
        | Op::Cast => Prefix,
        Op::Mul | Op::Div | Op::Mod => Multiplicative,
        Op::Add | Op::Sub => Additive,
        Op::BitShL | Op::BitShR => Shift,
        Op::Lt | Op::LtE | Op::Gt | Op::GtE => Relational,
        Op::Eq | Op::NotEq => Equality,
        Op::BitAnd => BitAnd,
        Op::BitXor => BitXor,
        Op::BitOr => BitOr,
        Op::And => LogicalAnd,
        Op::Or => LogicalOr,
        Op::Conditional => Ternary,
        Op::Assign => Assignment,
        Op::Comma => Comma,
    }
}

/// The class of an expression node, or `None` for nodes that never need
/// or cause parentheses. A negative numeric literal renders with a
/// leading minus and so binds like a prefix operator.
pub fn node_class(node: &Node) -> Option<PrecedenceClass> {
    match node {
        Node::UnaryOp { op, .. } | Node::BinaryOp { op, .. } => Some(op_class(*op)),
        Node::AugAssign { .. } => Some(PrecedenceClass::Assignment),
        Node::TernaryOp { .. } => Some(op_class(Op::Conditional)),
        Node::Cast { .. } => Some(op_class(Op::Cast)),
        Node::FunctionCall { .. } => Some(PrecedenceClass::Postfix),
        Node::Constant { value } if is_negative(value) => Some(PrecedenceClass::Prefix),
        _ => None,
    }
}

fn is_negative(value: &Value) -> bool {
    match *value {
        Value::Int(v) => v < 0,
        Value::Float(v) => v.is_sign_negative(),
        Value::Double(v) => v.is_sign_negative(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(PrecedenceClass::Postfix > PrecedenceClass::Prefix);
        assert!(PrecedenceClass::Multiplicative > PrecedenceClass::Additive);
        assert!(PrecedenceClass::Assignment > PrecedenceClass::Comma);
        assert!(op_class(Op::Mul) > op_class(Op::Add));
        assert!(op_class(Op::And) > op_class(Op::Or));
    }

    #[test]
    fn test_associativity() {
        assert!(!op_class(Op::Assign).is_left_associative());
        assert!(!op_class(Op::Conditional).is_left_associative());
        assert!(!op_class(Op::Neg).is_left_associative());
        assert!(op_class(Op::Sub).is_left_associative());
        assert!(op_class(Op::Comma).is_left_associative());
    }
}
