//! Operator tags

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every operator the IR can express.
///
/// `Cast` and `Conditional` are never stored on a `UnaryOp`/`BinaryOp`;
/// they are the implicit operators of `Cast` and `TernaryOp` nodes and
/// exist so those kinds have a precedence entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    // Postfix
    PostInc,
    PostDec,
    Dot,
    Arrow,
    ArrayRef,

    // Prefix
    PreInc,
    PreDec,
    Ref,
    Deref,
    SizeOf,
    Plus,
    Neg,
    Not,
    BitNot,
    Cast,

    // Binary
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    BitShL,
    BitShR,
    Lt,
    LtE,
    Gt,
    GtE,
    Eq,
    NotEq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Conditional,
    Assign,
    Comma,
}

impl Op {
    /// C spelling of the operator token
    pub fn spelling(self) -> &'static str {
        match self {
            Op::PostInc | Op::PreInc => "++",
            Op::PostDec | Op::PreDec => "--",
            Op::Dot => ".",
            Op::Arrow => "->",
            Op::ArrayRef => "[]",
            Op::Ref => "&",
            Op::Deref => "*",
            Op::SizeOf => "sizeof",
            Op::Plus => "+",
            Op::Neg => "-",
            Op::Not => "!",
            Op::BitNot => "~",
            Op::Cast => "()",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Add => "+",
            Op::Sub => "-",
            Op::BitShL => "<<",
            Op::BitShR => ">>",
            Op::Lt => "<",
            Op::LtE => "<=",
            Op::Gt => ">",
            Op::GtE => ">=",
            Op::Eq => "==",
            Op::NotEq => "!=",
            Op::BitAnd => "&",
            Op::BitXor => "^",
            Op::BitOr => "|",
            Op::And => "&&",
            Op::Or => "||",
            Op::Conditional => "?:",
            Op::Assign => "=",
            Op::Comma => ",",
        }
    }

    pub fn is_prefix(self) -> bool {
        matches!(
            self,
            Op::PreInc
                | Op::PreDec
                | Op::Ref
                | Op::Deref
                | Op::SizeOf
                | Op::Plus
                | Op::Neg
                | Op::Not
                | Op::BitNot
        )
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, Op::PostInc | Op::PostDec)
    }

    /// Valid on a `UnaryOp` node
    pub fn is_unary(self) -> bool {
        self.is_prefix() || self.is_postfix()
    }

    /// Valid on a `BinaryOp` node
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Op::Mul
                | Op::Div
                | Op::Mod
                | Op::Add
                | Op::Sub
                | Op::BitShL
                | Op::BitShR
                | Op::Lt
                | Op::LtE
                | Op::Gt
                | Op::GtE
                | Op::Eq
                | Op::NotEq
                | Op::BitAnd
                | Op::BitXor
                | Op::BitOr
                | Op::And
                | Op::Or
                | Op::Assign
                | Op::Comma
                | Op::Dot
                | Op::Arrow
                | Op::ArrayRef
        )
    }

    /// Valid on an `AugAssign` node (`a op= b`)
    pub fn is_augmentable(self) -> bool {
        matches!(
            self,
            Op::Add
                | Op::Sub
                | Op::Mul
                | Op::Div
                | Op::Mod
                | Op::BitAnd
                | Op::BitOr
                | Op::BitXor
                | Op::BitShL
                | Op::BitShR
        )
    }

    /// Comparison and logical operators, which always yield `int`
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            Op::Lt | Op::LtE | Op::Gt | Op::GtE | Op::Eq | Op::NotEq | Op::And | Op::Or
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Op::BitShL | Op::BitShR)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_sets_are_disjoint() {
        for op in [Op::Add, Op::Assign, Op::ArrayRef, Op::Comma] {
            assert!(op.is_binary());
            assert!(!op.is_unary());
        }
        for op in [Op::PreInc, Op::PostDec, Op::Deref, Op::SizeOf] {
            assert!(op.is_unary());
            assert!(!op.is_binary());
        }
        assert!(!Op::Cast.is_unary() && !Op::Cast.is_binary());
        assert!(!Op::Conditional.is_binary());
    }

    #[test]
    fn test_augmentable() {
        assert!(Op::BitShL.is_augmentable());
        assert!(!Op::Assign.is_augmentable());
        assert!(!Op::And.is_augmentable());
    }
}
