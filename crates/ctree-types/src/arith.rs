//! Usual arithmetic conversions (C89 6.2.1.5)

use crate::Type;

pub fn is_integer(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Char
            | Type::UChar
            | Type::Short
            | Type::UShort
            | Type::Int
            | Type::UInt
            | Type::Long
            | Type::ULong
    )
}

pub fn is_floating(ty: &Type) -> bool {
    matches!(ty, Type::Float | Type::Double | Type::LongDouble)
}

pub fn is_arithmetic(ty: &Type) -> bool {
    is_integer(ty) || is_floating(ty)
}

/// Integer promotion: the small integer types become `int`
pub fn integer_promote(ty: &Type) -> Type {
    match ty {
        Type::Char | Type::UChar | Type::Short | Type::UShort => Type::Int,
        other => other.clone(),
    }
}

/// The common type of a binary arithmetic expression, or `None` when
/// either operand is not arithmetic.
pub fn usual_arithmetic_conversion(t0: &Type, t1: &Type) -> Option<Type> {
    if !is_arithmetic(t0) || !is_arithmetic(t1) {
        return None;
    }

    for floating in [Type::LongDouble, Type::Double, Type::Float] {
        if *t0 == floating || *t1 == floating {
            return Some(floating);
        }
    }

    let (p0, p1) = (integer_promote(t0), integer_promote(t1));
    for integer in [Type::ULong, Type::Long, Type::UInt] {
        if p0 == integer || p1 == integer {
            return Some(integer);
        }
    }
    Some(Type::Int)
}
