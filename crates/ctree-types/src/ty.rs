//! Type representations for the C target

use std::fmt;

use serde::{Deserialize, Serialize};

/// A C type.
///
/// Types compare structurally: two `Ptr(Int)` values are equal no matter
/// where they were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    LongDouble,

    /// Pointer to `base`: `base*`
    Ptr(Box<Type>),

    /// Function type: `ret (*)(args)`
    FuncType { ret: Box<Type>, args: Vec<Type> },
}

/// The tag of a [`Type`], ignoring any component types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Void,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    LongDouble,
    Ptr,
    FuncType,
}

impl Type {
    pub fn ptr(base: Type) -> Self {
        Type::Ptr(Box::new(base))
    }

    pub fn func(ret: Type, args: Vec<Type>) -> Self {
        Type::FuncType {
            ret: Box::new(ret),
            args,
        }
    }

    pub fn tag(&self) -> TypeTag {
        match self {
            Type::Void => TypeTag::Void,
            Type::Char => TypeTag::Char,
            Type::UChar => TypeTag::UChar,
            Type::Short => TypeTag::Short,
            Type::UShort => TypeTag::UShort,
            Type::Int => TypeTag::Int,
            Type::UInt => TypeTag::UInt,
            Type::Long => TypeTag::Long,
            Type::ULong => TypeTag::ULong,
            Type::Float => TypeTag::Float,
            Type::Double => TypeTag::Double,
            Type::LongDouble => TypeTag::LongDouble,
            Type::Ptr(_) => TypeTag::Ptr,
            Type::FuncType { .. } => TypeTag::FuncType,
        }
    }

    /// The pointed-to type, if this is a pointer
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(base) => Some(base),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// All scalar types, in declaration order.
    pub fn builtin_scalars() -> [Type; 12] {
        [
            Type::Void,
            Type::Char,
            Type::UChar,
            Type::Short,
            Type::UShort,
            Type::Int,
            Type::UInt,
            Type::Long,
            Type::ULong,
            Type::Float,
            Type::Double,
            Type::LongDouble,
        ]
    }
}

impl TypeTag {
    /// Built-in C keyword spelling for scalar tags
    pub fn keyword(self) -> Option<&'static str> {
        let s = match self {
            TypeTag::Void => "void",
            TypeTag::Char => "char",
            TypeTag::UChar => "unsigned char",
            TypeTag::Short => "short",
            TypeTag::UShort => "unsigned short",
            TypeTag::Int => "int",
            TypeTag::UInt => "unsigned int",
            TypeTag::Long => "long",
            TypeTag::ULong => "unsigned long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
            TypeTag::LongDouble => "long double",
            TypeTag::Ptr | TypeTag::FuncType => return None,
        };
        Some(s)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Ptr(base) => write!(f, "{}*", base),
            Type::FuncType { ret, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{} (*)({})", ret, args.join(", "))
            }
            scalar => f.write_str(scalar.tag().keyword().unwrap_or("?")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        assert_eq!(Type::ptr(Type::Int), Type::ptr(Type::Int));
        assert_ne!(Type::ptr(Type::Int), Type::ptr(Type::Long));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::ULong.to_string(), "unsigned long");
        assert_eq!(Type::ptr(Type::Char).to_string(), "char*");
        assert_eq!(
            Type::func(Type::Int, vec![Type::Int, Type::ptr(Type::Double)]).to_string(),
            "int (*)(int, double*)"
        );
    }
}
