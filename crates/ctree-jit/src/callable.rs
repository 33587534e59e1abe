//! Calling compiled functions through their `FuncType`
//!
//! Every call goes through one fixed C signature taking six integer
//! registers and eight floating registers. On the System V and AAPCS64
//! calling conventions integer-class and floating arguments are assigned
//! to their register files independently and in order, so a callee with
//! fewer parameters reads exactly the registers it declares. A `float`
//! travels in the low 32 bits of its `double` register.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;

use ctree_types::{Type, Value};
use tracing::trace;

use crate::{JitError, Module, Result};

const MAX_INTEGER_ARGS: usize = 6;
const MAX_FLOATING_ARGS: usize = 8;

type IntegerReturn =
    unsafe extern "C" fn(i64, i64, i64, i64, i64, i64, f64, f64, f64, f64, f64, f64, f64, f64) -> i64;
type FloatingReturn =
    unsafe extern "C" fn(i64, i64, i64, i64, i64, i64, f64, f64, f64, f64, f64, f64, f64, f64) -> f64;

/// Register class of a value crossing the call boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterClass {
    Integer,
    Float,
    Double,
}

fn register_class(ty: &Type) -> Result<RegisterClass> {
    match ty {
        Type::Char
        | Type::UChar
        | Type::Short
        | Type::UShort
        | Type::Int
        | Type::UInt
        | Type::Long
        | Type::ULong
        | Type::Ptr(_) => Ok(RegisterClass::Integer),
        Type::Float => Ok(RegisterClass::Float),
        Type::Double => Ok(RegisterClass::Double),
        Type::Void | Type::LongDouble | Type::FuncType { .. } => {
            Err(JitError::UnsupportedType { ty: ty.clone() })
        }
    }
}

/// A function resolved from a linked [`Module`]
pub struct Callable<'m> {
    name: String,
    addr: *const c_void,
    ret: Type,
    params: Vec<Type>,
    _module: PhantomData<&'m Module>,
}

impl<'m> Callable<'m> {
    /// # Safety
    ///
    /// `addr` must point to a C function whose real signature is `ty`, and
    /// must stay valid for `'m`.
    pub(crate) unsafe fn new(name: &str, addr: *const c_void, ty: &Type) -> Result<Self> {
        let Type::FuncType { ret, args } = ty else {
            return Err(JitError::NotAFunction { ty: ty.clone() });
        };

        let mut integers = 0;
        let mut floating = 0;
        for param in args {
            match register_class(param)? {
                RegisterClass::Integer => integers += 1,
                RegisterClass::Float | RegisterClass::Double => floating += 1,
            }
        }
        if integers > MAX_INTEGER_ARGS {
            return Err(JitError::TooManyArguments {
                class: "integer",
                max: MAX_INTEGER_ARGS,
            });
        }
        if floating > MAX_FLOATING_ARGS {
            return Err(JitError::TooManyArguments {
                class: "floating",
                max: MAX_FLOATING_ARGS,
            });
        }
        if !ret.is_void() {
            register_class(ret)?;
        }

        Ok(Self {
            name: name.to_string(),
            addr,
            ret: (**ret).clone(),
            params: args.clone(),
            _module: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> Type {
        Type::func(self.ret.clone(), self.params.clone())
    }

    /// Call with one value per parameter. Returns `None` for `void`
    /// functions.
    pub fn call(&self, args: &[Value]) -> Result<Option<Value>> {
        if args.len() != self.params.len() {
            return Err(JitError::ArityMismatch {
                name: self.name.clone(),
                expected: self.params.len(),
                got: args.len(),
            });
        }

        let mut ints = [0i64; MAX_INTEGER_ARGS];
        let mut floats = [0f64; MAX_FLOATING_ARGS];
        let (mut ni, mut nf) = (0, 0);
        for (index, (value, ty)) in args.iter().zip(&self.params).enumerate() {
            let unconvertible = || JitError::UnconvertibleValue {
                index,
                value: *value,
                ty: ty.clone(),
            };
            match register_class(ty)? {
                RegisterClass::Integer => {
                    ints[ni] = value.as_i64().ok_or_else(unconvertible)?;
                    ni += 1;
                }
                RegisterClass::Double => {
                    floats[nf] = floating(value).ok_or_else(unconvertible)?;
                    nf += 1;
                }
                RegisterClass::Float => {
                    let v = floating(value).ok_or_else(unconvertible)? as f32;
                    floats[nf] = f64::from_bits(u64::from(v.to_bits()));
                    nf += 1;
                }
            }
        }

        trace!(name = %self.name, ?args, "call");
        let [i0, i1, i2, i3, i4, i5] = ints;
        let [f0, f1, f2, f3, f4, f5, f6, f7] = floats;

        if self.ret.is_void() {
            // SAFETY: `new` requires `addr` to be a C function with this
            // signature; extra registers are ignored by the callee.
            unsafe {
                let f: IntegerReturn = std::mem::transmute(self.addr);
                f(i0, i1, i2, i3, i4, i5, f0, f1, f2, f3, f4, f5, f6, f7);
            }
            return Ok(None);
        }

        let value = match register_class(&self.ret)? {
            RegisterClass::Integer => {
                // SAFETY: as above
                let raw = unsafe {
                    let f: IntegerReturn = std::mem::transmute(self.addr);
                    f(i0, i1, i2, i3, i4, i5, f0, f1, f2, f3, f4, f5, f6, f7)
                };
                narrow(raw, &self.ret)
            }
            class => {
                // SAFETY: as above
                let raw = unsafe {
                    let f: FloatingReturn = std::mem::transmute(self.addr);
                    f(i0, i1, i2, i3, i4, i5, f0, f1, f2, f3, f4, f5, f6, f7)
                };
                if class == RegisterClass::Float {
                    Value::Float(f32::from_bits(raw.to_bits() as u32))
                } else {
                    Value::Double(raw)
                }
            }
        };
        Ok(Some(value))
    }
}

impl fmt::Debug for Callable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("signature", &self.signature().to_string())
            .finish()
    }
}

fn floating(value: &Value) -> Option<f64> {
    match *value {
        Value::Float(v) => Some(v as f64),
        Value::Double(v) => Some(v),
        Value::Int(v) => Some(v as f64),
        Value::UInt(v) => Some(v as f64),
        Value::Char(_) | Value::Bool(_) => None,
    }
}

/// Keep only the bits an integer-class return of `ty` defines
fn narrow(raw: i64, ty: &Type) -> Value {
    match ty {
        Type::Char | Type::UChar => Value::Char(raw as u8),
        Type::Short => Value::Int(raw as i16 as i64),
        Type::UShort => Value::Int(raw as u16 as i64),
        Type::Int => Value::Int(raw as i32 as i64),
        Type::UInt => Value::UInt(raw as u32 as u64),
        Type::ULong | Type::Ptr(_) => Value::UInt(raw as u64),
        _ => Value::Int(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn scale(n: i32, factor: f32, offset: f64) -> f64 {
        n as f64 * factor as f64 + offset
    }

    extern "C" fn negate(n: i32) -> i32 {
        -n
    }

    extern "C" fn halve(x: f32) -> f32 {
        x / 2.0
    }

    fn callable(addr: *const c_void, ty: Type) -> Callable<'static> {
        unsafe { Callable::new("f", addr, &ty) }.unwrap()
    }

    #[test]
    fn test_mixed_register_classes() {
        let f = callable(
            scale as *const c_void,
            Type::func(Type::Double, vec![Type::Int, Type::Float, Type::Double]),
        );
        let result = f
            .call(&[Value::Int(3), Value::Float(1.5), Value::Double(0.25)])
            .unwrap();
        assert_eq!(result, Some(Value::Double(4.75)));
    }

    #[test]
    fn test_integer_return_is_narrowed() {
        let f = callable(negate as *const c_void, Type::func(Type::Int, vec![Type::Int]));
        assert_eq!(f.call(&[Value::Int(7)]).unwrap(), Some(Value::Int(-7)));
    }

    #[test]
    fn test_float_return() {
        let f = callable(halve as *const c_void, Type::func(Type::Float, vec![Type::Float]));
        assert_eq!(f.call(&[Value::Double(3.0)]).unwrap(), Some(Value::Float(1.5)));
    }

    #[test]
    fn test_caller_errors() {
        let f = callable(negate as *const c_void, Type::func(Type::Int, vec![Type::Int]));
        assert!(matches!(
            f.call(&[]),
            Err(JitError::ArityMismatch { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            f.call(&[Value::Double(1.0)]),
            Err(JitError::UnconvertibleValue { index: 0, .. })
        ));
    }

    #[test]
    fn test_unsupported_signatures() {
        let addr = negate as *const c_void;
        let long_double = Type::func(Type::Int, vec![Type::LongDouble]);
        assert!(matches!(
            unsafe { Callable::new("f", addr, &long_double) },
            Err(JitError::UnsupportedType { .. })
        ));

        let seven = Type::func(Type::Void, vec![Type::Long; 7]);
        assert!(matches!(
            unsafe { Callable::new("f", addr, &seven) },
            Err(JitError::TooManyArguments { class: "integer", .. })
        ));

        assert!(matches!(
            unsafe { Callable::new("f", addr, &Type::Int) },
            Err(JitError::NotAFunction { .. })
        ));
    }
}
