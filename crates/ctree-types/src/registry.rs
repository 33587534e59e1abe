//! Type registry: host value recognition and C spelling
//!
//! The registry is an explicit value built once per session and passed by
//! reference to the passes that need it. Both tables are open: extension
//! crates add recognizers for their own value classes and spellings for
//! their own types. Registering an existing key replaces it and is
//! reported, never rejected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::{class, HostValue, RegistryError, Result, Type, TypeTag, ValueClass};

/// Produces the C type of a host value
pub type Recognizer = Arc<dyn Fn(&dyn HostValue) -> Result<Type> + Send + Sync>;

/// Produces the C spelling of a type; receives the registry so composite
/// types can spell their components
pub type Speller = Arc<dyn Fn(&Type, &TypeRegistry) -> Result<String> + Send + Sync>;

/// Key of the spelling table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SpellingKey {
    /// Exactly this type, e.g. `Ptr(Char)`
    Exact(Type),
    /// Any type with this tag
    Tag(TypeTag),
}

impl From<TypeTag> for SpellingKey {
    fn from(tag: TypeTag) -> Self {
        SpellingKey::Tag(tag)
    }
}

impl From<Type> for SpellingKey {
    fn from(ty: Type) -> Self {
        SpellingKey::Exact(ty)
    }
}

#[derive(Clone)]
pub struct TypeRegistry {
    recognizers: HashMap<&'static str, Recognizer>,
    spellers: HashMap<SpellingKey, Speller>,
}

impl TypeRegistry {
    /// A registry preloaded with the built-in recognizers and spellings
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.install_builtins();
        registry
    }

    /// A registry with no entries at all
    pub fn empty() -> Self {
        Self {
            recognizers: HashMap::new(),
            spellers: HashMap::new(),
        }
    }

    fn install_builtins(&mut self) {
        self.register_recognizer(&class::INT, constant(Type::Long));
        self.register_recognizer(&class::UINT, constant(Type::ULong));
        self.register_recognizer(&class::FLOAT, constant(Type::Double));
        self.register_recognizer(&class::FLOAT32, constant(Type::Float));
        self.register_recognizer(&class::CHAR, constant(Type::Char));
        self.register_recognizer(&class::STR, constant(Type::ptr(Type::Char)));

        for scalar in Type::builtin_scalars() {
            let tag = scalar.tag();
            if let Some(keyword) = tag.keyword() {
                self.register_spelling(tag, move |_: &Type, _: &TypeRegistry| Ok(keyword.to_string()));
            }
        }
        self.register_spelling(TypeTag::Ptr, |ty: &Type, registry: &TypeRegistry| match ty {
            Type::Ptr(base) => Ok(format!("{}*", registry.spell(base)?)),
            other => Err(unspelled(other)),
        });
        self.register_spelling(TypeTag::FuncType, |ty: &Type, registry: &TypeRegistry| match ty {
            Type::FuncType { ret, args } => {
                let args = args
                    .iter()
                    .map(|a| registry.spell(a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(format!("{} (*)({})", registry.spell(ret)?, args.join(", ")))
            }
            other => Err(unspelled(other)),
        });
    }

    /// Register a recognizer for values of `class` (and, by fallback, of
    /// its subclasses). Returns true if an existing entry was replaced.
    pub fn register_recognizer<F>(&mut self, class: &'static ValueClass, recognizer: F) -> bool
    where
        F: Fn(&dyn HostValue) -> Result<Type> + Send + Sync + 'static,
    {
        let replaced = self
            .recognizers
            .insert(class.name, Arc::new(recognizer))
            .is_some();
        if replaced {
            warn!(class = class.name, "replacing existing type recognizer");
        }
        replaced
    }

    /// Register a spelling. Returns true if an existing entry was replaced.
    pub fn register_spelling<K, F>(&mut self, key: K, speller: F) -> bool
    where
        K: Into<SpellingKey>,
        F: Fn(&Type, &TypeRegistry) -> Result<String> + Send + Sync + 'static,
    {
        let key = key.into();
        let replaced = self.spellers.contains_key(&key);
        if replaced {
            warn!(?key, "replacing existing type spelling");
        }
        self.spellers.insert(key, Arc::new(speller));
        replaced
    }

    /// The C type of a host value, walking the value's base classes when
    /// its exact class has no recognizer
    pub fn recognize(&self, value: &dyn HostValue) -> Result<Type> {
        let class = value.value_class();
        for ancestor in class.ancestry() {
            if let Some(recognizer) = self.recognizers.get(ancestor.name) {
                return recognizer(value);
            }
        }
        Err(RegistryError::UnrecognizedValue {
            class: class.name,
            value: format!("{:?}", value),
        })
    }

    /// The C spelling of `ty`: an exact registration wins over the
    /// registration for its tag
    pub fn spell(&self, ty: &Type) -> Result<String> {
        let speller = self
            .spellers
            .get(&SpellingKey::Exact(ty.clone()))
            .or_else(|| self.spellers.get(&SpellingKey::Tag(ty.tag())))
            .ok_or_else(|| unspelled(ty))?;
        speller(ty, self)
    }

    pub fn has_recognizer(&self, class: &ValueClass) -> bool {
        self.recognizers.contains_key(class.name)
    }
}

fn constant(ty: Type) -> impl Fn(&dyn HostValue) -> Result<Type> + Send + Sync + 'static {
    move |_: &dyn HostValue| Ok(ty.clone())
}

fn unspelled(ty: &Type) -> RegistryError {
    RegistryError::UnspelledType { ty: format!("{:?}", ty) }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&str> = self.recognizers.keys().copied().collect();
        classes.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("recognizers", &classes)
            .field("spellings", &self.spellers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    static GRID: ValueClass = ValueClass::root("grid");
    static SPARSE_GRID: ValueClass = ValueClass::derived("sparse_grid", &GRID);

    #[derive(Debug)]
    struct SparseGrid;

    impl HostValue for SparseGrid {
        fn value_class(&self) -> &'static ValueClass {
            &SPARSE_GRID
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_builtin_recognizers() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.recognize(&Value::Int(1)).unwrap(), Type::Long);
        assert_eq!(registry.recognize(&2.5f64).unwrap(), Type::Double);
        assert_eq!(registry.recognize(&1.5f32).unwrap(), Type::Float);
        assert_eq!(registry.recognize(&"text").unwrap(), Type::ptr(Type::Char));
    }

    #[test]
    fn test_recognizer_falls_back_to_base_class() {
        let registry = TypeRegistry::new();
        // bool has no entry of its own
        assert_eq!(registry.recognize(&true).unwrap(), Type::Long);

        let mut registry = TypeRegistry::new();
        registry.register_recognizer(&GRID, |_: &dyn HostValue| Ok(Type::ptr(Type::Double)));
        assert_eq!(registry.recognize(&SparseGrid).unwrap(), Type::ptr(Type::Double));
    }

    #[test]
    fn test_unrecognized_value_names_class() {
        let registry = TypeRegistry::empty();
        let err = registry.recognize(&SparseGrid).unwrap_err();
        assert_eq!(
            err,
            RegistryError::UnrecognizedValue {
                class: "sparse_grid",
                value: "SparseGrid".to_string(),
            }
        );
    }

    #[test]
    fn test_spelling_round_trip_for_builtins() {
        let registry = TypeRegistry::new();
        for ty in Type::builtin_scalars() {
            assert_eq!(registry.spell(&ty).unwrap(), ty.to_string());
        }
        let fn_ptr = Type::func(Type::Int, vec![Type::ptr(Type::Float), Type::Long]);
        assert_eq!(registry.spell(&fn_ptr).unwrap(), "int (*)(float*, long)");
    }

    #[test]
    fn test_exact_spelling_beats_tag() {
        let mut registry = TypeRegistry::new();
        registry.register_spelling(Type::ptr(Type::Char), |_: &Type, _: &TypeRegistry| {
            Ok("const char*".to_string())
        });
        assert_eq!(registry.spell(&Type::ptr(Type::Char)).unwrap(), "const char*");
        assert_eq!(registry.spell(&Type::ptr(Type::Int)).unwrap(), "int*");
    }

    #[test]
    fn test_reregistration_is_reported() {
        let mut registry = TypeRegistry::new();
        let replaced = registry.register_spelling(TypeTag::Long, |_: &Type, _: &TypeRegistry| {
            Ok("int64_t".to_string())
        });
        assert!(replaced);
        assert_eq!(registry.spell(&Type::Long).unwrap(), "int64_t");
        assert_eq!(registry.spell(&Type::ptr(Type::Long)).unwrap(), "int64_t*");
    }

    #[test]
    fn test_unspelled_type() {
        let registry = TypeRegistry::empty();
        assert!(matches!(
            registry.spell(&Type::Int),
            Err(RegistryError::UnspelledType { .. })
        ));
    }
}
