//! IL value types and literals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A value type in the IL.
///
/// Types are recursive: a primitive, a pointer to another type, or the name of
/// a record declared in the program-level record table.
///
/// # Surface form
///
/// `"int"`, `"bool"`, `{"ptr": T}`, or a bare record name such as `"point"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TypeRepr", into = "TypeRepr")]
pub enum Type {
    /// 64-bit signed integer.
    Int,
    /// Single-bit boolean.
    Bool,
    /// Pointer to another type.
    Ptr(Box<Type>),
    /// Named record declared in the program's record table.
    Record(String),
}

impl Type {
    /// Check whether this is a pointer type.
    #[must_use]
    pub const fn is_ptr(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    /// Get the pointee of a pointer type.
    #[must_use]
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Ptr(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Ptr(inner) => write!(f, "ptr<{inner}>"),
            Type::Record(name) => write!(f, "{name}"),
        }
    }
}

/// Serde helper mirroring the JSON shape of [`Type`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TypeRepr {
    Ptr {
        ptr: Box<TypeRepr>,
    },
    Name(String),
}

impl From<TypeRepr> for Type {
    fn from(repr: TypeRepr) -> Self {
        match repr {
            TypeRepr::Name(name) => match name.as_str() {
                "int" => Type::Int,
                "bool" => Type::Bool,
                _ => Type::Record(name),
            },
            TypeRepr::Ptr { ptr } => Type::Ptr(Box::new(Type::from(*ptr))),
        }
    }
}

impl From<Type> for TypeRepr {
    fn from(typ: Type) -> Self {
        match typ {
            Type::Int => TypeRepr::Name("int".to_string()),
            Type::Bool => TypeRepr::Name("bool".to_string()),
            Type::Record(name) => TypeRepr::Name(name),
            Type::Ptr(inner) => TypeRepr::Ptr {
                ptr: Box::new(TypeRepr::from(*inner)),
            },
        }
    }
}

/// A literal constant value carried by a `const` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// Boolean literal.
    Bool(bool),
    /// Signed integer literal.
    Int(i64),
}

impl Literal {
    /// Collapse the literal to an integer, mapping booleans to 0/1.
    #[must_use]
    pub const fn as_int(self) -> i64 {
        match self {
            Literal::Bool(b) => b as i64,
            Literal::Int(v) => v,
        }
    }
}
