//! # Type System
//!
//! Primitive element types carried by every [`crate::ir::Expr`]: a
//! code (int/uint/float), a bit width, and a lane count for future
//! vector widening. Bounds (`Dom::extent`, shape dimensions) always use
//! a 32-bit signed scalar `Type`; the element type of a kernel's data
//! comes from its JSON `data_type` field.

use serde::{Deserialize, Serialize};

/// The three primitive numeric codes TCL understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    Int,
    UInt,
    Float,
}

/// `(code, bits, lanes)` — immutable once constructed, equal iff all
/// three fields match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    pub code: TypeCode,
    pub bits: u8,
    pub lanes: u32,
}

impl Type {
    /// Construct directly; panics on a bit width outside `{1, 8, 16,
    /// 32, 64}` or a zero lane count, since both indicate a bug in a
    /// caller rather than a case worth propagating as an error.
    pub fn new(code: TypeCode, bits: u8, lanes: u32) -> Self {
        assert!(
            matches!(bits, 1 | 8 | 16 | 32 | 64),
            "unsupported bit width: {bits}"
        );
        assert!(lanes >= 1, "lanes must be >= 1");
        Type { code, bits, lanes }
    }

    pub fn int_scalar(bits: u8) -> Self {
        Self::new(TypeCode::Int, bits, 1)
    }

    pub fn uint_scalar(bits: u8) -> Self {
        Self::new(TypeCode::UInt, bits, 1)
    }

    pub fn float_scalar(bits: u8) -> Self {
        Self::new(TypeCode::Float, bits, 1)
    }

    pub fn is_scalar(&self) -> bool {
        self.lanes == 1
    }

    /// The element type written in a kernel JSON case: `"float"` or
    /// `"int"`, both 32-bit scalars per spec.
    pub fn from_data_type_str(s: &str) -> Option<Self> {
        match s {
            "float" => Some(Self::float_scalar(32)),
            "int" => Some(Self::int_scalar(32)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            TypeCode::Int => write!(f, "int{}", self.bits)?,
            TypeCode::UInt => write!(f, "uint{}", self.bits)?,
            TypeCode::Float => write!(f, "float{}", self.bits)?,
        }
        if self.lanes > 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_constructors_match_fields() {
        let t = Type::int_scalar(32);
        assert_eq!(t.code, TypeCode::Int);
        assert_eq!(t.bits, 32);
        assert_eq!(t.lanes, 1);
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(Type::float_scalar(32), Type::float_scalar(32));
        assert_ne!(Type::float_scalar(32), Type::float_scalar(64));
        assert_ne!(Type::int_scalar(32), Type::uint_scalar(32));
    }

    #[test]
    fn from_data_type_str_matches_json_schema() {
        assert_eq!(Type::from_data_type_str("float"), Some(Type::float_scalar(32)));
        assert_eq!(Type::from_data_type_str("int"), Some(Type::int_scalar(32)));
        assert_eq!(Type::from_data_type_str("bogus"), None);
    }

    #[test]
    #[should_panic(expected = "unsupported bit width")]
    fn rejects_bad_bit_width() {
        let _ = Type::int_scalar(7);
    }
}
