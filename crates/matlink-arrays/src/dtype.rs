//! Element Type Enumeration
//!
//! A closed set of element types that can cross the engine boundary.
//! Every encode/decode dispatch matches exhaustively on this enum, so an
//! unhandled case is a compile error rather than a silent fallthrough.
//!
//! Complex types are stored interleaved on the host side and as split
//! real/imaginary planes on the engine side; [`DType::component`] and
//! [`DType::to_complex`] move between a complex type and its component type.

use std::fmt;

/// Host element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Boolean, one byte per element
    Bool,

    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,

    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,

    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,

    /// Complex of two 32-bit floats
    Complex64,
    /// Complex of two 64-bit floats
    Complex128,
}

impl DType {
    /// Size in bytes of one element
    pub fn size(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Int32 | DType::UInt32 | DType::Float32 => 4,
            DType::Int64 | DType::UInt64 | DType::Float64 | DType::Complex64 => 8,
            DType::Complex128 => 16,
        }
    }

    /// Canonical name (e.g. "float64")
    pub fn name(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Complex64 => "complex64",
            DType::Complex128 => "complex128",
        }
    }

    /// Check if this is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DType::Int8
                | DType::Int16
                | DType::Int32
                | DType::Int64
                | DType::UInt8
                | DType::UInt16
                | DType::UInt32
                | DType::UInt64
        )
    }

    /// Check if this is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    /// Check if this is a complex type
    pub fn is_complex(&self) -> bool {
        matches!(self, DType::Complex64 | DType::Complex128)
    }

    /// Component type of a complex type; identity for everything else.
    ///
    /// `Complex128.component()` is `Float64`, matching the engine's split
    /// real/imaginary storage where each plane holds component elements.
    pub fn component(&self) -> DType {
        match self {
            DType::Complex64 => DType::Float32,
            DType::Complex128 => DType::Float64,
            other => *other,
        }
    }

    /// The complex type with this float type as component, if one exists.
    pub fn to_complex(&self) -> Option<DType> {
        match self {
            DType::Float32 => Some(DType::Complex64),
            DType::Float64 => Some(DType::Complex128),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DType::Bool.size(), 1);
        assert_eq!(DType::Int16.size(), 2);
        assert_eq!(DType::Float32.size(), 4);
        assert_eq!(DType::Float64.size(), 8);
        assert_eq!(DType::Complex64.size(), 8);
        assert_eq!(DType::Complex128.size(), 16);
    }

    #[test]
    fn test_kind_predicates() {
        assert!(DType::UInt32.is_integer());
        assert!(DType::Float64.is_float());
        assert!(DType::Complex128.is_complex());
        assert!(!DType::Bool.is_integer());
        assert!(!DType::Complex64.is_float());
    }

    #[test]
    fn test_complex_pairing() {
        assert_eq!(DType::Complex128.component(), DType::Float64);
        assert_eq!(DType::Complex64.component(), DType::Float32);
        assert_eq!(DType::Int32.component(), DType::Int32);
        assert_eq!(DType::Float64.to_complex(), Some(DType::Complex128));
        assert_eq!(DType::Int8.to_complex(), None);
        // Each plane of a complex array holds component-sized elements.
        assert_eq!(DType::Complex128.component().size() * 2, DType::Complex128.size());
    }
}
