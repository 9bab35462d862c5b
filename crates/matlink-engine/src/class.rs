//! Engine Class Codes
//!
//! The engine tags every array handle with a numeric class code and a class
//! name. This module is the total, bidirectional map between those codes and
//! the host [`DType`] enumeration. Both directions are exhaustive matches
//! over closed enums; an unhandled case is a compile error, not a silent
//! fallthrough.
//!
//! Complex arrays carry the class code of their *component* type plus a
//! separate complexity flag, matching the engine's split-plane storage.

use matlink_arrays::DType;

/// Engine array class codes, as published by the engine's C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ClassId {
    /// Cell array; never marshalled
    Cell = 1,
    /// Struct array; never marshalled
    Struct = 2,
    /// Logical (boolean) array
    Logical = 3,
    /// Character array
    Char = 4,
    /// Double-precision float
    Double = 6,
    /// Single-precision float
    Single = 7,
    /// Signed 8-bit integer
    Int8 = 8,
    /// Unsigned 8-bit integer
    UInt8 = 9,
    /// Signed 16-bit integer
    Int16 = 10,
    /// Unsigned 16-bit integer
    UInt16 = 11,
    /// Signed 32-bit integer
    Int32 = 12,
    /// Unsigned 32-bit integer
    UInt32 = 13,
    /// Signed 64-bit integer
    Int64 = 14,
    /// Unsigned 64-bit integer
    UInt64 = 15,
}

impl ClassId {
    /// The class name the engine reports for this code
    pub fn name(&self) -> &'static str {
        match self {
            ClassId::Cell => "cell",
            ClassId::Struct => "struct",
            ClassId::Logical => "logical",
            ClassId::Char => "char",
            ClassId::Double => "double",
            ClassId::Single => "single",
            ClassId::Int8 => "int8",
            ClassId::UInt8 => "uint8",
            ClassId::Int16 => "int16",
            ClassId::UInt16 => "uint16",
            ClassId::Int32 => "int32",
            ClassId::UInt32 => "uint32",
            ClassId::Int64 => "int64",
            ClassId::UInt64 => "uint64",
        }
    }

    /// Parse a class from the name the engine reports
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cell" => Some(ClassId::Cell),
            "struct" => Some(ClassId::Struct),
            "logical" => Some(ClassId::Logical),
            "char" => Some(ClassId::Char),
            "double" => Some(ClassId::Double),
            "single" => Some(ClassId::Single),
            "int8" => Some(ClassId::Int8),
            "uint8" => Some(ClassId::UInt8),
            "int16" => Some(ClassId::Int16),
            "uint16" => Some(ClassId::UInt16),
            "int32" => Some(ClassId::Int32),
            "uint32" => Some(ClassId::UInt32),
            "int64" => Some(ClassId::Int64),
            "uint64" => Some(ClassId::UInt64),
            _ => None,
        }
    }

    /// The raw class code passed to the engine's create calls
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Engine class code for a host dtype.
///
/// Complex dtypes map through their component class; the complexity flag
/// travels separately. Total over the closed [`DType`] set.
pub fn class_id(dtype: DType) -> ClassId {
    match dtype {
        DType::Bool => ClassId::Logical,
        DType::Int8 => ClassId::Int8,
        DType::Int16 => ClassId::Int16,
        DType::Int32 => ClassId::Int32,
        DType::Int64 => ClassId::Int64,
        DType::UInt8 => ClassId::UInt8,
        DType::UInt16 => ClassId::UInt16,
        DType::UInt32 => ClassId::UInt32,
        DType::UInt64 => ClassId::UInt64,
        DType::Float32 | DType::Complex64 => ClassId::Single,
        DType::Float64 | DType::Complex128 => ClassId::Double,
    }
}

/// Host dtype for a numeric or logical class name reported by the engine.
///
/// "char" has a dedicated decode path and is not mapped here; unknown names
/// return `None` and the caller rejects the class.
pub fn dtype_for_class(name: &str) -> Option<DType> {
    match ClassId::from_name(name)? {
        ClassId::Logical => Some(DType::Bool),
        ClassId::Cell | ClassId::Struct | ClassId::Char => None,
        ClassId::Double => Some(DType::Float64),
        ClassId::Single => Some(DType::Float32),
        ClassId::Int8 => Some(DType::Int8),
        ClassId::UInt8 => Some(DType::UInt8),
        ClassId::Int16 => Some(DType::Int16),
        ClassId::UInt16 => Some(DType::UInt16),
        ClassId::Int32 => Some(DType::Int32),
        ClassId::UInt32 => Some(DType::UInt32),
        ClassId::Int64 => Some(DType::Int64),
        ClassId::UInt64 => Some(DType::UInt64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_engine_constants() {
        assert_eq!(ClassId::Cell.code(), 1);
        assert_eq!(ClassId::Struct.code(), 2);
        assert_eq!(ClassId::Logical.code(), 3);
        assert_eq!(ClassId::Char.code(), 4);
        assert_eq!(ClassId::Double.code(), 6);
        assert_eq!(ClassId::Single.code(), 7);
        assert_eq!(ClassId::Int8.code(), 8);
        assert_eq!(ClassId::UInt64.code(), 15);
    }

    #[test]
    fn test_name_roundtrip() {
        for class in [
            ClassId::Cell,
            ClassId::Struct,
            ClassId::Logical,
            ClassId::Char,
            ClassId::Double,
            ClassId::Single,
            ClassId::Int8,
            ClassId::UInt8,
            ClassId::Int16,
            ClassId::UInt16,
            ClassId::Int32,
            ClassId::UInt32,
            ClassId::Int64,
            ClassId::UInt64,
        ] {
            assert_eq!(ClassId::from_name(class.name()), Some(class));
        }
        assert_eq!(ClassId::from_name("function_handle"), None);
    }

    #[test]
    fn test_dtype_to_class() {
        assert_eq!(class_id(DType::Float64), ClassId::Double);
        assert_eq!(class_id(DType::Complex128), ClassId::Double);
        assert_eq!(class_id(DType::Complex64), ClassId::Single);
        assert_eq!(class_id(DType::Bool), ClassId::Logical);
        assert_eq!(class_id(DType::UInt16), ClassId::UInt16);
    }

    #[test]
    fn test_class_to_dtype() {
        assert_eq!(dtype_for_class("double"), Some(DType::Float64));
        assert_eq!(dtype_for_class("single"), Some(DType::Float32));
        assert_eq!(dtype_for_class("logical"), Some(DType::Bool));
        assert_eq!(dtype_for_class("char"), None);
        assert_eq!(dtype_for_class("cell"), None);
        assert_eq!(dtype_for_class("struct"), None);
    }
}
