//! Host Value Representation
//!
//! [`Value`] is what callers put into and get out of the engine workspace:
//! a numeric/logical array, a piece of text, or a struct-like associative
//! value. Struct values exist so the encode path can reject them loudly;
//! the engine boundary supports no structured encoding.

use std::fmt;

use indexmap::IndexMap;

use crate::array::NumericArray;
use crate::element::Element;
use crate::error::ArrayResult;

/// A host value exchanged with the engine workspace.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Numeric, complex, or logical array
    Array(NumericArray),
    /// Text
    Str(String),
    /// Struct-like associative value; never encodable
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Array(_) => "array",
            Value::Str(_) => "str",
            Value::Struct(_) => "struct",
        }
    }

    /// Borrow the array, if this is one
    pub fn as_array(&self) -> Option<&NumericArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Borrow the text, if this is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Read a one-element array back as a typed scalar
    pub fn as_scalar<T: Element>(&self) -> Option<T> {
        self.as_array().and_then(|a| a.to_scalar::<T>().ok())
    }

    /// Build an array value from typed row-major elements
    pub fn from_vec<T: Element>(values: &[T], shape: Vec<usize>) -> ArrayResult<Self> {
        Ok(Value::Array(NumericArray::from_vec(values, shape)?))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Array(a) => write!(f, "{:?} array of shape {:?}", a.dtype(), a.shape()),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Struct(m) => write!(f, "struct with {} fields", m.len()),
        }
    }
}

impl From<NumericArray> for Value {
    fn from(a: NumericArray) -> Self {
        Value::Array(a)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

macro_rules! impl_scalar_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Array(NumericArray::scalar(v))
                }
            }
        )*
    };
}

impl_scalar_from!(
    i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool,
    crate::element::Complex<f32>, crate::element::Complex<f64>,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_scalar_conversion() {
        let v = Value::from(3.5f64);
        let a = v.as_array().unwrap();
        assert_eq!(a.dtype(), DType::Float64);
        assert_eq!(a.shape(), &[] as &[usize]);
        assert_eq!(v.as_scalar::<f64>(), Some(3.5));
    }

    #[test]
    fn test_text_conversion() {
        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.kind(), "str");
        assert!(v.as_array().is_none());
    }

    #[test]
    fn test_struct_kind() {
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), Value::from(1.0f64));
        let v = Value::Struct(fields);
        assert_eq!(v.kind(), "struct");
        assert_eq!(v.as_scalar::<f64>(), None);
    }
}
