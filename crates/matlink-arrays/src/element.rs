//! Scalar Element Trait
//!
//! Maps Rust scalar types onto [`DType`] and moves single elements in and
//! out of untyped byte buffers. Per-element copies through `from_ne_bytes`
//! keep the backing buffer free of alignment requirements.

use crate::dtype::DType;

/// A scalar type that can live in a [`NumericArray`](crate::NumericArray).
pub trait Element: Sized + Copy + PartialEq + std::fmt::Debug {
    /// The dtype tag for this scalar type
    fn dtype() -> DType;

    /// Read one element from the start of `bytes`.
    ///
    /// `bytes` must hold at least `Self::dtype().size()` bytes.
    fn from_bytes(bytes: &[u8]) -> Self;

    /// Append this element's native-endian bytes to `out`.
    fn write_bytes(&self, out: &mut Vec<u8>);
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $width:expr) => {
        impl Element for $ty {
            fn dtype() -> DType {
                $dtype
            }

            fn from_bytes(bytes: &[u8]) -> Self {
                let arr: [u8; $width] = bytes[..$width].try_into().unwrap();
                <$ty>::from_ne_bytes(arr)
            }

            fn write_bytes(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }
        }
    };
}

impl_element!(i8, DType::Int8, 1);
impl_element!(i16, DType::Int16, 2);
impl_element!(i32, DType::Int32, 4);
impl_element!(i64, DType::Int64, 8);
impl_element!(u8, DType::UInt8, 1);
impl_element!(u16, DType::UInt16, 2);
impl_element!(u32, DType::UInt32, 4);
impl_element!(u64, DType::UInt64, 8);
impl_element!(f32, DType::Float32, 4);
impl_element!(f64, DType::Float64, 8);

impl Element for bool {
    fn dtype() -> DType {
        DType::Bool
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

/// A complex scalar with interleaved real and imaginary components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Complex<T> {
    /// Real component
    pub re: T,
    /// Imaginary component
    pub im: T,
}

impl<T> Complex<T> {
    /// Create a complex value from its components
    pub fn new(re: T, im: T) -> Self {
        Self { re, im }
    }
}

impl Element for Complex<f32> {
    fn dtype() -> DType {
        DType::Complex64
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            re: f32::from_bytes(&bytes[..4]),
            im: f32::from_bytes(&bytes[4..8]),
        }
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        self.re.write_bytes(out);
        self.im.write_bytes(out);
    }
}

impl Element for Complex<f64> {
    fn dtype() -> DType {
        DType::Complex128
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            re: f64::from_bytes(&bytes[..8]),
            im: f64::from_bytes(&bytes[8..16]),
        }
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        self.re.write_bytes(out);
        self.im.write_bytes(out);
    }
}
