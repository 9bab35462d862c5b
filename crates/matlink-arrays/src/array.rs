//! Owned Multidimensional Host Array
//!
//! [`NumericArray`] is the host-side value that crosses the engine boundary:
//! a dtype tag, a shape vector, and an owned, C-order (row-major) contiguous
//! byte buffer. The engine boundary always copies, so there are no views,
//! strides, or borrowed buffers here.
//!
//! ## Shape Rules
//!
//! - A zero-dimensional array (`shape == []`) is a scalar with one element.
//! - [`NumericArray::squeeze`] drops every unit extent; neither squeezing nor
//!   [`NumericArray::with_min_dims`] touches the byte buffer, since adding or
//!   removing unit dimensions never changes linear element order.

use std::fmt;

use crate::dtype::DType;
use crate::element::Element;
use crate::error::{ArrayError, ArrayResult};

/// An owned, contiguous, row-major array of one of the supported dtypes.
#[derive(Clone, PartialEq)]
pub struct NumericArray {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NumericArray {
    /// Create a zero-filled array
    pub fn zeros(shape: Vec<usize>, dtype: DType) -> Self {
        let numel: usize = shape.iter().product();
        Self {
            dtype,
            shape,
            data: vec![0; numel * dtype.size()],
        }
    }

    /// Create an array from typed elements in row-major order.
    ///
    /// Fails if the element count does not fill `shape` exactly.
    pub fn from_vec<T: Element>(values: &[T], shape: Vec<usize>) -> ArrayResult<Self> {
        let expected: usize = shape.iter().product();
        if values.len() != expected {
            return Err(ArrayError::shape_mismatch(values.len(), &shape));
        }

        let dtype = T::dtype();
        let mut data = Vec::with_capacity(values.len() * dtype.size());
        for v in values {
            v.write_bytes(&mut data);
        }

        Ok(Self { dtype, shape, data })
    }

    /// Create a zero-dimensional array holding a single value
    pub fn scalar<T: Element>(value: T) -> Self {
        let mut data = Vec::with_capacity(T::dtype().size());
        value.write_bytes(&mut data);
        Self {
            dtype: T::dtype(),
            shape: Vec::new(),
            data,
        }
    }

    /// Rebuild an array from raw parts.
    ///
    /// The buffer must hold exactly `shape.product() * dtype.size()` bytes of
    /// row-major element data.
    pub fn from_bytes(data: Vec<u8>, shape: Vec<usize>, dtype: DType) -> ArrayResult<Self> {
        let numel: usize = shape.iter().product();
        if data.len() != numel * dtype.size() {
            return Err(ArrayError::ShapeMismatch {
                count: data.len() / dtype.size().max(1),
                shape: shape.clone(),
                expected: numel,
            });
        }
        Ok(Self { dtype, shape, data })
    }

    /// Element type
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Shape extents
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Total buffer size in bytes
    pub fn nbytes(&self) -> usize {
        self.data.len()
    }

    /// Raw row-major element bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Read the elements back as a typed vector in row-major order
    pub fn to_vec<T: Element>(&self) -> ArrayResult<Vec<T>> {
        if T::dtype() != self.dtype {
            return Err(ArrayError::dtype_mismatch(self.dtype.name(), T::dtype().name()));
        }
        let width = self.dtype.size();
        Ok(self
            .data
            .chunks_exact(width)
            .map(|chunk| T::from_bytes(chunk))
            .collect())
    }

    /// Read back a single-element array as a scalar
    pub fn to_scalar<T: Element>(&self) -> ArrayResult<T> {
        if self.numel() != 1 {
            return Err(ArrayError::NotScalar { count: self.numel() });
        }
        Ok(self.to_vec::<T>()?[0])
    }

    /// Remove every unit-length dimension from the shape.
    ///
    /// A 1x5 array becomes a 5-vector; a 1x1 array becomes a scalar
    /// (`shape == []`). The buffer is untouched.
    pub fn squeeze(mut self) -> Self {
        self.shape.retain(|&extent| extent != 1);
        self
    }

    /// Prepend unit dimensions until the array has at least `ndim` dimensions.
    ///
    /// Matches the engine convention that nothing is a bare scalar: a scalar
    /// padded to 2 dims is a 1x1 array, a 5-vector becomes 1x5.
    pub fn with_min_dims(mut self, ndim: usize) -> Self {
        while self.shape.len() < ndim {
            self.shape.insert(0, 1);
        }
        self
    }
}

impl fmt::Debug for NumericArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericArray")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("numel", &self.numel())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Complex;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_vec_and_back() {
        let a = NumericArray::from_vec(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        assert_eq!(a.dtype(), DType::Float64);
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a.numel(), 6);
        assert_eq!(a.nbytes(), 48);
        assert_eq!(a.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = NumericArray::from_vec(&[1i32, 2, 3], vec![2, 2]).unwrap_err();
        assert_eq!(
            err,
            ArrayError::ShapeMismatch {
                count: 3,
                shape: vec![2, 2],
                expected: 4
            }
        );
    }

    #[test]
    fn test_typed_readback_guards_dtype() {
        let a = NumericArray::from_vec(&[1i32, 2], vec![2]).unwrap();
        let err = a.to_vec::<f64>().unwrap_err();
        assert_eq!(err, ArrayError::dtype_mismatch("int32", "float64"));
    }

    #[test]
    fn test_scalar() {
        let a = NumericArray::scalar(4.25f64);
        assert_eq!(a.shape(), &[] as &[usize]);
        assert_eq!(a.numel(), 1);
        assert_eq!(a.to_scalar::<f64>().unwrap(), 4.25);

        let v = NumericArray::from_vec(&[1u8, 2], vec![2]).unwrap();
        assert!(matches!(
            v.to_scalar::<u8>(),
            Err(ArrayError::NotScalar { count: 2 })
        ));
    }

    #[test]
    fn test_squeeze() {
        let a = NumericArray::zeros(vec![1, 5, 1], DType::Int16).squeeze();
        assert_eq!(a.shape(), &[5]);

        let s = NumericArray::zeros(vec![1, 1], DType::Float32).squeeze();
        assert_eq!(s.shape(), &[] as &[usize]);
        assert_eq!(s.numel(), 1);
    }

    #[test]
    fn test_with_min_dims() {
        let a = NumericArray::from_vec(&[1.0f32, 2.0, 3.0], vec![3]).unwrap().with_min_dims(2);
        assert_eq!(a.shape(), &[1, 3]);
        // Prepending unit dims leaves the linear order alone.
        assert_eq!(a.to_vec::<f32>().unwrap(), vec![1.0, 2.0, 3.0]);

        let s = NumericArray::scalar(true).with_min_dims(2);
        assert_eq!(s.shape(), &[1, 1]);
    }

    #[test]
    fn test_complex_storage() {
        let a = NumericArray::from_vec(
            &[Complex::new(1.0f64, -1.0), Complex::new(2.0, -2.0)],
            vec![2],
        )
        .unwrap();
        assert_eq!(a.dtype(), DType::Complex128);
        assert_eq!(a.nbytes(), 32);
        assert_eq!(a.to_vec::<Complex<f64>>().unwrap()[1], Complex::new(2.0, -2.0));
    }
}
