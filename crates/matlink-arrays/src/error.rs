//! Error Types for the Host Array Model
//!
//! Shape and element-type failures raised while building or reading back
//! host arrays. Engine-boundary failures live in `matlink-engine`.

use thiserror::Error;

/// Result type for host array operations
pub type ArrayResult<T> = Result<T, ArrayError>;

/// Host array error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArrayError {
    /// Element count does not match the product of the shape extents
    #[error("shape mismatch: {count} elements cannot fill shape {shape:?} ({expected} slots)")]
    ShapeMismatch {
        /// Number of elements provided
        count: usize,
        /// Requested shape
        shape: Vec<usize>,
        /// Product of the shape extents
        expected: usize,
    },

    /// Typed access with the wrong element type
    #[error("dtype mismatch: array holds {actual}, requested {requested}")]
    DTypeMismatch {
        /// The array's element type
        actual: &'static str,
        /// The element type the caller asked for
        requested: &'static str,
    },

    /// Scalar readback of an array with more than one element
    #[error("not a scalar: array has {count} elements")]
    NotScalar {
        /// Number of elements in the array
        count: usize,
    },
}

impl ArrayError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(count: usize, shape: &[usize]) -> Self {
        ArrayError::ShapeMismatch {
            count,
            shape: shape.to_vec(),
            expected: shape.iter().product(),
        }
    }

    /// Create a dtype mismatch error
    pub fn dtype_mismatch(actual: &'static str, requested: &'static str) -> Self {
        ArrayError::DTypeMismatch { actual, requested }
    }
}
