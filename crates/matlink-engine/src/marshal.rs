//! Host Value <-> Engine Handle Marshalling
//!
//! Encode turns a [`Value`] into a freshly allocated [`MxArray`]; decode
//! consumes an [`MxArray`] and produces a [`Value`]. The engine stores
//! elements in column-major order with complex data split into separate
//! real and imaginary planes; the host stores row-major with complex
//! components interleaved. Both conversions go through one gather/scatter
//! pair driven by an odometer over the dimension vector, so the element
//! permutation is written exactly once.
//!
//! Ownership: encode hands the new handle to the caller; decode destroys
//! the handle it consumed on every path, success or failure.

use std::sync::Arc;

use tracing::trace;

use matlink_arrays::{NumericArray, Value};

use crate::api::MxApi;
use crate::class::{class_id, dtype_for_class};
use crate::error::{EngineError, EngineResult};
use crate::handle::MxArray;

/// Gather elements of a row-major buffer into a column-major plane.
///
/// Walks the destination in column-major order (first index fastest) and
/// pulls `width` bytes per element from the row-major source, reading at
/// byte `offset` inside each source element of `stride` bytes. With
/// `offset == 0` and `width == stride` this is a plain order conversion;
/// with a half-element width it extracts one component of an interleaved
/// complex buffer.
fn gather_col_major(
    src: &[u8],
    shape: &[usize],
    stride: usize,
    offset: usize,
    width: usize,
) -> Vec<u8> {
    let numel: usize = shape.iter().product();
    let mut dst = vec![0u8; numel * width];
    let mut index = vec![0usize; shape.len()];

    for slot in 0..numel {
        let row_linear = row_major_linear(&index, shape);
        let src_at = row_linear * stride + offset;
        dst[slot * width..(slot + 1) * width].copy_from_slice(&src[src_at..src_at + width]);
        advance_first_fastest(&mut index, shape);
    }
    dst
}

/// Scatter a column-major plane into a row-major buffer.
///
/// The inverse of [`gather_col_major`]: walks the source plane in
/// column-major order and writes each element's `width` bytes at byte
/// `offset` inside the corresponding row-major destination element.
fn scatter_row_major(
    plane: &[u8],
    shape: &[usize],
    dst: &mut [u8],
    stride: usize,
    offset: usize,
    width: usize,
) {
    let numel: usize = shape.iter().product();
    let mut index = vec![0usize; shape.len()];

    for slot in 0..numel {
        let row_linear = row_major_linear(&index, shape);
        let dst_at = row_linear * stride + offset;
        dst[dst_at..dst_at + width].copy_from_slice(&plane[slot * width..(slot + 1) * width]);
        advance_first_fastest(&mut index, shape);
    }
}

/// Row-major linear position of a multi-index: last index varies fastest.
fn row_major_linear(index: &[usize], shape: &[usize]) -> usize {
    let mut linear = 0;
    for (i, extent) in index.iter().zip(shape.iter()) {
        linear = linear * extent + i;
    }
    linear
}

/// Step a multi-index in column-major order: first index varies fastest.
fn advance_first_fastest(index: &mut [usize], shape: &[usize]) {
    for (i, extent) in index.iter_mut().zip(shape.iter()) {
        *i += 1;
        if *i < *extent {
            return;
        }
        *i = 0;
    }
}

/// Encode a host value into a freshly allocated engine handle.
///
/// The caller owns the returned handle and must let it drop (or transfer it
/// with a put call and then let it drop).
pub fn encode(mx: &Arc<dyn MxApi>, value: &Value) -> EngineResult<MxArray> {
    match value {
        Value::Str(text) => MxArray::alloc_string(Arc::clone(mx), text),

        // No structured encoding crosses this boundary.
        Value::Struct(_) => Err(EngineError::unsupported_type("struct")),

        Value::Array(array) => {
            // The engine has no bare scalars or bare vectors; pad to 2-D.
            let array = array.clone().with_min_dims(2);
            let dtype = array.dtype();
            let complex = dtype.is_complex();
            let width = dtype.component().size();

            let mut handle = MxArray::alloc_numeric(
                Arc::clone(mx),
                array.shape(),
                class_id(dtype),
                complex,
            )?;
            trace!(dtype = %dtype, shape = ?array.shape(), complex, "encoding array");

            let real = gather_col_major(array.bytes(), array.shape(), dtype.size(), 0, width);
            handle.write_real_plane(&real)?;

            if complex {
                let imag =
                    gather_col_major(array.bytes(), array.shape(), dtype.size(), width, width);
                handle.write_imag_plane(&imag)?;
            }

            Ok(handle)
        }
    }
}

/// Decode an engine handle into a host value, consuming and destroying it.
pub fn decode(handle: MxArray) -> EngineResult<Value> {
    let class = handle.class_name();
    let dims = handle.dims();
    trace!(%class, ?dims, complex = handle.is_complex(), "decoding handle");

    if handle.is_numeric() {
        decode_numeric(&handle, &class, dims)
    } else if class == "char" {
        let text = handle.read_string().ok_or(EngineError::StringExtraction {
            numel: handle.numel(),
        })?;
        Ok(Value::Str(text))
    } else if class == "logical" {
        decode_logical(&handle, dims)
    } else {
        Err(EngineError::unsupported_class(class))
    }
}

fn decode_numeric(handle: &MxArray, class: &str, dims: Vec<usize>) -> EngineResult<Value> {
    let component =
        dtype_for_class(class).ok_or_else(|| EngineError::unsupported_class(class))?;

    let element_size = handle.element_size();
    if element_size != component.size() {
        return Err(EngineError::GeometryMismatch {
            class: class.to_string(),
            element_size,
            expected: component.size(),
        });
    }

    let dtype = if handle.is_complex() {
        component
            .to_complex()
            .ok_or_else(|| EngineError::unsupported_class(format!("complex {class}")))?
    } else {
        component
    };

    let width = component.size();
    let mut data = vec![0u8; handle.numel() * dtype.size()];

    let real = handle.read_real_plane()?;
    scatter_row_major(&real, &dims, &mut data, dtype.size(), 0, width);

    if dtype.is_complex() {
        let imag = handle.read_imag_plane()?;
        scatter_row_major(&imag, &dims, &mut data, dtype.size(), width, width);
    }

    let array = NumericArray::from_bytes(data, dims, dtype)?.squeeze();
    Ok(Value::Array(array))
}

fn decode_logical(handle: &MxArray, dims: Vec<usize>) -> EngineResult<Value> {
    let element_size = handle.element_size();
    let plane = handle.read_real_plane()?;

    // Logical elements are one byte; tolerate wider layouts by collapsing
    // each element to its canonical truth value.
    let bytes: Vec<u8> = plane
        .chunks_exact(element_size.max(1))
        .map(|chunk| u8::from(chunk.iter().any(|&b| b != 0)))
        .collect();

    let mut data = vec![0u8; bytes.len()];
    scatter_row_major(&bytes, &dims, &mut data, 1, 0, 1);

    let array = NumericArray::from_bytes(data, dims, matlink_arrays::DType::Bool)?.squeeze();
    Ok(Value::Array(array))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_major_linear() {
        // 2x3: row-major walks a row at a time.
        assert_eq!(row_major_linear(&[0, 0], &[2, 3]), 0);
        assert_eq!(row_major_linear(&[0, 2], &[2, 3]), 2);
        assert_eq!(row_major_linear(&[1, 0], &[2, 3]), 3);
        assert_eq!(row_major_linear(&[1, 2], &[2, 3]), 5);
    }

    #[test]
    fn test_gather_transposes_2x3() {
        // Row-major [[1,2,3],[4,5,6]]; column-major order is 1,4,2,5,3,6.
        let src = [1u8, 2, 3, 4, 5, 6];
        let out = gather_col_major(&src, &[2, 3], 1, 0, 1);
        assert_eq!(out, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_scatter_inverts_gather() {
        let src = [10u8, 20, 30, 40, 50, 60, 70, 80, 90, 100, 110, 120];
        let shape = [2, 3, 2];
        let col = gather_col_major(&src, &shape, 1, 0, 1);
        let mut back = vec![0u8; src.len()];
        scatter_row_major(&col, &shape, &mut back, 1, 0, 1);
        assert_eq!(back, src.to_vec());
    }

    #[test]
    fn test_gather_extracts_interleaved_component() {
        // Two interleaved (re, im) byte pairs: (1,2) and (3,4).
        let src = [1u8, 2, 3, 4];
        let re = gather_col_major(&src, &[2, 1], 2, 0, 1);
        let im = gather_col_major(&src, &[2, 1], 2, 1, 1);
        assert_eq!(re, vec![1, 3]);
        assert_eq!(im, vec![2, 4]);
    }

    #[test]
    fn test_gather_scalar_shape() {
        let src = [7u8, 8];
        let out = gather_col_major(&src, &[], 2, 0, 2);
        assert_eq!(out, vec![7, 8]);
    }

    #[test]
    fn test_multibyte_elements_move_whole() {
        // 2x2 of u16-sized elements, values distinguishable per byte.
        let src = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let out = gather_col_major(&src, &[2, 2], 2, 0, 2);
        // Column-major element order: (0,0) (1,0) (0,1) (1,1).
        assert_eq!(out, vec![0, 1, 4, 5, 2, 3, 6, 7]);
    }

    #[test]
    fn test_encode_writes_column_major_plane() {
        use crate::mock::MockEngine;

        let mock = MockEngine::new();
        let mx: Arc<dyn MxApi> = mock.clone();

        // Row-major [[1,2,3],[4,5,6]].
        let value = Value::from_vec(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let handle = encode(&mx, &value).unwrap();

        let plane = handle.read_real_plane().unwrap();
        let elems: Vec<f64> = plane
            .chunks_exact(8)
            .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
            .collect();
        // The engine plane walks columns first: 1,4 | 2,5 | 3,6.
        assert_eq!(elems, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_encode_splits_complex_planes() {
        use crate::mock::MockEngine;
        use matlink_arrays::Complex;

        let mock = MockEngine::new();
        let mx: Arc<dyn MxApi> = mock.clone();

        let value = Value::from_vec(
            &[Complex::new(1.0f64, 10.0), Complex::new(2.0, 20.0)],
            vec![2],
        )
        .unwrap();
        let handle = encode(&mx, &value).unwrap();

        let read = |plane: Vec<u8>| -> Vec<f64> {
            plane
                .chunks_exact(8)
                .map(|c| f64::from_ne_bytes(c.try_into().unwrap()))
                .collect()
        };
        assert_eq!(read(handle.read_real_plane().unwrap()), vec![1.0, 2.0]);
        assert_eq!(read(handle.read_imag_plane().unwrap()), vec![10.0, 20.0]);
    }

    #[test]
    fn test_decode_destroys_handle_on_rejection() {
        use crate::class::ClassId;
        use crate::mock::MockEngine;

        let mock = MockEngine::new();
        let mx: Arc<dyn MxApi> = mock.clone();

        let ptr = mx.create_numeric(&[1, 1], ClassId::Struct, false);
        let handle = MxArray::wrap(Arc::clone(&mx), ptr).unwrap();

        let err = decode(handle).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(mock.live_handles(), 0);
    }
}
