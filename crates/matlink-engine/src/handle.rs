//! Owned Engine Array Handle
//!
//! [`MxArray`] is a move-only wrapper around an engine-allocated array.
//! Whoever holds the wrapper holds the only reference; dropping it issues
//! the engine's destroy call exactly once. There is no way to touch a
//! destroyed handle, because destruction consumes the value.
//!
//! Two construction paths mirror the two directions of the boundary: [`wrap`]
//! for handles the engine returned (get path) and the `alloc_*` constructors
//! for handles the host builds before transferring them in (put path). The
//! put transfer copies, so the local handle is still destroyed afterwards.
//!
//! [`wrap`]: MxArray::wrap

use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::api::{MxApi, MxHandle};
use crate::class::ClassId;
use crate::error::{EngineError, EngineResult};

/// An owned engine-side array, destroyed on drop.
pub struct MxArray {
    mx: Arc<dyn MxApi>,
    ptr: NonNull<MxHandle>,
}

impl MxArray {
    /// Take ownership of a handle returned by the engine.
    ///
    /// Returns `None` for a null handle so callers decide what a null means
    /// in their context (missing variable, allocation failure).
    pub fn wrap(mx: Arc<dyn MxApi>, ptr: *mut MxHandle) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { mx, ptr })
    }

    /// Allocate a numeric or logical array with the given extents.
    pub fn alloc_numeric(
        mx: Arc<dyn MxApi>,
        dims: &[usize],
        class: ClassId,
        complex: bool,
    ) -> EngineResult<Self> {
        let ptr = mx.create_numeric(dims, class, complex);
        Self::wrap(mx, ptr).ok_or_else(|| EngineError::CreateFailed {
            what: format!("{} array of shape {:?}", class.name(), dims),
        })
    }

    /// Allocate a 1xN char array from text.
    pub fn alloc_string(mx: Arc<dyn MxApi>, text: &str) -> EngineResult<Self> {
        let c_text = CString::new(text).map_err(|_| EngineError::InvalidString {
            what: "string value".to_string(),
        })?;
        let ptr = mx.create_string(&c_text);
        Self::wrap(mx, ptr).ok_or_else(|| EngineError::CreateFailed {
            what: format!("char array of {} elements", text.len()),
        })
    }

    /// The raw handle, for passing to the engine's own calls
    pub fn as_ptr(&self) -> *mut MxHandle {
        self.ptr.as_ptr()
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.mx.num_dimensions(self.as_ptr())
    }

    /// Per-dimension extents
    pub fn dims(&self) -> Vec<usize> {
        self.mx.dimensions(self.as_ptr())
    }

    /// Total element count
    pub fn numel(&self) -> usize {
        self.mx.num_elements(self.as_ptr())
    }

    /// Bytes per element of one data plane
    pub fn element_size(&self) -> usize {
        self.mx.element_size(self.as_ptr())
    }

    /// Class name reported by the engine
    pub fn class_name(&self) -> String {
        self.mx.class_name(self.as_ptr())
    }

    /// Whether the engine classifies this array as numeric
    pub fn is_numeric(&self) -> bool {
        self.mx.is_numeric(self.as_ptr())
    }

    /// Whether the array carries an imaginary plane
    pub fn is_complex(&self) -> bool {
        self.mx.is_complex(self.as_ptr())
    }

    /// Copy the whole real plane out, `numel x element_size` bytes.
    pub fn read_real_plane(&self) -> EngineResult<Vec<u8>> {
        let mut buf = vec![0u8; self.numel() * self.element_size()];
        if !self.mx.read_real(self.as_ptr(), &mut buf) {
            return Err(EngineError::MissingData { plane: "real" });
        }
        Ok(buf)
    }

    /// Copy the whole imaginary plane out, `numel x element_size` bytes.
    pub fn read_imag_plane(&self) -> EngineResult<Vec<u8>> {
        let mut buf = vec![0u8; self.numel() * self.element_size()];
        if !self.mx.read_imag(self.as_ptr(), &mut buf) {
            return Err(EngineError::MissingData { plane: "imaginary" });
        }
        Ok(buf)
    }

    /// Copy `src` into the real plane. `src` must be exactly
    /// `numel x element_size` bytes.
    pub fn write_real_plane(&mut self, src: &[u8]) -> EngineResult<()> {
        if !self.mx.write_real(self.as_ptr(), src) {
            return Err(EngineError::MissingData { plane: "real" });
        }
        Ok(())
    }

    /// Copy `src` into the imaginary plane. `src` must be exactly
    /// `numel x element_size` bytes.
    pub fn write_imag_plane(&mut self, src: &[u8]) -> EngineResult<()> {
        if !self.mx.write_imag(self.as_ptr(), src) {
            return Err(EngineError::MissingData { plane: "imaginary" });
        }
        Ok(())
    }

    /// Extract a char array's text, reserving one byte past the element
    /// count for the terminator.
    pub fn read_string(&self) -> Option<String> {
        self.mx.read_string(self.as_ptr(), self.numel() + 1)
    }
}

impl Drop for MxArray {
    fn drop(&mut self) {
        self.mx.destroy(self.ptr.as_ptr());
    }
}

impl std::fmt::Debug for MxArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MxArray")
            .field("class", &self.class_name())
            .field("dims", &self.dims())
            .field("complex", &self.is_complex())
            .finish()
    }
}
