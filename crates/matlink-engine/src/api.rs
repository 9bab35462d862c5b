//! Typed Binding Surface for the Engine C API
//!
//! Every native entry point the bridge uses is declared here exactly once,
//! with fixed Rust types. Implementations are the dynamic loader in
//! [`library`](crate::library) and the in-process test double in
//! [`mock`](crate::mock); everything above this layer is implementation
//! agnostic.
//!
//! ## Conventions
//!
//! - Handles are raw pointers to opaque marker types. Null is meaningful
//!   (open failure, missing variable, allocation failure) and is checked by
//!   the caller, never inside an implementation.
//! - Buffer access copies through byte slices, so `unsafe` stays inside
//!   implementations.
//! - Status-code returns follow the C API: zero is success for eval/put/
//!   close; buffer reads/writes return `true` on success.

use std::ffi::CStr;
use std::sync::Arc;

use libc::c_char;

use crate::class::ClassId;

/// Opaque engine connection, allocated and owned by the engine library.
#[repr(C)]
pub struct EngHandle {
    _opaque: [u8; 0],
}

/// Opaque engine-side array, allocated and owned by the engine library.
#[repr(C)]
pub struct MxHandle {
    _opaque: [u8; 0],
}

/// Engine process control entry points (the `eng*` family).
pub trait EngApi {
    /// Launch or attach to an engine process with the given command line.
    /// Null means the engine could not be started.
    fn open(&self, command: &CStr) -> *mut EngHandle;

    /// Close the connection. Zero on success.
    fn close(&self, ep: *mut EngHandle) -> i32;

    /// Execute a script in the engine workspace. The return code signals
    /// protocol-level failure only, not script errors.
    fn eval_string(&self, ep: *mut EngHandle, script: &CStr) -> i32;

    /// Copy a workspace variable out of the engine. Null means the variable
    /// does not exist. The caller owns the returned handle.
    fn get_variable(&self, ep: *mut EngHandle, name: &CStr) -> *mut MxHandle;

    /// Copy an array into the named workspace variable. Zero on success.
    /// The engine copies; the caller keeps ownership of `pm`.
    fn put_variable(&self, ep: *mut EngHandle, name: &CStr, pm: *mut MxHandle) -> i32;

    /// Register a caller-owned capture buffer for engine output. The engine
    /// writes at most `capacity` bytes plus a NUL terminator. The buffer
    /// must outlive the connection or be re-registered.
    fn output_buffer(&self, ep: *mut EngHandle, buffer: *mut c_char, capacity: i32) -> i32;
}

/// Array handle entry points (the `mx*` family).
pub trait MxApi {
    /// Allocate a numeric (or logical) array with the given extents.
    /// Null means allocation failed. The caller owns the handle.
    fn create_numeric(&self, dims: &[usize], class: ClassId, complex: bool) -> *mut MxHandle;

    /// Allocate a 1xN char array from text. Null means allocation failed.
    fn create_string(&self, text: &CStr) -> *mut MxHandle;

    /// Release an engine-allocated array. Exactly once per handle.
    fn destroy(&self, pm: *mut MxHandle);

    /// Number of dimensions (always at least 2 for engine arrays)
    fn num_dimensions(&self, pm: *mut MxHandle) -> usize;

    /// Per-dimension extents, `num_dimensions` long
    fn dimensions(&self, pm: *mut MxHandle) -> Vec<usize>;

    /// Total element count (product of the extents)
    fn num_elements(&self, pm: *mut MxHandle) -> usize;

    /// Size in bytes of one element of the real or imaginary plane
    fn element_size(&self, pm: *mut MxHandle) -> usize;

    /// Class name tag, e.g. "double", "char", "logical"
    fn class_name(&self, pm: *mut MxHandle) -> String;

    /// Whether the handle holds a numeric class
    fn is_numeric(&self, pm: *mut MxHandle) -> bool;

    /// Whether the handle carries an imaginary plane
    fn is_complex(&self, pm: *mut MxHandle) -> bool;

    /// Extract a char array as text, reading at most `capacity` bytes
    /// including the terminator. None if the handle is not a char array or
    /// the text did not fit.
    fn read_string(&self, pm: *mut MxHandle, capacity: usize) -> Option<String>;

    /// Copy the real plane into `dst`. False if the handle has no data.
    fn read_real(&self, pm: *mut MxHandle, dst: &mut [u8]) -> bool;

    /// Copy the imaginary plane into `dst`. False if the handle has none.
    fn read_imag(&self, pm: *mut MxHandle, dst: &mut [u8]) -> bool;

    /// Copy `src` over the real plane. False if the handle has no data.
    fn write_real(&self, pm: *mut MxHandle, src: &[u8]) -> bool;

    /// Copy `src` over the imaginary plane. False if the handle has none.
    fn write_imag(&self, pm: *mut MxHandle, src: &[u8]) -> bool;
}

/// The pair of library bindings a session runs against.
///
/// Cloning shares the underlying implementations; a loaded library is
/// resolved once and reused by every session and handle.
#[derive(Clone)]
pub struct EngineApi {
    /// Engine process control
    pub eng: Arc<dyn EngApi>,
    /// Array handle operations
    pub mx: Arc<dyn MxApi>,
}

impl EngineApi {
    /// Bundle the two bindings
    pub fn new(eng: Arc<dyn EngApi>, mx: Arc<dyn MxApi>) -> Self {
        Self { eng, mx }
    }
}
