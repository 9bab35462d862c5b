//! Dynamic Loading of the Engine Libraries
//!
//! [`MatlabRuntime`] loads `libeng` and `libmx` from an installation root,
//! resolves every entry point once into typed function pointers, and
//! implements the [`EngApi`]/[`MxApi`] binding surface over them. Resolving
//! up front means a missing or mistyped symbol fails at load, not in the
//! middle of a marshalling call.
//!
//! Installation discovery itself (finding the root) is the caller's
//! problem; this module only turns a root into a loaded runtime and a
//! launch command.

use std::ffi::CStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libc::{c_char, c_int, c_void, size_t};
use libloading::Library;
use tracing::debug;

use crate::api::{EngApi, EngHandle, EngineApi, MxApi, MxHandle};
use crate::class::ClassId;
use crate::error::{EngineError, EngineResult};

// Engine process control (libeng)
type EngOpenFn = unsafe extern "C" fn(*const c_char) -> *mut EngHandle;
type EngCloseFn = unsafe extern "C" fn(*mut EngHandle) -> c_int;
type EngEvalStringFn = unsafe extern "C" fn(*mut EngHandle, *const c_char) -> c_int;
type EngGetVariableFn = unsafe extern "C" fn(*mut EngHandle, *const c_char) -> *mut MxHandle;
type EngPutVariableFn =
    unsafe extern "C" fn(*mut EngHandle, *const c_char, *mut MxHandle) -> c_int;
type EngOutputBufferFn = unsafe extern "C" fn(*mut EngHandle, *mut c_char, c_int) -> c_int;

// Array handles (libmx)
type MxGetNumberOfDimensionsFn = unsafe extern "C" fn(*mut MxHandle) -> size_t;
type MxGetDimensionsFn = unsafe extern "C" fn(*mut MxHandle) -> *const size_t;
type MxGetNumberOfElementsFn = unsafe extern "C" fn(*mut MxHandle) -> size_t;
type MxGetElementSizeFn = unsafe extern "C" fn(*mut MxHandle) -> size_t;
type MxGetClassNameFn = unsafe extern "C" fn(*mut MxHandle) -> *const c_char;
type MxIsNumericFn = unsafe extern "C" fn(*mut MxHandle) -> bool;
type MxIsComplexFn = unsafe extern "C" fn(*mut MxHandle) -> bool;
type MxGetDataFn = unsafe extern "C" fn(*mut MxHandle) -> *mut c_void;
type MxGetImagDataFn = unsafe extern "C" fn(*mut MxHandle) -> *mut c_void;
type MxCreateNumericArrayFn =
    unsafe extern "C" fn(size_t, *const size_t, c_int, c_int) -> *mut MxHandle;
type MxCreateStringFn = unsafe extern "C" fn(*const c_char) -> *mut MxHandle;
type MxGetStringFn = unsafe extern "C" fn(*mut MxHandle, *mut c_char, size_t) -> c_int;
type MxDestroyArrayFn = unsafe extern "C" fn(*mut MxHandle);

struct EngFns {
    open: EngOpenFn,
    close: EngCloseFn,
    eval_string: EngEvalStringFn,
    get_variable: EngGetVariableFn,
    put_variable: EngPutVariableFn,
    output_buffer: EngOutputBufferFn,
}

struct MxFns {
    num_dimensions: MxGetNumberOfDimensionsFn,
    dimensions: MxGetDimensionsFn,
    num_elements: MxGetNumberOfElementsFn,
    element_size: MxGetElementSizeFn,
    class_name: MxGetClassNameFn,
    is_numeric: MxIsNumericFn,
    is_complex: MxIsComplexFn,
    data: MxGetDataFn,
    imag_data: MxGetImagDataFn,
    create_numeric: MxCreateNumericArrayFn,
    create_string: MxCreateStringFn,
    get_string: MxGetStringFn,
    destroy: MxDestroyArrayFn,
}

/// The engine's C libraries, loaded and fully resolved.
pub struct MatlabRuntime {
    // The libraries must outlive every resolved function pointer below.
    _libeng: Library,
    _libmx: Library,
    eng: EngFns,
    mx: MxFns,
}

impl MatlabRuntime {
    /// Load `libeng` and `libmx` from the installation root and resolve
    /// all entry points.
    pub fn load(matlab_root: impl AsRef<Path>) -> EngineResult<Arc<Self>> {
        let dir = library_dir(matlab_root.as_ref());
        let eng_path = dir.join(library_file("eng"));
        let mx_path = dir.join(library_file("mx"));

        let libeng = open_library(&eng_path)?;
        let libmx = open_library(&mx_path)?;
        debug!(eng = %eng_path.display(), mx = %mx_path.display(), "engine libraries loaded");

        let eng = EngFns {
            open: symbol(&libeng, &eng_path, b"engOpen\0")?,
            close: symbol(&libeng, &eng_path, b"engClose\0")?,
            eval_string: symbol(&libeng, &eng_path, b"engEvalString\0")?,
            get_variable: symbol(&libeng, &eng_path, b"engGetVariable\0")?,
            put_variable: symbol(&libeng, &eng_path, b"engPutVariable\0")?,
            output_buffer: symbol(&libeng, &eng_path, b"engOutputBuffer\0")?,
        };

        let mx = MxFns {
            num_dimensions: symbol(&libmx, &mx_path, b"mxGetNumberOfDimensions\0")?,
            dimensions: symbol(&libmx, &mx_path, b"mxGetDimensions\0")?,
            num_elements: symbol(&libmx, &mx_path, b"mxGetNumberOfElements\0")?,
            element_size: symbol(&libmx, &mx_path, b"mxGetElementSize\0")?,
            class_name: symbol(&libmx, &mx_path, b"mxGetClassName\0")?,
            is_numeric: symbol(&libmx, &mx_path, b"mxIsNumeric\0")?,
            is_complex: symbol(&libmx, &mx_path, b"mxIsComplex\0")?,
            data: symbol(&libmx, &mx_path, b"mxGetData\0")?,
            imag_data: symbol(&libmx, &mx_path, b"mxGetImagData\0")?,
            create_numeric: symbol(&libmx, &mx_path, b"mxCreateNumericArray\0")?,
            create_string: symbol(&libmx, &mx_path, b"mxCreateString\0")?,
            get_string: symbol(&libmx, &mx_path, b"mxGetString\0")?,
            destroy: symbol(&libmx, &mx_path, b"mxDestroyArray\0")?,
        };

        Ok(Arc::new(Self {
            _libeng: libeng,
            _libmx: libmx,
            eng,
            mx,
        }))
    }

    /// The binding-surface pair backed by this runtime
    pub fn api(self: &Arc<Self>) -> EngineApi {
        EngineApi::new(
            Arc::clone(self) as Arc<dyn EngApi>,
            Arc::clone(self) as Arc<dyn MxApi>,
        )
    }
}

/// Launch command for an installation root: executable path plus options
/// (e.g. "-nosplash").
pub fn default_command(matlab_root: impl AsRef<Path>, options: &str) -> String {
    let executable = matlab_root.as_ref().join("bin").join("matlab");
    if options.is_empty() {
        executable.display().to_string()
    } else {
        format!("{} {}", executable.display(), options)
    }
}

/// Platform library directory under the installation root
fn library_dir(root: &Path) -> PathBuf {
    #[cfg(target_os = "linux")]
    let arch = "glnxa64";
    #[cfg(target_os = "macos")]
    let arch = "maci64";
    #[cfg(target_os = "windows")]
    let arch = "win64";
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    let arch = "glnxa64";

    root.join("bin").join(arch)
}

/// Platform file name for an engine library stem ("eng", "mx")
fn library_file(stem: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("lib{stem}.dll")
    }
    #[cfg(target_os = "macos")]
    {
        format!("lib{stem}.dylib")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        format!("lib{stem}.so")
    }
}

fn open_library(path: &Path) -> EngineResult<Library> {
    unsafe { Library::new(path) }
        .map_err(|e| EngineError::library_load(path.display().to_string(), e.to_string()))
}

fn symbol<T: Copy>(lib: &Library, path: &Path, name: &[u8]) -> EngineResult<T> {
    let sym = unsafe { lib.get::<T>(name) }.map_err(|e| {
        EngineError::library_load(
            format!(
                "{}:{}",
                path.display(),
                String::from_utf8_lossy(&name[..name.len() - 1])
            ),
            e.to_string(),
        )
    })?;
    Ok(*sym)
}

impl EngApi for MatlabRuntime {
    fn open(&self, command: &CStr) -> *mut EngHandle {
        unsafe { (self.eng.open)(command.as_ptr()) }
    }

    fn close(&self, ep: *mut EngHandle) -> i32 {
        unsafe { (self.eng.close)(ep) }
    }

    fn eval_string(&self, ep: *mut EngHandle, script: &CStr) -> i32 {
        unsafe { (self.eng.eval_string)(ep, script.as_ptr()) }
    }

    fn get_variable(&self, ep: *mut EngHandle, name: &CStr) -> *mut MxHandle {
        unsafe { (self.eng.get_variable)(ep, name.as_ptr()) }
    }

    fn put_variable(&self, ep: *mut EngHandle, name: &CStr, pm: *mut MxHandle) -> i32 {
        unsafe { (self.eng.put_variable)(ep, name.as_ptr(), pm) }
    }

    fn output_buffer(&self, ep: *mut EngHandle, buffer: *mut c_char, capacity: i32) -> i32 {
        unsafe { (self.eng.output_buffer)(ep, buffer, capacity) }
    }
}

impl MxApi for MatlabRuntime {
    fn create_numeric(&self, dims: &[usize], class: ClassId, complex: bool) -> *mut MxHandle {
        unsafe {
            (self.mx.create_numeric)(
                dims.len(),
                dims.as_ptr(),
                class.code(),
                c_int::from(complex),
            )
        }
    }

    fn create_string(&self, text: &CStr) -> *mut MxHandle {
        unsafe { (self.mx.create_string)(text.as_ptr()) }
    }

    fn destroy(&self, pm: *mut MxHandle) {
        unsafe { (self.mx.destroy)(pm) }
    }

    fn num_dimensions(&self, pm: *mut MxHandle) -> usize {
        unsafe { (self.mx.num_dimensions)(pm) }
    }

    fn dimensions(&self, pm: *mut MxHandle) -> Vec<usize> {
        let ndim = self.num_dimensions(pm);
        let ptr = unsafe { (self.mx.dimensions)(pm) };
        if ptr.is_null() {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(ptr, ndim) }.to_vec()
    }

    fn num_elements(&self, pm: *mut MxHandle) -> usize {
        unsafe { (self.mx.num_elements)(pm) }
    }

    fn element_size(&self, pm: *mut MxHandle) -> usize {
        unsafe { (self.mx.element_size)(pm) }
    }

    fn class_name(&self, pm: *mut MxHandle) -> String {
        let ptr = unsafe { (self.mx.class_name)(pm) };
        if ptr.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }

    fn is_numeric(&self, pm: *mut MxHandle) -> bool {
        unsafe { (self.mx.is_numeric)(pm) }
    }

    fn is_complex(&self, pm: *mut MxHandle) -> bool {
        unsafe { (self.mx.is_complex)(pm) }
    }

    fn read_string(&self, pm: *mut MxHandle, capacity: usize) -> Option<String> {
        let mut buf = vec![0u8; capacity + 1];
        let status =
            unsafe { (self.mx.get_string)(pm, buf.as_mut_ptr().cast::<c_char>(), capacity) };
        if status != 0 {
            return None;
        }
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Some(String::from_utf8_lossy(&buf[..end]).into_owned())
    }

    fn read_real(&self, pm: *mut MxHandle, dst: &mut [u8]) -> bool {
        copy_out(unsafe { (self.mx.data)(pm) }, dst)
    }

    fn read_imag(&self, pm: *mut MxHandle, dst: &mut [u8]) -> bool {
        copy_out(unsafe { (self.mx.imag_data)(pm) }, dst)
    }

    fn write_real(&self, pm: *mut MxHandle, src: &[u8]) -> bool {
        copy_in(unsafe { (self.mx.data)(pm) }, src)
    }

    fn write_imag(&self, pm: *mut MxHandle, src: &[u8]) -> bool {
        copy_in(unsafe { (self.mx.imag_data)(pm) }, src)
    }
}

fn copy_out(ptr: *mut c_void, dst: &mut [u8]) -> bool {
    if ptr.is_null() {
        return false;
    }
    unsafe { std::ptr::copy_nonoverlapping(ptr.cast::<u8>(), dst.as_mut_ptr(), dst.len()) };
    true
}

fn copy_in(ptr: *mut c_void, src: &[u8]) -> bool {
    if ptr.is_null() {
        return false;
    }
    unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), ptr.cast::<u8>(), src.len()) };
    true
}
