//! In-Process Engine Test Double
//!
//! [`MockEngine`] implements the full binding surface against an in-memory
//! workspace, so sessions, marshalling, and resource discipline can be
//! exercised without an engine installation. It mirrors the real engine's
//! copy semantics: get hands out a fresh handle copy of the stored
//! variable, put copies the handle's contents into the workspace.
//!
//! The double is strict where the real libraries are forgiving: destroying
//! an unknown handle, touching a destroyed handle, or closing a connection
//! twice panics, which turns ownership bugs into immediate test failures.
//! Create/destroy counts are exposed so tests can assert handle balance.

use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use std::sync::{Arc, Mutex, MutexGuard};

use libc::c_char;

use crate::api::{EngApi, EngHandle, EngineApi, MxApi, MxHandle};
use crate::class::ClassId;

#[derive(Clone)]
struct MockArray {
    class: ClassId,
    dims: Vec<usize>,
    complex: bool,
    real: Vec<u8>,
    imag: Option<Vec<u8>>,
    text: Option<String>,
}

impl MockArray {
    fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    fn element_size(&self) -> usize {
        match self.class {
            ClassId::Logical | ClassId::Int8 | ClassId::UInt8 => 1,
            ClassId::Char | ClassId::Int16 | ClassId::UInt16 => 2,
            ClassId::Single | ClassId::Int32 | ClassId::UInt32 => 4,
            ClassId::Double | ClassId::Int64 | ClassId::UInt64 => 8,
            // Containers hold handle-sized slots.
            ClassId::Cell | ClassId::Struct => 8,
        }
    }
}

#[derive(Default)]
struct MockState {
    next_id: usize,
    arrays: HashMap<usize, MockArray>,
    workspace: HashMap<String, MockArray>,
    connections: HashSet<usize>,
    created: usize,
    destroyed: usize,
    refuse_connection: bool,
    next_eval_error: Option<String>,
    fail_next_put: bool,
    pending_output: String,
    capture: Option<(usize, usize)>,
    scripts: Vec<String>,
}

impl MockState {
    fn new_handle(&mut self, array: MockArray) -> *mut MxHandle {
        self.next_id += 1;
        self.created += 1;
        self.arrays.insert(self.next_id, array);
        self.next_id as *mut MxHandle
    }

    fn array(&self, pm: *mut MxHandle) -> &MockArray {
        match self.arrays.get(&(pm as usize)) {
            Some(a) => a,
            None => panic!("mock: use of an unknown or destroyed handle"),
        }
    }

    fn array_mut(&mut self, pm: *mut MxHandle) -> &mut MockArray {
        match self.arrays.get_mut(&(pm as usize)) {
            Some(a) => a,
            None => panic!("mock: use of an unknown or destroyed handle"),
        }
    }

    fn string_array(text: &str) -> MockArray {
        let dims = if text.is_empty() {
            vec![0, 0]
        } else {
            vec![1, text.len()]
        };
        MockArray {
            class: ClassId::Char,
            dims,
            complex: false,
            real: Vec::new(),
            imag: None,
            text: Some(text.to_string()),
        }
    }
}

/// An in-memory engine implementing both binding traits.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    /// Create a fresh mock engine
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The binding-surface pair backed by this mock
    pub fn api(self: &Arc<Self>) -> EngineApi {
        EngineApi::new(
            Arc::clone(self) as Arc<dyn EngApi>,
            Arc::clone(self) as Arc<dyn MxApi>,
        )
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---- test hooks -------------------------------------------------------

    /// Make every subsequent open return a null connection
    pub fn refuse_connections(&self) {
        self.state().refuse_connection = true;
    }

    /// Script the next eval to fail with the given capture report
    pub fn fail_next_eval(&self, report: impl Into<String>) {
        self.state().next_eval_error = Some(report.into());
    }

    /// Make the next put report failure
    pub fn fail_next_put(&self) {
        self.state().fail_next_put = true;
    }

    /// Queue text the next eval writes into the registered capture buffer
    pub fn queue_output(&self, text: impl Into<String>) {
        self.state().pending_output = text.into();
    }

    /// Handles currently alive (created but not destroyed)
    pub fn live_handles(&self) -> usize {
        self.state().arrays.len()
    }

    /// Total handles created so far
    pub fn created(&self) -> usize {
        self.state().created
    }

    /// Total handles destroyed so far
    pub fn destroyed(&self) -> usize {
        self.state().destroyed
    }

    /// Open connections
    pub fn open_connections(&self) -> usize {
        self.state().connections.len()
    }

    /// Whether a workspace variable exists
    pub fn has_variable(&self, name: &str) -> bool {
        self.state().workspace.contains_key(name)
    }

    /// Every script evaluated so far, wrapped text included
    pub fn scripts(&self) -> Vec<String> {
        self.state().scripts.clone()
    }
}

impl EngApi for MockEngine {
    fn open(&self, _command: &CStr) -> *mut EngHandle {
        let mut state = self.state();
        if state.refuse_connection {
            return std::ptr::null_mut();
        }
        state.next_id += 1;
        let id = state.next_id;
        state.connections.insert(id);
        id as *mut EngHandle
    }

    fn close(&self, ep: *mut EngHandle) -> i32 {
        let mut state = self.state();
        if !state.connections.remove(&(ep as usize)) {
            panic!("mock: connection closed twice");
        }
        0
    }

    fn eval_string(&self, _ep: *mut EngHandle, script: &CStr) -> i32 {
        let mut state = self.state();
        let script = script.to_string_lossy().into_owned();
        state.scripts.push(script);

        let report = state.next_eval_error.take().unwrap_or_default();
        let capture = MockState::string_array(&report);
        state.workspace.insert(ERROR_VARIABLE.to_string(), capture);

        if let Some((buffer, capacity)) = state.capture {
            let text = std::mem::take(&mut state.pending_output);
            let n = text.len().min(capacity);
            // The session registered a buffer of capacity + 1 bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(text.as_ptr(), buffer as *mut u8, n);
                *(buffer as *mut u8).add(n) = 0;
            }
        }
        0
    }

    fn get_variable(&self, _ep: *mut EngHandle, name: &CStr) -> *mut MxHandle {
        let mut state = self.state();
        let name = name.to_string_lossy().into_owned();
        match state.workspace.get(&name).cloned() {
            Some(array) => state.new_handle(array),
            None => std::ptr::null_mut(),
        }
    }

    fn put_variable(&self, _ep: *mut EngHandle, name: &CStr, pm: *mut MxHandle) -> i32 {
        let mut state = self.state();
        if state.fail_next_put {
            state.fail_next_put = false;
            return 1;
        }
        let array = state.array(pm).clone();
        let name = name.to_string_lossy().into_owned();
        state.workspace.insert(name, array);
        0
    }

    fn output_buffer(&self, _ep: *mut EngHandle, buffer: *mut c_char, capacity: i32) -> i32 {
        self.state().capture = Some((buffer as usize, capacity as usize));
        0
    }
}

impl MxApi for MockEngine {
    fn create_numeric(&self, dims: &[usize], class: ClassId, complex: bool) -> *mut MxHandle {
        let mut array = MockArray {
            class,
            dims: dims.to_vec(),
            complex,
            real: Vec::new(),
            imag: None,
            text: None,
        };
        let bytes = array.numel() * array.element_size();
        array.real = vec![0; bytes];
        array.imag = complex.then(|| vec![0; bytes]);
        self.state().new_handle(array)
    }

    fn create_string(&self, text: &CStr) -> *mut MxHandle {
        let text = text.to_string_lossy().into_owned();
        self.state().new_handle(MockState::string_array(&text))
    }

    fn destroy(&self, pm: *mut MxHandle) {
        let mut state = self.state();
        if state.arrays.remove(&(pm as usize)).is_none() {
            panic!("mock: handle destroyed twice");
        }
        state.destroyed += 1;
    }

    fn num_dimensions(&self, pm: *mut MxHandle) -> usize {
        self.state().array(pm).dims.len()
    }

    fn dimensions(&self, pm: *mut MxHandle) -> Vec<usize> {
        self.state().array(pm).dims.clone()
    }

    fn num_elements(&self, pm: *mut MxHandle) -> usize {
        self.state().array(pm).numel()
    }

    fn element_size(&self, pm: *mut MxHandle) -> usize {
        self.state().array(pm).element_size()
    }

    fn class_name(&self, pm: *mut MxHandle) -> String {
        self.state().array(pm).class.name().to_string()
    }

    fn is_numeric(&self, pm: *mut MxHandle) -> bool {
        !matches!(
            self.state().array(pm).class,
            ClassId::Logical | ClassId::Char | ClassId::Cell | ClassId::Struct
        )
    }

    fn is_complex(&self, pm: *mut MxHandle) -> bool {
        self.state().array(pm).complex
    }

    fn read_string(&self, pm: *mut MxHandle, capacity: usize) -> Option<String> {
        let state = self.state();
        let text = state.array(pm).text.clone()?;
        if text.len() + 1 > capacity {
            return None;
        }
        Some(text)
    }

    fn read_real(&self, pm: *mut MxHandle, dst: &mut [u8]) -> bool {
        let state = self.state();
        let array = state.array(pm);
        dst.copy_from_slice(&array.real[..dst.len()]);
        true
    }

    fn read_imag(&self, pm: *mut MxHandle, dst: &mut [u8]) -> bool {
        let state = self.state();
        match &state.array(pm).imag {
            Some(imag) => {
                dst.copy_from_slice(&imag[..dst.len()]);
                true
            }
            None => false,
        }
    }

    fn write_real(&self, pm: *mut MxHandle, src: &[u8]) -> bool {
        let mut state = self.state();
        let array = state.array_mut(pm);
        array.real[..src.len()].copy_from_slice(src);
        true
    }

    fn write_imag(&self, pm: *mut MxHandle, src: &[u8]) -> bool {
        let mut state = self.state();
        match &mut state.array_mut(pm).imag {
            Some(imag) => {
                imag[..src.len()].copy_from_slice(src);
                true
            }
            None => false,
        }
    }
}

/// Workspace variable the session's capture template writes into
const ERROR_VARIABLE: &str = "ERRORSTR";
