//! Engine Session Lifecycle
//!
//! [`Session`] owns one engine connection for its whole lifetime: it exists
//! only in the connected state ([`Session::connect`] is the sole way in) and
//! closing consumes it, so use-after-close is unrepresentable. The close
//! call is issued exactly once, by [`Session::close`] or by drop.
//!
//! ## Error Capture Protocol
//!
//! The engine's eval return code only signals protocol-level failure, so
//! script errors are detected by wrapping every expression in a capture
//! template that guarantees, in order: the error variable starts empty; the
//! expression runs verbatim; a thrown error fills the variable with
//! identifier, message, and one line per stack frame (function, file,
//! line); the variable exists afterwards no matter what the expression did.
//! After sending the script, the session reads the variable back through
//! the ordinary get path and raises if anything was captured.

use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::Arc;

use libc::c_char;
use tracing::{debug, trace, warn};

use matlink_arrays::Value;

use crate::api::{EngHandle, EngineApi};
use crate::error::{EngineError, EngineResult};
use crate::handle::MxArray;
use crate::marshal;

/// Workspace variable the capture template writes script errors into.
const ERROR_VARIABLE: &str = "ERRORSTR";

/// Connection options for [`Session::connect`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    command: String,
    output_capacity: usize,
}

impl SessionOptions {
    /// Options for launching the engine with the given command line
    /// (executable path plus engine flags).
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output_capacity: 0,
        }
    }

    /// Capture engine textual output into a session-owned buffer of
    /// `capacity` bytes. The engine writes at most `capacity - 1` bytes
    /// plus a terminator. Zero (the default) disables capture.
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    /// The launch command these options will attempt
    pub fn command(&self) -> &str {
        &self.command
    }
}

/// A live, exclusively owned engine connection.
///
/// All calls block until the engine responds. The session is deliberately
/// single-threaded; callers sharing one session across threads must
/// serialize access around whole eval/get/put calls.
pub struct Session {
    api: EngineApi,
    ep: NonNull<EngHandle>,
    output: Option<Box<[u8]>>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("ep", &self.ep)
            .field("output", &self.output)
            .field("closed", &self.closed)
            .finish()
    }
}

impl Session {
    /// Launch or attach to an engine process.
    ///
    /// Fails with [`EngineError::ConnectionFailure`] carrying the attempted
    /// command when the engine reports a null connection handle.
    pub fn connect(api: EngineApi, options: &SessionOptions) -> EngineResult<Self> {
        let command = CString::new(options.command.as_str()).map_err(|_| {
            EngineError::InvalidString {
                what: "launch command".to_string(),
            }
        })?;

        let ep = NonNull::new(api.eng.open(&command))
            .ok_or_else(|| EngineError::connection_failure(options.command.as_str()))?;
        debug!(command = %options.command, "engine connected");

        let mut session = Self {
            api,
            ep,
            output: None,
            closed: false,
        };

        if options.output_capacity > 0 {
            // The buffer is heap-pinned inside the session so the pointer
            // registered with the engine stays valid until close.
            let mut buffer = vec![0u8; options.output_capacity].into_boxed_slice();
            session.api.eng.output_buffer(
                session.ep.as_ptr(),
                buffer.as_mut_ptr().cast::<c_char>(),
                (options.output_capacity - 1) as i32,
            );
            session.output = Some(buffer);
        }

        Ok(session)
    }

    /// Evaluate an expression in the engine workspace.
    ///
    /// A script error inside the engine fails with
    /// [`EngineError::Evaluation`] carrying the captured identifier,
    /// message, and stack text verbatim. A capture that is empty after
    /// trimming whitespace counts as success.
    pub fn eval(&mut self, expression: &str) -> EngineResult<()> {
        let script = wrap_expression(expression);
        let c_script = CString::new(script).map_err(|_| EngineError::InvalidString {
            what: "expression".to_string(),
        })?;

        trace!(%expression, "evaluating");
        self.api.eng.eval_string(self.ep.as_ptr(), &c_script);

        // The sole error-detection mechanism: read the capture variable
        // back through the ordinary get path.
        let captured = self.get(ERROR_VARIABLE)?;
        let report = match captured {
            Value::Str(s) => s,
            other => {
                return Err(EngineError::evaluation(format!(
                    "error capture variable held a {} instead of text",
                    other.kind()
                )))
            }
        };

        if report.trim().is_empty() {
            Ok(())
        } else {
            Err(EngineError::evaluation(report))
        }
    }

    /// Retrieve a workspace variable as a host value.
    ///
    /// A name the workspace does not know fails with
    /// [`EngineError::VariableNotFound`]; missing variables are never
    /// zero-filled.
    pub fn get(&mut self, name: &str) -> EngineResult<Value> {
        let c_name = variable_name(name)?;
        let ptr = self.api.eng.get_variable(self.ep.as_ptr(), &c_name);
        let handle = MxArray::wrap(Arc::clone(&self.api.mx), ptr)
            .ok_or_else(|| EngineError::variable_not_found(name))?;
        marshal::decode(handle)
    }

    /// Copy a host value into the named workspace variable.
    ///
    /// The engine copies on transfer; the local handle is destroyed on
    /// every path once the call returns.
    pub fn put(&mut self, name: &str, value: &Value) -> EngineResult<()> {
        let c_name = variable_name(name)?;
        let handle = marshal::encode(&self.api.mx, value)?;

        let status = self
            .api
            .eng
            .put_variable(self.ep.as_ptr(), &c_name, handle.as_ptr());
        drop(handle);

        if status != 0 {
            return Err(EngineError::PutFailed {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Captured engine output up to the terminator, or `None` when no
    /// capture buffer was configured.
    pub fn output(&self) -> Option<String> {
        self.output.as_ref().map(|buffer| {
            let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
            String::from_utf8_lossy(&buffer[..end]).into_owned()
        })
    }

    /// Close the connection. Equivalent to dropping the session; provided
    /// so teardown can be sequenced explicitly.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let status = self.api.eng.close(self.ep.as_ptr());
        if status != 0 {
            warn!(status, "engine close reported failure");
        } else {
            debug!("engine connection closed");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn variable_name(name: &str) -> EngineResult<CString> {
    CString::new(name).map_err(|_| EngineError::InvalidString {
        what: format!("variable name '{}'", name.replace('\0', "\\0")),
    })
}

/// Embed an expression verbatim in the error-capture template.
fn wrap_expression(expression: &str) -> String {
    format!(
        r#"ERRORSTR = '';
try
    {expression}
catch err
    ERRORSTR = sprintf('%s: %s\n', err.identifier, err.message);
    for i = 1:length(err.stack)
        ERRORSTR = sprintf('%sError: in function %s in file %s line %i\n', ERRORSTR, err.stack(i,1).name, err.stack(i,1).file, err.stack(i,1).line);
    end
end
if exist('ERRORSTR','var') == 0
    ERRORSTR='';
end
"#
    )
}
