//! Error Types for the Engine Bridge
//!
//! ## Error Categories
//!
//! - Connection and library-loading failures (fatal to the session)
//! - Unsupported host dtypes / engine classes (local, session stays usable)
//! - Script errors reported by the engine's capture protocol
//! - Missing workspace variables and other null-handle conditions
//!
//! None of these are retried; propagation stops at the caller.

use thiserror::Error;

use matlink_arrays::ArrayError;

/// Result type for engine bridge operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine bridge error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine process could not be started or attached
    #[error("could not start engine using command:\n\t{command}")]
    ConnectionFailure {
        /// The launch command that was attempted
        command: String,
    },

    /// A native library or symbol could not be loaded
    #[error("failed to load engine library '{path}': {reason}")]
    LibraryLoad {
        /// Path of the library or symbol being resolved
        path: String,
        /// Loader error text
        reason: String,
    },

    /// Encode encountered a host value outside the supported set
    #[error("unsupported host type: {dtype}")]
    UnsupportedType {
        /// Name of the rejected dtype or value kind
        dtype: String,
    },

    /// Decode encountered an engine class outside the supported set
    #[error("{class}-arrays are not supported")]
    UnsupportedClass {
        /// Engine class name as reported by the handle
        class: String,
    },

    /// The evaluated expression raised an error inside the engine
    #[error("error from engine\n{report}")]
    Evaluation {
        /// Captured identifier, message, and stack text, verbatim
        report: String,
    },

    /// The requested workspace variable does not exist
    #[error("workspace variable '{name}' not found")]
    VariableNotFound {
        /// The variable name passed to get
        name: String,
    },

    /// The engine failed to allocate an array handle
    #[error("engine failed to allocate {what}")]
    CreateFailed {
        /// What was being allocated
        what: String,
    },

    /// The engine rejected a workspace transfer
    #[error("engine rejected put of variable '{name}'")]
    PutFailed {
        /// The variable name passed to put
        name: String,
    },

    /// Text crossing the boundary contained an interior NUL byte
    #[error("{what} contains an interior NUL byte")]
    InvalidString {
        /// What the text was (a variable name, an expression, ...)
        what: String,
    },

    /// A char array's text could not be extracted
    #[error("failed to extract text from a char array of {numel} elements")]
    StringExtraction {
        /// Element count of the char array
        numel: usize,
    },

    /// A handle unexpectedly had no data plane to copy
    #[error("handle has no {plane} plane")]
    MissingData {
        /// Which plane was requested ("real" or "imaginary")
        plane: &'static str,
    },

    /// A handle reported buffer geometry inconsistent with its class
    #[error("handle geometry mismatch for class {class}: element size {element_size}, expected {expected}")]
    GeometryMismatch {
        /// Engine class name
        class: String,
        /// Element size the handle reported
        element_size: usize,
        /// Element size the class implies
        expected: usize,
    },

    /// Host array model error
    #[error(transparent)]
    Array(#[from] ArrayError),
}

impl EngineError {
    /// Create a connection failure carrying the attempted command
    pub fn connection_failure(command: impl Into<String>) -> Self {
        EngineError::ConnectionFailure {
            command: command.into(),
        }
    }

    /// Create a library load error
    pub fn library_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::LibraryLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported host type error
    pub fn unsupported_type(dtype: impl Into<String>) -> Self {
        EngineError::UnsupportedType {
            dtype: dtype.into(),
        }
    }

    /// Create an unsupported engine class error
    pub fn unsupported_class(class: impl Into<String>) -> Self {
        EngineError::UnsupportedClass {
            class: class.into(),
        }
    }

    /// Create an evaluation error carrying the captured report
    pub fn evaluation(report: impl Into<String>) -> Self {
        EngineError::Evaluation {
            report: report.into(),
        }
    }

    /// Create a missing-variable error
    pub fn variable_not_found(name: impl Into<String>) -> Self {
        EngineError::VariableNotFound { name: name.into() }
    }

    /// Check if this error came from inside an evaluated expression
    pub fn is_evaluation(&self) -> bool {
        matches!(self, EngineError::Evaluation { .. })
    }

    /// Check if this is a marshalling rejection (the session stays usable)
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            EngineError::UnsupportedType { .. } | EngineError::UnsupportedClass { .. }
        )
    }

    /// Check if this error is fatal to the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::ConnectionFailure { .. } | EngineError::LibraryLoad { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failure_names_command() {
        let err = EngineError::connection_failure("/opt/matlab/bin/matlab -nosplash");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/opt/matlab/bin/matlab -nosplash"));
    }

    #[test]
    fn test_unsupported_predicates() {
        assert!(EngineError::unsupported_type("struct").is_unsupported());
        assert!(EngineError::unsupported_class("cell").is_unsupported());
        assert!(!EngineError::unsupported_class("cell").is_fatal());
    }

    #[test]
    fn test_evaluation_report_verbatim() {
        let report = "MyPkg:fail: something broke\nError: in function f in file f.m line 3\n";
        let err = EngineError::evaluation(report);
        assert!(err.is_evaluation());
        assert!(err.to_string().contains(report));
    }

    #[test]
    fn test_array_error_wraps() {
        let arr = ArrayError::dtype_mismatch("int32", "float64");
        let err: EngineError = arr.clone().into();
        assert_eq!(err, EngineError::Array(arr));
    }
}
