//! # MATLink Engine
//!
//! Drive a MATLAB engine process from Rust: launch a session, put and get
//! multidimensional numeric, complex, logical, and string values, evaluate
//! expressions, and surface script errors as Rust failures.
//!
//! The heart of the crate is the marshalling layer: exact agreement with
//! the engine on dimensionality, column-major element order, class codes,
//! split complex planes, string extraction, and handle ownership. The
//! engine's C entry points are declared once as a typed binding surface,
//! with a `libloading`-backed implementation for real installations and an
//! in-memory [`MockEngine`](mock::MockEngine) for tests.
//!
//! ## Example
//!
//! ```ignore
//! use matlink_arrays::Value;
//! use matlink_engine::library::{default_command, MatlabRuntime};
//! use matlink_engine::session::{Session, SessionOptions};
//!
//! let runtime = MatlabRuntime::load("/usr/local/MATLAB/R2014a")?;
//! let options = SessionOptions::new(default_command(
//!     "/usr/local/MATLAB/R2014a",
//!     "-nosplash",
//! ))
//! .with_output_capacity(4096);
//!
//! let mut session = Session::connect(runtime.api(), &options)?;
//! session.put("x", &Value::from_vec(&[1.0f64, 2.0, 3.0], vec![3])?)?;
//! session.eval("y = x * 2;")?;
//! let y = session.get("y")?;
//! session.close();
//! ```
//!
//! ## Module Structure
//!
//! - [`api`]: typed binding surface over the engine's C entry points
//! - [`class`]: engine class codes and the dtype map
//! - [`library`]: dynamic loading of `libeng`/`libmx`
//! - [`handle`]: owned engine array handles
//! - [`marshal`]: host value <-> engine handle conversion
//! - [`session`]: connection lifecycle, eval/get/put, error capture
//! - [`mock`]: in-process test double
//! - [`error`]: error types for the bridge

pub mod api;
pub mod class;
pub mod error;
pub mod handle;
pub mod library;
pub mod marshal;
pub mod mock;
pub mod session;

// Re-export main types for convenience
pub use api::{EngApi, EngineApi, MxApi};
pub use class::ClassId;
pub use error::{EngineError, EngineResult};
pub use handle::MxArray;
pub use library::MatlabRuntime;
pub use session::{Session, SessionOptions};

// The host value model, re-exported so callers need only one crate.
pub use matlink_arrays::{Complex, DType, NumericArray, Value};
